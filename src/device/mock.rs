// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    collections::{HashMap, HashSet},
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;
use tracing::debug;

use super::{Connector, DeviceError, Transport};

/// A mock transport. Records every line written to it instead of talking to hardware.
#[derive(Clone)]
pub struct MockTransport {
    port: String,
    lines: Arc<Mutex<Vec<String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MockTransport {
    /// Creates a new mock transport for the given port.
    pub fn new(port: &str) -> MockTransport {
        MockTransport {
            port: port.to_string(),
            lines: Arc::new(Mutex::new(Vec::new())),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Gets every line written so far, without the trailing newline.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Forgets the recorded lines.
    pub fn clear(&self) {
        self.lines.lock().clear();
    }

    /// Makes subsequent writes fail with a broken pipe.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }
}

impl Transport for MockTransport {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock transport failure",
            ));
        }

        debug!(port = self.port, line, "Mock write.");
        self.lines.lock().push(line.to_string());
        Ok(())
    }
}

/// Hands out mock transports and remembers which ports were opened.
#[derive(Default)]
pub struct MockConnector {
    transports: Mutex<HashMap<String, MockTransport>>,
    opened: Mutex<Vec<String>>,
    refused: HashSet<String>,
}

impl MockConnector {
    pub fn new() -> MockConnector {
        MockConnector::default()
    }

    /// Makes opening the given port fail.
    pub fn refuse(mut self, port: &str) -> MockConnector {
        self.refused.insert(port.to_string());
        self
    }

    /// Gets the ports that were opened, in order, including refused ones.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }

    /// Gets the transport handed out for the given port.
    pub fn transport(&self, port: &str) -> Option<MockTransport> {
        self.transports.lock().get(port).cloned()
    }
}

impl Connector for MockConnector {
    fn open(
        &self,
        port: &str,
        _baud: u32,
        _timeout: Duration,
    ) -> Result<Box<dyn Transport>, DeviceError> {
        self.opened.lock().push(port.to_string());

        if self.refused.contains(port) {
            return Err(DeviceError::Connect {
                port: port.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "mock port refused"),
            });
        }

        let transport = self
            .transports
            .lock()
            .entry(port.to_string())
            .or_insert_with(|| MockTransport::new(port))
            .clone();
        Ok(Box::new(transport))
    }
}
