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
    error::Error,
    io::{self, Write},
    time::Duration,
};

use serialport::SerialPort;

use super::{mock::MockConnector, Connector, DeviceError, Transport};

/// Opens real serial ports. Port names starting with "mock" are served by a mock connector.
#[derive(Default)]
pub struct SerialConnector {
    mock: MockConnector,
}

impl SerialConnector {
    pub fn new() -> SerialConnector {
        SerialConnector::default()
    }
}

impl Connector for SerialConnector {
    fn open(
        &self,
        port: &str,
        baud: u32,
        timeout: Duration,
    ) -> Result<Box<dyn Transport>, DeviceError> {
        if port.starts_with("mock") {
            return self.mock.open(port, baud, timeout);
        }

        let serial = serialport::new(port, baud)
            .timeout(timeout)
            .open()
            .map_err(|e| DeviceError::Connect {
                port: port.to_string(),
                source: e.into(),
            })?;
        Ok(Box::new(SerialTransport { serial }))
    }
}

struct SerialTransport {
    serial: Box<dyn SerialPort>,
}

impl Transport for SerialTransport {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        self.serial.write_all(&buf)?;
        self.serial.flush()
    }
}

pub(super) fn list() -> Result<Vec<String>, Box<dyn Error>> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|info| info.port_name)
        .collect())
}
