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
use std::{io, sync::Arc};

use tokio::task::JoinHandle;
use tracing::{info, span, warn, Level};

use super::Reply;
use crate::playback::Engine;

const PLAY: &str = "play";
const STOP: &str = "stop";
const STATUS: &str = "status";

/// A controller that drives the engine from lines typed on stdin.
pub struct Driver {
    engine: Arc<Engine>,
}

impl Driver {
    pub fn new(engine: Arc<Engine>) -> Driver {
        Driver { engine }
    }

    /// Handles a single command line. Returns false once the reader is exhausted.
    fn monitor_io<R, W>(engine: &Engine, mut reader: R, mut writer: W) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(writer, "Command ({} <notes>, {}, {}): ", PLAY, STOP, STATUS)?;
        writer.flush()?;
        let mut input = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }

        let mut words = input.split_whitespace();
        let reply = match words.next().map(str::to_lowercase).as_deref() {
            Some(PLAY) => {
                serde_json::to_string(&Reply::from(engine.play(words.map(String::from).collect())))
            }
            Some(STOP) => {
                engine.stop();
                serde_json::to_string(&Reply::ok())
            }
            Some(STATUS) => serde_json::to_string(&engine.status()),
            Some(other) => {
                warn!(input = other, "Unrecognized input");
                return Ok(true);
            }
            None => return Ok(true),
        }
        .map_err(io::Error::other)?;

        writeln!(writer, "{}", reply)?;
        Ok(true)
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self) -> JoinHandle<Result<(), io::Error>> {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");
            while Self::monitor_io(&engine, io::stdin().lock(), io::stdout())? {}
            info!("Keyboard input closed.");
            Ok(())
        })
    }
}
