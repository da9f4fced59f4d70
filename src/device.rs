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
use std::{error::Error, fmt, io, time::Duration};

mod channel;
mod mock;
mod serial;

pub use self::channel::{Channel, ChannelSettings, DisableReason, SendOutcome};
pub use self::mock::{MockConnector, MockTransport};
pub use self::serial::SerialConnector;

#[cfg(test)]
pub(crate) use self::channel::test::unthrottled;

/// A command understood by the board firmware. Rendered on the wire as a single ASCII line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Moves the servo to the given angle in degrees.
    Angle(u16),
    /// Sets the LED brightness.
    Light(u8),
    /// Plays a tone at the given frequency in Hz.
    Tone(u32),
    /// Silences the buzzer, darkens the LED and holds the servo.
    Stop,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Angle(angle) => write!(f, "ANGLE:{}", angle),
            Command::Light(level) => write!(f, "LED:{}", level),
            Command::Tone(freq) => write!(f, "BUZZ:{}", freq),
            Command::Stop => write!(f, "STOP"),
        }
    }
}

/// Failures talking to a board. These never escape a channel; they disable it instead.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("unable to open {port}: {source}")]
    Connect {
        port: String,
        #[source]
        source: io::Error,
    },

    #[error("write failed: {0}")]
    Write(#[from] io::Error),
}

/// An open byte-oriented connection to a board. Dropping it closes the connection.
pub trait Transport: Send {
    /// Writes the line followed by a newline.
    fn write_line(&mut self, line: &str) -> io::Result<()>;
}

/// Opens transports by port name.
pub trait Connector: Send + Sync {
    fn open(
        &self,
        port: &str,
        baud: u32,
        timeout: Duration,
    ) -> Result<Box<dyn Transport>, DeviceError>;
}

/// Lists the serial ports known to the operating system.
pub fn list_ports() -> Result<Vec<String>, Box<dyn Error>> {
    serial::list()
}
