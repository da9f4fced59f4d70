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
use serde::Deserialize;

/// A YAML representation of an attached actuator board.
#[derive(Deserialize, Clone, Debug)]
pub struct Device {
    /// The name of the board, unique within the configuration.
    name: String,

    /// The serial port the board is attached to, e.g. /dev/ttyUSB0 or COM5.
    port: String,

    /// Disabled boards are never opened. Defaults to true.
    enabled: Option<bool>,
}

impl Device {
    /// Creates a new device configuration.
    pub fn new(name: &str, port: &str, enabled: bool) -> Device {
        Device {
            name: name.to_string(),
            port: port.to_string(),
            enabled: Some(enabled),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}
