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

/// Typed error for config load/validation failures so callers can distinguish
/// a missing file from an out-of-range value without string matching.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid duration '{value}': {source}")]
    Duration {
        value: String,
        #[source]
        source: duration_string::Error,
    },

    #[error("Command rate must be above 0 and at most {max} Hz, got {rate}")]
    CommandRate { rate: f64, max: f64 },

    #[error("Invalid servo bounds: min {min}, max {max}")]
    ServoBounds { min: u16, max: u16 },

    #[error("Device name '{0}' is used more than once")]
    DuplicateDevice(String),
}
