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
use std::{collections::HashSet, path::Path, time::Duration};

use config::{Config, File, FileFormat};
use duration_string::DurationString;
use serde::Deserialize;

mod controller;
mod device;
mod error;

pub use self::controller::{Controller, HttpController};
pub use self::device::Device;
pub use self::error::ConfigError;

/// Boards start dropping serial input above this rate.
pub const MAX_COMMAND_RATE_HZ: f64 = 30.0;

/// The largest angle a hobby servo accepts.
pub const SERVO_LIMIT: u16 = 180;

const DEFAULT_SERIAL_BAUD: u32 = 115_200;
const DEFAULT_COMMAND_RATE_HZ: f64 = 20.0;
const DEFAULT_NOTE_DELAY: Duration = Duration::from_millis(150);
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// The configuration for the servo music player.
#[derive(Deserialize, Clone)]
pub struct Player {
    /// The baud rate used for every serial connection.
    serial_baud: Option<u32>,

    /// The maximum number of commands per second sent to a single device.
    command_rate_hz: Option<f64>,

    /// How long to wait between notes.
    note_delay: Option<String>,

    /// How long to wait after opening a port while the board resets.
    settle_delay: Option<String>,

    /// Servo angle bounds.
    #[serde(default)]
    servo: Servo,

    /// Optional hardware features.
    #[serde(default)]
    features: Features,

    /// The attached boards, in order. The first is the left device, the second the right.
    #[serde(default)]
    devices: Vec<Device>,

    /// The controllers used to drive the player.
    #[serde(default)]
    controller: Vec<Controller>,
}

impl Player {
    /// Loads and validates a player configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Player, ConfigError> {
        let player = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Player>()?;
        player.validate()?;
        Ok(player)
    }

    /// Loads and validates a player configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Player, ConfigError> {
        let player = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<Player>()?;
        player.validate()?;
        Ok(player)
    }

    /// Checks the bounds that serde can't express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.command_rate_hz();
        if !(rate > 0.0 && rate <= MAX_COMMAND_RATE_HZ) {
            return Err(ConfigError::CommandRate {
                rate,
                max: MAX_COMMAND_RATE_HZ,
            });
        }

        let (min, max) = (self.servo.min(), self.servo.max());
        if min > max || max > SERVO_LIMIT {
            return Err(ConfigError::ServoBounds { min, max });
        }

        let mut names = HashSet::new();
        for device in self.devices.iter() {
            if !names.insert(device.name()) {
                return Err(ConfigError::DuplicateDevice(device.name().to_string()));
            }
        }

        self.note_delay()?;
        self.settle_delay()?;
        Ok(())
    }

    /// Returns the serial baud rate.
    pub fn serial_baud(&self) -> u32 {
        self.serial_baud.unwrap_or(DEFAULT_SERIAL_BAUD)
    }

    /// Returns the per-device command rate limit in Hz.
    pub fn command_rate_hz(&self) -> f64 {
        self.command_rate_hz.unwrap_or(DEFAULT_COMMAND_RATE_HZ)
    }

    /// Returns the minimum time between two commands on the same device.
    pub fn command_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.command_rate_hz())
    }

    /// Returns the delay between notes.
    pub fn note_delay(&self) -> Result<Duration, ConfigError> {
        parse_duration(self.note_delay.as_deref(), DEFAULT_NOTE_DELAY)
    }

    /// Returns the settle delay after opening a serial port.
    pub fn settle_delay(&self) -> Result<Duration, ConfigError> {
        parse_duration(self.settle_delay.as_deref(), DEFAULT_SETTLE_DELAY)
    }

    /// Returns the servo bounds.
    pub fn servo(&self) -> &Servo {
        &self.servo
    }

    /// Returns the feature toggles.
    pub fn features(&self) -> &Features {
        &self.features
    }

    /// Returns the configured devices, including disabled ones.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Returns the configured controllers. Defaults to a single HTTP controller.
    pub fn controllers(&self) -> Vec<Controller> {
        if self.controller.is_empty() {
            return vec![Controller::Http(HttpController::default())];
        }
        self.controller.clone()
    }
}

fn parse_duration(value: Option<&str>, default: Duration) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => DurationString::from_string(value.to_string())
            .map(Into::into)
            .map_err(|source| ConfigError::Duration {
                value: value.to_string(),
                source,
            }),
        None => Ok(default),
    }
}

/// Servo angle bounds.
#[derive(Deserialize, Clone, Default)]
pub struct Servo {
    min: Option<u16>,
    max: Option<u16>,
    center: Option<u16>,
}

impl Servo {
    pub fn min(&self) -> u16 {
        self.min.unwrap_or(0)
    }

    pub fn max(&self) -> u16 {
        self.max.unwrap_or(SERVO_LIMIT)
    }

    /// The resting angle. Not used by playback, which always returns to STOP.
    pub fn center(&self) -> u16 {
        self.center.unwrap_or(SERVO_LIMIT / 2)
    }
}

/// Toggles for the optional buzzer and LED on each board.
#[derive(Deserialize, Clone, Default)]
pub struct Features {
    buzzer: Option<bool>,
    led: Option<bool>,
}

impl Features {
    pub fn buzzer(&self) -> bool {
        self.buzzer.unwrap_or(true)
    }

    pub fn led(&self) -> bool {
        self.led.unwrap_or(true)
    }
}
