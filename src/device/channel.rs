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
    fmt, thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tracing::{debug, error, info, span, warn, Level, Span};

use crate::config::{self, ConfigError};

use super::{Command, Connector, DeviceError, Transport};

const READ_TIMEOUT: Duration = Duration::from_millis(100);
const MAX_LIGHT: f64 = 255.0;

/// Per-channel settings derived from the player configuration.
#[derive(Clone, Debug)]
pub struct ChannelSettings {
    /// The serial baud rate.
    pub baud: u32,
    /// The read timeout used when opening the port.
    pub read_timeout: Duration,
    /// Commands sent sooner than this after the previous one are dropped.
    pub command_interval: Duration,
    /// How long to wait after opening a port for the board to reset.
    pub settle_delay: Duration,
    /// The lowest allowed servo angle.
    pub servo_min: u16,
    /// The highest allowed servo angle.
    pub servo_max: u16,
    /// Whether LED commands are sent.
    pub led: bool,
    /// Whether buzzer commands are sent.
    pub buzzer: bool,
}

impl ChannelSettings {
    /// Derives the channel settings from the player configuration.
    pub fn from_config(config: &config::Player) -> Result<ChannelSettings, ConfigError> {
        Ok(ChannelSettings {
            baud: config.serial_baud(),
            read_timeout: READ_TIMEOUT,
            command_interval: config.command_interval(),
            settle_delay: config.settle_delay()?,
            servo_min: config.servo().min(),
            servo_max: config.servo().max(),
            led: config.features().led(),
            buzzer: config.features().buzzer(),
        })
    }
}

/// Why a channel stopped talking to its board. Channels never recover from either.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisableReason {
    /// The port could not be opened.
    ConnectionFailure(String),
    /// A write failed after the port was opened.
    WriteFailure(String),
}

impl fmt::Display for DisableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisableReason::ConnectionFailure(reason) => write!(f, "connection failure: {}", reason),
            DisableReason::WriteFailure(reason) => write!(f, "write failure: {}", reason),
        }
    }
}

/// The result of a send attempt. Purely informational; nothing needs to act on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// The command was written.
    Sent,
    /// The command arrived too soon after the previous one and was dropped.
    RateLimited,
    /// The feature the command drives is turned off.
    Skipped,
    /// The channel is disabled.
    Disabled,
    /// The write failed and the channel is now disabled.
    Failed,
}

enum ChannelState {
    Active(Box<dyn Transport>),
    Disabled(DisableReason),
}

struct Inner {
    state: ChannelState,
    last_send: Option<Instant>,
}

/// A single serial connection to an actuator board.
pub struct Channel {
    /// The configured device name.
    name: String,
    /// The port the board is attached to.
    port: String,
    settings: ChannelSettings,
    /// The connection and rate limiting state. Sends on one channel are serialized by this lock.
    inner: Mutex<Inner>,
    span: Span,
}

impl Channel {
    /// Opens the connection to the configured board. A board that can't be opened produces a
    /// disabled channel rather than an error.
    pub fn connect(
        device: &config::Device,
        settings: ChannelSettings,
        connector: &dyn Connector,
    ) -> Channel {
        let span = span!(Level::INFO, "channel", device = device.name());
        let state = {
            let _enter = span.enter();
            match connector.open(device.port(), settings.baud, settings.read_timeout) {
                Ok(transport) => {
                    // The board resets when the port opens.
                    thread::sleep(settings.settle_delay);
                    info!(port = device.port(), baud = settings.baud, "Device connected.");
                    ChannelState::Active(transport)
                }
                Err(e) => {
                    error!(port = device.port(), err = %e, "Unable to connect to device.");
                    ChannelState::Disabled(DisableReason::ConnectionFailure(e.to_string()))
                }
            }
        };

        Channel {
            name: device.name().to_string(),
            port: device.port().to_string(),
            settings,
            inner: Mutex::new(Inner {
                state,
                last_send: None,
            }),
            span,
        }
    }

    /// Sends a command, subject to the rate limit. Commands that arrive too soon are dropped.
    pub fn send(&self, command: Command) -> SendOutcome {
        let _enter = self.span.enter();
        let mut inner = self.inner.lock();
        let Inner { state, last_send } = &mut *inner;

        let transport = match &mut *state {
            ChannelState::Active(transport) => transport,
            ChannelState::Disabled(_) => return SendOutcome::Disabled,
        };

        let now = Instant::now();
        if let Some(last) = *last_send {
            if now.duration_since(last) < self.settings.command_interval {
                debug!(command = %command, "Rate limited, dropping command.");
                return SendOutcome::RateLimited;
            }
        }
        *last_send = Some(now);

        if let Err(e) = transport.write_line(&command.to_string()) {
            let e = DeviceError::from(e);
            warn!(command = %command, err = %e, "Disabling device.");
            *state = ChannelState::Disabled(DisableReason::WriteFailure(e.to_string()));
            return SendOutcome::Failed;
        }
        SendOutcome::Sent
    }

    /// Moves the servo, clamping to the configured bounds.
    pub fn set_angle(&self, angle: f64) -> SendOutcome {
        let angle = angle.clamp(
            f64::from(self.settings.servo_min),
            f64::from(self.settings.servo_max),
        );
        self.send(Command::Angle(angle as u16))
    }

    /// Sets the LED brightness, clamped to 0-255. Does nothing if the LED is turned off.
    pub fn set_light(&self, level: f64) -> SendOutcome {
        if !self.settings.led {
            return SendOutcome::Skipped;
        }
        self.send(Command::Light(level.clamp(0.0, MAX_LIGHT) as u8))
    }

    /// Plays a tone. Does nothing if the buzzer is turned off.
    pub fn set_tone(&self, freq: f64) -> SendOutcome {
        if !self.settings.buzzer {
            return SendOutcome::Skipped;
        }
        self.send(Command::Tone(freq as u32))
    }

    /// Sends STOP. Feature toggles don't apply.
    pub fn stop(&self) -> SendOutcome {
        self.send(Command::Stop)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// The minimum time between two commands on this channel.
    pub fn command_interval(&self) -> Duration {
        self.settings.command_interval
    }

    /// Returns true if the channel still talks to its board.
    pub fn is_enabled(&self) -> bool {
        matches!(self.inner.lock().state, ChannelState::Active(_))
    }

    /// Returns why the channel was disabled, if it was.
    pub fn disable_reason(&self) -> Option<DisableReason> {
        match &self.inner.lock().state {
            ChannelState::Active(_) => None,
            ChannelState::Disabled(reason) => Some(reason.clone()),
        }
    }

    /// Returns when the last non-dropped send was attempted.
    pub fn last_send(&self) -> Option<Instant> {
        self.inner.lock().last_send
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.port)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::{thread, time::Duration};

    use crate::{
        config,
        device::{Command, MockConnector, MockTransport, SendOutcome},
    };

    use super::{Channel, ChannelSettings, DisableReason};

    /// Settings with no rate limit and no settle delay.
    pub(crate) fn unthrottled() -> ChannelSettings {
        ChannelSettings {
            baud: 115_200,
            read_timeout: Duration::from_millis(100),
            command_interval: Duration::ZERO,
            settle_delay: Duration::ZERO,
            servo_min: 0,
            servo_max: 180,
            led: true,
            buzzer: true,
        }
    }

    fn channel(settings: ChannelSettings) -> (Channel, MockTransport) {
        let connector = MockConnector::new();
        let channel = Channel::connect(
            &config::Device::new("left", "mock-left", true),
            settings,
            &connector,
        );
        let transport = connector.transport("mock-left").expect("port was opened");
        (channel, transport)
    }

    #[test]
    fn test_semantic_commands() {
        let (channel, transport) = channel(unthrottled());

        assert_eq!(channel.set_angle(30.0), SendOutcome::Sent);
        assert_eq!(channel.set_angle(250.0), SendOutcome::Sent);
        assert_eq!(channel.set_angle(-12.0), SendOutcome::Sent);
        assert_eq!(channel.set_angle(44.9), SendOutcome::Sent);
        assert_eq!(channel.set_light(180.0), SendOutcome::Sent);
        assert_eq!(channel.set_light(300.0), SendOutcome::Sent);
        assert_eq!(channel.set_tone(261.7), SendOutcome::Sent);
        assert_eq!(channel.stop(), SendOutcome::Sent);

        assert_eq!(
            transport.lines(),
            vec![
                "ANGLE:30", "ANGLE:180", "ANGLE:0", "ANGLE:44", "LED:180", "LED:255", "BUZZ:261",
                "STOP"
            ]
        );
    }

    #[test]
    fn test_servo_bounds() {
        let (channel, transport) = channel(ChannelSettings {
            servo_min: 20,
            servo_max: 160,
            ..unthrottled()
        });

        channel.set_angle(0.0);
        channel.set_angle(180.0);
        assert_eq!(transport.lines(), vec!["ANGLE:20", "ANGLE:160"]);
    }

    #[test]
    fn test_feature_toggles() {
        let (channel, transport) = channel(ChannelSettings {
            led: false,
            buzzer: false,
            ..unthrottled()
        });

        assert_eq!(channel.set_light(100.0), SendOutcome::Skipped);
        assert_eq!(channel.set_tone(440.0), SendOutcome::Skipped);
        assert_eq!(channel.stop(), SendOutcome::Sent);
        assert_eq!(transport.lines(), vec!["STOP"]);
    }

    #[test]
    fn test_rate_limit_drops() {
        let (channel, transport) = channel(ChannelSettings {
            command_interval: Duration::from_secs(3600),
            ..unthrottled()
        });

        assert_eq!(channel.last_send(), None);
        assert_eq!(channel.send(Command::Angle(30)), SendOutcome::Sent);
        let first = channel.last_send().expect("send was attempted");

        assert_eq!(channel.send(Command::Angle(50)), SendOutcome::RateLimited);
        assert_eq!(channel.stop(), SendOutcome::RateLimited);
        assert_eq!(channel.last_send(), Some(first));
        assert_eq!(transport.lines(), vec!["ANGLE:30"]);
    }

    #[test]
    fn test_rate_limit_expires() {
        let (channel, transport) = channel(ChannelSettings {
            command_interval: Duration::from_millis(20),
            ..unthrottled()
        });

        assert_eq!(channel.send(Command::Angle(30)), SendOutcome::Sent);
        thread::sleep(Duration::from_millis(40));
        assert_eq!(channel.send(Command::Angle(50)), SendOutcome::Sent);
        assert_eq!(transport.lines(), vec!["ANGLE:30", "ANGLE:50"]);
    }

    #[test]
    fn test_rate_limit_is_per_channel() {
        let connector = MockConnector::new();
        let settings = ChannelSettings {
            command_interval: Duration::from_secs(3600),
            ..unthrottled()
        };
        let left = Channel::connect(
            &config::Device::new("left", "mock-left", true),
            settings.clone(),
            &connector,
        );
        let right = Channel::connect(
            &config::Device::new("right", "mock-right", true),
            settings,
            &connector,
        );

        assert_eq!(left.stop(), SendOutcome::Sent);
        assert_eq!(right.stop(), SendOutcome::Sent);
        assert_eq!(left.stop(), SendOutcome::RateLimited);
    }

    #[test]
    fn test_write_failure_disables() {
        let (channel, transport) = channel(unthrottled());

        assert!(channel.is_enabled());
        transport.fail_writes(true);
        assert_eq!(channel.stop(), SendOutcome::Failed);
        assert!(channel.last_send().is_some());
        assert!(!channel.is_enabled());
        assert!(matches!(
            channel.disable_reason(),
            Some(DisableReason::WriteFailure(_))
        ));

        // The channel never comes back, even when the transport would work again.
        transport.fail_writes(false);
        assert_eq!(channel.stop(), SendOutcome::Disabled);
        assert!(transport.lines().is_empty());
    }

    #[test]
    fn test_connection_failure_disables() {
        let connector = MockConnector::new().refuse("mock-gone");
        let channel = Channel::connect(
            &config::Device::new("gone", "mock-gone", true),
            unthrottled(),
            &connector,
        );

        assert!(!channel.is_enabled());
        assert!(matches!(
            channel.disable_reason(),
            Some(DisableReason::ConnectionFailure(_))
        ));
        assert_eq!(channel.set_angle(90.0), SendOutcome::Disabled);
        assert_eq!(channel.stop(), SendOutcome::Disabled);
        assert_eq!(channel.last_send(), None);
        assert_eq!(connector.opened(), vec!["mock-gone"]);
        assert_eq!(channel.to_string(), "gone (mock-gone)");
    }
}
