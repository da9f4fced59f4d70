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
//! Plays note sequences as coordinated servo, buzzer and LED motion on serial actuator boards.
//!
//! A [registry::Registry] owns one rate-limited [device::Channel] per configured board. The
//! [playback::Engine] turns notes into commands for the first two boards, one playback at a
//! time, and the [safety::SafetyController] can silence everything at any moment.
pub mod config;
pub mod controller;
pub mod device;
pub mod playback;
pub mod registry;
pub mod safety;
pub mod state;
#[cfg(test)]
mod test;

use std::{error::Error, path::Path, sync::Arc};

use device::Connector;
use playback::Engine;
use registry::Registry;
use state::RunState;

/// Opens every configured device and builds the engine that drives them. Blocks for the settle
/// delay of each device that connects.
pub fn init_engine(
    config: &config::Player,
    connector: &dyn Connector,
) -> Result<Arc<Engine>, config::ConfigError> {
    let registry = Arc::new(Registry::from_config(config, connector)?);
    Ok(Arc::new(Engine::new(
        registry,
        Arc::new(RunState::new()),
        config.note_delay()?,
    )))
}

/// Initializes the engine and controller from the given config file and returns the
/// controller. Realistically, the controller is not expected to exit. Devices are opened on the
/// blocking pool since each one waits for its board to settle.
pub async fn init_engine_and_controller(
    config_path: &Path,
    connector: Arc<dyn Connector>,
) -> Result<(Arc<Engine>, controller::Controller), Box<dyn Error>> {
    let config = config::Player::deserialize(config_path)?;
    let engine = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || init_engine(&config, connector.as_ref())).await??
    };
    let controller = controller::Controller::new(engine.clone(), config.controllers())?;
    Ok((engine, controller))
}

#[cfg(test)]
mod init_test {
    use std::{error::Error, io::Write, sync::Arc};

    use crate::{
        config,
        device::MockConnector,
        playback::PlayOutcome,
        test::eventually,
    };

    use super::{init_engine, init_engine_and_controller};

    #[test]
    fn test_init_engine() {
        let config = config::Player::parse(
            r#"
            note_delay: 0s
            settle_delay: 0s
            command_rate_hz: 30
            devices:
              - name: left_servo
                port: mock-left
              - name: right_servo
                port: mock-right
            "#,
        )
        .unwrap();
        let connector = MockConnector::new();
        let engine = init_engine(&config, &connector).unwrap();
        assert_eq!(engine.registry().len(), 2);

        assert_eq!(engine.play(vec!["C".to_string()]), PlayOutcome::Accepted);
        assert!(engine.wait());

        // At 30Hz only the first command of a note gets through. The final stop waits until
        // the boards accept commands again.
        let left = connector.transport("mock-left").unwrap().lines();
        assert_eq!(left, vec!["ANGLE:30", "STOP"]);
        let right = connector.transport("mock-right").unwrap().lines();
        assert_eq!(right, vec!["ANGLE:150", "STOP"]);
    }

    #[test]
    fn test_stop_right_after_a_note_reaches_every_board() {
        let config = config::Player::parse(
            r#"
            settle_delay: 0s
            devices:
              - name: left_servo
                port: mock-left
              - name: right_servo
                port: mock-right
            "#,
        )
        .unwrap();
        let connector = MockConnector::new();
        let engine = init_engine(&config, &connector).unwrap();
        let left = connector.transport("mock-left").unwrap();
        let right = connector.transport("mock-right").unwrap();

        let notes = ["C", "D", "E"].iter().map(|n| n.to_string()).collect();
        assert_eq!(engine.play(notes), PlayOutcome::Accepted);
        eventually(|| !left.lines().is_empty(), "first note never played");

        // Well within the 50ms interval of the default rate, so this STOP is dropped.
        engine.stop();
        engine.wait();

        for lines in [left.lines(), right.lines()] {
            assert_eq!(lines.last().map(String::as_str), Some("STOP"), "{:?}", lines);
        }
        assert_eq!(left.lines()[0], "ANGLE:30");
        assert!(!engine.status().locked);
    }

    #[tokio::test]
    async fn test_init_engine_and_controller() -> Result<(), Box<dyn Error>> {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
        write!(
            file,
            r#"
settle_delay: 0s
devices:
  - name: left_servo
    port: mock-left
controller:
  - kind: http
    address: 127.0.0.1:0
"#
        )?;

        let connector = Arc::new(MockConnector::new());
        let (engine, _controller) =
            init_engine_and_controller(file.path(), connector.clone()).await?;
        assert_eq!(engine.registry().len(), 1);
        assert_eq!(connector.opened(), vec!["mock-left"]);
        Ok(())
    }
}
