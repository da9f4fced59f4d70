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
use std::{error::Error, path::PathBuf, sync::Arc};

use clap::{crate_version, Parser, Subcommand};
use servomusic::{
    config,
    device::{self, SerialConnector},
    init_engine, init_engine_and_controller,
    playback::PlayOutcome,
};
use tracing::info;

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=servo music player

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/servomusic
ExecStart=/usr/local/bin/servomusic start "$SERVOMUSIC_CONFIG"

[Install]
WantedBy=multi-user.target
Alias=servomusic.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Plays notes on servo actuator boards."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available serial ports.
    Ports {},
    /// Plays a sequence of notes once and waits for it to finish.
    Play {
        /// The path to the player config.
        config_path: String,
        /// The notes to play, e.g. C D E F G A B.
        notes: Vec<String>,
    },
    /// Sends STOP to every configured device.
    Stop {
        /// The path to the player config.
        config_path: String,
    },
    /// Start will start the player and its controllers.
    Start {
        /// The path to the player config.
        config_path: String,
    },
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let connector = Arc::new(SerialConnector::new());

    match cli.command {
        Commands::Ports {} => {
            let ports = device::list_ports()?;

            if ports.is_empty() {
                println!("No serial ports found.");
                return Ok(());
            }

            println!("Serial ports:");
            for port in ports {
                println!("- {}", port);
            }
        }
        Commands::Play { config_path, notes } => {
            let config = config::Player::deserialize(&PathBuf::from(config_path))?;
            let outcome = tokio::task::spawn_blocking(move || {
                let engine = init_engine(&config, connector.as_ref())?;
                let outcome = engine.play(notes);
                engine.wait();
                Ok::<_, config::ConfigError>(outcome)
            })
            .await??;

            if outcome != PlayOutcome::Accepted {
                return Err(format!("playback not started: {:?}", outcome).into());
            }
        }
        Commands::Stop { config_path } => {
            let config = config::Player::deserialize(&PathBuf::from(config_path))?;
            tokio::task::spawn_blocking(move || {
                init_engine(&config, connector.as_ref()).map(|engine| engine.stop())
            })
            .await??;
        }
        Commands::Start { config_path } => {
            let (engine, mut controller) =
                init_engine_and_controller(&PathBuf::from(config_path), connector).await?;
            controller.join().await?;

            info!("Controllers finished, stopping devices.");
            tokio::task::spawn_blocking(move || {
                engine.stop();
                engine.wait();
            })
            .await?;
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE)
        }
    }

    Ok(())
}
