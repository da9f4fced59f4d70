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
use std::{error::Error, io, sync::Arc};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, span, Level};

use crate::{
    config,
    playback::{Engine, PlayOutcome},
};

#[cfg(feature = "http")]
pub mod http;
pub mod keyboard;

/// A source of control requests. Drivers talk to the engine directly.
pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self) -> JoinHandle<Result<(), io::Error>>;
}

/// The reply to a play or stop request.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    pub fn ok() -> Reply {
        Reply {
            success: true,
            error: None,
        }
    }

    pub fn error(error: &str) -> Reply {
        Reply {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

impl From<PlayOutcome> for Reply {
    fn from(outcome: PlayOutcome) -> Self {
        match outcome {
            PlayOutcome::Accepted => Reply::ok(),
            PlayOutcome::Busy => Reply::error("busy"),
            PlayOutcome::Failed => Reply::error("unable to start playback"),
        }
    }
}

/// Runs the configured drivers against an engine.
pub struct Controller {
    handles: Vec<JoinHandle<Result<(), io::Error>>>,
}

impl Controller {
    /// Creates a controller and starts every driver. Must be called from within a tokio runtime.
    pub fn new(
        engine: Arc<Engine>,
        configs: Vec<config::Controller>,
    ) -> Result<Controller, Box<dyn Error>> {
        let span = span!(Level::INFO, "controller");
        let _enter = span.enter();

        let drivers = configs
            .into_iter()
            .map(|config| driver(config, engine.clone()))
            .collect::<Result<Vec<Arc<dyn Driver>>, Box<dyn Error>>>()?;

        info!(drivers = drivers.len(), "Controller started.");
        Ok(Controller {
            handles: drivers
                .iter()
                .map(|driver| driver.monitor_events())
                .collect(),
        })
    }

    /// Join will block until every driver finishes.
    pub async fn join(&mut self) -> Result<(), Box<dyn Error>> {
        for handle in self.handles.drain(..) {
            handle.await??;
        }
        info!("Controller closing.");
        Ok(())
    }
}

/// Creates a driver from its configuration.
fn driver(
    config: config::Controller,
    engine: Arc<Engine>,
) -> Result<Arc<dyn Driver>, Box<dyn Error>> {
    match config {
        #[cfg(feature = "http")]
        config::Controller::Http(config) => Ok(http::Driver::new(&config, engine)?),
        #[cfg(not(feature = "http"))]
        config::Controller::Http(_) => Err("HTTP controller support is not compiled in.".into()),
        config::Controller::Keyboard => Ok(Arc::new(keyboard::Driver::new(engine))),
    }
}

#[cfg(test)]
mod test {
    use crate::playback::PlayOutcome;

    use super::Reply;

    #[test]
    fn test_reply_json() {
        assert_eq!(
            serde_json::to_string(&Reply::from(PlayOutcome::Accepted)).unwrap(),
            r#"{"success":true}"#
        );
        assert_eq!(
            serde_json::to_string(&Reply::from(PlayOutcome::Busy)).unwrap(),
            r#"{"success":false,"error":"busy"}"#
        );
        assert!(!Reply::from(PlayOutcome::Failed).success);
    }
}
