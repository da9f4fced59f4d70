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
use std::sync::Arc;

use tracing::{info, span, Level};

use crate::{device::SendOutcome, registry::Registry, state::RunState};

/// Forces every device back to a neutral state. Safe to call at any time, from any thread.
#[derive(Clone)]
pub struct SafetyController {
    registry: Arc<Registry>,
    state: Arc<RunState>,
}

impl SafetyController {
    pub fn new(registry: Arc<Registry>, state: Arc<RunState>) -> SafetyController {
        SafetyController { registry, state }
    }

    /// Clears playing, returns to idle and sends STOP to every channel in order. Doesn't wait
    /// for a running playback and never releases its lock; the playback does that itself once
    /// it notices.
    pub fn stop_all(&self) {
        let span = span!(Level::INFO, "stop all");
        let _enter = span.enter();

        self.state.halt();
        let mut stopped = 0;
        for channel in &*self.registry {
            if channel.stop() == SendOutcome::Sent {
                stopped += 1;
            }
        }

        info!(stopped, channels = self.registry.len(), "Stopped all devices.");
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::{
        config,
        device::{unthrottled, MockConnector},
        registry::Registry,
        state::{Mode, RunState},
    };

    use super::SafetyController;

    #[test]
    fn test_stop_all_while_idle() {
        let connector = MockConnector::new().refuse("mock-broken");
        let registry = Arc::new(Registry::new(
            &[
                config::Device::new("left", "mock-left", true),
                config::Device::new("right", "mock-right", true),
                config::Device::new("broken", "mock-broken", true),
                config::Device::new("spare", "mock-spare", true),
            ],
            &unthrottled(),
            &connector,
        ));
        let state = Arc::new(RunState::new());
        let safety = SafetyController::new(registry, state.clone());

        safety.stop_all();
        safety.stop_all();

        for port in ["mock-left", "mock-right", "mock-spare"] {
            assert_eq!(
                connector.transport(port).unwrap().lines(),
                vec!["STOP", "STOP"],
                "{} should have been stopped twice",
                port
            );
        }
        assert!(connector.transport("mock-broken").is_none());

        let status = state.status();
        assert_eq!(status.mode, Mode::Idle);
        assert!(!status.locked);
        assert!(!status.playing);
    }

    #[test]
    fn test_stop_all_leaves_lock_alone() {
        let connector = MockConnector::new();
        let registry = Arc::new(Registry::new(
            &[config::Device::new("left", "mock-left", true)],
            &unthrottled(),
            &connector,
        ));
        let state = Arc::new(RunState::new());
        let lock = state.try_begin_music().unwrap();

        SafetyController::new(registry, state.clone()).stop_all();
        assert!(state.is_locked());
        assert!(!state.is_playing());
        assert_eq!(state.mode(), Mode::Idle);
        assert_eq!(connector.transport("mock-left").unwrap().lines(), vec!["STOP"]);

        drop(lock);
        assert!(!state.is_locked());
    }
}
