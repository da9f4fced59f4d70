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
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use crate::{
    config,
    device::{unthrottled, MockConnector},
    playback::Engine,
    registry::Registry,
    state::RunState,
};

const TICK: Duration = Duration::from_millis(5);
const TIMEOUT: Duration = Duration::from_secs(3);

/// Polls the predicate until it holds, failing the test after a few seconds.
pub fn eventually<F>(predicate: F, error_msg: &str)
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + TIMEOUT;
    while !predicate() {
        assert!(Instant::now() < deadline, "{}", error_msg);
        thread::sleep(TICK);
    }
}

/// Builds an engine over mock devices, one per port, with no rate limiting. The connector is
/// handed back so tests can inspect the transports it opened.
pub fn mock_engine(
    ports: &[&str],
    note_delay: Duration,
    connector: MockConnector,
) -> (Arc<Engine>, Arc<RunState>, MockConnector) {
    let devices: Vec<config::Device> = ports
        .iter()
        .map(|port| config::Device::new(port, port, true))
        .collect();
    let registry = Arc::new(Registry::new(&devices, &unthrottled(), &connector));
    let state = Arc::new(RunState::new());
    (
        Arc::new(Engine::new(registry, state.clone(), note_delay)),
        state,
        connector,
    )
}
