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
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::{Condvar, Mutex};
use serde::Serialize;

/// What the player is doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Idle,
    Music,
}

/// A point-in-time copy of the run state, as reported to controllers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Status {
    pub mode: Mode,
    pub locked: bool,
    pub playing: bool,
}

struct Flags {
    mode: Mode,
    playing: bool,
}

/// The shared run state. `locked` is only ever released by dropping the [PlaybackLock] that
/// acquired it, while `mode` and `playing` may be changed by anyone at any time.
pub struct RunState {
    locked: AtomicBool,
    flags: Mutex<Flags>,
    /// Wakes a playback waiting between notes when playing is cleared.
    condvar: Condvar,
}

impl RunState {
    /// Creates an idle, unlocked run state.
    pub fn new() -> RunState {
        RunState {
            locked: AtomicBool::new(false),
            flags: Mutex::new(Flags {
                mode: Mode::Idle,
                playing: false,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Takes the playback lock if nobody holds it.
    pub fn try_lock(self: &Arc<Self>) -> Option<PlaybackLock> {
        self.locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PlaybackLock {
                state: self.clone(),
            })
    }

    /// Takes the playback lock and enters music mode in one step, so a concurrent halt either
    /// lands before playback starts or stops it. Leaves everything untouched if busy.
    pub fn try_begin_music(self: &Arc<Self>) -> Option<PlaybackLock> {
        let mut flags = self.flags.lock();
        let lock = self.try_lock()?;
        flags.mode = Mode::Music;
        flags.playing = true;
        Some(lock)
    }

    /// Clears playing and returns to idle, waking any playback waiting between notes.
    pub fn halt(&self) {
        let mut flags = self.flags.lock();
        flags.mode = Mode::Idle;
        flags.playing = false;
        self.condvar.notify_all();
    }

    pub fn is_playing(&self) -> bool {
        self.flags.lock().playing
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    pub fn mode(&self) -> Mode {
        self.flags.lock().mode
    }

    pub fn status(&self) -> Status {
        let flags = self.flags.lock();
        Status {
            mode: flags.mode,
            locked: self.is_locked(),
            playing: flags.playing,
        }
    }

    /// Sleeps for up to the timeout, returning early if playing is cleared. Returns whether
    /// playback should continue.
    pub fn wait_while_playing(&self, timeout: Duration) -> bool {
        let mut flags = self.flags.lock();
        self.condvar
            .wait_while_for(&mut flags, |flags| flags.playing, timeout);
        flags.playing
    }
}

impl Default for RunState {
    fn default() -> Self {
        RunState::new()
    }
}

/// Proof of holding the playback lock. The lock is released when this is dropped.
pub struct PlaybackLock {
    state: Arc<RunState>,
}

impl Drop for PlaybackLock {
    fn drop(&mut self) {
        self.state.locked.store(false, Ordering::Release);
    }
}
