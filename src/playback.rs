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
    fmt,
    str::FromStr,
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tracing::{debug, error, info, span, Level, Span};

use crate::{
    registry::Registry,
    safety::SafetyController,
    state::{PlaybackLock, RunState, Status},
};

/// Light level for the left device.
const LEFT_LIGHT: f64 = 180.0;
/// Light level for the right device.
const RIGHT_LIGHT: f64 = 120.0;
/// The right device moves opposite the left one around this angle.
const MIRROR_ANGLE: u16 = 180;

/// A playable note.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Note {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Note {
    /// The servo angle for the note.
    pub fn angle(self) -> u16 {
        match self {
            Note::C => 30,
            Note::D => 50,
            Note::E => 70,
            Note::F => 90,
            Note::G => 110,
            Note::A => 130,
            Note::B => 150,
        }
    }

    /// The buzzer frequency for the note, in Hz.
    pub fn frequency(self) -> u32 {
        match self {
            Note::C => 261,
            Note::D => 293,
            Note::E => 329,
            Note::F => 349,
            Note::G => 392,
            Note::A => 440,
            Note::B => 493,
        }
    }

    /// The angle for the right device.
    pub fn mirrored_angle(self) -> u16 {
        MIRROR_ANGLE - self.angle()
    }

    /// The frequency for the right device, an octave up.
    pub fn harmony_frequency(self) -> u32 {
        self.frequency() * 2
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized note '{0}'")]
pub struct UnknownNote(String);

impl FromStr for Note {
    type Err = UnknownNote;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "C" => Ok(Note::C),
            "D" => Ok(Note::D),
            "E" => Ok(Note::E),
            "F" => Ok(Note::F),
            "G" => Ok(Note::G),
            "A" => Ok(Note::A),
            "B" => Ok(Note::B),
            _ => Err(UnknownNote(s.to_string())),
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The answer to a play request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Playback started in the background.
    Accepted,
    /// Another playback holds the lock. Nothing happened.
    Busy,
    /// The playback thread couldn't be started. Devices were stopped.
    Failed,
}

/// Plays note sequences on the first two devices of the registry.
pub struct Engine {
    registry: Arc<Registry>,
    state: Arc<RunState>,
    safety: SafetyController,
    /// How long each note is held.
    note_delay: Duration,
    /// The most recent playback thread.
    join: Mutex<Option<JoinHandle<()>>>,
    /// The logging span.
    span: Span,
}

impl Engine {
    /// Creates a new engine. Stop requests go through a safety controller sharing the same
    /// registry and state.
    pub fn new(registry: Arc<Registry>, state: Arc<RunState>, note_delay: Duration) -> Engine {
        Engine {
            safety: SafetyController::new(registry.clone(), state.clone()),
            registry,
            state,
            note_delay,
            join: Mutex::new(None),
            span: span!(Level::INFO, "playback engine"),
        }
    }

    /// Starts playing the notes in the background. Returns immediately; at most one playback
    /// runs at a time and requests made while one is running are rejected.
    pub fn play(&self, notes: Vec<String>) -> PlayOutcome {
        let _enter = self.span.enter();

        let lock = match self.state.try_begin_music() {
            Some(lock) => lock,
            None => {
                info!("Playback already in progress, rejecting request.");
                return PlayOutcome::Busy;
            }
        };
        info!(notes = notes.len(), "Starting playback.");

        let sequence = Sequence {
            registry: self.registry.clone(),
            state: self.state.clone(),
            safety: self.safety.clone(),
            note_delay: self.note_delay,
        };
        match thread::Builder::new()
            .name("playback".to_string())
            .spawn(move || sequence.run(notes, lock))
        {
            Ok(join) => {
                // Any previous thread has already released the lock and is on its way out.
                *self.join.lock() = Some(join);
                PlayOutcome::Accepted
            }
            Err(e) => {
                // The closure, and the lock with it, was dropped by the failed spawn.
                error!(err = %e, "Unable to start playback thread.");
                self.safety.stop_all();
                PlayOutcome::Failed
            }
        }
    }

    /// Stops any playback and sends STOP to every device.
    pub fn stop(&self) {
        self.safety.stop_all();
    }

    /// Waits for the most recent playback thread to finish. Returns true if there was one.
    pub fn wait(&self) -> bool {
        let join = self.join.lock().take();
        match join {
            Some(join) => {
                if join.join().is_err() {
                    error!("Playback thread panicked.");
                }
                true
            }
            None => false,
        }
    }

    /// Gets the current run state.
    pub fn status(&self) -> Status {
        self.state.status()
    }

    /// Gets the registry driven by this engine.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// One playback invocation, owned by its thread.
struct Sequence {
    registry: Arc<Registry>,
    state: Arc<RunState>,
    safety: SafetyController,
    note_delay: Duration,
}

impl Sequence {
    fn run(self, notes: Vec<String>, lock: PlaybackLock) {
        let span = span!(Level::INFO, "playback");
        let _enter = span.enter();

        let mut played = 0;
        let mut last_note = None;
        for symbol in notes.iter() {
            if !self.state.is_playing() {
                info!(played, "Playback interrupted.");
                break;
            }

            let note = match symbol.parse::<Note>() {
                Ok(note) => note,
                Err(e) => {
                    debug!(err = %e, "Skipping note.");
                    continue;
                }
            };

            self.play_note(note);
            last_note = Some(Instant::now());
            played += 1;
            self.state.wait_while_playing(self.note_delay);
        }

        // A STOP sooner than one command interval after the last note would be dropped by the
        // rate limiter, and an interrupted wait can end well before that.
        if let Some(last_note) = last_note {
            let ready = last_note + self.registry.command_interval();
            let now = Instant::now();
            if ready > now {
                thread::sleep(ready - now);
            }
        }

        self.safety.stop_all();
        drop(lock);
        info!(played, total = notes.len(), "Playback finished.");
    }

    fn play_note(&self, note: Note) {
        debug!(%note, "Playing note.");

        if let Some(left) = self.registry.get(0) {
            left.set_angle(f64::from(note.angle()));
            left.set_tone(f64::from(note.frequency()));
            left.set_light(LEFT_LIGHT);
        }

        if let Some(right) = self.registry.get(1) {
            right.set_angle(f64::from(note.mirrored_angle()));
            right.set_tone(f64::from(note.harmony_frequency()));
            right.set_light(RIGHT_LIGHT);
        }
    }
}
