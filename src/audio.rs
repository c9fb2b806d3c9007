//! Audio-routing collaborator interface
//!
//! The simulation never touches a sample. Everything audible is delegated to
//! the host's audio engine through [`AudioRouting`]: per-puck volume ramps,
//! mute, four effect-channel targets, and transport control. Buffer loading
//! is asynchronous on the host side; completion is reported back with
//! [`crate::sim::Field::buffer_loaded`] / `buffer_failed`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::PuckId;

/// Opaque handle identifying an audio source (URL, blob id, capture id).
/// Passed through unchanged; the core never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSource(pub String);

impl AudioSource {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }
}

/// Per-puck effect slots, one per surface corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectChannel {
    /// Corner 0 - delay send
    Delay,
    /// Corner 1 - reverb send
    Reverb,
    /// Corner 2 - distortion amount
    Distortion,
    /// Corner 3 - low-band EQ gain
    LowEq,
}

impl EffectChannel {
    pub const ALL: [EffectChannel; 4] = [
        EffectChannel::Delay,
        EffectChannel::Reverb,
        EffectChannel::Distortion,
        EffectChannel::LowEq,
    ];

    /// Index of the surface corner driving this channel
    pub fn corner_index(&self) -> usize {
        match self {
            EffectChannel::Delay => 0,
            EffectChannel::Reverb => 1,
            EffectChannel::Distortion => 2,
            EffectChannel::LowEq => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EffectChannel::Delay => "delay",
            EffectChannel::Reverb => "reverb",
            EffectChannel::Distortion => "distortion",
            EffectChannel::LowEq => "low-eq",
        }
    }
}

/// Failure reported by the audio collaborator
#[derive(Debug, Error)]
pub enum AudioError {
    /// The collaborator could not rebuild a playable source for this handle
    #[error("failed to attach audio source {0:?}")]
    AttachFailed(String),
}

/// Host audio engine capabilities consumed by the simulation.
///
/// All methods are synchronous fire-and-forget except [`attach`], whose
/// failure aborts puck reconstruction during undo.
///
/// [`attach`]: AudioRouting::attach
pub trait AudioRouting {
    /// Bind a source to a puck's audio chain (create gain/effect nodes)
    fn attach(&mut self, id: PuckId, source: &AudioSource) -> Result<(), AudioError>;
    /// Tear down a puck's audio chain
    fn detach(&mut self, id: PuckId);

    /// Ramp volume to `db` over `ramp_ms`
    fn ramp_volume(&mut self, id: PuckId, db: f32, ramp_ms: f32);
    /// Set volume immediately (undo restore)
    fn set_volume(&mut self, id: PuckId, db: f32);
    fn set_mute(&mut self, id: PuckId, muted: bool);

    /// Ramp one effect channel toward `value` over `ramp_ms`
    fn set_effect_target(&mut self, id: PuckId, channel: EffectChannel, value: f32, ramp_ms: f32);

    fn start_playback(&mut self, id: PuckId);
    fn stop_playback(&mut self, id: PuckId);
    fn set_reverse(&mut self, id: PuckId, reversed: bool);
}

/// Collaborator that swallows everything. Useful for hosts that tick the
/// simulation before their audio engine is ready, and for tests that only
/// care about puck state.
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioRouting for NullAudio {
    fn attach(&mut self, _id: PuckId, _source: &AudioSource) -> Result<(), AudioError> {
        Ok(())
    }
    fn detach(&mut self, _id: PuckId) {}
    fn ramp_volume(&mut self, _id: PuckId, _db: f32, _ramp_ms: f32) {}
    fn set_volume(&mut self, _id: PuckId, _db: f32) {}
    fn set_mute(&mut self, _id: PuckId, _muted: bool) {}
    fn set_effect_target(&mut self, _id: PuckId, _ch: EffectChannel, _value: f32, _ramp_ms: f32) {}
    fn start_playback(&mut self, _id: PuckId) {}
    fn stop_playback(&mut self, _id: PuckId) {}
    fn set_reverse(&mut self, _id: PuckId, _reversed: bool) {}
}

/// Collaborator that records every call, for tests and the headless demo
#[derive(Debug, Default)]
pub struct RecordingAudio {
    /// (puck, channel, target, ramp_ms) in submission order
    pub effect_targets: Vec<(PuckId, EffectChannel, f32, f32)>,
    /// (puck, db) volume sets and ramps
    pub volumes: Vec<(PuckId, f32)>,
    pub attached: Vec<PuckId>,
    pub detached: Vec<PuckId>,
    pub started: Vec<PuckId>,
    pub stopped: Vec<PuckId>,
    /// When set, `attach` fails - simulates a dead blob URL during undo
    pub fail_attach: bool,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last submitted target for a given puck/channel pair
    pub fn last_target(&self, id: PuckId, channel: EffectChannel) -> Option<f32> {
        self.effect_targets
            .iter()
            .rev()
            .find(|(pid, ch, _, _)| *pid == id && *ch == channel)
            .map(|(_, _, value, _)| *value)
    }
}

impl AudioRouting for RecordingAudio {
    fn attach(&mut self, id: PuckId, source: &AudioSource) -> Result<(), AudioError> {
        if self.fail_attach {
            return Err(AudioError::AttachFailed(source.0.clone()));
        }
        self.attached.push(id);
        Ok(())
    }

    fn detach(&mut self, id: PuckId) {
        self.detached.push(id);
    }

    fn ramp_volume(&mut self, id: PuckId, db: f32, _ramp_ms: f32) {
        self.volumes.push((id, db));
    }

    fn set_volume(&mut self, id: PuckId, db: f32) {
        self.volumes.push((id, db));
    }

    fn set_mute(&mut self, _id: PuckId, _muted: bool) {}

    fn set_effect_target(&mut self, id: PuckId, channel: EffectChannel, value: f32, ramp_ms: f32) {
        self.effect_targets.push((id, channel, value, ramp_ms));
    }

    fn start_playback(&mut self, id: PuckId) {
        self.started.push(id);
    }

    fn stop_playback(&mut self, id: PuckId) {
        self.stopped.push(id);
    }

    fn set_reverse(&mut self, _id: PuckId, _reversed: bool) {}
}
