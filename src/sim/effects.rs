//! Proximity-to-parameter effect mapping
//!
//! Each surface corner drives one effect channel. A puck's closeness to a
//! corner (0 at the far end of the diagonal, 1 on the corner) sets that
//! channel's target; the audio collaborator ramps toward targets over a few
//! tens of milliseconds, so this module only computes and submits them.

use glam::Vec2;

use crate::audio::{AudioRouting, EffectChannel};
use crate::consts::LOW_EQ_SPAN;
use crate::settings::Settings;

use super::state::{Field, Surface};

/// Targets for the four effect slots, one tick's worth
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectTargets {
    /// Corner 0, half range
    pub delay: f32,
    /// Corner 1, full range
    pub reverb: f32,
    /// Corner 2, half range
    pub distortion: f32,
    /// Corner 3, proximity mapped onto a ±12 unit gain
    pub low_eq: f32,
}

impl EffectTargets {
    pub fn get(&self, channel: EffectChannel) -> f32 {
        match channel {
            EffectChannel::Delay => self.delay,
            EffectChannel::Reverb => self.reverb,
            EffectChannel::Distortion => self.distortion,
            EffectChannel::LowEq => self.low_eq,
        }
    }
}

/// Normalized closeness of `pos` to `corner`: 1 − min(distance/diagonal, 1)
pub fn proximity(pos: Vec2, corner: Vec2, diagonal: f32) -> f32 {
    1.0 - (pos.distance(corner) / diagonal).min(1.0)
}

/// Compute the four channel targets for a position, or `None` when the
/// surface has zero area (mid-resize) and the previous targets should stand
pub fn compute_targets(pos: Vec2, surface: &Surface) -> Option<EffectTargets> {
    if surface.is_degenerate() {
        return None;
    }
    let diagonal = surface.diagonal();
    let p = surface.corners.map(|corner| proximity(pos, corner, diagonal));

    Some(EffectTargets {
        delay: p[0] * 0.5,
        reverb: p[1],
        distortion: p[2] * 0.5,
        low_eq: (p[3] - 0.5) * LOW_EQ_SPAN,
    })
}

/// Submit targets for every puck with a usable buffer, once per tick
pub fn submit_targets(field: &Field, settings: &Settings, audio: &mut impl AudioRouting) {
    for puck in field.pucks() {
        if !puck.audio_usable() {
            continue;
        }
        let Some(targets) = compute_targets(puck.pos, &field.surface) else {
            // Degenerate surface: leave the collaborator at its previous targets
            return;
        };
        for channel in EffectChannel::ALL {
            audio.set_effect_target(puck.id, channel, targets.get(channel), settings.effect_ramp_ms);
        }
    }
}
