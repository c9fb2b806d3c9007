//! Per-frame simulation tick
//!
//! One call per frame from the host's clock. Order matters: path playback
//! owns the positions of looping pucks (and drags their components along)
//! before physics runs for everyone else, and effect targets are computed
//! from the settled positions so the audio collaborator always sees this
//! tick's final state.

use crate::audio::AudioRouting;
use crate::settings::Settings;

use super::effects;
use super::path;
use super::physics;
use super::state::Field;

/// Advance the whole field by one tick. `now_ms` is the host clock in
/// milliseconds; playback sampling is relative to it.
pub fn tick(field: &mut Field, settings: &Settings, audio: &mut impl AudioRouting, now_ms: f64) {
    // Path playback position overrides, propagated through components
    path::apply_playback(field, now_ms);

    // Physics for every puck not owned by playback or an active drag
    let dragging = field.active_link().map(|link| link.puck);
    for i in 0..field.pucks.len() {
        if field.pucks[i].path.is_playing() || dragging == Some(field.pucks[i].id) {
            continue;
        }
        physics::integrate(&mut field.pucks[i]);
        physics::resolve_boundary(&mut field.pucks[i], &field.surface);
    }
    physics::resolve_all_pairs(&mut field.pucks, dragging);

    // Effect targets from the settled positions
    effects::submit_targets(field, settings, audio);
}
