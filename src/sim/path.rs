//! Path recording and looped playback
//!
//! While a puck is dragged with the path modifier held, the host calls
//! `record_point` per pointer move; releasing converts the capture into a
//! loop that overrides the puck's position every tick. Playback displacement
//! is shared with the puck's connected component so linked clusters move as
//! one.

use glam::Vec2;

use super::state::{Field, PathMode, PathState, PuckId, Waypoint};

/// Sample a looped path at `elapsed_ms` since playback start.
///
/// Returns `None` for paths that cannot play (fewer than two waypoints or
/// non-positive duration). Falls back to the first/last bracketing pair when
/// floating error leaves the wrapped time outside every interval.
pub fn sample_path(path: &PathState, elapsed_ms: f64) -> Option<Vec2> {
    if path.waypoints.len() < 2 || path.duration_ms <= 0.0 {
        return None;
    }
    let elapsed = elapsed_ms.rem_euclid(path.duration_ms);
    let wps = &path.waypoints;

    let mut bracket = None;
    for i in 0..wps.len() - 1 {
        if wps[i].t_ms <= elapsed && elapsed <= wps[i + 1].t_ms {
            bracket = Some(i);
            break;
        }
    }
    let i = bracket.unwrap_or(if elapsed < wps[0].t_ms { 0 } else { wps.len() - 2 });

    let (a, b) = (wps[i], wps[i + 1]);
    let span = b.t_ms - a.t_ms;
    // Zero-length intervals would divide by zero; treating the denominator
    // as 1 pins the sample to the interval start
    let denom = if span > 0.0 { span } else { 1.0 };
    let t = ((elapsed - a.t_ms) / denom).clamp(0.0, 1.0) as f32;
    Some(crate::lerp_vec(a.pos, b.pos, t))
}

impl Field {
    /// Begin capturing a path: prior waypoints are discarded and the puck
    /// becomes the primary drawing puck
    pub fn start_recording(&mut self, id: PuckId, now_ms: f64) {
        if !self.contains(id) {
            return;
        }
        self.set_primary(Some(id));
        if let Some(puck) = self.get_mut(id) {
            puck.path.clear();
            puck.path.mode = PathMode::Recording { started_ms: now_ms };
            log::debug!("Recording path for {id:?}");
        }
    }

    /// Append the puck's current position to its path. Ignored unless the
    /// puck is recording. Sampling rate is the caller's concern (typically
    /// one call per pointer-move event).
    pub fn record_point(&mut self, id: PuckId, now_ms: f64) {
        let Some(puck) = self.get_mut(id) else { return };
        let PathMode::Recording { started_ms } = puck.path.mode else {
            return;
        };
        let mut t_ms = now_ms - started_ms;
        // Keep waypoint times monotonically non-decreasing
        if let Some(last) = puck.path.waypoints.last() {
            t_ms = t_ms.max(last.t_ms);
        }
        let pos = puck.pos;
        puck.path.waypoints.push(Waypoint { t_ms, pos });
    }

    /// End capture. Paths with fewer than two waypoints (or zero span) have
    /// nothing to play and return to idle empty; anything else starts
    /// looping immediately.
    pub fn stop_recording(&mut self, id: PuckId, now_ms: f64) {
        let Some(puck) = self.get_mut(id) else { return };
        if !puck.path.is_recording() {
            return;
        }
        let duration = puck.path.waypoints.last().map(|w| w.t_ms).unwrap_or(0.0);
        if puck.path.waypoints.len() < 2 || duration <= 0.0 {
            puck.path.clear();
            return;
        }
        puck.path.duration_ms = duration;
        puck.path.mode = PathMode::Playing { started_ms: now_ms };
        puck.vel = Vec2::ZERO;
        log::debug!(
            "Path for {id:?} looping: {} waypoints over {duration:.0} ms",
            puck.path.waypoints.len()
        );
    }

    /// Global record release: a single external signal, not per-puck. Every
    /// recording puck stops through the normal transition, and every puck in
    /// a cluster containing one exits together, dropping its primary marker.
    pub fn release_all_recordings(&mut self, now_ms: f64) {
        let recording: Vec<PuckId> = self
            .pucks()
            .iter()
            .filter(|p| p.path.is_recording())
            .map(|p| p.id)
            .collect();

        let mut affected: Vec<PuckId> = Vec::new();
        for id in recording {
            for member in self.component_of(id) {
                if !affected.contains(&member) {
                    affected.push(member);
                }
            }
        }

        for id in affected {
            if self.get(id).is_some_and(|p| p.path.is_recording()) {
                self.stop_recording(id, now_ms);
            }
            if let Some(puck) = self.get_mut(id) {
                puck.primary = false;
            }
        }
    }
}

/// Advance every playing puck along its loop and share the displacement with
/// its connected component. One visited set covers the whole tick so no puck
/// is displaced twice, even inside cyclic graphs or components holding
/// several playing pucks.
pub(crate) fn apply_playback(field: &mut Field, now_ms: f64) {
    let mut ids: Vec<PuckId> = field.pucks().iter().map(|p| p.id).collect();
    ids.sort();

    let mut visited: Vec<PuckId> = Vec::new();

    for id in ids {
        let Some(puck) = field.get(id) else { continue };
        let PathMode::Playing { started_ms } = puck.path.mode else {
            continue;
        };

        let Some(new_pos) = sample_path(&puck.path, now_ms - started_ms) else {
            // Cannot remain in playback without a playable path
            if let Some(puck) = field.get_mut(id) {
                puck.path.clear();
            }
            continue;
        };

        let delta = new_pos - puck.pos;
        if let Some(puck) = field.get_mut(id) {
            puck.pos = new_pos;
        }
        if !visited.contains(&id) {
            visited.push(id);
        }
        if delta == Vec2::ZERO {
            continue;
        }

        // Breadth-first over the component; playing members keep their own
        // loop-driven positions and are never displaced
        let mut queue = vec![id];
        while let Some(current) = queue.pop() {
            for neighbor in field.neighbors(current) {
                if visited.contains(&neighbor) {
                    continue;
                }
                visited.push(neighbor);
                if let Some(puck) = field.get_mut(neighbor) {
                    if !puck.path.is_playing() {
                        puck.pos += delta;
                    }
                }
                queue.push(neighbor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioSource, NullAudio};
    use crate::settings::Settings;

    fn field_with_pucks(positions: &[Vec2]) -> (Field, Vec<PuckId>) {
        let settings = Settings::default();
        let mut field = Field::new(&settings);
        let ids = positions
            .iter()
            .enumerate()
            .map(|(i, pos)| {
                field.spawn_puck(
                    AudioSource::new(format!("clip-{i}")),
                    format!("clip {i}"),
                    false,
                    *pos,
                    &settings,
                    &mut NullAudio,
                )
            })
            .collect();
        (field, ids)
    }

    /// Record a simple horizontal two-point path and start it looping
    fn record_line(field: &mut Field, id: PuckId) {
        field.start_recording(id, 0.0);
        field.get_mut(id).unwrap().pos = Vec2::new(0.0, 0.0);
        field.record_point(id, 0.0);
        field.get_mut(id).unwrap().pos = Vec2::new(100.0, 0.0);
        field.record_point(id, 1000.0);
        field.stop_recording(id, 1000.0);
    }

    #[test]
    fn test_stop_with_no_points_is_idle_empty() {
        let (mut field, ids) = field_with_pucks(&[Vec2::ZERO]);
        field.start_recording(ids[0], 0.0);
        field.stop_recording(ids[0], 5.0);
        let puck = field.get(ids[0]).unwrap();
        assert_eq!(puck.path.mode, PathMode::Idle);
        assert!(puck.path.waypoints.is_empty());
    }

    #[test]
    fn test_stop_with_single_point_cannot_play() {
        let (mut field, ids) = field_with_pucks(&[Vec2::ZERO]);
        field.start_recording(ids[0], 0.0);
        field.record_point(ids[0], 0.0);
        field.stop_recording(ids[0], 10.0);
        assert_eq!(field.get(ids[0]).unwrap().path.mode, PathMode::Idle);
    }

    #[test]
    fn test_record_point_ignored_when_idle() {
        let (mut field, ids) = field_with_pucks(&[Vec2::ZERO]);
        field.record_point(ids[0], 100.0);
        assert!(field.get(ids[0]).unwrap().path.waypoints.is_empty());
    }

    #[test]
    fn test_waypoint_times_monotonic() {
        let (mut field, ids) = field_with_pucks(&[Vec2::ZERO]);
        field.start_recording(ids[0], 100.0);
        field.record_point(ids[0], 150.0);
        // Clock hiccup going backwards must not produce a decreasing time
        field.record_point(ids[0], 120.0);
        field.record_point(ids[0], 200.0);
        let wps = &field.get(ids[0]).unwrap().path.waypoints;
        assert!(wps.windows(2).all(|w| w[0].t_ms <= w[1].t_ms));
    }

    #[test]
    fn test_loop_interpolation_and_wrap() {
        let path = PathState {
            mode: PathMode::Playing { started_ms: 0.0 },
            waypoints: vec![
                Waypoint { t_ms: 0.0, pos: Vec2::new(0.0, 0.0) },
                Waypoint { t_ms: 1000.0, pos: Vec2::new(100.0, 0.0) },
            ],
            duration_ms: 1000.0,
        };
        assert_eq!(sample_path(&path, 500.0), Some(Vec2::new(50.0, 0.0)));
        // Exactly one full loop wraps to the start
        assert_eq!(sample_path(&path, 1000.0), Some(Vec2::new(0.0, 0.0)));
        assert_eq!(sample_path(&path, 1250.0), Some(Vec2::new(25.0, 0.0)));
    }

    #[test]
    fn test_zero_length_interval_does_not_blow_up() {
        let path = PathState {
            mode: PathMode::Playing { started_ms: 0.0 },
            waypoints: vec![
                Waypoint { t_ms: 0.0, pos: Vec2::new(0.0, 0.0) },
                Waypoint { t_ms: 500.0, pos: Vec2::new(40.0, 0.0) },
                Waypoint { t_ms: 500.0, pos: Vec2::new(60.0, 0.0) },
                Waypoint { t_ms: 1000.0, pos: Vec2::new(100.0, 0.0) },
            ],
            duration_ms: 1000.0,
        };
        let sampled = sample_path(&path, 500.0).unwrap();
        assert!(sampled.is_finite());
    }

    #[test]
    fn test_playback_moves_connected_component() {
        let (mut field, ids) = field_with_pucks(&[
            Vec2::new(0.0, 0.0),     // A: will play
            Vec2::new(200.0, 200.0), // B: connected to A
            Vec2::new(400.0, 200.0), // C: connected to B (recursive reach)
            Vec2::new(700.0, 500.0), // D: unconnected
        ]);
        field.connect(ids[0], ids[1]);
        field.connect(ids[1], ids[2]);
        record_line(&mut field, ids[0]);

        // Half way through the loop the player sits at (50, 0); it started
        // playback from (100, 0), so the component shares delta (-50, 0)
        apply_playback(&mut field, 1500.0);
        assert_eq!(field.get(ids[0]).unwrap().pos, Vec2::new(50.0, 0.0));
        assert_eq!(field.get(ids[1]).unwrap().pos, Vec2::new(150.0, 200.0));
        assert_eq!(field.get(ids[2]).unwrap().pos, Vec2::new(350.0, 200.0));
        // Unconnected puck untouched
        assert_eq!(field.get(ids[3]).unwrap().pos, Vec2::new(700.0, 500.0));
    }

    #[test]
    fn test_playing_members_are_not_displaced() {
        let (mut field, ids) = field_with_pucks(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(200.0, 200.0),
        ]);
        field.connect(ids[0], ids[1]);
        record_line(&mut field, ids[0]);
        record_line(&mut field, ids[1]);

        apply_playback(&mut field, 1500.0);
        // Both follow their own loops; neither receives the other's delta
        assert_eq!(field.get(ids[0]).unwrap().pos, Vec2::new(50.0, 0.0));
        assert_eq!(field.get(ids[1]).unwrap().pos, Vec2::new(50.0, 0.0));
    }

    #[test]
    fn test_release_all_stops_whole_cluster() {
        let (mut field, ids) = field_with_pucks(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(200.0, 0.0),
            Vec2::new(700.0, 500.0), // separate cluster, also recording
        ]);
        field.connect(ids[0], ids[1]);

        field.start_recording(ids[0], 0.0);
        field.record_point(ids[0], 0.0);
        field.get_mut(ids[0]).unwrap().pos = Vec2::new(50.0, 0.0);
        field.record_point(ids[0], 800.0);

        field.start_recording(ids[2], 0.0);

        field.release_all_recordings(800.0);

        // The captured path starts looping, the empty one goes idle
        assert!(field.get(ids[0]).unwrap().path.is_playing());
        assert_eq!(field.get(ids[2]).unwrap().path.mode, PathMode::Idle);
        // No member of any affected cluster keeps a primary marker
        assert!(field.pucks().iter().all(|p| !p.primary));
    }
}
