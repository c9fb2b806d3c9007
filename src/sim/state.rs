//! Puck state and the owned puck collection
//!
//! Everything the renderer reads and the tick mutates lives here. Pucks carry
//! a stable `PuckId` allocated from a counter that is never reused; display
//! order is the position in `Field::pucks` and is a presentation concern, not
//! identity.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::audio::{AudioRouting, AudioSource};
use crate::consts::*;
use crate::settings::Settings;

use super::graph::LinkDrag;
use super::undo::DeletedPuck;

/// Stable puck identity. Not an index: deleting a puck never renumbers the
/// survivors, and undo restores the same id it captured.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PuckId(pub u32);

/// Recording/playback phase of a puck's motion path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum PathMode {
    #[default]
    Idle,
    /// Capturing waypoints since `started_ms`
    Recording { started_ms: f64 },
    /// Looping the captured path since `started_ms`
    Playing { started_ms: f64 },
}

/// One captured sample of a dragged puck's position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Elapsed ms since recording started (monotonically non-decreasing)
    pub t_ms: f64,
    pub pos: Vec2,
}

/// A puck's recorded motion path and its record/play phase
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathState {
    pub mode: PathMode,
    pub waypoints: Vec<Waypoint>,
    /// Loop length, cached at `stop_recording` (last waypoint's timestamp)
    pub duration_ms: f64,
}

impl PathState {
    pub fn is_recording(&self) -> bool {
        matches!(self.mode, PathMode::Recording { .. })
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.mode, PathMode::Playing { .. })
    }

    pub fn clear(&mut self) {
        self.mode = PathMode::Idle;
        self.waypoints.clear();
        self.duration_ms = 0.0;
    }
}

/// Radius for a volume level: linear map of [-48, +6] dB onto the radius
/// bounds, clamped at both ends. Monotonic non-decreasing by construction.
pub fn radius_for_volume(volume_db: f32) -> f32 {
    let t = (volume_db - MIN_VOLUME_DB) / (MAX_VOLUME_DB - MIN_VOLUME_DB);
    crate::lerp(MIN_PUCK_RADIUS, MAX_PUCK_RADIUS, t.clamp(0.0, 1.0))
}

/// A movable circular token bound to one audio source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Puck {
    pub id: PuckId,
    pub pos: Vec2,
    pub vel: Vec2,

    /// Volume in dB, [-48, +6]. Radius is derived from this.
    pub volume_db: f32,
    /// Zero while physics is globally disabled; zero-mass pucks neither push
    /// nor are pushed
    pub mass: f32,
    /// Per-tick velocity multiplier (0 = instant stop, 1 = frictionless)
    pub friction: f32,
    /// Restitution for boundary and puck impacts
    pub bounce: f32,

    // Audio-facing flags; the collaborator owns the actual nodes
    pub muted: bool,
    /// Queued to start playing on the next transport sync
    pub armed: bool,
    pub playing: bool,
    pub loaded: bool,
    pub load_error: bool,
    pub reverse: bool,

    /// Symmetric edge set: `a.connections` contains `b` iff `b.connections`
    /// contains `a`. Maintained only through `Field::connect`/`disconnect`.
    pub connections: Vec<PuckId>,

    pub path: PathState,
    /// At most one puck is primary at a time (presentation only)
    pub primary: bool,

    pub source: AudioSource,
    pub name: String,
    pub from_mic: bool,
}

impl Puck {
    pub fn new(
        id: PuckId,
        source: AudioSource,
        name: impl Into<String>,
        from_mic: bool,
        pos: Vec2,
        settings: &Settings,
    ) -> Self {
        let (mass, friction, bounce) = if settings.physics_enabled {
            (settings.mass, settings.friction, settings.bounce)
        } else {
            (0.0, 0.0, 0.0)
        };
        Self {
            id,
            pos,
            vel: Vec2::ZERO,
            volume_db: 0.0,
            mass,
            friction,
            bounce,
            muted: false,
            armed: false,
            playing: false,
            loaded: false,
            load_error: false,
            reverse: false,
            connections: Vec::new(),
            path: PathState::default(),
            primary: false,
            source,
            name: name.into(),
            from_mic,
        }
    }

    /// Current radius, derived from volume
    pub fn radius(&self) -> f32 {
        radius_for_volume(self.volume_db)
    }

    pub fn is_connected_to(&self, other: PuckId) -> bool {
        self.connections.contains(&other)
    }

    /// A puck needs a successfully loaded buffer before playback or effect
    /// mapping touch its audio chain. Physics does not care.
    pub fn audio_usable(&self) -> bool {
        self.loaded && !self.load_error
    }
}

/// The interaction surface: dimensions plus the four effect corners,
/// refreshed by the host on resize
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Surface {
    pub width: f32,
    pub height: f32,
    /// Corner order: top-left, top-right, bottom-left, bottom-right
    pub corners: [Vec2; 4],
}

impl Surface {
    pub fn new(width: f32, height: f32) -> Self {
        let mut surface = Self {
            width: 0.0,
            height: 0.0,
            corners: [Vec2::ZERO; 4],
        };
        surface.resize(width, height);
        surface
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.corners = [
            Vec2::new(0.0, 0.0),
            Vec2::new(width, 0.0),
            Vec2::new(0.0, height),
            Vec2::new(width, height),
        ];
    }

    /// Euclidean diagonal, the normalization length for proximity
    pub fn diagonal(&self) -> f32 {
        (self.width * self.width + self.height * self.height).sqrt()
    }

    /// Degenerate surfaces (zero area) suspend effect mapping for the tick
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(SURFACE_WIDTH, SURFACE_HEIGHT)
    }
}

/// The owned puck collection and all cross-puck simulation state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    /// Insertion-ordered; undo re-inserts at the captured ordinal
    pub(crate) pucks: Vec<Puck>,
    next_id: u32,
    pub surface: Surface,
    pub physics_enabled: bool,
    /// Active connection proposal, if any
    pub(crate) link: Option<LinkDrag>,
    /// Single-slot undo history; a second delete overwrites it
    pub(crate) undo_slot: Option<DeletedPuck>,
}

impl Field {
    pub fn new(settings: &Settings) -> Self {
        Self {
            pucks: Vec::new(),
            next_id: 1,
            surface: Surface::default(),
            physics_enabled: settings.physics_enabled,
            link: None,
            undo_slot: None,
        }
    }

    pub(crate) fn alloc_id(&mut self) -> PuckId {
        let id = PuckId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.pucks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pucks.is_empty()
    }

    pub fn contains(&self, id: PuckId) -> bool {
        self.pucks.iter().any(|p| p.id == id)
    }

    pub fn get(&self, id: PuckId) -> Option<&Puck> {
        self.pucks.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PuckId) -> Option<&mut Puck> {
        self.pucks.iter_mut().find(|p| p.id == id)
    }

    /// Display index: position in the ordered collection, not identity
    pub fn display_index(&self, id: PuckId) -> Option<usize> {
        self.pucks.iter().position(|p| p.id == id)
    }

    /// Read-only view for the renderer
    pub fn pucks(&self) -> &[Puck] {
        &self.pucks
    }

    pub fn ids(&self) -> Vec<PuckId> {
        self.pucks.iter().map(|p| p.id).collect()
    }

    /// Create a puck at `pos` bound to `source`. Called on file drop and on
    /// microphone capture completion. The collaborator builds the audio chain
    /// asynchronously; a failed attach leaves the puck in physics with
    /// `load_error` set rather than aborting the spawn.
    pub fn spawn_puck(
        &mut self,
        source: AudioSource,
        name: impl Into<String>,
        from_mic: bool,
        pos: Vec2,
        settings: &Settings,
        audio: &mut impl AudioRouting,
    ) -> PuckId {
        let id = self.alloc_id();
        let mut puck = Puck::new(id, source, name, from_mic, pos, settings);
        if !self.physics_enabled {
            puck.mass = 0.0;
            puck.friction = 0.0;
            puck.bounce = 0.0;
        }
        if let Err(err) = audio.attach(id, &puck.source) {
            log::warn!("Audio attach failed for new puck {id:?}: {err}");
            puck.load_error = true;
        }
        log::info!("Spawned puck {id:?} ({}) at {pos}", puck.name);
        self.pucks.push(puck);
        id
    }

    // === Host control operations ===

    /// Scroll-wheel volume change, clamped and ramped. Radius follows.
    pub fn adjust_volume(&mut self, id: PuckId, delta_db: f32, settings: &Settings, audio: &mut impl AudioRouting) {
        let ramp_ms = settings.volume_ramp_ms;
        if let Some(puck) = self.get_mut(id) {
            puck.volume_db = (puck.volume_db + delta_db).clamp(MIN_VOLUME_DB, MAX_VOLUME_DB);
            let db = puck.volume_db;
            audio.ramp_volume(id, db, ramp_ms);
        }
    }

    /// Direct volume set with no ramp (undo restore)
    pub fn set_volume_db(&mut self, id: PuckId, db: f32, audio: &mut impl AudioRouting) {
        if let Some(puck) = self.get_mut(id) {
            puck.volume_db = db.clamp(MIN_VOLUME_DB, MAX_VOLUME_DB);
            let db = puck.volume_db;
            audio.set_volume(id, db);
        }
    }

    pub fn toggle_mute(&mut self, id: PuckId, audio: &mut impl AudioRouting) {
        if let Some(puck) = self.get_mut(id) {
            puck.muted = !puck.muted;
            let muted = puck.muted;
            audio.set_mute(id, muted);
        }
    }

    /// Double-activation gesture: flip playback. Ignored for pucks without a
    /// usable buffer.
    pub fn toggle_playback(&mut self, id: PuckId, audio: &mut impl AudioRouting) {
        let Some(puck) = self.get_mut(id) else { return };
        if !puck.audio_usable() {
            return;
        }
        if puck.playing {
            puck.playing = false;
            puck.armed = false;
            audio.stop_playback(id);
        } else {
            puck.playing = true;
            audio.start_playback(id);
        }
    }

    pub fn set_reverse(&mut self, id: PuckId, reversed: bool, audio: &mut impl AudioRouting) {
        if let Some(puck) = self.get_mut(id) {
            puck.reverse = reversed;
            audio.set_reverse(id, reversed);
        }
    }

    /// Mark at most one puck as the primary drawing puck
    pub fn set_primary(&mut self, id: Option<PuckId>) {
        for puck in &mut self.pucks {
            puck.primary = Some(puck.id) == id;
        }
    }

    /// Async load completion: the collaborator finished decoding
    pub fn buffer_loaded(&mut self, id: PuckId) {
        if let Some(puck) = self.get_mut(id) {
            puck.loaded = true;
            puck.load_error = false;
        }
    }

    /// Async load failure: puck stays in physics but is excluded from
    /// playback and effect mapping
    pub fn buffer_failed(&mut self, id: PuckId) {
        if let Some(puck) = self.get_mut(id) {
            puck.loaded = false;
            puck.load_error = true;
            puck.playing = false;
            puck.armed = false;
            log::warn!("Buffer load failed for puck {id:?}");
        }
    }

    /// Global physics toggle. Either every puck carries the stored values or
    /// every puck carries zeros - never a mix.
    pub fn set_physics_enabled(&mut self, enabled: bool, settings: &Settings) {
        self.physics_enabled = enabled;
        for puck in &mut self.pucks {
            if enabled {
                puck.mass = settings.mass;
                puck.friction = settings.friction;
                puck.bounce = settings.bounce;
            } else {
                puck.mass = 0.0;
                puck.friction = 0.0;
                puck.bounce = 0.0;
                puck.vel = Vec2::ZERO;
            }
        }
        log::info!("Physics {}", if enabled { "enabled" } else { "disabled" });
    }
}
