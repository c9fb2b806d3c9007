//! Puckboard - simulation core for an interactive audio-puck surface
//!
//! Core modules:
//! - `sim`: Deterministic puck simulation (physics, connections, paths, undo)
//! - `audio`: Audio-routing collaborator trait and effect channel types
//! - `settings`: Tunable simulation settings
//!
//! Rendering, DSP, and file I/O live in the host application. The host drives
//! the simulation with one `sim::tick` call per frame and reads puck state
//! back for presentation.

pub mod audio;
pub mod settings;
pub mod sim;

pub use audio::{AudioRouting, AudioSource, EffectChannel};
pub use settings::Settings;
pub use sim::{Field, Puck, PuckId, Surface};

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Default surface dimensions (pixels)
    pub const SURFACE_WIDTH: f32 = 800.0;
    pub const SURFACE_HEIGHT: f32 = 600.0;

    /// Volume range in decibels
    pub const MIN_VOLUME_DB: f32 = -48.0;
    pub const MAX_VOLUME_DB: f32 = 6.0;

    /// Puck radius bounds - radius is derived from volume, never set directly
    pub const MIN_PUCK_RADIUS: f32 = 20.0;
    pub const MAX_PUCK_RADIUS: f32 = 60.0;

    /// Distance within which a connection proposal eases onto a candidate.
    /// Smaller than the drag threshold so targeting a puck takes intent.
    pub const SNAP_RADIUS: f32 = 40.0;
    /// General pointer hit threshold for dragging a puck
    pub const DRAG_RADIUS: f32 = 80.0;

    /// Easing factor per update for a snapped proposal endpoint
    pub const SNAP_EASE: f32 = 0.35;

    /// Low-EQ gain span (proximity 0..1 maps onto a ±12 unit range)
    pub const LOW_EQ_SPAN: f32 = 24.0;
}

/// Linear interpolation between `a` and `b` by `t` in [0, 1]
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Linear interpolation between two points
#[inline]
pub fn lerp_vec(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    a + (b - a) * t
}
