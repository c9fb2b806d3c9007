//! Deterministic puck simulation
//!
//! All simulation logic lives here. This module must stay pure and
//! deterministic:
//! - One tick per host frame, whole-field exclusive mutation per tick
//! - Time comes in as a host-supplied `now_ms`, never read from a clock
//! - Stable iteration order (by puck id)
//! - No rendering, audio DSP, or platform dependencies - collaborators are
//!   traits and read-only views

pub mod effects;
pub mod graph;
pub mod path;
pub mod physics;
pub mod state;
pub mod tick;
pub mod undo;

pub use effects::{EffectTargets, compute_targets, proximity};
pub use graph::{LinkDrag, LinkPhase};
pub use path::sample_path;
pub use state::{Field, PathMode, PathState, Puck, PuckId, Surface, Waypoint, radius_for_volume};
pub use tick::tick;
pub use undo::{DeletedPuck, UndoError};
