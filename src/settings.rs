//! Simulation settings
//!
//! Tunables the host may expose in a preferences UI. Serializable so the host
//! can persist them wherever it keeps its own state.

use serde::{Deserialize, Serialize};

/// Simulation settings and physics tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // === Physics ===
    /// Global physics toggle. When off, every puck's friction, bounce, and
    /// mass are zeroed together; when on, the stored values below apply.
    pub physics_enabled: bool,
    /// Velocity multiplier per tick: 0 stops a puck instantly, 1 never slows it
    pub friction: f32,
    /// Restitution applied on boundary and puck impacts (0..1)
    pub bounce: f32,
    /// Puck mass while physics is enabled
    pub mass: f32,

    // === Audio ramps ===
    /// Ramp time for scroll-wheel volume changes (ms)
    pub volume_ramp_ms: f32,
    /// Ramp time for effect target changes (ms)
    pub effect_ramp_ms: f32,

    // === Interaction ===
    /// Snap radius for connection proposals (pixels)
    pub snap_radius: f32,
    /// Volume change per scroll notch (dB)
    pub volume_step_db: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            physics_enabled: true,
            friction: 0.985,
            bounce: 0.75,
            mass: 1.0,

            volume_ramp_ms: 50.0,
            effect_ramp_ms: 40.0,

            snap_radius: crate::consts::SNAP_RADIUS,
            volume_step_db: 1.5,
        }
    }
}

impl Settings {
    /// Serialize to JSON for host-side persistence
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    /// Restore from JSON, falling back to defaults on any parse failure
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(settings) => settings,
            Err(err) => {
                log::warn!("Failed to parse settings ({err}), using defaults");
                Self::default()
            }
        }
    }
}
