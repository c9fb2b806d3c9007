//! Deletion and the single-slot undo history
//!
//! Deleting a puck severs its edges and captures enough state to rebuild it:
//! source handle, name, origin, position, volume, ordinal position in the
//! collection, and neighbor identities. One slot only - a second deletion
//! overwrites the first.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::{AudioError, AudioRouting, AudioSource};
use crate::settings::Settings;

use super::state::{Field, Puck, PuckId};

/// Everything needed to rebuild a deleted puck
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedPuck {
    /// The deleted puck's id, reused on restore (ids are never reallocated)
    pub id: PuckId,
    pub source: AudioSource,
    pub name: String,
    pub from_mic: bool,
    pub pos: Vec2,
    pub volume_db: f32,
    /// Position in the ordered collection at deletion time
    pub ordinal: usize,
    /// Neighbor identities; members deleted in the interim are skipped on
    /// restore
    pub neighbors: Vec<PuckId>,
}

/// Failure modes of `undo_delete`
#[derive(Debug, Error)]
pub enum UndoError {
    #[error("nothing to undo")]
    NothingToUndo,
    /// The collaborator could not rebuild the audio chain. The slot is
    /// cleared and no partial puck is left behind.
    #[error("could not rebuild deleted puck: {0}")]
    Reconstruction(#[from] AudioError),
}

impl Field {
    /// Delete a puck: capture the undo snapshot, sever all edges, release
    /// collaborator resources, remove from the collection. Returns false for
    /// unknown ids.
    pub fn delete_puck(&mut self, id: PuckId, audio: &mut impl AudioRouting) -> bool {
        let Some(ordinal) = self.display_index(id) else {
            return false;
        };

        // A drag out of the dying puck cannot be restored; drop it
        if self.link.as_ref().is_some_and(|link| link.puck == id) {
            self.link = None;
        }

        let neighbors = self.neighbors(id);
        self.disconnect_all(id);

        let puck = self.pucks.remove(ordinal);
        audio.detach(id);
        if puck.playing {
            audio.stop_playback(id);
        }

        self.undo_slot = Some(DeletedPuck {
            id,
            source: puck.source,
            name: puck.name,
            from_mic: puck.from_mic,
            pos: puck.pos,
            volume_db: puck.volume_db,
            ordinal,
            neighbors,
        });
        log::info!("Deleted puck {id:?} (undo slot armed)");
        true
    }

    /// Rebuild the most recently deleted puck: same id, original ordinal
    /// position, direct position/volume restore, edges re-established to
    /// every neighbor that still exists. The slot is cleared whatever
    /// happens; a failed rebuild surfaces as an error with no partial puck
    /// left dangling.
    pub fn undo_delete(
        &mut self,
        settings: &Settings,
        audio: &mut impl AudioRouting,
    ) -> Result<PuckId, UndoError> {
        let snapshot = self.undo_slot.take().ok_or(UndoError::NothingToUndo)?;

        // Attach before touching the collection so failure cannot leave a
        // half-built puck behind
        audio.attach(snapshot.id, &snapshot.source)?;

        let mut puck = Puck::new(
            snapshot.id,
            snapshot.source,
            snapshot.name,
            snapshot.from_mic,
            snapshot.pos,
            settings,
        );
        if !self.physics_enabled {
            puck.mass = 0.0;
            puck.friction = 0.0;
            puck.bounce = 0.0;
        }
        puck.volume_db = snapshot.volume_db;
        audio.set_volume(snapshot.id, snapshot.volume_db);

        let index = snapshot.ordinal.min(self.pucks.len());
        self.pucks.insert(index, puck);

        for neighbor in snapshot.neighbors {
            if self.contains(neighbor) {
                self.connect(snapshot.id, neighbor);
            }
        }

        log::info!("Restored puck {:?} at ordinal {index}", snapshot.id);
        Ok(snapshot.id)
    }

    /// Whether an undo is currently possible
    pub fn can_undo(&self) -> bool {
        self.undo_slot.is_some()
    }
}
