//! Connection graph: proposals, snapping, commits, triangle completion
//!
//! Edges are symmetric and live in each puck's `connections` list; this
//! module owns the only code allowed to touch those lists. A proposal is a
//! drag from a puck toward a candidate: the visible endpoint eases onto a
//! candidate inside the snap radius, and committing runs a best-effort
//! triangle-completion pass whose priority order is part of the observed
//! contract - do not "improve" it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::SNAP_EASE;
use crate::settings::Settings;

use super::state::{Field, PathMode, PuckId};

/// Phase of an in-flight connection proposal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LinkPhase {
    /// Dragging freely, endpoint follows the cursor
    Proposing,
    /// Endpoint eased onto a candidate within the snap radius
    Snapped { target: PuckId },
}

/// An active connection drag. `None` on the field means idle; a committed
/// edge lives in the pucks' connection lists, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkDrag {
    pub puck: PuckId,
    /// Fixed start point: the proposer's position at begin
    pub start: Vec2,
    /// Movable visible endpoint
    pub end: Vec2,
    pub phase: LinkPhase,
    /// UI hint only: committing now would close a triangle
    pub would_close_triangle: bool,
    /// Captured at begin, restored on cancel
    pub(crate) saved_vel: Vec2,
    pub(crate) saved_path_mode: PathMode,
}

impl Field {
    // === Symmetric edge primitives ===

    /// Add the symmetric edge a-b. Rejects self-loops, duplicates, and
    /// missing endpoints. Returns whether an edge was added.
    pub fn connect(&mut self, a: PuckId, b: PuckId) -> bool {
        if a == b || !self.contains(a) || !self.contains(b) || self.are_connected(a, b) {
            return false;
        }
        if let Some(puck) = self.get_mut(a) {
            puck.connections.push(b);
        }
        if let Some(puck) = self.get_mut(b) {
            puck.connections.push(a);
        }
        log::debug!("Connected {a:?} - {b:?}");
        true
    }

    /// Remove the symmetric edge a-b if present
    pub fn disconnect(&mut self, a: PuckId, b: PuckId) {
        if let Some(puck) = self.get_mut(a) {
            puck.connections.retain(|&id| id != b);
        }
        if let Some(puck) = self.get_mut(b) {
            puck.connections.retain(|&id| id != a);
        }
    }

    /// Remove every edge incident to `id`, symmetrically
    pub fn disconnect_all(&mut self, id: PuckId) {
        let neighbors = self.neighbors(id);
        for neighbor in neighbors {
            self.disconnect(id, neighbor);
        }
    }

    pub fn are_connected(&self, a: PuckId, b: PuckId) -> bool {
        self.get(a).is_some_and(|p| p.is_connected_to(b))
    }

    pub fn neighbors(&self, id: PuckId) -> Vec<PuckId> {
        self.get(id).map(|p| p.connections.clone()).unwrap_or_default()
    }

    /// Every puck reachable from `id` through edges, including `id` itself.
    /// Breadth-first with an explicit visited list; the graph is cyclic.
    pub fn component_of(&self, id: PuckId) -> Vec<PuckId> {
        let mut visited = Vec::new();
        if !self.contains(id) {
            return visited;
        }
        let mut queue = vec![id];
        visited.push(id);
        while let Some(current) = queue.pop() {
            for neighbor in self.neighbors(current) {
                if !visited.contains(&neighbor) {
                    visited.push(neighbor);
                    queue.push(neighbor);
                }
            }
        }
        visited
    }

    // === Proposal state machine ===

    /// Start dragging a connection out of `id`. Suspends the puck's velocity
    /// and any path record/playback so a cancel can restore them exactly.
    pub fn begin_proposal(&mut self, id: PuckId, cursor: Vec2) {
        // An earlier unfinished drag is abandoned via its own cancel path
        if self.link.is_some() {
            self.cancel_proposal();
        }
        let Some(puck) = self.get_mut(id) else { return };

        let saved_vel = puck.vel;
        let saved_path_mode = puck.path.mode;
        puck.vel = Vec2::ZERO;
        puck.path.mode = PathMode::Idle;
        let start = puck.pos;

        self.link = Some(LinkDrag {
            puck: id,
            start,
            end: cursor,
            phase: LinkPhase::Proposing,
            would_close_triangle: false,
            saved_vel,
            saved_path_mode,
        });
    }

    /// Move the proposal endpoint. Within the snap radius of another puck the
    /// endpoint eases onto it rather than hard-snapping.
    pub fn update_proposal(&mut self, cursor: Vec2, settings: &Settings) {
        let Some(link) = self.link.as_ref() else { return };
        let proposer = link.puck;

        // Nearest other puck within the snap radius of the cursor
        let candidate = self
            .pucks
            .iter()
            .filter(|p| p.id != proposer)
            .map(|p| (p.id, p.pos, p.pos.distance(cursor)))
            .filter(|(_, _, dist)| *dist <= settings.snap_radius)
            .min_by(|a, b| a.2.total_cmp(&b.2));

        let would_close_triangle = candidate
            .map(|(target, _, _)| self.shares_common_neighbor(proposer, target))
            .unwrap_or(false);

        let Some(link) = self.link.as_mut() else { return };
        match candidate {
            Some((target, target_pos, _)) => {
                link.end += (target_pos - link.end) * SNAP_EASE;
                link.phase = LinkPhase::Snapped { target };
            }
            None => {
                link.end = cursor;
                link.phase = LinkPhase::Proposing;
            }
        }
        link.would_close_triangle = would_close_triangle;
    }

    /// Release the drag. A snapped, valid target commits the edge and runs
    /// triangle completion; anything else is a cancellation.
    pub fn commit_proposal(&mut self) {
        let Some(link) = self.link.as_ref() else { return };
        let proposer = link.puck;
        let target = match link.phase {
            LinkPhase::Snapped { target } => target,
            LinkPhase::Proposing => {
                self.cancel_proposal();
                return;
            }
        };

        // Self-targets and existing edges are treated as cancellation
        if target == proposer || !self.contains(target) || self.are_connected(proposer, target) {
            self.cancel_proposal();
            return;
        }

        // Committed: suspended state is discarded, the puck comes out of the
        // drag at rest and idle
        self.link = None;

        let target_degree_before = self.neighbors(target).len();
        self.connect(proposer, target);
        log::info!("Committed connection {proposer:?} - {target:?}");

        self.complete_triangle(proposer, target, target_degree_before);
    }

    /// Abandon the drag and restore the state captured at begin
    pub fn cancel_proposal(&mut self) {
        let Some(link) = self.link.take() else { return };
        if let Some(puck) = self.get_mut(link.puck) {
            puck.vel = link.saved_vel;
            puck.path.mode = link.saved_path_mode;
        }
    }

    /// Renderer view of the active drag
    pub fn active_link(&self) -> Option<&LinkDrag> {
        self.link.as_ref()
    }

    // === Triangle completion ===

    fn shares_common_neighbor(&self, a: PuckId, b: PuckId) -> bool {
        let b_neighbors = self.neighbors(b);
        self.neighbors(a)
            .iter()
            .any(|n| *n != b && b_neighbors.contains(n))
    }

    /// Third pucks adjacent to both `a` and `b`
    fn common_neighbors(&self, a: PuckId, b: PuckId) -> Vec<PuckId> {
        let b_neighbors = self.neighbors(b);
        self.neighbors(a)
            .into_iter()
            .filter(|n| *n != a && *n != b && b_neighbors.contains(n))
            .collect()
    }

    /// Best-effort triangle completion after committing proposer-target.
    ///
    /// Four cases evaluated in priority order; the first one that actually
    /// links (or finds the triangle already closed) ends the pass. At most
    /// one auto-edge is ever added.
    fn complete_triangle(&mut self, proposer: PuckId, target: PuckId, target_degree_before: usize) {
        let proposer_degree = self.neighbors(proposer).len();
        let target_degree = self.neighbors(target).len();

        // Case 1: target is already meshed, proposer only has this new edge.
        // Pull the proposer into the mesh through one of target's neighbors.
        if target_degree >= 2 && proposer_degree == 1 {
            let candidate = self
                .neighbors(target)
                .into_iter()
                .find(|n| *n != proposer && !self.are_connected(proposer, *n));
            if let Some(third) = candidate {
                self.connect(proposer, third);
                return;
            }
        }

        // Case 2: mirror image - proposer is meshed, target had exactly one
        // edge before this commit. Pull target toward the proposer's mesh.
        if proposer_degree >= 2 && target_degree_before == 1 {
            let candidate = self
                .neighbors(proposer)
                .into_iter()
                .find(|n| *n != target && !self.are_connected(target, *n));
            if let Some(third) = candidate {
                self.connect(target, third);
                return;
            }
        }

        // Case 3: exactly one shared vertex - the triangle closes through it.
        // With symmetric edges the shared vertex is already linked to both,
        // so this case mostly acts as the idempotence stop.
        let common = self.common_neighbors(proposer, target);
        if common.len() == 1 {
            let third = common[0];
            if !self.are_connected(proposer, third) {
                self.connect(proposer, third);
            }
            return;
        }

        // Case 4: no shared vertex at all - extend the mesh through one of
        // target's other neighbors rather than leaving an isolated dyad.
        if common.is_empty() {
            let candidate = self
                .neighbors(target)
                .into_iter()
                .find(|n| *n != proposer && !self.are_connected(proposer, *n));
            if let Some(third) = candidate {
                self.connect(proposer, third);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioSource, NullAudio};

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

    fn assert_symmetric(field: &Field) {
        for puck in field.pucks() {
            for neighbor in &puck.connections {
                assert!(
                    field.are_connected(*neighbor, puck.id),
                    "edge {:?}-{:?} not mirrored",
                    puck.id,
                    neighbor
                );
            }
        }
    }

    #[test]
    fn test_connect_is_symmetric_no_self_no_dup() {
        let (mut field, ids) = field_with_pucks(&[Vec2::ZERO, Vec2::new(100.0, 0.0)]);
        assert!(field.connect(ids[0], ids[1]));
        assert!(!field.connect(ids[0], ids[1])); // duplicate
        assert!(!field.connect(ids[1], ids[0])); // mirrored duplicate
        assert!(!field.connect(ids[0], ids[0])); // self-loop
        assert_symmetric(&field);
        assert_eq!(field.neighbors(ids[0]).len(), 1);

        field.disconnect(ids[0], ids[1]);
        assert!(field.neighbors(ids[0]).is_empty());
        assert!(field.neighbors(ids[1]).is_empty());
    }

    #[test]
    fn test_disconnect_all() {
        let (mut field, ids) =
            field_with_pucks(&[Vec2::ZERO, Vec2::new(100.0, 0.0), Vec2::new(0.0, 100.0)]);
        field.connect(ids[0], ids[1]);
        field.connect(ids[0], ids[2]);
        field.disconnect_all(ids[0]);
        assert!(field.neighbors(ids[0]).is_empty());
        assert!(field.neighbors(ids[1]).is_empty());
        assert_symmetric(&field);
    }

    #[test]
    fn test_component_traversal_is_cycle_safe() {
        let (mut field, ids) = field_with_pucks(&[
            Vec2::ZERO,
            Vec2::new(100.0, 0.0),
            Vec2::new(0.0, 100.0),
            Vec2::new(500.0, 500.0),
        ]);
        field.connect(ids[0], ids[1]);
        field.connect(ids[1], ids[2]);
        field.connect(ids[2], ids[0]); // cycle
        let mut component = field.component_of(ids[0]);
        component.sort();
        assert_eq!(component, vec![ids[0], ids[1], ids[2]]);
        assert_eq!(field.component_of(ids[3]), vec![ids[3]]);
    }

    fn commit(field: &mut Field, from: PuckId, to: PuckId) {
        let from_pos = field.get(from).unwrap().pos;
        let to_pos = field.get(to).unwrap().pos;
        field.begin_proposal(from, from_pos);
        // Ease within snap range of the target, then release
        field.update_proposal(to_pos, &Settings::default());
        field.commit_proposal();
    }

    #[test]
    fn test_commit_to_self_or_existing_cancels() {
        let (mut field, ids) = field_with_pucks(&[Vec2::ZERO, Vec2::new(300.0, 0.0)]);
        field.connect(ids[0], ids[1]);
        commit(&mut field, ids[0], ids[1]);
        assert_eq!(field.neighbors(ids[0]).len(), 1);
        assert!(field.active_link().is_none());
    }

    #[test]
    fn test_snap_eases_toward_candidate() {
        let (mut field, ids) = field_with_pucks(&[Vec2::ZERO, Vec2::new(300.0, 0.0)]);
        let settings = Settings::default();
        field.begin_proposal(ids[0], Vec2::new(280.0, 0.0));
        // Cursor inside the snap radius but not on the candidate
        field.update_proposal(Vec2::new(280.0, 0.0), &settings);
        let link = field.active_link().unwrap();
        assert_eq!(link.phase, LinkPhase::Snapped { target: ids[1] });
        // Eased partway, not hard-snapped
        assert!(link.end.x > 280.0 && link.end.x < 300.0);

        // Cursor far away: back to free proposing
        field.update_proposal(Vec2::new(100.0, 200.0), &settings);
        assert_eq!(field.active_link().unwrap().phase, LinkPhase::Proposing);
    }

    #[test]
    fn test_cancel_restores_suspended_state() {
        let (mut field, ids) = field_with_pucks(&[Vec2::ZERO, Vec2::new(300.0, 0.0)]);
        {
            let puck = field.get_mut(ids[0]).unwrap();
            puck.vel = Vec2::new(3.0, -1.0);
            puck.path.mode = PathMode::Playing { started_ms: 10.0 };
        }
        field.begin_proposal(ids[0], Vec2::ZERO);
        // Suspended during the drag
        let puck = field.get(ids[0]).unwrap();
        assert_eq!(puck.vel, Vec2::ZERO);
        assert_eq!(puck.path.mode, PathMode::Idle);

        field.cancel_proposal();
        let puck = field.get(ids[0]).unwrap();
        assert_eq!(puck.vel, Vec2::new(3.0, -1.0));
        assert_eq!(puck.path.mode, PathMode::Playing { started_ms: 10.0 });
    }

    #[test]
    fn test_triangle_case_1_proposer_joins_mesh() {
        // Target B meshed with C; lone proposer A connects to B,
        // then gets pulled to one of B's neighbors
        let (mut field, ids) = field_with_pucks(&[
            Vec2::new(0.0, 0.0),   // A
            Vec2::new(300.0, 0.0), // B
            Vec2::new(300.0, 300.0), // C
        ]);
        field.connect(ids[1], ids[2]);
        commit(&mut field, ids[0], ids[1]);

        assert!(field.are_connected(ids[0], ids[1]));
        assert!(field.are_connected(ids[0], ids[2]));
        assert_symmetric(&field);
    }

    #[test]
    fn test_triangle_case_2_target_joins_mesh() {
        // Proposer A meshed with C; target B had exactly one edge (to D)
        let (mut field, ids) = field_with_pucks(&[
            Vec2::new(0.0, 0.0),     // A
            Vec2::new(300.0, 0.0),   // B
            Vec2::new(0.0, 300.0),   // C
            Vec2::new(600.0, 0.0),   // D
        ]);
        field.connect(ids[0], ids[2]);
        field.connect(ids[1], ids[3]);
        commit(&mut field, ids[0], ids[1]);

        assert!(field.are_connected(ids[0], ids[1]));
        // Target pulled onto one of proposer's other neighbors
        assert!(field.are_connected(ids[1], ids[2]));
        assert_symmetric(&field);
    }

    #[test]
    fn test_triangle_case_3_idempotent_with_common_neighbor() {
        // A and B both already linked to C: committing A-B must not add any
        // further edge for either
        let (mut field, ids) = field_with_pucks(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(300.0, 0.0),
            Vec2::new(150.0, 300.0),
        ]);
        field.connect(ids[0], ids[2]);
        field.connect(ids[1], ids[2]);
        commit(&mut field, ids[0], ids[1]);

        assert!(field.are_connected(ids[0], ids[1]));
        assert_eq!(field.neighbors(ids[0]).len(), 2);
        assert_eq!(field.neighbors(ids[1]).len(), 2);
        assert_eq!(field.neighbors(ids[2]).len(), 2);
        assert_symmetric(&field);
    }

    #[test]
    fn test_case_priority_two_meshed_dyads() {
        // A-C and B-D, no common neighbor. Degrees after A-B: A=2, B=2 with
        // target having had exactly 1 edge before, so case 2 wins over case 4
        // and links B to C. Priority order is the contract.
        let (mut field, ids) = field_with_pucks(&[
            Vec2::new(0.0, 0.0),     // A
            Vec2::new(300.0, 0.0),   // B
            Vec2::new(0.0, 300.0),   // C (A's neighbor)
            Vec2::new(600.0, 0.0),   // D (B's neighbor)
        ]);
        field.connect(ids[0], ids[2]);
        field.connect(ids[1], ids[3]);
        commit(&mut field, ids[0], ids[1]);

        assert!(field.are_connected(ids[1], ids[2]));
        // One auto-edge total
        let edge_count: usize = field.pucks().iter().map(|p| p.connections.len()).sum();
        assert_eq!(edge_count, 8); // 4 edges, each counted twice
        assert_symmetric(&field);
    }

    #[test]
    fn test_triangle_case_4_extends_mesh() {
        // Proposer and target both meshed, no shared vertex, and none of the
        // earlier cases apply (proposer degree 2, target had 2 edges before):
        // the proposer gets linked through one of target's other neighbors.
        let (mut field, ids) = field_with_pucks(&[
            Vec2::new(0.0, 0.0),     // A
            Vec2::new(300.0, 0.0),   // B
            Vec2::new(0.0, 300.0),   // C (A's neighbor)
            Vec2::new(600.0, 0.0),   // D (B's neighbor)
            Vec2::new(600.0, 300.0), // E (B's neighbor)
        ]);
        field.connect(ids[0], ids[2]);
        field.connect(ids[1], ids[3]);
        field.connect(ids[1], ids[4]);
        commit(&mut field, ids[0], ids[1]);

        // Linked through B's first spare neighbor
        assert!(field.are_connected(ids[0], ids[3]));
        assert!(!field.are_connected(ids[0], ids[4]));
        assert_symmetric(&field);
    }

    #[test]
    fn test_lone_proposer_gets_exactly_one_auto_edge() {
        // Proposer A is isolated, target B carries two neighbors already:
        // case 1 pulls A to one of them. Pin that it is exactly one edge.
        let (mut field, ids) = field_with_pucks(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(300.0, 0.0),
            Vec2::new(600.0, 0.0),
            Vec2::new(300.0, 300.0),
        ]);
        field.connect(ids[1], ids[2]);
        field.connect(ids[1], ids[3]);
        commit(&mut field, ids[0], ids[1]);

        assert!(field.are_connected(ids[0], ids[1]));
        let auto_edges = [ids[2], ids[3]]
            .iter()
            .filter(|n| field.are_connected(ids[0], **n))
            .count();
        assert_eq!(auto_edges, 1);
        assert_symmetric(&field);
    }

    #[test]
    fn test_plain_dyad_gets_no_auto_edge() {
        let (mut field, ids) = field_with_pucks(&[Vec2::ZERO, Vec2::new(300.0, 0.0)]);
        commit(&mut field, ids[0], ids[1]);
        assert!(field.are_connected(ids[0], ids[1]));
        assert_eq!(field.neighbors(ids[0]).len(), 1);
        assert_eq!(field.neighbors(ids[1]).len(), 1);
    }

    #[test]
    fn test_triangle_preview_flag() {
        let (mut field, ids) = field_with_pucks(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(300.0, 0.0),
            Vec2::new(150.0, 300.0),
        ]);
        field.connect(ids[0], ids[2]);
        field.connect(ids[1], ids[2]);
        let settings = Settings::default();
        field.begin_proposal(ids[0], Vec2::ZERO);
        field.update_proposal(Vec2::new(300.0, 0.0), &settings);
        assert!(field.active_link().unwrap().would_close_triangle);
        field.cancel_proposal();
    }
}
