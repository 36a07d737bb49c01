//! Registration records for every piece taking part in snapping.

use slotmap::SecondaryMap;
use snapfit_math::{Pose, SnapTolerance};

use crate::error::{Result, SnapError};
use crate::scene::{ObjectId, Scene};

/// One goal of one piece: the place a piece may be pinned to.
///
/// Goal 0 of a piece is its primary slot. That slot carries the ghost and is
/// the one offered to pieces listing the owner as an alternate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    /// Piece whose authored goal this is.
    pub owner: ObjectId,
    /// Index into the owner's goal list.
    pub goal: usize,
}

impl Slot {
    /// Goal `goal` of `owner`.
    pub fn new(owner: ObjectId, goal: usize) -> Self {
        Self { owner, goal }
    }

    /// Goal 0 of `owner`.
    pub fn primary(owner: ObjectId) -> Self {
        Self::new(owner, 0)
    }

    /// Whether this is the owner's ghost-marked slot.
    pub fn is_primary(&self) -> bool {
        self.goal == 0
    }
}

/// Authored data for one piece, as supplied by the configuration layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PieceSpec {
    /// Goal poses in priority order; the first is the primary slot. Scale is
    /// ignored, the piece keeps its own.
    pub goals: Vec<Pose>,
    /// How close the manipulator must come before the piece snaps.
    pub tolerance: SnapTolerance,
    /// Ghost visual marking the primary slot.
    pub ghost: Option<ObjectId>,
    /// Goal to snap onto at registration, wherever the piece is.
    pub snap_index: Option<usize>,
}

impl PieceSpec {
    /// Single goal with default tolerances and no ghost.
    pub fn new(goal: Pose) -> Self {
        Self {
            goals: vec![goal],
            tolerance: SnapTolerance::DEFAULT,
            ghost: None,
            snap_index: None,
        }
    }

    /// Append another goal after the existing ones.
    pub fn with_goal(mut self, goal: Pose) -> Self {
        self.goals.push(goal);
        self
    }

    /// Replace the tolerances.
    pub fn with_tolerance(mut self, tolerance: SnapTolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Attach a ghost visual.
    pub fn with_ghost(mut self, ghost: ObjectId) -> Self {
        self.ghost = Some(ghost);
        self
    }

    /// Snap onto goal `index` at registration.
    pub fn with_snap_index(mut self, index: usize) -> Self {
        self.snap_index = Some(index);
        self
    }

    /// At least one goal, valid tolerances and an in-range snap index.
    pub fn validate(&self) -> Result<()> {
        if self.goals.is_empty() {
            return Err(SnapError::InvalidConfig("a piece needs at least one goal".into()));
        }
        if !self.tolerance.is_valid() {
            return Err(SnapError::InvalidConfig(format!(
                "tolerance {:?} is out of range",
                self.tolerance
            )));
        }
        if let Some(index) = self.snap_index {
            if index >= self.goals.len() {
                return Err(SnapError::InvalidConfig(format!(
                    "snap index {} out of range for {} goals",
                    index,
                    self.goals.len()
                )));
            }
        }
        Ok(())
    }
}

/// Cached goal of a piece on an alternate's slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Not computed yet, or geometry was missing last time.
    NotReady,
    /// Computed once and kept: meshes are static after load.
    Resolved(Pose),
}

impl Resolution {
    /// The resolved pose, if any.
    pub fn pose(&self) -> Option<&Pose> {
        match self {
            Resolution::NotReady => None,
            Resolution::Resolved(pose) => Some(pose),
        }
    }
}

/// One entry of a piece's alternatives list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlternateSlot {
    /// The interchangeable piece whose primary slot may be taken.
    pub object: ObjectId,
    /// Goal of the owning piece on that slot.
    pub resolution: Resolution,
}

/// Registry entry of one piece.
#[derive(Debug, Clone, PartialEq)]
pub struct PieceRecord {
    /// Authored goals, primary first.
    pub goals: Vec<Pose>,
    /// Snap tolerances.
    pub tolerance: SnapTolerance,
    /// Ghost visual of this piece's primary slot.
    pub ghost: Option<ObjectId>,
    snapped_onto: Option<Slot>,
}

impl PieceRecord {
    fn from_spec(spec: &PieceSpec) -> Self {
        Self {
            goals: spec.goals.clone(),
            tolerance: spec.tolerance,
            ghost: spec.ghost,
            snapped_onto: None,
        }
    }

    /// Authored goal `index`.
    pub fn goal(&self, index: usize) -> Option<&Pose> {
        self.goals.get(index)
    }

    /// The primary goal.
    pub fn primary_goal(&self) -> Option<&Pose> {
        self.goals.first()
    }

    /// Slot this piece is pinned to, if any.
    pub fn snapped_onto(&self) -> Option<Slot> {
        self.snapped_onto
    }

    /// Whether the piece is pinned to any slot.
    pub fn is_snapped(&self) -> bool {
        self.snapped_onto.is_some()
    }
}

/// All registered pieces and their alternatives.
///
/// Only the snap state machine changes which slot a piece occupies. Ghost
/// visibility is never stored here: it is recomputed from slot occupancy
/// whenever occupancy changes.
#[derive(Debug, Default)]
pub struct PieceRegistry {
    pieces: SecondaryMap<ObjectId, PieceRecord>,
    alternates: SecondaryMap<ObjectId, Vec<AlternateSlot>>,
}

impl PieceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update a piece.
    ///
    /// The record carries over the slot the piece occupies; callers that
    /// change goals free the piece first. Cached alternate goals that depend
    /// on this piece's authored data are dropped and recomputed on the next
    /// grab.
    pub fn insert(&mut self, piece: ObjectId, spec: &PieceSpec) -> Option<PieceRecord> {
        let mut record = PieceRecord::from_spec(spec);
        let previous = self.pieces.get(piece).cloned();
        if let Some(prev) = &previous {
            record.snapped_onto = prev.snapped_onto;
        }
        self.pieces.insert(piece, record);
        self.invalidate_resolutions(piece);
        previous
    }

    /// Remove a piece and its alternatives list.
    pub fn remove(&mut self, piece: ObjectId) -> Option<PieceRecord> {
        self.alternates.remove(piece);
        self.pieces.remove(piece)
    }

    /// Replace the alternatives list of a piece, dropping every cached goal.
    pub fn set_alternates(&mut self, piece: ObjectId, alternates: &[ObjectId]) {
        let slots = alternates
            .iter()
            .filter(|&&alt| alt != piece)
            .map(|&object| AlternateSlot {
                object,
                resolution: Resolution::NotReady,
            })
            .collect();
        self.alternates.insert(piece, slots);
    }

    /// Alternatives of a piece in registration order.
    pub fn alternates(&self, piece: ObjectId) -> &[AlternateSlot] {
        self.alternates.get(piece).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up a piece.
    pub fn get(&self, piece: ObjectId) -> Option<&PieceRecord> {
        self.pieces.get(piece)
    }

    /// Whether a piece is registered.
    pub fn contains(&self, piece: ObjectId) -> bool {
        self.pieces.contains_key(piece)
    }

    /// All registered pieces.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &PieceRecord)> {
        self.pieces.iter()
    }

    /// Number of registered pieces.
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// Whether no piece is registered.
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// The piece pinned to `slot`, if any.
    pub fn occupant_of(&self, slot: Slot) -> Option<ObjectId> {
        self.pieces
            .iter()
            .find(|(_, record)| record.snapped_onto == Some(slot))
            .map(|(piece, _)| piece)
    }

    /// Pieces pinned to any goal of `owner`, the owner itself included.
    pub fn occupants_of_owner(&self, owner: ObjectId) -> Vec<ObjectId> {
        self.pieces
            .iter()
            .filter(|(_, record)| record.snapped_onto.is_some_and(|slot| slot.owner == owner))
            .map(|(piece, _)| piece)
            .collect()
    }

    /// Show the ghost of `owner` when nothing occupies its primary slot,
    /// hide it otherwise.
    pub fn sync_ghost<S: Scene + ?Sized>(&self, scene: &mut S, owner: ObjectId) {
        if let Some(ghost) = self.pieces.get(owner).and_then(|record| record.ghost) {
            scene.set_visible(ghost, self.occupant_of(Slot::primary(owner)).is_none());
        }
    }

    pub(crate) fn set_snapped_onto(&mut self, piece: ObjectId, slot: Option<Slot>) -> Option<Slot> {
        match self.pieces.get_mut(piece) {
            Some(record) => std::mem::replace(&mut record.snapped_onto, slot),
            None => None,
        }
    }

    pub(crate) fn cache_resolution(&mut self, piece: ObjectId, index: usize, pose: Pose) {
        if let Some(slot) = self
            .alternates
            .get_mut(piece)
            .and_then(|slots| slots.get_mut(index))
        {
            slot.resolution = Resolution::Resolved(pose);
        }
    }

    fn invalidate_resolutions(&mut self, changed: ObjectId) {
        for (owner, slots) in self.alternates.iter_mut() {
            for slot in slots.iter_mut() {
                if owner == changed || slot.object == changed {
                    slot.resolution = Resolution::NotReady;
                }
            }
        }
    }
}
