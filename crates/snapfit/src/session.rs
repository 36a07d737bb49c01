//! State held between grab-start and grab-end.

use snapfit_math::{Pose, Transform};

use crate::error::{Result, SnapError};
use crate::goals::{build_goals, Goal};
use crate::registry::{PieceRegistry, Slot};
use crate::scene::{ObjectId, Scene};

/// A piece held by one manipulator.
#[derive(Debug, Clone)]
pub struct GrabSession {
    manipulator: ObjectId,
    grab_offset: Transform,
    goals: Vec<Goal>,
}

impl GrabSession {
    /// Freeze the grab offset and build the candidate goals.
    pub fn start<S: Scene + ?Sized>(
        scene: &mut S,
        registry: &mut PieceRegistry,
        piece: ObjectId,
        manipulator: ObjectId,
    ) -> Result<Self> {
        let goals = build_goals(scene, registry, piece, manipulator)?;

        let manipulator_world = scene
            .world_transform(manipulator)
            .ok_or(SnapError::UnknownObject(manipulator))?;
        let piece_local = scene
            .local_pose(piece)
            .ok_or(SnapError::UnknownObject(piece))?
            .to_transform();
        let grab_offset = manipulator_world
            .inverse()
            .ok_or(SnapError::SingularTransform { object: manipulator })?
            .then(&piece_local);

        Ok(Self {
            manipulator,
            grab_offset,
            goals,
        })
    }

    /// Pose of a free piece carried by a manipulator at `manipulator_world`.
    pub fn follow_pose(&self, manipulator_world: &Transform) -> Pose {
        Pose::from_transform(&manipulator_world.then(&self.grab_offset))
    }

    /// Index of the goal for `slot`.
    pub fn goal_index(&self, slot: Slot) -> Option<usize> {
        self.goals.iter().position(|goal| goal.slot == slot)
    }

    /// The holding manipulator.
    pub fn manipulator(&self) -> ObjectId {
        self.manipulator
    }

    /// Piece pose relative to the manipulator at grab-start.
    pub fn grab_offset(&self) -> &Transform {
        &self.grab_offset
    }

    /// Candidate goals in priority order.
    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }
}
