//! Candidate goals of a grabbed piece.

use snapfit_math::{Pose, SnapTolerance, Transform, Vec3};

use crate::error::{Result, SnapError};
use crate::registry::{PieceRegistry, Resolution, Slot};
use crate::resolver::resolve_alternate_goal;
use crate::scene::{ObjectId, Scene};

/// One place the grabbed piece may snap to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Goal {
    /// One of the piece's own goals, or an alternate's primary slot.
    pub slot: Slot,
    /// Pose the piece takes when snapped here.
    pub target: Pose,
    /// Manipulator pose that holds the piece exactly at `target`.
    pub manipulator: Pose,
    /// Tolerances of the slot owner.
    pub tolerance: SnapTolerance,
}

impl Goal {
    fn new(
        slot: Slot,
        target: Pose,
        tolerance: SnapTolerance,
        piece_scale: Vec3,
        offset: &Transform,
    ) -> Self {
        let target = target.with_scale(piece_scale);
        Self {
            slot,
            target,
            manipulator: manipulator_pose_at(&target, &piece_scale, offset),
            tolerance,
        }
    }

    /// Whether a manipulator at `pose` is within tolerance of this goal.
    pub fn matches(&self, pose: &Pose) -> bool {
        self.tolerance.accepts_poses(&self.manipulator, pose)
    }
}

/// Manipulator pose relative to the piece: `inverse(piece_world) * manipulator_world`.
pub fn manipulator_offset(
    piece_world: &Transform,
    manipulator_world: &Transform,
) -> Option<Transform> {
    piece_world.inverse().map(|inv| inv.then(manipulator_world))
}

/// Manipulator pose that places the piece at `target` for the given offset.
pub fn manipulator_pose_at(target: &Pose, piece_scale: &Vec3, offset: &Transform) -> Pose {
    let at_goal = Transform::compose(&target.position, &target.orientation, piece_scale);
    Pose::from_transform(&at_goal.then(offset))
}

/// Build the candidate goals of `piece` held by `manipulator`.
///
/// The piece's own goals come first in authored order, then the primary
/// slot of each alternate in registration order. Alternates that are not
/// registered, whose geometry has not streamed in, or whose shape cannot be
/// aligned are left out; the build itself only fails when the piece or
/// manipulator cannot be read. Alternate goals are resolved once and cached
/// in the registry.
pub fn build_goals<S: Scene + ?Sized>(
    scene: &mut S,
    registry: &mut PieceRegistry,
    piece: ObjectId,
    manipulator: ObjectId,
) -> Result<Vec<Goal>> {
    let record = registry
        .get(piece)
        .cloned()
        .ok_or(SnapError::UnregisteredPiece(piece))?;
    let piece_scale = scene
        .local_pose(piece)
        .ok_or(SnapError::UnknownObject(piece))?
        .scale;
    let piece_world = scene
        .world_transform(piece)
        .ok_or(SnapError::UnknownObject(piece))?;
    let manipulator_world = scene
        .world_transform(manipulator)
        .ok_or(SnapError::UnknownObject(manipulator))?;
    let offset = manipulator_offset(&piece_world, &manipulator_world)
        .ok_or(SnapError::SingularTransform { object: piece })?;

    let slots = registry.alternates(piece).to_vec();
    let mut goals = Vec::with_capacity(record.goals.len() + slots.len());
    for (index, goal) in record.goals.iter().enumerate() {
        let slot = Slot::new(piece, index);
        goals.push(Goal::new(slot, *goal, record.tolerance, piece_scale, &offset));
    }

    for (index, slot) in slots.iter().enumerate() {
        let alt = slot.object;
        let Some((alt_goal, alt_tolerance)) = registry
            .get(alt)
            .and_then(|record| record.primary_goal().map(|goal| (*goal, record.tolerance)))
        else {
            tracing::debug!("alternate {:?} of {:?} is not registered, skipping", alt, piece);
            continue;
        };

        let target = match slot.resolution {
            Resolution::Resolved(pose) => pose,
            Resolution::NotReady => match resolve_alternate_goal(scene, piece, alt, &alt_goal) {
                Ok(pose) => {
                    tracing::debug!("resolved goal of {:?} on slot {:?}", piece, alt);
                    registry.cache_resolution(piece, index, pose);
                    pose
                }
                Err(SnapError::GeometryUnavailable { object }) => {
                    tracing::debug!(
                        "geometry of {:?} not loaded yet, alternate {:?} deferred",
                        object,
                        alt
                    );
                    continue;
                }
                Err(err) => {
                    tracing::warn!(piece = ?piece, alternate = ?alt, "alternate excluded: {}", err);
                    continue;
                }
            },
        };
        let slot = Slot::primary(alt);
        goals.push(Goal::new(slot, target, alt_tolerance, piece_scale, &offset));
    }

    Ok(goals)
}
