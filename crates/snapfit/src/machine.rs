//! Per-piece snap state machine.
//!
//! This is the only module that changes which slot a piece occupies. Every
//! change re-derives the ghost visibility of the slots involved, pins the
//! piece when it enters a slot and emits one event.

use snapfit_math::Pose;

use crate::events::{EventSink, SnapEvent};
use crate::goals::Goal;
use crate::registry::{PieceRegistry, Slot};
use crate::scene::{ObjectId, Scene};

/// Snap state of a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapState {
    /// Follows its manipulator.
    Free,
    /// Pinned to the given slot.
    Snapped(Slot),
}

impl SnapState {
    /// State stored in the registry for `piece`, `None` if unregistered.
    pub fn of(registry: &PieceRegistry, piece: ObjectId) -> Option<Self> {
        registry.get(piece).map(|record| match record.snapped_onto() {
            Some(slot) => SnapState::Snapped(slot),
            None => SnapState::Free,
        })
    }

    /// The occupied slot, if any.
    pub fn slot(&self) -> Option<Slot> {
        match *self {
            SnapState::Free => None,
            SnapState::Snapped(slot) => Some(slot),
        }
    }
}

/// Result of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed.
    Stay,
    /// The piece entered a slot.
    Snapped {
        /// Index of the matched goal in the session's goal list.
        goal_index: usize,
        /// Slot entered.
        slot: Slot,
        /// Slot left on the way, if the piece jumped between slots.
        previous: Option<Slot>,
    },
    /// The piece left its slot.
    Freed {
        /// Slot left.
        previous: Slot,
    },
}

/// Index of the first goal accepting a manipulator at `manipulator`.
///
/// Order decides, not distance: an earlier goal wins over a closer later one.
pub fn find_match(goals: &[Goal], manipulator: &Pose) -> Option<usize> {
    goals.iter().position(|goal| goal.matches(manipulator))
}

/// Transition from `state` for a manipulator at `manipulator`, without side effects.
pub fn plan(state: SnapState, goals: &[Goal], manipulator: &Pose) -> Transition {
    match (find_match(goals, manipulator), state) {
        (None, SnapState::Free) => Transition::Stay,
        (None, SnapState::Snapped(previous)) => Transition::Freed { previous },
        (Some(index), SnapState::Snapped(current)) if goals[index].slot == current => {
            Transition::Stay
        }
        (Some(goal_index), state) => Transition::Snapped {
            goal_index,
            slot: goals[goal_index].slot,
            previous: state.slot(),
        },
    }
}

/// Evaluate `piece` against its goals and apply the resulting transition.
///
/// Unregistered pieces never transition.
pub fn evaluate<S, E>(
    scene: &mut S,
    registry: &mut PieceRegistry,
    piece: ObjectId,
    goals: &[Goal],
    manipulator: &Pose,
    sink: &mut E,
) -> Transition
where
    S: Scene + ?Sized,
    E: EventSink + ?Sized,
{
    let Some(state) = SnapState::of(registry, piece) else {
        return Transition::Stay;
    };
    let transition = plan(state, goals, manipulator);
    match transition {
        Transition::Stay => {}
        Transition::Snapped { goal_index, slot, .. } => {
            occupy(scene, registry, piece, Some(slot));
            pin(scene, piece, &goals[goal_index].target);
            tracing::debug!("{:?} snapped onto {:?} (goal {})", piece, slot, goal_index);
            sink.emit(SnapEvent::Snapped { piece, slot });
        }
        Transition::Freed { previous } => {
            occupy(scene, registry, piece, None);
            tracing::debug!("{:?} freed from {:?}", piece, previous);
            sink.emit(SnapEvent::Freed { piece });
        }
    }
    transition
}

/// Snap `piece` onto its own goal `index` regardless of where it is.
///
/// The pose is pinned even when the piece already occupies that slot; the
/// event is only emitted on a state change. Returns `false` for an
/// unregistered piece or an index past its goal list.
pub fn force_snap<S, E>(
    scene: &mut S,
    registry: &mut PieceRegistry,
    piece: ObjectId,
    index: usize,
    sink: &mut E,
) -> bool
where
    S: Scene + ?Sized,
    E: EventSink + ?Sized,
{
    let Some(record) = registry.get(piece) else {
        tracing::warn!("force_snap on unregistered piece {:?} ignored", piece);
        return false;
    };
    let Some(goal) = record.goal(index).copied() else {
        tracing::warn!(
            "force_snap of {:?} to goal {} ignored, it has {} goals",
            piece,
            index,
            record.goals.len()
        );
        return false;
    };
    let slot = Slot::new(piece, index);
    let previous = occupy(scene, registry, piece, Some(slot));
    pin(scene, piece, &goal);
    if previous != Some(slot) {
        tracing::debug!("{:?} force-snapped onto its goal {}", piece, index);
        sink.emit(SnapEvent::Snapped { piece, slot });
    }
    true
}

/// Release `piece` from whatever slot it occupies. The pose is left as is.
///
/// Returns `false` for an unregistered piece.
pub fn force_free<S, E>(
    scene: &mut S,
    registry: &mut PieceRegistry,
    piece: ObjectId,
    sink: &mut E,
) -> bool
where
    S: Scene + ?Sized,
    E: EventSink + ?Sized,
{
    if !registry.contains(piece) {
        tracing::warn!("force_free on unregistered piece {:?} ignored", piece);
        return false;
    }
    if occupy(scene, registry, piece, None).is_some() {
        tracing::debug!("{:?} force-freed", piece);
        sink.emit(SnapEvent::Freed { piece });
    }
    true
}

/// Move `piece` into `slot` and re-derive the ghosts of the old and new owner.
fn occupy<S: Scene + ?Sized>(
    scene: &mut S,
    registry: &mut PieceRegistry,
    piece: ObjectId,
    slot: Option<Slot>,
) -> Option<Slot> {
    let previous = registry.set_snapped_onto(piece, slot);
    for changed in [previous, slot].into_iter().flatten() {
        registry.sync_ghost(scene, changed.owner);
    }
    previous
}

/// Set position and orientation exactly; the piece keeps its own scale.
fn pin<S: Scene + ?Sized>(scene: &mut S, piece: ObjectId, target: &Pose) {
    let scale = scene.local_pose(piece).map_or(target.scale, |pose| pose.scale);
    scene.set_local_pose(
        piece,
        Pose {
            position: target.position,
            orientation: target.orientation,
            scale,
        },
    );
}
