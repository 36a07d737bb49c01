//! Coordinator owning the registry and the active grab sessions.

use slotmap::SecondaryMap;
use snapfit_math::Pose;

use crate::error::{Result, SnapError};
use crate::events::EventSink;
use crate::goals::Goal;
use crate::machine::{self, SnapState, Transition};
use crate::registry::{PieceRegistry, PieceSpec, Slot};
use crate::scene::{ObjectId, Scene};
use crate::session::GrabSession;

/// Snap-fit goal engine.
///
/// Drive it with [`SnapEngine::grab_start`], one [`SnapEngine::tick`] per
/// frame and [`SnapEngine::grab_end`]. The engine holds no scene state of
/// its own; every call gets the scene and the event sink passed in.
#[derive(Debug, Default)]
pub struct SnapEngine {
    registry: PieceRegistry,
    sessions: SecondaryMap<ObjectId, GrabSession>,
}

impl SnapEngine {
    /// Create an engine with no pieces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update a piece.
    ///
    /// With a snap index the piece is snapped onto that goal straight away;
    /// otherwise it is snapped onto the first goal it already sits within
    /// tolerance of. On re-registration a piece whose slot is not the one
    /// this check picks is freed first. When the goals change, other pieces
    /// pinned to this piece's slots are freed too.
    pub fn register_piece<S, E>(
        &mut self,
        scene: &mut S,
        piece: ObjectId,
        spec: &PieceSpec,
        sink: &mut E,
    ) -> Result<()>
    where
        S: Scene + ?Sized,
        E: EventSink + ?Sized,
    {
        spec.validate()?;
        let current = scene.local_pose(piece).ok_or(SnapError::UnknownObject(piece))?;
        let initial = spec.snap_index.or_else(|| {
            spec.goals
                .iter()
                .position(|goal| spec.tolerance.accepts_poses(&current, goal))
        });

        let previous = self
            .registry
            .get(piece)
            .map(|record| (record.snapped_onto(), record.goals != spec.goals));
        if let Some((occupied, goals_changed)) = previous {
            if occupied.is_some() && occupied != initial.map(|index| Slot::new(piece, index)) {
                machine::force_free(scene, &mut self.registry, piece, sink);
            }
            if goals_changed {
                self.free_occupants(scene, piece, sink);
            }
        }

        self.registry.insert(piece, spec);
        self.registry.sync_ghost(scene, piece);

        if let Some(index) = initial {
            machine::force_snap(scene, &mut self.registry, piece, index, sink);
        }
        tracing::debug!("registered {:?} with {} goals", piece, spec.goals.len());
        Ok(())
    }

    /// Replace the alternates of a registered piece.
    ///
    /// Alternates need not be registered yet; they are only offered once
    /// they are.
    pub fn register_alternates(&mut self, piece: ObjectId, alternates: &[ObjectId]) -> Result<()> {
        if !self.registry.contains(piece) {
            return Err(SnapError::UnregisteredPiece(piece));
        }
        self.registry.set_alternates(piece, alternates);
        Ok(())
    }

    /// Forget a piece.
    ///
    /// Other pieces pinned to its goals are freed. The slot it occupied and
    /// its own ghost are shown again.
    pub fn unregister_piece<S, E>(&mut self, scene: &mut S, piece: ObjectId, sink: &mut E) -> bool
    where
        S: Scene + ?Sized,
        E: EventSink + ?Sized,
    {
        self.sessions.remove(piece);
        if !self.registry.contains(piece) {
            tracing::warn!("unregister of unknown piece {:?} ignored", piece);
            return false;
        }
        self.free_occupants(scene, piece, sink);

        let Some(record) = self.registry.remove(piece) else {
            return false;
        };
        if let Some(slot) = record.snapped_onto().filter(|slot| slot.owner != piece) {
            self.registry.sync_ghost(scene, slot.owner);
        }
        if let Some(ghost) = record.ghost {
            scene.set_visible(ghost, true);
        }
        tracing::debug!("unregistered {:?}", piece);
        true
    }

    /// Start carrying `piece` with `manipulator`. Returns the number of candidate goals.
    pub fn grab_start<S: Scene + ?Sized>(
        &mut self,
        scene: &mut S,
        piece: ObjectId,
        manipulator: ObjectId,
    ) -> Result<usize> {
        let session = GrabSession::start(scene, &mut self.registry, piece, manipulator)?;
        let count = session.goals().len();
        if let Some(old) = self.sessions.insert(piece, session) {
            tracing::debug!("{:?} re-grabbed, dropping session of {:?}", piece, old.manipulator());
        }
        tracing::debug!("{:?} grabbed by {:?} with {} goals", piece, manipulator, count);
        Ok(count)
    }

    /// Stop carrying `piece`. Ignored unless `manipulator` holds it.
    ///
    /// The snap state is kept.
    pub fn grab_end(&mut self, piece: ObjectId, manipulator: ObjectId) -> bool {
        match self.sessions.get(piece) {
            Some(session) if session.manipulator() == manipulator => {
                self.sessions.remove(piece);
                true
            }
            Some(_) => {
                tracing::debug!("release of {:?} by non-holder {:?} ignored", piece, manipulator);
                false
            }
            None => false,
        }
    }

    /// Evaluate every grabbed piece once. Returns the number of transitions.
    pub fn tick<S, E>(&mut self, scene: &mut S, sink: &mut E) -> usize
    where
        S: Scene + ?Sized,
        E: EventSink + ?Sized,
    {
        let mut transitions = 0;
        let registry = &mut self.registry;
        self.sessions.retain(|piece, session| match step(scene, registry, piece, session, sink) {
            Some(Transition::Stay) => true,
            Some(_) => {
                transitions += 1;
                true
            }
            None => false,
        });
        transitions
    }

    /// Evaluate one grabbed piece. `None` when the piece is not grabbed.
    pub fn evaluate<S, E>(
        &mut self,
        scene: &mut S,
        piece: ObjectId,
        sink: &mut E,
    ) -> Option<Transition>
    where
        S: Scene + ?Sized,
        E: EventSink + ?Sized,
    {
        let session = self.sessions.get(piece)?;
        let result = step(scene, &mut self.registry, piece, session, sink);
        if result.is_none() {
            self.sessions.remove(piece);
        }
        result
    }

    /// Snap a piece onto its own goal `goal_index`.
    ///
    /// No-op with a warning when the piece is unregistered or has no such goal.
    pub fn force_snap<S, E>(
        &mut self,
        scene: &mut S,
        piece: ObjectId,
        goal_index: usize,
        sink: &mut E,
    ) -> bool
    where
        S: Scene + ?Sized,
        E: EventSink + ?Sized,
    {
        machine::force_snap(scene, &mut self.registry, piece, goal_index, sink)
    }

    /// Release a piece from its slot. No-op with a warning when unregistered.
    pub fn force_free<S, E>(&mut self, scene: &mut S, piece: ObjectId, sink: &mut E) -> bool
    where
        S: Scene + ?Sized,
        E: EventSink + ?Sized,
    {
        machine::force_free(scene, &mut self.registry, piece, sink)
    }

    /// Snap state of a registered piece.
    pub fn state(&self, piece: ObjectId) -> Option<SnapState> {
        SnapState::of(&self.registry, piece)
    }

    /// Active session of a piece.
    pub fn session(&self, piece: ObjectId) -> Option<&GrabSession> {
        self.sessions.get(piece)
    }

    /// Candidate goals of a grabbed piece.
    pub fn goals(&self, piece: ObjectId) -> &[Goal] {
        self.sessions.get(piece).map_or(&[], |session| session.goals())
    }

    /// Whether a piece is currently held.
    pub fn is_grabbed(&self, piece: ObjectId) -> bool {
        self.sessions.contains_key(piece)
    }

    /// Registered pieces.
    pub fn registry(&self) -> &PieceRegistry {
        &self.registry
    }

    /// Free every other piece pinned to one of `owner`'s goals.
    fn free_occupants<S, E>(&mut self, scene: &mut S, owner: ObjectId, sink: &mut E)
    where
        S: Scene + ?Sized,
        E: EventSink + ?Sized,
    {
        for other in self.registry.occupants_of_owner(owner) {
            if other != owner {
                tracing::debug!("{:?} loses its slot on {:?}", other, owner);
                machine::force_free(scene, &mut self.registry, other, sink);
            }
        }
    }
}

/// Run the state machine for one session and carry the piece if it is free.
///
/// `None` when the manipulator is gone from the scene.
fn step<S, E>(
    scene: &mut S,
    registry: &mut PieceRegistry,
    piece: ObjectId,
    session: &GrabSession,
    sink: &mut E,
) -> Option<Transition>
where
    S: Scene + ?Sized,
    E: EventSink + ?Sized,
{
    let Some(manipulator_world) = scene.world_transform(session.manipulator()) else {
        tracing::warn!(
            "manipulator {:?} of {:?} left the scene, ending grab",
            session.manipulator(),
            piece
        );
        return None;
    };
    let manipulator = Pose::from_transform(&manipulator_world);
    let goals = session.goals();
    let transition = machine::evaluate(scene, registry, piece, goals, &manipulator, sink);
    if SnapState::of(registry, piece) == Some(SnapState::Free) {
        scene.set_local_pose(piece, session.follow_pose(&manipulator_world));
    }
    Some(transition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SnapEvent;
    use crate::scene::MemoryScene;
    use approx::assert_relative_eq;
    use snapfit_geom::Mesh;
    use snapfit_math::{angle_between_degrees, Point3, Quat, SnapTolerance};

    fn move_to(scene: &mut MemoryScene, id: ObjectId, x: f64, y: f64, z: f64) {
        scene.set_local_pose(id, Pose::from_translation(x, y, z));
    }

    fn wedge() -> Mesh {
        Mesh::wedge(0.3, 0.2, 0.1)
    }

    fn own(piece: ObjectId) -> Option<SnapState> {
        Some(SnapState::Snapped(Slot::primary(piece)))
    }

    #[test]
    fn test_end_to_end_snap_and_release() {
        let mut scene = MemoryScene::new();
        let piece = scene.insert_mesh("piece", Pose::from_translation(1.0, 0.0, 0.0), wedge());
        let hand = scene.insert("hand", Pose::from_translation(1.0, 0.0, 0.1));
        let mut engine = SnapEngine::new();
        let mut events = Vec::new();
        let spec = PieceSpec::new(Pose::identity()).with_tolerance(SnapTolerance::new(0.05, 20.0));
        engine.register_piece(&mut scene, piece, &spec, &mut events).unwrap();
        assert_eq!(engine.state(piece), Some(SnapState::Free));

        assert_eq!(engine.grab_start(&mut scene, piece, hand).unwrap(), 1);

        // approach: still outside tolerance, piece follows
        move_to(&mut scene, hand, 0.5, 0.0, 0.1);
        assert_eq!(engine.tick(&mut scene, &mut events), 0);
        assert_relative_eq!(
            scene.local_pose(piece).unwrap().position,
            Point3::new(0.5, 0.0, 0.0),
            epsilon = 1e-12
        );

        // within 0.05 of the goal-hand pose (0, 0, 0.1)
        move_to(&mut scene, hand, 0.03, 0.0, 0.1);
        assert_eq!(engine.tick(&mut scene, &mut events), 1);
        assert_eq!(engine.state(piece), own(piece));
        assert_eq!(
            events,
            vec![SnapEvent::Snapped {
                piece,
                slot: Slot::primary(piece)
            }]
        );
        let pose = scene.local_pose(piece).unwrap();
        assert_relative_eq!(pose.position, Point3::origin(), epsilon = 1e-12);
        assert!(angle_between_degrees(&pose.orientation, &Quat::identity()) < 1e-6);

        // 0.2 away: free again, piece rigidly follows with the frozen offset
        move_to(&mut scene, hand, 0.2, 0.0, 0.1);
        assert_eq!(engine.tick(&mut scene, &mut events), 1);
        assert_eq!(engine.state(piece), Some(SnapState::Free));
        assert_eq!(events[1], SnapEvent::Freed { piece });
        assert_relative_eq!(
            scene.local_pose(piece).unwrap().position,
            Point3::new(0.2, 0.0, 0.0),
            epsilon = 1e-12
        );

        assert!(engine.grab_end(piece, hand));
        assert!(!engine.is_grabbed(piece));
    }

    #[test]
    fn test_registration_snaps_piece_already_in_place() {
        let mut scene = MemoryScene::new();
        let piece = scene.insert("piece", Pose::from_translation(0.01, 0.0, 0.0));
        let ghost = scene.spawn_ghost(piece, &Pose::identity()).unwrap();
        let mut engine = SnapEngine::new();
        let mut events = Vec::new();
        let spec = PieceSpec::new(Pose::identity()).with_ghost(ghost);
        engine.register_piece(&mut scene, piece, &spec, &mut events).unwrap();

        assert_eq!(engine.state(piece), own(piece));
        assert_eq!(
            events,
            vec![SnapEvent::Snapped {
                piece,
                slot: Slot::primary(piece)
            }]
        );
        assert_eq!(scene.local_pose(piece).unwrap().position, Point3::origin());
        assert_eq!(scene.is_visible(ghost), Some(false));

        // registering again with the same goal does not repeat the notification
        engine.register_piece(&mut scene, piece, &spec, &mut events).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(engine.state(piece), own(piece));
        assert_eq!(scene.is_visible(ghost), Some(false));
    }

    #[test]
    fn test_reregistration_with_moved_goal_frees_piece() {
        let mut scene = MemoryScene::new();
        let piece = scene.insert("piece", Pose::identity());
        let ghost = scene.spawn_ghost(piece, &Pose::identity()).unwrap();
        let mut engine = SnapEngine::new();
        let mut events = Vec::new();
        let spec = PieceSpec::new(Pose::identity()).with_ghost(ghost);
        engine.register_piece(&mut scene, piece, &spec, &mut events).unwrap();
        assert_eq!(engine.state(piece), own(piece));

        let moved = PieceSpec::new(Pose::from_translation(5.0, 0.0, 0.0)).with_ghost(ghost);
        engine.register_piece(&mut scene, piece, &moved, &mut events).unwrap();
        assert_eq!(engine.state(piece), Some(SnapState::Free));
        assert_eq!(scene.is_visible(ghost), Some(true));
        assert_eq!(events.last(), Some(&SnapEvent::Freed { piece }));
        assert_eq!(events.len(), 2);
        // freeing leaves the pose where it was
        assert_eq!(scene.local_pose(piece).unwrap().position, Point3::origin());

        // back in place, then a goal moved by less than the tolerance
        // re-pins without events
        let nudged = PieceSpec::new(Pose::from_translation(0.01, 0.0, 0.0));
        engine.register_piece(&mut scene, piece, &spec, &mut events).unwrap();
        engine.register_piece(&mut scene, piece, &nudged, &mut events).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(engine.state(piece), own(piece));
        assert_eq!(
            scene.local_pose(piece).unwrap().position,
            Point3::new(0.01, 0.0, 0.0)
        );
    }

    #[test]
    fn test_reregistration_with_moved_goal_frees_occupants() {
        let mut scene = MemoryScene::new();
        let a = scene.insert("a", Pose::from_translation(5.0, 0.0, 0.0));
        let b = scene.insert("b", Pose::from_translation(-5.0, 0.0, 0.0));
        let mut engine = SnapEngine::new();
        let mut events = Vec::new();
        let a_spec = PieceSpec::new(Pose::identity());
        engine.register_piece(&mut scene, a, &a_spec, &mut events).unwrap();
        let b_spec = PieceSpec::new(Pose::identity());
        engine.register_piece(&mut scene, b, &b_spec, &mut events).unwrap();
        engine.registry.set_snapped_onto(a, Some(Slot::primary(b)));

        // same goals: a keeps b's slot
        engine.register_piece(&mut scene, b, &b_spec, &mut events).unwrap();
        assert_eq!(engine.state(a), Some(SnapState::Snapped(Slot::primary(b))));

        let moved = PieceSpec::new(Pose::from_translation(0.0, 3.0, 0.0));
        engine.register_piece(&mut scene, b, &moved, &mut events).unwrap();
        assert_eq!(engine.state(a), Some(SnapState::Free));
        assert_eq!(events, vec![SnapEvent::Freed { piece: a }]);
    }

    #[test]
    fn test_registration_away_from_goal_stays_free_with_ghost_shown() {
        let mut scene = MemoryScene::new();
        let piece = scene.insert("piece", Pose::from_translation(3.0, 0.0, 0.0));
        let ghost = scene.spawn_ghost(piece, &Pose::identity()).unwrap();
        scene.set_visible(ghost, false);
        let mut engine = SnapEngine::new();
        let spec = PieceSpec::new(Pose::identity()).with_ghost(ghost);
        engine.register_piece(&mut scene, piece, &spec, &mut Vec::new()).unwrap();
        assert_eq!(engine.state(piece), Some(SnapState::Free));
        assert_eq!(scene.is_visible(ghost), Some(true));
    }

    #[test]
    fn test_snap_index_applies_at_registration() {
        let mut scene = MemoryScene::new();
        let piece = scene.insert("piece", Pose::from_translation(3.0, 0.0, 0.0));
        let ghost = scene.spawn_ghost(piece, &Pose::identity()).unwrap();
        let mut engine = SnapEngine::new();
        let mut events = Vec::new();
        let spec = PieceSpec::new(Pose::identity())
            .with_goal(Pose::from_translation(0.0, 2.0, 0.0))
            .with_ghost(ghost)
            .with_snap_index(1);
        engine.register_piece(&mut scene, piece, &spec, &mut events).unwrap();

        let slot = Slot::new(piece, 1);
        assert_eq!(engine.state(piece), Some(SnapState::Snapped(slot)));
        assert_eq!(events, vec![SnapEvent::Snapped { piece, slot }]);
        assert_eq!(
            scene.local_pose(piece).unwrap().position,
            Point3::new(0.0, 2.0, 0.0)
        );
        // the ghost marks goal 0, which is still empty
        assert_eq!(scene.is_visible(ghost), Some(true));
    }

    #[test]
    fn test_registration_picks_first_accepting_goal() {
        let mut scene = MemoryScene::new();
        let piece = scene.insert("piece", Pose::from_translation(0.0, 2.01, 0.0));
        let mut engine = SnapEngine::new();
        let spec = PieceSpec::new(Pose::identity())
            .with_goal(Pose::from_translation(0.0, 2.0, 0.0));
        engine.register_piece(&mut scene, piece, &spec, &mut Vec::new()).unwrap();
        assert_eq!(engine.state(piece), Some(SnapState::Snapped(Slot::new(piece, 1))));
    }

    #[test]
    fn test_grab_snaps_onto_secondary_goal() {
        let mut scene = MemoryScene::new();
        let piece = scene.insert("piece", Pose::from_translation(1.0, 0.0, 0.0));
        let hand = scene.insert("hand", Pose::from_translation(1.0, 0.0, 0.1));
        let mut engine = SnapEngine::new();
        let mut events = Vec::new();
        let spec = PieceSpec::new(Pose::identity())
            .with_goal(Pose::from_translation(0.0, 0.0, -2.0));
        engine.register_piece(&mut scene, piece, &spec, &mut events).unwrap();
        assert_eq!(engine.grab_start(&mut scene, piece, hand).unwrap(), 2);

        move_to(&mut scene, hand, 0.0, 0.0, -1.9);
        engine.tick(&mut scene, &mut events);
        let slot = Slot::new(piece, 1);
        assert_eq!(engine.state(piece), Some(SnapState::Snapped(slot)));
        assert_eq!(engine.session(piece).unwrap().goal_index(slot), Some(1));
        assert_eq!(events, vec![SnapEvent::Snapped { piece, slot }]);

        assert!(engine.force_snap(&mut scene, piece, 0, &mut events));
        assert_eq!(engine.state(piece), own(piece));
        assert!(!engine.force_snap(&mut scene, piece, 2, &mut events));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_register_rejects_bad_input() {
        let mut scene = MemoryScene::new();
        let piece = scene.insert("piece", Pose::identity());
        let mut engine = SnapEngine::new();
        let bad = PieceSpec::new(Pose::identity()).with_tolerance(SnapTolerance::new(-1.0, 10.0));
        assert!(matches!(
            engine.register_piece(&mut scene, piece, &bad, &mut Vec::new()),
            Err(SnapError::InvalidConfig(_))
        ));
        let bad_index = PieceSpec::new(Pose::identity()).with_snap_index(3);
        assert!(matches!(
            engine.register_piece(&mut scene, piece, &bad_index, &mut Vec::new()),
            Err(SnapError::InvalidConfig(_))
        ));
        assert!(engine.registry().is_empty());

        scene.remove(piece);
        let good = PieceSpec::new(Pose::identity());
        assert_eq!(
            engine.register_piece(&mut scene, piece, &good, &mut Vec::new()),
            Err(SnapError::UnknownObject(piece))
        );
        assert_eq!(
            engine.register_alternates(piece, &[]),
            Err(SnapError::UnregisteredPiece(piece))
        );
    }

    #[test]
    fn test_force_snap_unregistered_is_noop() {
        let mut scene = MemoryScene::new();
        let piece = scene.insert("piece", Pose::from_translation(1.0, 2.0, 3.0));
        let mut engine = SnapEngine::new();
        let mut events = Vec::new();
        assert!(!engine.force_snap(&mut scene, piece, 0, &mut events));
        assert!(!engine.force_free(&mut scene, piece, &mut events));
        assert!(events.is_empty());
        assert_eq!(
            scene.local_pose(piece).unwrap().position,
            Point3::new(1.0, 2.0, 3.0)
        );
        assert_eq!(engine.state(piece), None);
    }

    #[test]
    fn test_grab_end_from_other_manipulator_is_ignored() {
        let mut scene = MemoryScene::new();
        let piece = scene.insert("piece", Pose::from_translation(1.0, 0.0, 0.0));
        let left = scene.insert("left", Pose::from_translation(1.0, 0.0, 0.1));
        let right = scene.insert("right", Pose::from_translation(-1.0, 0.0, 0.1));
        let mut engine = SnapEngine::new();
        let spec = PieceSpec::new(Pose::identity());
        engine.register_piece(&mut scene, piece, &spec, &mut Vec::new()).unwrap();
        engine.grab_start(&mut scene, piece, left).unwrap();

        assert!(!engine.grab_end(piece, right));
        assert!(engine.is_grabbed(piece));
        assert_eq!(engine.session(piece).unwrap().manipulator(), left);
        assert!(engine.grab_end(piece, left));
        assert!(!engine.grab_end(piece, left));
    }

    #[test]
    fn test_snap_state_survives_release() {
        let mut scene = MemoryScene::new();
        let piece = scene.insert("piece", Pose::from_translation(1.0, 0.0, 0.0));
        let hand = scene.insert("hand", Pose::from_translation(1.0, 0.0, 0.1));
        let mut engine = SnapEngine::new();
        let mut events = Vec::new();
        let spec = PieceSpec::new(Pose::identity());
        engine.register_piece(&mut scene, piece, &spec, &mut events).unwrap();
        engine.grab_start(&mut scene, piece, hand).unwrap();
        move_to(&mut scene, hand, 0.0, 0.0, 0.1);
        engine.tick(&mut scene, &mut events);
        engine.grab_end(piece, hand);

        // ticks without a session leave the piece alone
        move_to(&mut scene, hand, 5.0, 0.0, 0.0);
        assert_eq!(engine.tick(&mut scene, &mut events), 0);
        assert_eq!(engine.state(piece), own(piece));
        assert_eq!(scene.local_pose(piece).unwrap().position, Point3::origin());
        assert_eq!(engine.evaluate(&mut scene, piece, &mut events), None);
    }

    #[test]
    fn test_alternate_slot_end_to_end() {
        let mut scene = MemoryScene::new();
        let a = scene.insert_mesh("a", Pose::from_translation(2.0, 0.0, 0.0), wedge());
        let b = scene.insert("b", Pose::from_translation(-2.0, 0.0, 0.0));
        let hand = scene.insert("hand", Pose::from_translation(2.0, 0.0, 0.1));
        let mut engine = SnapEngine::new();
        let mut events = Vec::new();
        let a_spec = PieceSpec::new(Pose::identity());
        engine.register_piece(&mut scene, a, &a_spec, &mut events).unwrap();
        let b_spec = PieceSpec::new(Pose::from_translation(0.0, 1.0, 0.0));
        engine.register_piece(&mut scene, b, &b_spec, &mut events).unwrap();
        engine.register_alternates(a, &[b]).unwrap();

        // b's mesh has not streamed in yet
        assert_eq!(engine.grab_start(&mut scene, a, hand).unwrap(), 1);
        engine.grab_end(a, hand);

        scene.set_mesh(b, wedge());
        assert_eq!(engine.grab_start(&mut scene, a, hand).unwrap(), 2);
        assert_eq!(engine.goals(a)[1].slot, Slot::primary(b));

        move_to(&mut scene, hand, 0.0, 1.0, 0.1);
        engine.tick(&mut scene, &mut events);
        assert_eq!(engine.state(a), own(b));
        assert_eq!(
            events,
            vec![SnapEvent::Snapped {
                piece: a,
                slot: Slot::primary(b)
            }]
        );
        assert_relative_eq!(
            scene.local_pose(a).unwrap().position,
            Point3::new(0.0, 1.0, 0.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_unregister_restores_occupied_ghost() {
        let mut scene = MemoryScene::new();
        let a = scene.insert("a", Pose::from_translation(5.0, 0.0, 0.0));
        let b = scene.insert("b", Pose::from_translation(-5.0, 0.0, 0.0));
        let ghost = scene.spawn_ghost(b, &Pose::identity()).unwrap();
        let mut engine = SnapEngine::new();
        let mut events = Vec::new();
        let a_spec = PieceSpec::new(Pose::identity());
        engine.register_piece(&mut scene, a, &a_spec, &mut events).unwrap();
        let b_spec = PieceSpec::new(Pose::identity()).with_ghost(ghost);
        engine.register_piece(&mut scene, b, &b_spec, &mut events).unwrap();
        // a occupies b's slot
        engine.registry.set_snapped_onto(a, Some(Slot::primary(b)));
        engine.registry.sync_ghost(&mut scene, b);
        assert_eq!(scene.is_visible(ghost), Some(false));

        assert!(engine.unregister_piece(&mut scene, a, &mut events));
        assert_eq!(scene.is_visible(ghost), Some(true));
        assert!(!engine.unregister_piece(&mut scene, a, &mut events));
        assert!(events.is_empty());
    }

    #[test]
    fn test_unregister_piece_in_own_slot_shows_its_ghost() {
        let mut scene = MemoryScene::new();
        let piece = scene.insert("piece", Pose::identity());
        let ghost = scene.spawn_ghost(piece, &Pose::identity()).unwrap();
        let mut engine = SnapEngine::new();
        let mut events = Vec::new();
        let spec = PieceSpec::new(Pose::identity()).with_ghost(ghost);
        engine.register_piece(&mut scene, piece, &spec, &mut events).unwrap();
        assert_eq!(scene.is_visible(ghost), Some(false));

        assert!(engine.unregister_piece(&mut scene, piece, &mut events));
        assert_eq!(scene.is_visible(ghost), Some(true));
        assert_eq!(engine.state(piece), None);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_unregister_frees_pieces_on_its_slots() {
        let mut scene = MemoryScene::new();
        let a = scene.insert("a", Pose::from_translation(5.0, 0.0, 0.0));
        let b = scene.insert("b", Pose::from_translation(-5.0, 0.0, 0.0));
        let ghost = scene.spawn_ghost(b, &Pose::identity()).unwrap();
        let mut engine = SnapEngine::new();
        let mut events = Vec::new();
        let a_spec = PieceSpec::new(Pose::identity());
        engine.register_piece(&mut scene, a, &a_spec, &mut events).unwrap();
        let b_spec = PieceSpec::new(Pose::identity()).with_ghost(ghost);
        engine.register_piece(&mut scene, b, &b_spec, &mut events).unwrap();
        engine.registry.set_snapped_onto(a, Some(Slot::primary(b)));
        engine.registry.sync_ghost(&mut scene, b);

        assert!(engine.unregister_piece(&mut scene, b, &mut events));
        assert_eq!(engine.state(a), Some(SnapState::Free));
        assert_eq!(events, vec![SnapEvent::Freed { piece: a }]);
        assert_eq!(scene.is_visible(ghost), Some(true));
        assert!(engine.registry().occupants_of_owner(b).is_empty());
    }

    #[test]
    fn test_vanished_manipulator_ends_grab() {
        let mut scene = MemoryScene::new();
        let piece = scene.insert("piece", Pose::from_translation(1.0, 0.0, 0.0));
        let hand = scene.insert("hand", Pose::from_translation(1.0, 0.0, 0.1));
        let mut engine = SnapEngine::new();
        let spec = PieceSpec::new(Pose::identity());
        engine.register_piece(&mut scene, piece, &spec, &mut Vec::new()).unwrap();
        engine.grab_start(&mut scene, piece, hand).unwrap();
        scene.remove(hand);
        assert_eq!(engine.tick(&mut scene, &mut Vec::new()), 0);
        assert!(!engine.is_grabbed(piece));
    }
}
