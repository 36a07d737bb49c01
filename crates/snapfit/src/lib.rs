#![warn(missing_docs)]

//! Snap-fit goal engine.
//!
//! A manipulator (a tracked hand or controller) picks up a rigid piece and
//! guides it toward its goal. While held, the piece follows the manipulator
//! rigidly; once the manipulator comes within tolerance of the pose that
//! would hold the piece exactly at a goal, the piece snaps there and stays
//! pinned until the manipulator moves away again.
//!
//! A piece may author several goals; the first is its primary slot, marked
//! by an optional ghost visual. Pieces can also list interchangeable
//! alternates. The goal of a piece on an alternate's primary slot is not
//! authored but derived from the two meshes, see [`resolver`].
//!
//! # Example
//!
//! ```
//! use snapfit::{MemoryScene, PieceSpec, Slot, SnapEngine, SnapEvent, SnapState};
//! use snapfit_math::Pose;
//!
//! let mut scene = MemoryScene::new();
//! let lid = scene.insert("lid", Pose::from_translation(1.0, 0.0, 0.0));
//! let hand = scene.insert("hand", Pose::from_translation(1.0, 0.0, 0.1));
//!
//! let mut engine = SnapEngine::new();
//! let mut events: Vec<SnapEvent> = Vec::new();
//! let spec = PieceSpec::new(Pose::identity());
//! engine.register_piece(&mut scene, lid, &spec, &mut events)?;
//! engine.grab_start(&mut scene, lid, hand)?;
//!
//! // bring the hand to where it would hold the lid at its goal
//! use snapfit::Scene;
//! scene.set_local_pose(hand, Pose::from_translation(0.0, 0.0, 0.1));
//! engine.tick(&mut scene, &mut events);
//!
//! assert_eq!(engine.state(lid), Some(SnapState::Snapped(Slot::primary(lid))));
//! assert_eq!(events.len(), 1);
//! # Ok::<(), snapfit::SnapError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod goals;
pub mod machine;
pub mod registry;
pub mod resolver;
pub mod scene;
pub mod session;

pub use config::PieceConfig;
pub use engine::SnapEngine;
pub use error::{Result, SnapError};
pub use events::{EventSink, NullSink, SnapEvent};
pub use goals::{build_goals, Goal};
pub use machine::{SnapState, Transition};
pub use registry::{AlternateSlot, PieceRecord, PieceRegistry, PieceSpec, Resolution, Slot};
pub use resolver::{resolve_alternate_goal, sample_shape, world_shape, WorldShape};
pub use scene::{MemoryScene, ObjectId, Scene, SceneNode};
pub use session::GrabSession;
