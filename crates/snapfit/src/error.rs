//! Error types for the goal engine.

use snapfit_geom::GeomError;
use thiserror::Error;

use crate::scene::ObjectId;

/// Errors that can occur while building goals or driving pieces.
///
/// None of these are fatal: goal construction drops the offending candidate
/// and registration calls report the error to the host.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapError {
    /// Mesh has no sampled vertices yet; retry on a later grab.
    #[error("geometry of {object:?} is not available yet")]
    GeometryUnavailable {
        /// Object whose vertex stream was empty.
        object: ObjectId,
    },

    /// Shape has no facing direction (center and centroid coincide).
    #[error("facing frame of {object:?} is degenerate")]
    DegenerateFrame {
        /// Object whose frame could not be built.
        object: ObjectId,
        /// Underlying geometry error.
        #[source]
        source: GeomError,
    },

    /// Transform cannot be inverted (zero scale on some axis).
    #[error("transform of {object:?} is singular")]
    SingularTransform {
        /// Object owning the transform.
        object: ObjectId,
    },

    /// Operation on a piece without a registry entry.
    #[error("piece {0:?} is not registered")]
    UnregisteredPiece(ObjectId),

    /// Object handle not known to the scene.
    #[error("object {0:?} is not in the scene")]
    UnknownObject(ObjectId),

    /// Malformed tolerance or pose configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, SnapError>;
