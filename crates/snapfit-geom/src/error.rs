//! Error types for shape analysis.

use thiserror::Error;

/// Errors that can occur while analysing mesh geometry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeomError {
    /// Center and centroid coincide, so the shape has no facing direction.
    #[error("facing frame is degenerate: center and centroid are {separation} apart")]
    DegenerateFrame {
        /// Distance between bounding-box center and centroid.
        separation: f64,
    },

    /// Mesh buffers are malformed.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
}

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, GeomError>;
