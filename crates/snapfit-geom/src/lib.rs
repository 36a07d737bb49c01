#![warn(missing_docs)]

//! Shape analysis for the snapfit goal engine.
//!
//! Reduces a mesh's vertex stream to its bounding-box center and vertex
//! centroid, and builds a "facing frame" from the two: an orthonormal frame
//! at the center whose forward axis points toward the centroid. Two
//! congruent meshes placed differently in the scene yield facing frames that
//! differ by exactly their relative placement, which is what lets one piece
//! take over another piece's goal slot.
//!
//! # Example
//!
//! ```
//! use snapfit_geom::{sample_points, Mesh};
//! use snapfit_math::Vec3;
//!
//! let mesh = Mesh::wedge(1.0, 1.0, 0.2);
//! let sample = sample_points(mesh.points());
//! let frame = sample.facing_frame(&Vec3::y()).unwrap();
//! assert_eq!(sample.vertex_count, 6);
//! assert!((frame.column(2).norm() - 1.0).abs() < 1e-12);
//! ```

pub mod error;
pub mod frame;
pub mod mesh;

pub use error::{GeomError, Result};
pub use frame::{build_facing_frame, sample_points, ShapeAccumulator, ShapeSample, FRAME_EPSILON};
pub use mesh::Mesh;
