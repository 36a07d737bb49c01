//! Center/centroid sampling and the facing frame built from it.

use snapfit_math::{Point3, Transform, Vec3};

use crate::error::{GeomError, Result};

/// Minimum center-to-centroid distance for a usable facing direction.
pub const FRAME_EPSILON: f64 = 1e-6;

/// Bounding-box center and vertex centroid of a vertex stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeSample {
    /// Midpoint of the axis-aligned bounds.
    pub center: Point3,
    /// Arithmetic mean of all vertices.
    pub centroid: Point3,
    /// Number of vertices sampled. Zero means the geometry is not loaded yet.
    pub vertex_count: usize,
}

impl ShapeSample {
    /// Whether any vertices were sampled.
    pub fn is_available(&self) -> bool {
        self.vertex_count > 0
    }

    /// Map center and centroid through `transform`.
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self {
            center: transform.apply_point(&self.center),
            centroid: transform.apply_point(&self.centroid),
            vertex_count: self.vertex_count,
        }
    }

    /// Facing frame of this sample, see [`build_facing_frame`].
    pub fn facing_frame(&self, reference_up: &Vec3) -> Result<Transform> {
        build_facing_frame(&self.center, &self.centroid, reference_up)
    }
}

/// Running bounds and sum over a vertex stream.
///
/// Holds no buffers, so a scene can push vertices from a visitor without
/// collecting them first.
#[derive(Debug, Clone, Copy)]
pub struct ShapeAccumulator {
    min: Point3,
    max: Point3,
    sum: Vec3,
    count: usize,
}

impl ShapeAccumulator {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self {
            min: Point3::new(f64::MAX, f64::MAX, f64::MAX),
            max: Point3::new(f64::MIN, f64::MIN, f64::MIN),
            sum: Vec3::zeros(),
            count: 0,
        }
    }

    /// Add one vertex.
    pub fn add(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
        self.sum += p.coords;
        self.count += 1;
    }

    /// Vertices added so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Center and centroid of everything added. Both are the origin when
    /// nothing was added.
    pub fn finish(&self) -> ShapeSample {
        if self.count == 0 {
            return ShapeSample {
                center: Point3::origin(),
                centroid: Point3::origin(),
                vertex_count: 0,
            };
        }
        ShapeSample {
            center: box_center(&self.min, &self.max),
            centroid: Point3::from(self.sum / self.count as f64),
            vertex_count: self.count,
        }
    }
}

impl Default for ShapeAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

fn box_center(min: &Point3, max: &Point3) -> Point3 {
    min + (max - min) * 0.5
}

/// Sample center and centroid of a point stream.
pub fn sample_points<I>(points: I) -> ShapeSample
where
    I: IntoIterator<Item = Point3>,
{
    let mut acc = ShapeAccumulator::new();
    for p in points {
        acc.add(&p);
    }
    acc.finish()
}

/// Orthonormal, right-handed frame at `center` facing `centroid`.
///
/// The forward direction (center toward centroid) is the frame's local -Z
/// axis, local +Y is `reference_up` re-orthogonalized against it. A shape
/// whose centroid coincides with its box center has no facing direction and
/// yields [`GeomError::DegenerateFrame`]; such shapes cannot be aligned by
/// this method.
pub fn build_facing_frame(
    center: &Point3,
    centroid: &Point3,
    reference_up: &Vec3,
) -> Result<Transform> {
    let separation = (centroid - center).norm();
    if !separation.is_finite() || separation < FRAME_EPSILON {
        return Err(GeomError::DegenerateFrame { separation });
    }
    Ok(Transform::look_at(center, centroid, reference_up))
}
