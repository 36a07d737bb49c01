#![warn(missing_docs)]

//! Pose math for the snapfit goal engine.
//!
//! Thin wrappers around nalgebra providing the types the engine passes
//! around: points, vectors, unit quaternions, 4x4 affine transforms,
//! position/orientation/scale poses and snap tolerances.

use nalgebra::{Matrix4, Rotation3, UnitQuaternion, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit quaternion orientation.
pub type Quat = UnitQuaternion<f64>;

/// Threshold below which lengths and scale factors are treated as zero.
pub const EPSILON: f64 = 1e-9;

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Build `T * R * S` from a position, orientation and per-axis scale.
    pub fn compose(position: &Point3, orientation: &Quat, scale: &Vec3) -> Self {
        let mut m = orientation.to_homogeneous();
        for col in 0..3 {
            for row in 0..3 {
                m[(row, col)] *= scale[col];
            }
        }
        m[(0, 3)] = position.x;
        m[(1, 3)] = position.y;
        m[(2, 3)] = position.z;
        Self { matrix: m }
    }

    /// Split into position, orientation and per-axis scale.
    ///
    /// Exact for matrices built by [`Transform::compose`]. When non-uniform
    /// scale is combined with a rotation further up the chain the upper 3x3
    /// carries shear; the returned orientation is then the rotation nearest
    /// to the normalized columns and the round trip is approximate. The
    /// orientation is always a unit quaternion. A zero scale axis yields the
    /// identity orientation.
    pub fn decompose(&self) -> (Point3, Quat, Vec3) {
        let m = &self.matrix;
        let mut sx = self.column(0).norm();
        let sy = self.column(1).norm();
        let sz = self.column(2).norm();

        if m.fixed_view::<3, 3>(0, 0).determinant() < 0.0 {
            sx = -sx;
        }

        let position = self.translation_part();
        let scale = Vec3::new(sx, sy, sz);

        if sx.abs() < EPSILON || sy.abs() < EPSILON || sz.abs() < EPSILON {
            return (position, Quat::identity(), scale);
        }

        let mut r = m.fixed_view::<3, 3>(0, 0).into_owned();
        for col in 0..3 {
            let inv = 1.0 / scale[col];
            for row in 0..3 {
                r[(row, col)] *= inv;
            }
        }
        // exact for orthonormal columns, then refined towards the nearest
        // rotation when shear is present
        let guess = Quat::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r));
        let guess = Quat::new_normalize(guess.into_inner());
        let orientation = Quat::from_matrix_eps(&r, EPSILON, 64, guess);

        (position, orientation, scale)
    }

    /// Rotation-only frame at `eye` whose local -Z axis points at `target`.
    ///
    /// The local +Y axis is `up` re-orthogonalized against the viewing
    /// direction. When `up` is parallel to the viewing direction the
    /// direction is nudged off-axis so a frame can still be built; when
    /// `eye == target` the viewing axis falls back to +Z. Callers that need
    /// a meaningful direction must reject coincident points themselves.
    pub fn look_at(eye: &Point3, target: &Point3, up: &Vec3) -> Self {
        let mut z = eye - target;
        if z.norm_squared() < EPSILON * EPSILON {
            z = Vec3::z();
        }
        z.normalize_mut();

        let up = if up.norm_squared() < EPSILON * EPSILON {
            Vec3::y()
        } else {
            up.normalize()
        };

        let mut x = up.cross(&z);
        if x.norm_squared() < EPSILON * EPSILON {
            if (up.z.abs() - 1.0).abs() < EPSILON {
                z.x += 1e-4;
            } else {
                z.z += 1e-4;
            }
            z.normalize_mut();
            x = up.cross(&z);
        }
        x.normalize_mut();
        let y = z.cross(&x);

        let mut m = Matrix4::identity();
        for row in 0..3 {
            m[(row, 0)] = x[row];
            m[(row, 1)] = y[row];
            m[(row, 2)] = z[row];
        }
        m[(0, 3)] = eye.x;
        m[(1, 3)] = eye.y;
        m[(2, 3)] = eye.z;
        Self { matrix: m }
    }

    /// Compose: `self` then `other` (self * other).
    ///
    /// Applying the result to a point applies `other` first.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        self.matrix.transform_point(p)
    }

    /// One of the three basis columns of the upper 3x3.
    pub fn column(&self, index: usize) -> Vec3 {
        Vec3::new(
            self.matrix[(0, index)],
            self.matrix[(1, index)],
            self.matrix[(2, index)],
        )
    }

    /// The translation column as a point.
    pub fn translation_part(&self) -> Point3 {
        Point3::new(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)])
    }

    /// Inverse of this transform, if it exists.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Position, orientation and per-axis scale of an object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Position.
    pub position: Point3,
    /// Orientation.
    pub orientation: Quat,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Pose {
    /// Origin, no rotation, unit scale.
    pub fn identity() -> Self {
        Self {
            position: Point3::origin(),
            orientation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }

    /// Pose with unit scale.
    pub fn new(position: Point3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }

    /// Unrotated pose at `(x, y, z)`.
    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z), Quat::identity())
    }

    /// Replace the scale.
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Compose into a transform.
    pub fn to_transform(&self) -> Transform {
        Transform::compose(&self.position, &self.orientation, &self.scale)
    }

    /// Decompose a transform.
    pub fn from_transform(transform: &Transform) -> Self {
        let (position, orientation, scale) = transform.decompose();
        Self {
            position,
            orientation,
            scale,
        }
    }

    /// Euclidean distance between positions.
    pub fn distance_to(&self, other: &Pose) -> f64 {
        (self.position - other.position).norm()
    }

    /// Shortest-arc angle between orientations, in degrees.
    pub fn angle_to_degrees(&self, other: &Pose) -> f64 {
        angle_between_degrees(&self.orientation, &other.orientation)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Shortest-arc angle between two orientations, in degrees.
///
/// Computed as `2 * acos(|dot(a, b)|)`, so `q` and `-q` compare equal and
/// the result is always within `[0, 180]`.
pub fn angle_between_degrees(a: &Quat, b: &Quat) -> f64 {
    let dot = a.coords.dot(&b.coords);
    (2.0 * dot.abs().clamp(-1.0, 1.0).acos()).to_degrees()
}

/// Orientation from Euler angles in degrees, applied in Y, X, Z order.
///
/// This is the rotation convention of authored goal rotations.
pub fn quat_from_euler_yxz_degrees(x: f64, y: f64, z: f64) -> Quat {
    Quat::from_axis_angle(&Vec3::y_axis(), y.to_radians())
        * Quat::from_axis_angle(&Vec3::x_axis(), x.to_radians())
        * Quat::from_axis_angle(&Vec3::z_axis(), z.to_radians())
}

/// How close a manipulator must come to a goal before the piece snaps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapTolerance {
    /// Linear distance tolerance in scene units.
    pub position: f64,
    /// Angular tolerance in degrees.
    pub angle_degrees: f64,
}

impl SnapTolerance {
    /// Default snap tolerances (0.05 scene units, 20 degrees).
    pub const DEFAULT: Self = Self {
        position: 0.05,
        angle_degrees: 20.0,
    };

    /// Create a tolerance pair.
    pub fn new(position: f64, angle_degrees: f64) -> Self {
        Self {
            position,
            angle_degrees,
        }
    }

    /// Both limits are strict: a distance equal to the tolerance does not match.
    pub fn accepts(&self, distance: f64, angle_degrees: f64) -> bool {
        distance < self.position && angle_degrees < self.angle_degrees
    }

    /// Check whether two poses are within tolerance of each other.
    pub fn accepts_poses(&self, a: &Pose, b: &Pose) -> bool {
        self.accepts(a.distance_to(b), a.angle_to_degrees(b))
    }

    /// `position >= 0` and `angle_degrees` within `[0, 180]`, both finite.
    pub fn is_valid(&self) -> bool {
        self.position.is_finite()
            && self.angle_degrees.is_finite()
            && self.position >= 0.0
            && (0.0..=180.0).contains(&self.angle_degrees)
    }
}

impl Default for SnapTolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}
