//! Vertex buffers as handed over by the host renderer.

use snapfit_math::Point3;

use crate::error::{GeomError, Result};

/// Triangle mesh in the object's local space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Flat array of vertex positions: `[x0, y0, z0, x1, y1, z1, ...]` (f32).
    pub vertices: Vec<f32>,
    /// Flat array of triangle indices: `[i0, i1, i2, ...]` (u32).
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Point cloud without triangles.
    pub fn from_points(points: &[Point3]) -> Self {
        let mut vertices = Vec::with_capacity(points.len() * 3);
        for p in points {
            vertices.extend_from_slice(&[p.x as f32, p.y as f32, p.z as f32]);
        }
        Self {
            vertices,
            indices: Vec::new(),
        }
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Vertex `i` as a point.
    pub fn point(&self, i: usize) -> Point3 {
        Point3::new(
            self.vertices[i * 3] as f64,
            self.vertices[i * 3 + 1] as f64,
            self.vertices[i * 3 + 2] as f64,
        )
    }

    /// Iterate vertex positions.
    pub fn points(&self) -> impl Iterator<Item = Point3> + '_ {
        (0..self.num_vertices()).map(move |i| self.point(i))
    }

    /// Check buffer lengths and index ranges.
    pub fn validate(&self) -> Result<()> {
        if self.vertices.len() % 3 != 0 {
            return Err(GeomError::InvalidMesh(format!(
                "vertex buffer length {} is not a multiple of 3",
                self.vertices.len()
            )));
        }
        if self.indices.len() % 3 != 0 {
            return Err(GeomError::InvalidMesh(format!(
                "index buffer length {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        let n = self.num_vertices();
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= n) {
            return Err(GeomError::InvalidMesh(format!(
                "index {bad} out of range for {n} vertices"
            )));
        }
        if self.vertices.iter().any(|v| !v.is_finite()) {
            return Err(GeomError::InvalidMesh("non-finite vertex position".into()));
        }
        Ok(())
    }

    /// Axis-aligned box of size `w x h x d` centered on the origin.
    pub fn cuboid(w: f64, h: f64, d: f64) -> Self {
        let (x, y, z) = ((w / 2.0) as f32, (h / 2.0) as f32, (d / 2.0) as f32);
        let vertices = vec![
            -x, -y, -z, x, -y, -z, x, y, -z, -x, y, -z,
            -x, -y, z, x, -y, z, x, y, z, -x, y, z,
        ];
        let indices = vec![
            0, 2, 1, 0, 3, 2,
            4, 5, 6, 4, 6, 7,
            0, 1, 5, 0, 5, 4,
            2, 3, 7, 2, 7, 6,
            0, 4, 7, 0, 7, 3,
            1, 2, 6, 1, 6, 5,
        ];
        Self { vertices, indices }
    }

    /// Right-triangle prism whose bounding box is `w x h x d` centered on the origin.
    ///
    /// The right angle sits at the `(-x, -y)` corner, so the vertex centroid
    /// lies at `(-w/6, -h/6, 0)`, off the box center. Handy as a shape with a
    /// well-defined facing direction.
    pub fn wedge(w: f64, h: f64, d: f64) -> Self {
        let (x, y, z) = ((w / 2.0) as f32, (h / 2.0) as f32, (d / 2.0) as f32);
        let vertices = vec![
            -x, -y, -z, x, -y, -z, -x, y, -z,
            -x, -y, z, x, -y, z, -x, y, z,
        ];
        let indices = vec![
            0, 2, 1,
            3, 4, 5,
            0, 1, 4, 0, 4, 3,
            0, 3, 5, 0, 5, 2,
            1, 2, 5, 1, 5, 4,
        ];
        Self { vertices, indices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_counts_and_extent() {
        let mesh = Mesh::cuboid(2.0, 4.0, 6.0);
        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(mesh.num_triangles(), 12);
        assert_eq!(mesh.point(0), Point3::new(-1.0, -2.0, -3.0));
        assert_eq!(mesh.point(6), Point3::new(1.0, 2.0, 3.0));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_wedge_is_valid() {
        let mesh = Mesh::wedge(1.0, 1.0, 1.0);
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_triangles(), 8);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_empty_mesh_has_no_points() {
        let mesh = Mesh::new();
        assert_eq!(mesh.points().count(), 0);
        assert_eq!(mesh.num_triangles(), 0);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_buffers() {
        let ragged = Mesh {
            vertices: vec![0.0, 1.0],
            indices: Vec::new(),
        };
        assert!(matches!(ragged.validate(), Err(GeomError::InvalidMesh(_))));

        let out_of_range = Mesh {
            vertices: vec![0.0; 9],
            indices: vec![0, 1, 3],
        };
        assert!(matches!(out_of_range.validate(), Err(GeomError::InvalidMesh(_))));

        let nan = Mesh {
            vertices: vec![0.0, f32::NAN, 0.0],
            indices: Vec::new(),
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_from_points() {
        let mesh = Mesh::from_points(&[Point3::new(1.0, 2.0, 3.0), Point3::new(-1.0, 0.0, 0.5)]);
        assert_eq!(mesh.num_vertices(), 2);
        assert_eq!(mesh.point(1), Point3::new(-1.0, 0.0, 0.5));
    }
}
