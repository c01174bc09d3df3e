/// Geometry primitives for mesh viewing
use nalgebra::{Point3, Vector3};

/// A model-space vertex position
pub type Vertex = Point3<f32>;

/// A triangle face defined by three vertices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Unit face normal from the triangle's vertices.
    ///
    /// Degenerate triangles have a zero-length cross product; the length is
    /// taken as 1 so the result is the zero vector rather than NaN.
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let v0 = self.vertices[0];
        let v1 = self.vertices[1];
        let v2 = self.vertices[2];

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        let normal = edge1.cross(&edge2);
        let len = normal.norm();
        if len == 0.0 {
            normal
        } else {
            normal / len
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Bounds {
    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }
}

/// A triangle mesh in parse order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Bounding box over every vertex, `None` for an empty mesh
    pub fn bounds(&self) -> Option<Bounds> {
        let mut vertices = self.triangles.iter().flat_map(|t| t.vertices.iter());
        let first = *vertices.next()?;
        let mut bounds = Bounds {
            min: first,
            max: first,
        };
        for v in vertices {
            bounds.min = bounds.min.inf(v);
            bounds.max = bounds.max.sup(v);
        }
        Some(bounds)
    }

    /// A cube centered on the origin, used as the demo model
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        let p = |x: f32, y: f32, z: f32| Point3::new(x * h, y * h, z * h);
        let mut mesh = Self::with_capacity(12);

        // (a, b, c, d) in counter-clockwise order seen from outside
        let faces = [
            [p(-1.0, -1.0, 1.0), p(1.0, -1.0, 1.0), p(1.0, 1.0, 1.0), p(-1.0, 1.0, 1.0)],
            [p(1.0, -1.0, -1.0), p(-1.0, -1.0, -1.0), p(-1.0, 1.0, -1.0), p(1.0, 1.0, -1.0)],
            [p(-1.0, 1.0, 1.0), p(1.0, 1.0, 1.0), p(1.0, 1.0, -1.0), p(-1.0, 1.0, -1.0)],
            [p(-1.0, -1.0, -1.0), p(1.0, -1.0, -1.0), p(1.0, -1.0, 1.0), p(-1.0, -1.0, 1.0)],
            [p(1.0, -1.0, 1.0), p(1.0, -1.0, -1.0), p(1.0, 1.0, -1.0), p(1.0, 1.0, 1.0)],
            [p(-1.0, -1.0, -1.0), p(-1.0, -1.0, 1.0), p(-1.0, 1.0, 1.0), p(-1.0, 1.0, -1.0)],
        ];
        for [a, b, c, d] in faces {
            mesh.add_triangle(Triangle::new(a, b, c));
            mesh.add_triangle(Triangle::new(a, c, d));
        }

        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_of_xy_triangle() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let n = tri.calculate_normal();
        assert!((n - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-6);
    }

    #[test]
    fn test_degenerate_normal_is_zero_not_nan() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let n = Triangle::new(p, p, p).calculate_normal();
        assert_eq!(n, Vector3::zeros());
    }

    #[test]
    fn test_bounds() {
        assert!(Mesh::new().bounds().is_none());

        let cube = Mesh::cube(2.0);
        assert_eq!(cube.len(), 12);
        let bounds = cube.bounds().unwrap();
        assert_eq!(bounds.min, Point3::new(-1.0, -1.0, -1.0));
        assert_eq!(bounds.max, Point3::new(1.0, 1.0, 1.0));
        assert_eq!(bounds.center(), Point3::origin());
    }

    #[test]
    fn test_cube_normals_point_outward() {
        for tri in &Mesh::cube(2.0).triangles {
            let centroid = (tri.vertices[0].coords + tri.vertices[1].coords + tri.vertices[2].coords) / 3.0;
            assert!(tri.calculate_normal().dot(&centroid) > 0.0);
        }
    }
}
