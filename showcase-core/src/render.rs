/// Flat-shaded painter's-algorithm renderer over an abstract 2D surface
use nalgebra::{Point2, Vector3};

use crate::geometry::{Mesh, Triangle};
use crate::projection::project_all;
use crate::transform::ViewState;

/// Fixed light direction, deliberately left unnormalized
pub const LIGHT_DIRECTION: Vector3<f32> = Vector3::new(0.2, -0.6, 1.0);

const BASE_LIGHTNESS: f32 = 30.0;
const LIGHTNESS_RANGE: f32 = 70.0;

/// Uniform fill tone for one triangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shade {
    /// HSL lightness in percent. May exceed 100 for faces facing the light.
    Grey { lightness: f32 },
    /// Solid white, used for overlay text
    White,
}

impl Shade {
    pub fn from_brightness(brightness: f32) -> Self {
        Shade::Grey {
            lightness: BASE_LIGHTNESS + brightness * LIGHTNESS_RANGE,
        }
    }

    /// Lightness clamped to 0..=100
    pub fn lightness(&self) -> f32 {
        match self {
            Shade::Grey { lightness } => lightness.clamp(0.0, 100.0),
            Shade::White => 100.0,
        }
    }

    pub fn to_rgb(&self) -> (u8, u8, u8) {
        let level = (self.lightness() / 100.0 * 255.0).round() as u8;
        (level, level, level)
    }

    /// CSS color string for canvas-style surfaces
    pub fn to_css(&self) -> String {
        match self {
            Shade::Grey { lightness } => format!("hsl(0, 0%, {lightness}%)"),
            Shade::White => "#fff".to_string(),
        }
    }
}

/// A 2D raster target: the host's canvas, terminal buffer, ...
pub trait DrawSurface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn clear(&mut self);
    fn fill_triangle(&mut self, points: [Point2<f32>; 3], shade: Shade);
    fn fill_text(&mut self, text: &str, x: f32, y: f32, shade: Shade);
}

/// A projected triangle ready to fill
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadedTriangle {
    pub points: [Point2<f32>; 3],
    /// Mean of the three projected depths
    pub depth: f32,
    pub shade: Shade,
}

/// Lambertian brightness of a face under `LIGHT_DIRECTION`, from its
/// model-space normal
pub fn face_brightness(triangle: &Triangle) -> f32 {
    triangle.calculate_normal().dot(&LIGHT_DIRECTION).max(0.0)
}

/// Project, shade and depth-sort every triangle, back to front.
///
/// The sort is stable and uses a total order, so equal or NaN depths keep a
/// fixed relative order from frame to frame.
pub fn plan_frame(mesh: &Mesh, view: &ViewState, width: u32, height: u32) -> Vec<ShadedTriangle> {
    let projected = project_all(
        mesh.triangles.iter().flat_map(|t| t.vertices.iter()),
        view,
        width,
        height,
    );

    let mut polys: Vec<ShadedTriangle> = mesh
        .triangles
        .iter()
        .zip(projected.chunks_exact(3))
        .map(|(triangle, p)| ShadedTriangle {
            points: [p[0].point(), p[1].point(), p[2].point()],
            depth: (p[0].depth + p[1].depth + p[2].depth) / 3.0,
            shade: Shade::from_brightness(face_brightness(triangle)),
        })
        .collect();

    polys.sort_by(|a, b| a.depth.total_cmp(&b.depth));
    polys
}

/// Clear the surface and paint the mesh back to front. No depth buffer:
/// later triangles simply cover earlier ones.
pub fn render<S: DrawSurface + ?Sized>(mesh: &Mesh, view: &ViewState, surface: &mut S) {
    let frame = plan_frame(mesh, view, surface.width(), surface.height());
    surface.clear();
    for poly in &frame {
        surface.fill_triangle(poly.points, poly.shade);
    }
}
