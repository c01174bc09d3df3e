/// View state and the rotation/fit transforms built from it
use nalgebra::{Matrix4, Point3, Vector3};

use crate::config::ViewerConfig;
use crate::geometry::Mesh;

/// Extents below this are treated as a single point when fitting
const MIN_FIT_EXTENT: f32 = 1e-6;

/// Per-viewer camera state: rotation (radians), zoom and pivot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub angle_x: f32,
    pub angle_y: f32,
    pub zoom: f32,
    pub center: Point3<f32>,
    pub auto_rotate: bool,
}

impl ViewState {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            angle_x: config.default_angle_x,
            angle_y: config.default_angle_y,
            zoom: config.default_zoom,
            center: Point3::origin(),
            auto_rotate: false,
        }
    }

    /// Rotate by delta amounts (in radians)
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.angle_x += dx;
        self.angle_y += dy;
    }

    pub fn zoom_by(&mut self, factor: f32) {
        self.zoom *= factor;
    }

    pub fn apply_fit(&mut self, fit: Fit) {
        self.center = fit.center;
        if let Some(zoom) = fit.zoom {
            self.zoom = zoom;
        }
    }

    /// Default angles, no auto-rotate. Center and zoom are left for a refit.
    pub fn reset_angles(&mut self, config: &ViewerConfig) {
        self.angle_x = config.default_angle_x;
        self.angle_y = config.default_angle_y;
        self.auto_rotate = false;
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(&ViewerConfig::default())
    }
}

/// Result of fitting a mesh into a viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    pub center: Point3<f32>,
    /// `None` when the mesh has no usable extent
    pub zoom: Option<f32>,
}

/// Center on the bounding box and scale its larger side to a share of the
/// shorter viewport side. Empty meshes yield `None`.
pub fn fit_to_view(mesh: &Mesh, width: u32, height: u32, config: &ViewerConfig) -> Option<Fit> {
    let bounds = mesh.bounds()?;
    let size = bounds.size();
    let extent = size.x.max(size.y);
    let short_side = width.min(height) as f32;

    let zoom = if extent.is_finite() && extent > MIN_FIT_EXTENT {
        Some(config.fit_fraction * short_side / extent * config.fit_damping)
    } else {
        None
    };

    Some(Fit {
        center: bounds.center(),
        zoom,
    })
}

/// Transform builder for view rotations
pub struct Transform;

impl Transform {
    /// Rotation about X by `angle_x`, then about Y by `angle_y`
    pub fn rotation_matrix(angle_x: f32, angle_y: f32) -> Matrix4<f32> {
        let rx = Matrix4::new_rotation(Vector3::new(angle_x, 0.0, 0.0));
        let ry = Matrix4::new_rotation(Vector3::new(0.0, angle_y, 0.0));

        // Column vectors: the rightmost matrix applies first
        ry * rx
    }

    /// Undo `rotation_matrix`: about Y by `-angle_y`, then about X by `-angle_x`
    pub fn inverse_rotation_matrix(angle_x: f32, angle_y: f32) -> Matrix4<f32> {
        let rx = Matrix4::new_rotation(Vector3::new(-angle_x, 0.0, 0.0));
        let ry = Matrix4::new_rotation(Vector3::new(0.0, -angle_y, 0.0));

        rx * ry
    }

    pub fn view_rotation(view: &ViewState) -> Matrix4<f32> {
        Self::rotation_matrix(view.angle_x, view.angle_y)
    }
}
