/// Orthographic projection from model space to the drawing surface
use nalgebra::{Matrix4, Point2, Point3, Vector3};

use crate::transform::{Transform, ViewState};

/// A vertex in screen space.
///
/// `depth` is the rotated, unscaled Z used for sorting only. Larger depth is
/// closer to the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub screen_x: f32,
    pub screen_y: f32,
    pub depth: f32,
}

impl Projected {
    pub fn point(&self) -> Point2<f32> {
        Point2::new(self.screen_x, self.screen_y)
    }
}

/// Project a model-space vertex to 2D screen space.
///
/// Centers on `view.center`, rotates about X then Y, scales by zoom and maps
/// the origin to the viewport center with screen Y growing downward. There is
/// no perspective divide.
pub fn project(vertex: &Point3<f32>, view: &ViewState, width: u32, height: u32) -> Projected {
    let rotation = Transform::view_rotation(view);
    project_with(vertex, view, &rotation, width, height)
}

/// Batch form of `project` that builds the rotation once
pub fn project_all<'a>(
    vertices: impl IntoIterator<Item = &'a Point3<f32>>,
    view: &ViewState,
    width: u32,
    height: u32,
) -> Vec<Projected> {
    let rotation = Transform::view_rotation(view);
    vertices
        .into_iter()
        .map(|v| project_with(v, view, &rotation, width, height))
        .collect()
}

fn project_with(
    vertex: &Point3<f32>,
    view: &ViewState,
    rotation: &Matrix4<f32>,
    width: u32,
    height: u32,
) -> Projected {
    let rotated = rotation.transform_vector(&(vertex - view.center));
    Projected {
        screen_x: width as f32 / 2.0 + rotated.x * view.zoom,
        screen_y: height as f32 / 2.0 - rotated.y * view.zoom,
        depth: rotated.z,
    }
}

/// Invert `project`: back to model space, including the view center
pub fn unproject(projected: &Projected, view: &ViewState, width: u32, height: u32) -> Point3<f32> {
    let rotated = Vector3::new(
        (projected.screen_x - width as f32 / 2.0) / view.zoom,
        (height as f32 / 2.0 - projected.screen_y) / view.zoom,
        projected.depth,
    );
    let inverse = Transform::inverse_rotation_matrix(view.angle_x, view.angle_y);
    view.center + inverse.transform_vector(&rotated)
}
