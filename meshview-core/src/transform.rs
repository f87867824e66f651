/// Model transforms for interactive viewing
use nalgebra::{Matrix4, Point3, Vector3};

use crate::geometry::Mesh;

/// User-controlled orbit around the model (radians and a zoom factor)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orbit {
    pub yaw: f32,
    pub pitch: f32,
    pub zoom: f32,
}

impl Orbit {
    const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2;
    const MIN_ZOOM: f32 = 0.1;
    const MAX_ZOOM: f32 = 10.0;

    pub fn new() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            zoom: 1.0,
        }
    }

    /// Pitch is clamped so the model never flips over the poles.
    pub fn rotate(&mut self, d_yaw: f32, d_pitch: f32) {
        self.yaw = (self.yaw + d_yaw) % std::f32::consts::TAU;
        self.pitch = (self.pitch + d_pitch).clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
    }

    pub fn zoom_by(&mut self, factor: f32) {
        self.zoom = (self.zoom * factor).clamp(Self::MIN_ZOOM, Self::MAX_ZOOM);
    }

    /// Rotation around the view's up axis (Y) then the X axis, then zoom
    pub fn matrix(&self) -> Matrix4<f32> {
        let yaw = Matrix4::new_rotation(Vector3::new(0.0, self.yaw, 0.0));
        let pitch = Matrix4::new_rotation(Vector3::new(self.pitch, 0.0, 0.0));
        Matrix4::new_scaling(self.zoom) * pitch * yaw
    }
}

impl Default for Orbit {
    fn default() -> Self {
        Self::new()
    }
}

/// Matrix that centers the mesh bounds on the origin and scales the longest
/// side to 1. Identity for meshes without extent.
pub fn fit_to_unit(mesh: &Mesh) -> Matrix4<f32> {
    let Some((lo, hi)) = mesh.bounds() else {
        return Matrix4::identity();
    };
    let extent = hi - lo;
    let longest = extent.x.max(extent.y).max(extent.z);
    if longest <= f32::EPSILON {
        return Matrix4::new_translation(&-lo.coords);
    }
    let center = Point3::from((lo.coords + hi.coords) * 0.5);
    Matrix4::new_scaling(1.0 / longest) * Matrix4::new_translation(&-center.coords)
}

/// Full model matrix for the viewer: fit, then orbit.
pub fn model_matrix(fit: &Matrix4<f32>, orbit: &Orbit) -> Matrix4<f32> {
    orbit.matrix() * fit
}
