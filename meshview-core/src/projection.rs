/// Camera description and projection utilities
use nalgebra::{Matrix4, Point3, Vector3, Vector4};
use serde::Serialize;

/// A point or direction in the renderer's camera vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraVector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl CameraVector {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Fixed viewport camera, expressed relative to the scene's bounding box
/// the way the browser renderer expects (eye is a multiple of the box extent)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SceneCamera {
    pub up: CameraVector,
    pub center: CameraVector,
    pub eye: CameraVector,
}

impl Default for SceneCamera {
    fn default() -> Self {
        Self {
            up: CameraVector::new(0.0, 1.0, 0.0),
            center: CameraVector::new(0.0, 0.0, 0.0),
            eye: CameraVector::new(1.5, 1.5, 1.5),
        }
    }
}

/// Perspective camera for the software rasterizer
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Place the camera like `scene` does, around a model normalized to the
    /// unit cube centered on the origin.
    pub fn from_scene(scene: &SceneCamera, width: u32, height: u32) -> Self {
        let eye = scene.eye;
        let center = scene.center;
        let up = scene.up;
        Self {
            // Models are fitted to the unit cube, so eye multiples are used as-is
            position: Point3::new(eye.x, eye.y, eye.z),
            target: Point3::new(center.x, center.y, center.z),
            up: Vector3::new(up.x, up.y, up.z),
            fov: std::f32::consts::FRAC_PI_4, // 45 degrees
            aspect: width as f32 / height.max(1) as f32,
            near: 0.1,
            far: 100.0,
        }
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    /// Project a model-space point to `(x, y, depth)` in screen space.
    ///
    /// Returns `None` behind the camera or outside the view volume.
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        model_matrix: &Matrix4<f32>,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let mvp = self.projection_matrix() * self.view_matrix() * model_matrix;
        let clip = mvp * Vector4::new(point.x, point.y, point.z, 1.0);

        if clip.w <= 1e-6 {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        if ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 || ndc.z.abs() > 1.0 {
            return None;
        }

        let screen_x = (ndc.x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc.y) * 0.5 * height as f32;
        Some((screen_x, screen_y, ndc.z))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_scene(&SceneCamera::default(), 800, 600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_camera_constants() {
        let scene = SceneCamera::default();
        assert_eq!(scene.up, CameraVector::new(0.0, 1.0, 0.0));
        assert_eq!(scene.center, CameraVector::new(0.0, 0.0, 0.0));
        assert_eq!(scene.eye, CameraVector::new(1.5, 1.5, 1.5));
    }

    #[test]
    fn test_camera_creation() {
        let camera = Camera::from_scene(&SceneCamera::default(), 800, 600);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
        assert_eq!(camera.position, Point3::new(1.5, 1.5, 1.5));
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let camera = Camera::default();
        let (x, y, depth) = camera
            .project_to_screen(&Point3::origin(), &Matrix4::identity(), 800, 600)
            .unwrap();
        assert!((x - 400.0).abs() < 1e-3);
        assert!((y - 300.0).abs() < 1e-3);
        assert!(depth > -1.0 && depth < 1.0);
    }

    #[test]
    fn test_point_behind_camera_is_clipped() {
        let camera = Camera::default();
        let behind = Point3::new(5.0, 5.0, 5.0);
        assert!(camera
            .project_to_screen(&behind, &Matrix4::identity(), 800, 600)
            .is_none());
    }

    #[test]
    fn test_closer_points_have_smaller_depth() {
        let camera = Camera::default();
        let model = Matrix4::identity();
        let near = camera
            .project_to_screen(&Point3::new(0.3, 0.3, 0.3), &model, 800, 600)
            .unwrap();
        let far = camera
            .project_to_screen(&Point3::new(-0.3, -0.3, -0.3), &model, 800, 600)
            .unwrap();
        assert!(near.2 < far.2);
    }
}
