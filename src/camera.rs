use glam::{Mat4, Vec3, Vec4};

use crate::shader_types::ViewProjection;

pub const PITCH_AXIS: Vec3 = Vec3::X;
pub const YAW_AXIS: Vec3 = Vec3::Y;
pub const ROLL_AXIS: Vec3 = Vec3::Z;

/// World up used when building the camera basis.
pub const UP: Vec3 = YAW_AXIS;

/// Projection parameters for a perspective camera. `aspect_ratio` is
/// height divided by width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionParams {
    pub aspect_ratio: f32,
    pub fov_radians: f32,
    pub near_z: f32,
    pub far_z: f32,
}

/// Free-flying yaw/pitch camera with velocity-based movement.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    /// Radians around the yaw axis; zero faces +X.
    pub yaw: f32,
    /// Radians above the horizon.
    pub pitch: f32,
    pub velocity: Vec3,
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            velocity: Vec3::ZERO,
        }
    }

    pub fn with_orientation(position: Vec3, pitch: f32, yaw: f32) -> Self {
        Self {
            position,
            yaw,
            pitch,
            velocity: Vec3::ZERO,
        }
    }

    /// Unit forward vector derived from the current yaw and pitch.
    pub fn look_direction(&self) -> Vec3 {
        let (yaw_sin, yaw_cos) = self.yaw.sin_cos();
        let (pitch_sin, pitch_cos) = self.pitch.sin_cos();
        Vec3::new(pitch_cos * yaw_cos, pitch_sin, pitch_cos * yaw_sin).normalize()
    }

    /// Normalized horizontal strafe direction to the camera's left.
    pub fn relative_left(&self) -> Vec3 {
        let cross = (-YAW_AXIS).cross(self.look_direction());
        Vec3::new(cross.x, 0.0, cross.z).normalize_or_zero()
    }

    /// Normalized horizontal strafe direction to the camera's right.
    pub fn relative_right(&self) -> Vec3 {
        let cross = YAW_AXIS.cross(self.look_direction());
        Vec3::new(cross.x, 0.0, cross.z).normalize_or_zero()
    }

    /// Integrates the current velocity over `delta_time` seconds.
    pub fn advance(&mut self, delta_time: f32) {
        self.position += self.velocity * delta_time;
    }

    /// World-to-camera transform: the inverse of a point-at basis built from
    /// the current position and look direction.
    pub fn view_matrix(&self) -> Mat4 {
        let target = self.position + self.look_direction();
        point_at(self.position, target).inverse()
    }

    /// Assembles the per-frame camera record uploaded to the device.
    pub fn view_projection(&self, params: &ProjectionParams) -> ViewProjection {
        ViewProjection {
            view: self.view_matrix().to_cols_array_2d(),
            projection: projection_matrix(params).to_cols_array_2d(),
        }
    }
}

/// Builds a camera-to-world basis looking from `pos` towards `target` with
/// world up `UP`.
pub fn point_at(pos: Vec3, target: Vec3) -> Mat4 {
    let forward = (target - pos).normalize();
    let up = (UP - forward * UP.dot(forward)).normalize();
    let right = up.cross(forward);

    Mat4::from_cols(
        right.extend(0.0),
        up.extend(0.0),
        forward.extend(0.0),
        pos.extend(1.0),
    )
}

/// Perspective projection with clip-space depth in 0..1.
///
/// `x` scale follows the height-over-width aspect convention, so the
/// horizontal field of view widens with the window.
pub fn projection_matrix(params: &ProjectionParams) -> Mat4 {
    let y = 1.0 / (params.fov_radians * 0.5).tan();
    let x = y * params.aspect_ratio;
    let z = params.far_z / (params.far_z - params.near_z);

    Mat4::from_cols(
        Vec4::new(x, 0.0, 0.0, 0.0),
        Vec4::new(0.0, y, 0.0, 0.0),
        Vec4::new(0.0, 0.0, z, 1.0),
        Vec4::new(0.0, 0.0, z * -params.near_z, 0.0),
    )
}
