use glam::Vec3;
use parking_lot::RwLock;

use crate::camera::{Camera, ProjectionParams};
use crate::render::{RendererOptions, MAX_LIGHTS};
use crate::scene::Scene;
use crate::shader_types::FragmentParams;

/// Window size shared between the event loop and frame assembly.
#[derive(Debug)]
pub struct WindowViewport {
    size: RwLock<(u32, u32)>,
}

impl WindowViewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: RwLock::new((width, height)),
        }
    }

    pub fn update(&self, width: u32, height: u32) {
        *self.size.write() = (width.max(1), height.max(1));
    }

    pub fn size(&self) -> (u32, u32) {
        *self.size.read()
    }
}

/// Builds the camera from the scene's camera object, or a default vantage
/// point looking down the -Z axis when the scene has none. `rotation.x` and
/// `rotation.y` of the camera object are pitch and yaw in degrees.
pub fn camera_from_scene(scene: &Scene) -> Camera {
    scene
        .objects
        .iter()
        .find(|object| object.object_type == "camera")
        .map(|object| {
            Camera::with_orientation(
                object.position,
                object.rotation.x.to_radians(),
                object.rotation.y.to_radians(),
            )
        })
        .unwrap_or_else(|| {
            Camera::with_orientation(
                Vec3::new(0.0, 2.0, 6.0),
                -0.2,
                -std::f32::consts::FRAC_PI_2,
            )
        })
}

/// Projection parameters for the current viewport; the field of view comes
/// from the scene's camera object.
pub fn projection_params(scene: &Scene, width: u32, height: u32) -> ProjectionParams {
    let fov = scene
        .objects
        .iter()
        .find(|object| object.object_type == "camera")
        .map(|object| object.fov)
        .unwrap_or(60.0);
    let aspect_ratio = if width == 0 {
        1.0
    } else {
        height as f32 / width as f32
    };
    ProjectionParams {
        aspect_ratio,
        fov_radians: fov.to_radians(),
        near_z: 0.1,
        far_z: 100.0,
    }
}

/// Assembles the per-frame shading record.
///
/// The light counts are clamped to the renderer's buffer capacity so they
/// never exceed the arrays uploaded alongside this record. The specular
/// coefficient comes from the first mesh object's material and is zeroed
/// when specular highlights are disabled.
pub fn fragment_params(
    scene: &Scene,
    camera_position: Vec3,
    options: &RendererOptions,
) -> FragmentParams {
    let specular = if options.specular_highlights {
        scene
            .mesh_objects()
            .next()
            .map(|object| object.specular)
            .unwrap_or(1.0)
    } else {
        0.0
    };
    FragmentParams {
        camera_position: camera_position.to_array(),
        specular_coefficient: specular,
        num_directional_lights: scene.directional_lights.len().min(MAX_LIGHTS) as i32,
        num_point_lights: scene.point_lights.len().min(MAX_LIGHTS) as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneObject;
    use crate::shader_types::PointLight;

    fn scene_with_camera() -> Scene {
        let camera = SceneObject {
            name: "Camera".to_string(),
            object_type: "camera".to_string(),
            position: Vec3::new(8.5, 3.2, 6.1),
            rotation: Vec3::new(-25.0, -160.0, 0.0),
            fov: 90.0,
            ..SceneObject::default()
        };
        Scene {
            objects: vec![camera],
            ..Scene::default()
        }
    }

    #[test]
    fn camera_comes_from_the_scene_object() {
        let camera = camera_from_scene(&scene_with_camera());
        assert_eq!(camera.position, Vec3::new(8.5, 3.2, 6.1));
        assert!((camera.pitch - (-25.0f32).to_radians()).abs() < 1e-6);
        assert!((camera.yaw - (-160.0f32).to_radians()).abs() < 1e-6);
    }

    #[test]
    fn missing_camera_falls_back_to_the_default_vantage() {
        let camera = camera_from_scene(&Scene::default());
        assert_eq!(camera.position, Vec3::new(0.0, 2.0, 6.0));
    }

    #[test]
    fn projection_uses_the_scene_fov_and_viewport_aspect() {
        let params = projection_params(&scene_with_camera(), 1280, 720);
        assert!((params.fov_radians - 90.0f32.to_radians()).abs() < 1e-6);
        assert!((params.aspect_ratio - 720.0 / 1280.0).abs() < 1e-6);
    }

    #[test]
    fn fragment_params_counts_match_the_scene_lights() {
        let mut scene = scene_with_camera();
        scene.point_lights = vec![
            PointLight {
                position: [0.0; 3],
                color: [1.0; 3],
                intensity: 1.0,
                radius: 10.0,
            };
            3
        ];
        let params = fragment_params(&scene, Vec3::ZERO, &RendererOptions::default());
        assert_eq!(params.num_directional_lights, 0);
        assert_eq!(params.num_point_lights, 3);
    }

    #[test]
    fn light_counts_never_exceed_the_buffer_capacity() {
        let mut scene = scene_with_camera();
        scene.point_lights = vec![
            PointLight {
                position: [0.0; 3],
                color: [1.0; 3],
                intensity: 1.0,
                radius: 10.0,
            };
            MAX_LIGHTS + 4
        ];
        let params = fragment_params(&scene, Vec3::ZERO, &RendererOptions::default());
        assert_eq!(params.num_point_lights, MAX_LIGHTS as i32);
    }

    #[test]
    fn disabling_specular_zeroes_the_coefficient() {
        let mut scene = scene_with_camera();
        scene.objects.push(SceneObject {
            name: "Teapot".to_string(),
            object_type: "mesh".to_string(),
            specular: 0.5,
            ..SceneObject::default()
        });
        let options = RendererOptions {
            specular_highlights: false,
            ..RendererOptions::default()
        };
        let params = fragment_params(&scene, Vec3::ZERO, &options);
        assert_eq!(params.specular_coefficient, 0.0);

        let params = fragment_params(&scene, Vec3::ZERO, &RendererOptions::default());
        assert_eq!(params.specular_coefficient, 0.5);
    }
}
