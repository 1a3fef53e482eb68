//! Reference implementation of the programmable pipeline stages.
//!
//! These functions mirror the WGSL in [`crate::render`] operation for
//! operation. They are what the tests exercise, and they double as the
//! binding documentation for the shared records: composition order, normal
//! handling and interpolation rules are fixed here, not in the records
//! themselves.

use glam::{Mat4, Vec3};

use crate::shader_types::{
    DirectionalLight, FragmentParams, ModelTransformation, PointLight, ProjectedVertex, Vertex,
};

/// Ambient term applied before any light contribution.
pub const AMBIENT: f32 = 0.15;

/// Blinn-Phong specular exponent.
pub const SHININESS: f32 = 32.0;

/// Composes the three per-object matrices into a single model matrix.
///
/// The order is translation * rotation * scaling; every consumer of
/// [`ModelTransformation`] composes this way.
pub fn compose_model(transform: &ModelTransformation) -> Mat4 {
    Mat4::from_cols_array_2d(&transform.translation)
        * Mat4::from_cols_array_2d(&transform.rotation)
        * Mat4::from_cols_array_2d(&transform.scaling)
}

/// Vertex stage: projects one input vertex into clip space.
///
/// Normals are transformed by the rotation matrix alone, which is why the
/// record keeps the matrices separate; this holds for the rigid plus
/// uniform-scale transforms the scene format produces.
pub fn project_vertex(
    vertex: &Vertex,
    transform: &ModelTransformation,
    view_projection: &ViewProjectionMatrices,
) -> ProjectedVertex {
    let model = compose_model(transform);
    let rotation = Mat4::from_cols_array_2d(&transform.rotation);

    let world_position = model * Vec3::from_array(vertex.position).extend(1.0);
    let clip_position = view_projection.projection * view_projection.view * world_position;

    let world_normal = (rotation * Vec3::from_array(vertex.normal).extend(0.0))
        .truncate()
        .normalize_or_zero();
    let view_normal = (view_projection.view * world_normal.extend(0.0))
        .truncate()
        .normalize_or_zero();

    ProjectedVertex {
        position: clip_position.to_array(),
        world_position: world_position.to_array(),
        color: vertex.color,
        normal: view_normal.to_array(),
        world_normal: world_normal.to_array(),
        uvs: vertex.uvs,
    }
}

/// The two camera matrices in math form; decoded once per draw from the
/// shared record.
#[derive(Debug, Clone, Copy)]
pub struct ViewProjectionMatrices {
    pub view: Mat4,
    pub projection: Mat4,
}

impl From<&crate::shader_types::ViewProjection> for ViewProjectionMatrices {
    fn from(raw: &crate::shader_types::ViewProjection) -> Self {
        Self {
            view: Mat4::from_cols_array_2d(&raw.view),
            projection: Mat4::from_cols_array_2d(&raw.projection),
        }
    }
}

/// Rasterizer attribute interpolation across one triangle.
///
/// Attributes are interpolated perspective-correct (weighted by `1/w`); the
/// clip position itself is interpolated linearly. When the triangle is
/// degenerate enough that the perspective weights cannot be formed (a `w`
/// near zero, or a vanishing weight sum), the function falls back to plain
/// linear weights, so the result stays finite for zero-area primitives.
pub fn interpolate(
    a: &ProjectedVertex,
    b: &ProjectedVertex,
    c: &ProjectedVertex,
    barycentric: Vec3,
) -> ProjectedVertex {
    const EPSILON: f32 = 1e-8;

    let bary_sum = barycentric.x + barycentric.y + barycentric.z;
    let bary = if bary_sum.abs() > EPSILON {
        barycentric / bary_sum
    } else {
        Vec3::splat(1.0 / 3.0)
    };

    let ws = [a.position[3], b.position[3], c.position[3]];
    let weights = if ws.iter().all(|w| w.abs() > EPSILON) {
        let perspective = Vec3::new(bary.x / ws[0], bary.y / ws[1], bary.z / ws[2]);
        let sum = perspective.x + perspective.y + perspective.z;
        if sum.abs() > EPSILON {
            perspective / sum
        } else {
            bary
        }
    } else {
        bary
    };

    ProjectedVertex {
        position: lerp4(a.position, b.position, c.position, bary),
        world_position: lerp4(a.world_position, b.world_position, c.world_position, weights),
        color: lerp4(a.color, b.color, c.color, weights),
        normal: lerp3(a.normal, b.normal, c.normal, weights),
        world_normal: lerp3(a.world_normal, b.world_normal, c.world_normal, weights),
        uvs: lerp2(a.uvs, b.uvs, c.uvs, weights),
    }
}

/// Fragment stage: ambient plus Lambert diffuse plus Blinn-Phong specular.
///
/// Light counts come from `params`; slices shorter than the counts simply
/// bound the iteration, keeping reads inside the arrays.
pub fn shade_fragment(
    fragment: &ProjectedVertex,
    params: &FragmentParams,
    directional_lights: &[DirectionalLight],
    point_lights: &[PointLight],
) -> [f32; 4] {
    let base = Vec3::new(fragment.color[0], fragment.color[1], fragment.color[2]);
    let normal = Vec3::from_array(fragment.world_normal).normalize_or_zero();
    let world_position = Vec3::new(
        fragment.world_position[0],
        fragment.world_position[1],
        fragment.world_position[2],
    );
    let view_direction =
        (Vec3::from_array(params.camera_position) - world_position).normalize_or_zero();

    let mut total = base * AMBIENT;

    let directional_count = params.num_directional_lights.max(0) as usize;
    for light in directional_lights.iter().take(directional_count) {
        let to_light = -Vec3::from_array(light.direction).normalize_or_zero();
        total += light_contribution(
            base,
            normal,
            view_direction,
            to_light,
            Vec3::from_array(light.color),
            light.intensity,
            params.specular_coefficient,
        );
    }

    let point_count = params.num_point_lights.max(0) as usize;
    for light in point_lights.iter().take(point_count) {
        let offset = Vec3::from_array(light.position) - world_position;
        let distance = offset.length();
        if distance >= light.radius || distance <= f32::EPSILON {
            continue;
        }
        let attenuation = 1.0 - distance / light.radius;
        total += light_contribution(
            base,
            normal,
            view_direction,
            offset / distance,
            Vec3::from_array(light.color),
            light.intensity * attenuation,
            params.specular_coefficient,
        );
    }

    [total.x, total.y, total.z, fragment.color[3]]
}

fn light_contribution(
    base: Vec3,
    normal: Vec3,
    view_direction: Vec3,
    to_light: Vec3,
    color: Vec3,
    intensity: f32,
    specular_coefficient: f32,
) -> Vec3 {
    let diffuse = normal.dot(to_light).max(0.0);
    let halfway = (to_light + view_direction).normalize_or_zero();
    let specular = normal.dot(halfway).max(0.0).powf(SHININESS) * specular_coefficient;
    (base * diffuse + Vec3::splat(specular)) * color * intensity
}

fn lerp2(a: [f32; 2], b: [f32; 2], c: [f32; 2], w: Vec3) -> [f32; 2] {
    [
        a[0] * w.x + b[0] * w.y + c[0] * w.z,
        a[1] * w.x + b[1] * w.y + c[1] * w.z,
    ]
}

fn lerp3(a: [f32; 3], b: [f32; 3], c: [f32; 3], w: Vec3) -> [f32; 3] {
    [
        a[0] * w.x + b[0] * w.y + c[0] * w.z,
        a[1] * w.x + b[1] * w.y + c[1] * w.z,
        a[2] * w.x + b[2] * w.y + c[2] * w.z,
    ]
}

fn lerp4(a: [f32; 4], b: [f32; 4], c: [f32; 4], w: Vec3) -> [f32; 4] {
    [
        a[0] * w.x + b[0] * w.y + c[0] * w.z,
        a[1] * w.x + b[1] * w.y + c[1] * w.z,
        a[2] * w.x + b[2] * w.y + c[2] * w.z,
        a[3] * w.x + b[3] * w.y + c[3] * w.z,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader_types::ViewProjection;
    use glam::Vec4;
    use once_cell::sync::Lazy;

    static IDENTITY_TRANSFORM: Lazy<ModelTransformation> = Lazy::new(|| ModelTransformation {
        translation: Mat4::IDENTITY.to_cols_array_2d(),
        rotation: Mat4::IDENTITY.to_cols_array_2d(),
        scaling: Mat4::IDENTITY.to_cols_array_2d(),
    });

    static IDENTITY_VIEW_PROJECTION: Lazy<ViewProjection> = Lazy::new(|| ViewProjection {
        view: Mat4::IDENTITY.to_cols_array_2d(),
        projection: Mat4::IDENTITY.to_cols_array_2d(),
    });

    fn sample_vertex(position: [f32; 3]) -> Vertex {
        Vertex {
            position,
            color: [0.8, 0.4, 0.2, 1.0],
            normal: [0.0, 0.0, 1.0],
            uvs: [0.25, 0.75],
        }
    }

    #[test]
    fn identity_transform_round_trips_position() {
        let vertex = sample_vertex([0.5, -1.5, 2.0]);
        let projected = project_vertex(
            &vertex,
            &IDENTITY_TRANSFORM,
            &ViewProjectionMatrices::from(&*IDENTITY_VIEW_PROJECTION),
        );
        assert_eq!(projected.position, [0.5, -1.5, 2.0, 1.0]);
        assert_eq!(projected.world_position, [0.5, -1.5, 2.0, 1.0]);
        assert_eq!(projected.color, vertex.color);
        assert_eq!(projected.uvs, vertex.uvs);
    }

    #[test]
    fn composition_order_is_translation_rotation_scaling() {
        let object = crate::scene::SceneObject {
            position: glam::Vec3::new(10.0, 0.0, 0.0),
            rotation: glam::Vec3::new(0.0, 90.0, 0.0),
            scale: glam::Vec3::splat(2.0),
            ..crate::scene::SceneObject::default()
        };
        let model = compose_model(&object.model_transformation());
        // scale first, rotate +X onto -Z, then translate
        let moved = model * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert!((moved.x - 10.0).abs() < 1e-4);
        assert!(moved.y.abs() < 1e-4);
        assert!((moved.z - -2.0).abs() < 1e-4);
    }

    #[test]
    fn rotation_reaches_projected_normals() {
        let object = crate::scene::SceneObject {
            rotation: glam::Vec3::new(0.0, 180.0, 0.0),
            scale: glam::Vec3::splat(3.0),
            ..crate::scene::SceneObject::default()
        };
        let projected = project_vertex(
            &sample_vertex([0.0, 0.0, 0.0]),
            &object.model_transformation(),
            &ViewProjectionMatrices::from(&*IDENTITY_VIEW_PROJECTION),
        );
        let world_normal = Vec3::from_array(projected.world_normal);
        assert!((world_normal - Vec3::NEG_Z).length() < 1e-5);
        // scaling must not stretch the normal
        assert!((world_normal.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn interpolation_at_a_corner_returns_that_vertex() {
        let transform = &*IDENTITY_TRANSFORM;
        let vp = ViewProjectionMatrices::from(&*IDENTITY_VIEW_PROJECTION);
        let a = project_vertex(&sample_vertex([0.0, 0.0, 0.0]), transform, &vp);
        let b = project_vertex(&sample_vertex([1.0, 0.0, 0.0]), transform, &vp);
        let c = project_vertex(&sample_vertex([0.0, 1.0, 0.0]), transform, &vp);
        let result = interpolate(&a, &b, &c, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(result.position, b.position);
        assert_eq!(result.uvs, b.uvs);
    }

    #[test]
    fn degenerate_primitive_interpolates_to_finite_values() {
        let vertex = ProjectedVertex {
            position: [0.0, 0.0, 0.0, 0.0],
            world_position: [1.0, 2.0, 3.0, 1.0],
            color: [0.5, 0.5, 0.5, 1.0],
            normal: [0.0, 0.0, 1.0],
            world_normal: [0.0, 0.0, 1.0],
            uvs: [0.5, 0.5],
        };
        let result = interpolate(&vertex, &vertex, &vertex, Vec3::ZERO);
        for component in result
            .position
            .iter()
            .chain(result.world_position.iter())
            .chain(result.color.iter())
        {
            assert!(component.is_finite());
        }
        assert_eq!(result.uvs, [0.5, 0.5]);
    }

    #[test]
    fn perspective_correct_weights_favor_the_near_vertex() {
        let a = ProjectedVertex {
            position: [0.0, 0.0, 0.0, 1.0],
            world_position: [0.0; 4],
            color: [1.0, 0.0, 0.0, 1.0],
            normal: [0.0, 0.0, 1.0],
            world_normal: [0.0, 0.0, 1.0],
            uvs: [0.0, 0.0],
        };
        let mut b = a;
        b.position[3] = 4.0; // farther away in camera depth
        b.color = [0.0, 1.0, 0.0, 1.0];
        b.uvs = [1.0, 0.0];
        let c = a;
        let midpoint = interpolate(&a, &b, &c, Vec3::new(0.5, 0.5, 0.0));
        // the near vertex dominates the screen-space midpoint
        assert!(midpoint.uvs[0] < 0.5);
        assert!(midpoint.color[0] > midpoint.color[1]);
    }

    #[test]
    fn unlit_fragment_keeps_ambient_only() {
        let fragment = ProjectedVertex {
            position: [0.0, 0.0, 0.5, 1.0],
            world_position: [0.0, 0.0, 0.0, 1.0],
            color: [1.0, 1.0, 1.0, 1.0],
            normal: [0.0, 0.0, 1.0],
            world_normal: [0.0, 0.0, 1.0],
            uvs: [0.0, 0.0],
        };
        let params = FragmentParams {
            camera_position: [0.0, 0.0, -5.0],
            specular_coefficient: 1.0,
            num_directional_lights: 0,
            num_point_lights: 0,
        };
        let shaded = shade_fragment(&fragment, &params, &[], &[]);
        assert_eq!(shaded, [AMBIENT, AMBIENT, AMBIENT, 1.0]);
    }

    #[test]
    fn light_counts_bound_the_slices() {
        let fragment = ProjectedVertex {
            position: [0.0, 0.0, 0.5, 1.0],
            world_position: [0.0, 0.0, 0.0, 1.0],
            color: [1.0, 1.0, 1.0, 1.0],
            normal: [0.0, 1.0, 0.0],
            world_normal: [0.0, 1.0, 0.0],
            uvs: [0.0, 0.0],
        };
        let light = DirectionalLight {
            direction: [0.0, -1.0, 0.0],
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
        };
        let params = FragmentParams {
            camera_position: [0.0, 5.0, 0.0],
            specular_coefficient: 0.0,
            num_directional_lights: 2,
            num_point_lights: 0,
        };
        // count exceeds the slice; iteration stays inside the array
        let shaded = shade_fragment(&fragment, &params, &[light], &[]);
        assert!(shaded[0] > AMBIENT);
    }

    #[test]
    fn point_light_fades_out_at_radius() {
        let fragment = ProjectedVertex {
            position: [0.0, 0.0, 0.5, 1.0],
            world_position: [0.0, 0.0, 0.0, 1.0],
            color: [1.0, 1.0, 1.0, 1.0],
            normal: [0.0, 1.0, 0.0],
            world_normal: [0.0, 1.0, 0.0],
            uvs: [0.0, 0.0],
        };
        let params = FragmentParams {
            camera_position: [0.0, 5.0, 0.0],
            specular_coefficient: 0.0,
            num_directional_lights: 0,
            num_point_lights: 1,
        };
        let near = PointLight {
            position: [0.0, 1.0, 0.0],
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            radius: 10.0,
        };
        let at_radius = PointLight {
            position: [0.0, 10.0, 0.0],
            ..near
        };
        let lit = shade_fragment(&fragment, &params, &[], &[near]);
        let dark = shade_fragment(&fragment, &params, &[], &[at_radius]);
        assert!(lit[0] > dark[0]);
        assert_eq!(dark[0], AMBIENT);
    }
}
