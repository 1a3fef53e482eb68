//! Record shapes shared between the host and the device program.
//!
//! Every struct here is a plain fixed-layout aggregate: field order, widths
//! and offsets are the wire-level agreement between the two independently
//! compiled sides, so reordering or resizing a field is a breaking change.
//! No behavior is attached; invariants (odd kernel sizes, light counts in
//! range, normalized directions) are enforced by the producers, not here.
//!
//! Matrices are column-major `[[f32; 4]; 4]` arrays. Vector fields are plain
//! float arrays rather than SIMD types so that no alignment padding sneaks in
//! between fields; the layout tests at the bottom pin every offset.

use bytemuck::{Pod, Zeroable};

/// Per-frame camera transforms, written once by the host and read by the
/// vertex stage. `view` maps world space to camera space, `projection` maps
/// camera space to clip space.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ViewProjection {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}

/// Per-object transform, kept as three separate matrices. The shading stage
/// owns the composition order (see [`crate::shading::compose_model`]); the
/// rotation matrix is also used on its own to transform normals.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ModelTransformation {
    pub translation: [[f32; 4]; 4],
    pub rotation: [[f32; 4]; 4],
    pub scaling: [[f32; 4]; 4],
}

/// Input vertex record as it sits in the vertex buffer. Stride 48, attribute
/// offsets 0/12/28/40.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub normal: [f32; 3],
    pub uvs: [f32; 2],
}

/// Output of the vertex stage, consumed by the fragment stage.
///
/// `position` is the clip-space position and carries the positional binding
/// semantic (`@builtin(position)` on the device side); the rasterizer reads
/// it to place the vertex. Every other field is interpolated across the
/// primitive before fragment processing. `normal` is the view-space normal,
/// `world_normal` the world-space one.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ProjectedVertex {
    pub position: [f32; 4],
    pub world_position: [f32; 4],
    pub color: [f32; 4],
    pub normal: [f32; 3],
    pub world_normal: [f32; 3],
    pub uvs: [f32; 2],
}

/// Directional light. `direction` is a unit vector by convention; callers
/// normalize before constructing one.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DirectionalLight {
    pub direction: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
}

/// Point light with a falloff distance. Intensity reaches zero at `radius`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointLight {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
    pub radius: f32,
}

/// Per-frame shading parameters. The two counts describe external light
/// arrays that live in separate buffers; they must not exceed the capacity
/// of those arrays, and nothing here checks that they don't.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FragmentParams {
    pub camera_position: [f32; 3],
    pub specular_coefficient: f32,
    pub num_directional_lights: i32,
    pub num_point_lights: i32,
}

/// Descriptor for a square convolution kernel used by the post-processing
/// passes. `size` is the side length and must be odd; `size * size` must
/// equal `mat.len()` ([`crate::kernels::validate`] checks both).
///
/// `mat` borrows the weight storage: the descriptor must not outlive the
/// buffer that owns the weights, and the weights are treated as immutable
/// for as long as any reader is in flight.
#[derive(Debug, Clone, Copy)]
pub struct ConvolutionKernel<'a> {
    pub size: i32,
    pub mat: &'a [f32],
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn view_projection_layout() {
        assert_eq!(size_of::<ViewProjection>(), 128);
        assert_eq!(offset_of!(ViewProjection, view), 0);
        assert_eq!(offset_of!(ViewProjection, projection), 64);
    }

    #[test]
    fn model_transformation_layout() {
        assert_eq!(size_of::<ModelTransformation>(), 192);
        assert_eq!(offset_of!(ModelTransformation, translation), 0);
        assert_eq!(offset_of!(ModelTransformation, rotation), 64);
        assert_eq!(offset_of!(ModelTransformation, scaling), 128);
    }

    #[test]
    fn vertex_layout() {
        assert_eq!(size_of::<Vertex>(), 48);
        assert_eq!(offset_of!(Vertex, position), 0);
        assert_eq!(offset_of!(Vertex, color), 12);
        assert_eq!(offset_of!(Vertex, normal), 28);
        assert_eq!(offset_of!(Vertex, uvs), 40);
    }

    #[test]
    fn projected_vertex_layout() {
        assert_eq!(size_of::<ProjectedVertex>(), 80);
        assert_eq!(offset_of!(ProjectedVertex, position), 0);
        assert_eq!(offset_of!(ProjectedVertex, world_position), 16);
        assert_eq!(offset_of!(ProjectedVertex, color), 32);
        assert_eq!(offset_of!(ProjectedVertex, normal), 48);
        assert_eq!(offset_of!(ProjectedVertex, world_normal), 60);
        assert_eq!(offset_of!(ProjectedVertex, uvs), 72);
    }

    #[test]
    fn light_layouts() {
        assert_eq!(size_of::<DirectionalLight>(), 28);
        assert_eq!(offset_of!(DirectionalLight, direction), 0);
        assert_eq!(offset_of!(DirectionalLight, color), 12);
        assert_eq!(offset_of!(DirectionalLight, intensity), 24);

        assert_eq!(size_of::<PointLight>(), 32);
        assert_eq!(offset_of!(PointLight, position), 0);
        assert_eq!(offset_of!(PointLight, color), 12);
        assert_eq!(offset_of!(PointLight, intensity), 24);
        assert_eq!(offset_of!(PointLight, radius), 28);
    }

    #[test]
    fn fragment_params_layout() {
        assert_eq!(size_of::<FragmentParams>(), 24);
        assert_eq!(offset_of!(FragmentParams, camera_position), 0);
        assert_eq!(offset_of!(FragmentParams, specular_coefficient), 12);
        assert_eq!(offset_of!(FragmentParams, num_directional_lights), 16);
        assert_eq!(offset_of!(FragmentParams, num_point_lights), 20);
    }

    #[test]
    fn structs_round_trip_through_bytes() {
        let vertex = Vertex {
            position: [1.0, 2.0, 3.0],
            color: [0.1, 0.2, 0.3, 1.0],
            normal: [0.0, 1.0, 0.0],
            uvs: [0.5, 0.5],
        };
        let bytes = bytemuck::bytes_of(&vertex);
        assert_eq!(bytes.len(), 48);
        let back: Vertex = *bytemuck::from_bytes(bytes);
        assert_eq!(back, vertex);
    }
}
