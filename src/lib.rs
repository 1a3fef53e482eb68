//! A small forward renderer organized around a shared host/device layout
//! contract.
//!
//! The crate's center of gravity is [`shader_types`]: the fixed-layout
//! records both the host side and the GPU program agree on byte for byte.
//! The remaining modules produce and consume those records: [`camera`] and
//! [`scene`] fill them in, [`shading`] is the CPU reference for how the
//! device program reads them, [`kernels`] generates the post-processing
//! weights, and [`render`] uploads everything through wgpu.

pub mod app;
pub mod camera;
pub mod input;
pub mod kernels;
pub mod mesh;
pub mod obj;
pub mod render;
pub mod scene;
pub mod shader_types;
pub mod shading;

pub use camera::{Camera, ProjectionParams};
pub use input::{InputState, KeyCode, MouseButton, NamedKey};
pub use kernels::{KernelError, MAX_KERNEL_SIZE};
pub use mesh::Mesh;
pub use obj::load_obj_from_str;
pub use render::{Renderer, RendererOptions, MAX_LIGHTS};
pub use scene::{Scene, SceneObject};
pub use shader_types::{
    ConvolutionKernel, DirectionalLight, FragmentParams, ModelTransformation, PointLight,
    ProjectedVertex, Vertex, ViewProjection,
};
