use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytemuck::{bytes_of, cast_slice, Pod, Zeroable};
use log::{error, warn};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::mesh::{cube, Mesh};
use crate::obj::load_obj_from_str;
use crate::scene::SceneObject;
use crate::shader_types::{
    DirectionalLight, FragmentParams, ModelTransformation, PointLight, Vertex, ViewProjection,
};

use super::post::{PostProcess, TARGET_FORMAT};
use super::{shader, RendererOptions};

/// Capacity of the light storage buffers. Frame assembly clamps the counts
/// written into `FragmentParams` to this bound.
pub const MAX_LIGHTS: usize = 16;

/// GPU renderer backed by wgpu that draws meshes from the scene snapshot.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: DepthBuffer,
    pipeline: wgpu::RenderPipeline,
    view_projection_buffer: wgpu::Buffer,
    fragment_params_buffer: wgpu::Buffer,
    directional_lights_buffer: wgpu::Buffer,
    point_lights_buffer: wgpu::Buffer,
    global_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    post: PostProcess,
    mesh_cache: HashMap<String, MeshBuffers>,
    missing_meshes: HashSet<String>,
    assets_dir: PathBuf,
    default_mesh: MeshBuffers,
}

impl Renderer {
    /// Initializes the GPU renderer for the provided window. Meshes named by
    /// the scene are loaded from `assets_dir`.
    pub async fn new(window: Arc<Window>, assets_dir: PathBuf) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            dx12_shader_compiler: Default::default(),
        });
        let surface = unsafe { instance.create_surface(window.as_ref()) }?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;

        let device_descriptor = wgpu::DeviceDescriptor {
            label: Some("renderer-device"),
            features: wgpu::Features::empty(),
            limits: wgpu::Limits::default(),
        };
        let (device, queue) = adapter
            .request_device(&device_descriptor, None)
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .iter()
                .copied()
                .find(|mode| {
                    matches!(
                        mode,
                        wgpu::PresentMode::Mailbox | wgpu::PresentMode::Immediate
                    )
                })
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("geometry-shader"),
            source: wgpu::ShaderSource::Wgsl(shader::GEOMETRY.into()),
        });

        let global_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("global-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(
                            std::num::NonZeroU64::new(std::mem::size_of::<ViewProjection>() as u64)
                                .unwrap(),
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(
                            std::num::NonZeroU64::new(
                                std::mem::size_of::<GpuFragmentParams>() as u64
                            )
                            .unwrap(),
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        // Per-object uniform layout
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object-bind-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: Some(
                        std::num::NonZeroU64::new(
                            std::mem::size_of::<ModelTransformation>() as u64
                        )
                        .unwrap(),
                    ),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("geometry-pipeline-layout"),
            bind_group_layouts: &[&global_layout, &object_layout],
            push_constant_ranges: &[],
        });

        let view_projection_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("view-projection-uniform"),
            size: std::mem::size_of::<ViewProjection>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let fragment_params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("fragment-params-uniform"),
            size: std::mem::size_of::<GpuFragmentParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let directional_lights_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("directional-lights"),
            size: (MAX_LIGHTS * std::mem::size_of::<GpuDirectionalLight>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let point_lights_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("point-lights"),
            size: (MAX_LIGHTS * std::mem::size_of::<GpuPointLight>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let global_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("global-bind-group"),
            layout: &global_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: view_projection_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: fragment_params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: directional_lights_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: point_lights_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("geometry-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "project_vertex",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x3,
                            offset: 0,
                            shader_location: 0,
                        },
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x4,
                            offset: 12,
                            shader_location: 1,
                        },
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x3,
                            offset: 28,
                            shader_location: 2,
                        },
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: 40,
                            shader_location: 3,
                        },
                    ],
                }],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthBuffer::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "basic_fragment",
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
        });

        let post = PostProcess::new(&device, surface_format, config.width, config.height);
        let default_mesh = MeshBuffers::from_mesh(&device, &cube(), "default-cube");

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth,
            pipeline,
            view_projection_buffer,
            fragment_params_buffer,
            directional_lights_buffer,
            point_lights_buffer,
            global_bind_group,
            object_layout,
            post,
            mesh_cache: HashMap::new(),
            missing_meshes: HashSet::new(),
            assets_dir,
            default_mesh,
        })
    }

    /// Returns the identifier of the window owned by the renderer.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    /// Exposes the inner window for event handling.
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Resizes the swap chain and offscreen targets to the new dimensions.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
        self.post
            .resize(&self.device, new_size.width, new_size.height);
    }

    /// Uploads the per-frame records before rendering.
    ///
    /// Light slices longer than [`MAX_LIGHTS`] are truncated with a warning,
    /// and the counts written to the device never exceed the data actually
    /// uploaded.
    pub fn update_globals(
        &self,
        view_projection: &ViewProjection,
        params: &FragmentParams,
        directional_lights: &[DirectionalLight],
        point_lights: &[PointLight],
        texturing: bool,
    ) {
        self.queue
            .write_buffer(&self.view_projection_buffer, 0, bytes_of(view_projection));

        let directional_count = clamped_count(
            params.num_directional_lights,
            directional_lights.len().min(MAX_LIGHTS),
        );
        let point_count =
            clamped_count(params.num_point_lights, point_lights.len().min(MAX_LIGHTS));
        if directional_count < params.num_directional_lights.max(0) as usize
            || point_count < params.num_point_lights.max(0) as usize
        {
            warn!(
                "light counts ({}, {}) exceed the available arrays; truncating",
                params.num_directional_lights, params.num_point_lights
            );
        }

        let gpu_params = GpuFragmentParams {
            camera_position: params.camera_position,
            specular_coefficient: params.specular_coefficient,
            num_directional_lights: directional_count as i32,
            num_point_lights: point_count as i32,
            texturing: texturing as u32,
            _pad: 0,
        };
        self.queue
            .write_buffer(&self.fragment_params_buffer, 0, bytes_of(&gpu_params));

        let directional: Vec<GpuDirectionalLight> = directional_lights[..directional_count]
            .iter()
            .map(GpuDirectionalLight::from)
            .collect();
        if !directional.is_empty() {
            self.queue
                .write_buffer(&self.directional_lights_buffer, 0, cast_slice(&directional));
        }

        let point: Vec<GpuPointLight> = point_lights[..point_count]
            .iter()
            .map(GpuPointLight::from)
            .collect();
        if !point.is_empty() {
            self.queue
                .write_buffer(&self.point_lights_buffer, 0, cast_slice(&point));
        }
    }

    /// Draws the meshes in the provided scene snapshot and runs the enabled
    /// post-processing passes.
    pub fn render(
        &mut self,
        objects: &[SceneObject],
        options: &RendererOptions,
    ) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("renderer-encoder"),
            });

        // Build the draw list and ensure meshes are cached
        let mut draw_list = Vec::new();
        for (index, object) in objects.iter().enumerate() {
            if !object.wants_mesh() {
                continue;
            }
            if let Some(name) = object.mesh.as_deref() {
                self.ensure_mesh_loaded(name);
                draw_list.push((Some(name.to_string()), index));
            } else {
                draw_list.push((None, index));
            }
        }

        let mut bind_groups = Vec::new();
        for (_, obj_index) in draw_list.iter() {
            let transform = objects[*obj_index].model_transformation();

            let object_buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("object-uniform"),
                    contents: bytes_of(&transform),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });

            let object_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &self.object_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: object_buffer.as_entire_binding(),
                }],
                label: Some("object-bind-group"),
            });

            bind_groups.push(object_bind_group);
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("geometry-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.post.color_attachment(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.03,
                        g: 0.03,
                        b: 0.05,
                        a: 1.0,
                    }),
                    store: true,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: true,
                }),
                stencil_ops: None,
            }),
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.global_bind_group, &[]);

        for ((mesh_name, _), bind_group) in draw_list.iter().zip(bind_groups.iter()) {
            let mesh = match mesh_name.as_ref() {
                Some(name) => self.mesh_cache.get(name).unwrap_or(&self.default_mesh),
                None => &self.default_mesh,
            };

            pass.set_vertex_buffer(0, mesh.vertex.slice(..));
            pass.set_index_buffer(mesh.index.slice(..), wgpu::IndexFormat::Uint32);
            pass.set_bind_group(1, bind_group, &[]);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }

        drop(pass); // explicit to satisfy lifetimes on some backends

        let final_view = self
            .post
            .run(&self.device, &self.queue, &mut encoder, options);
        self.post
            .blit(&self.device, &mut encoder, final_view, &surface_view);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn ensure_mesh_loaded(&mut self, name: &str) {
        if self.mesh_cache.contains_key(name) || self.missing_meshes.contains(name) {
            return;
        }
        match self.load_mesh(name) {
            Ok(mesh) => {
                self.mesh_cache.insert(name.to_string(), mesh);
            }
            Err(err) => {
                error!("failed to load mesh {name}: {err:?}");
                self.missing_meshes.insert(name.to_string());
            }
        }
    }

    fn load_mesh(&self, name: &str) -> Result<MeshBuffers> {
        let path = self.assets_dir.join(name);
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        let mesh = load_obj_from_str(&contents)
            .with_context(|| format!("failed to parse OBJ mesh {name}"))?;
        Ok(MeshBuffers::from_mesh(&self.device, &mesh, name))
    }
}

/// Clamps a light count to the data actually available.
fn clamped_count(count: i32, available: usize) -> usize {
    (count.max(0) as usize).min(available)
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn from_mesh(device: &wgpu::Device, mesh: &Mesh, label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Device copy of [`FragmentParams`], padded to the uniform block layout and
/// extended with the texturing flag.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GpuFragmentParams {
    camera_position: [f32; 3],
    specular_coefficient: f32,
    num_directional_lights: i32,
    num_point_lights: i32,
    texturing: u32,
    _pad: u32,
}

/// Device copy of [`DirectionalLight`] with the vec3 fields padded to 16
/// bytes.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GpuDirectionalLight {
    direction: [f32; 3],
    _pad0: f32,
    color: [f32; 3],
    intensity: f32,
}

impl From<&DirectionalLight> for GpuDirectionalLight {
    fn from(light: &DirectionalLight) -> Self {
        Self {
            direction: light.direction,
            _pad0: 0.0,
            color: light.color,
            intensity: light.intensity,
        }
    }
}

/// Device copy of [`PointLight`] with the vec3 fields padded to 16 bytes.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GpuPointLight {
    position: [f32; 3],
    _pad0: f32,
    color: [f32; 3],
    intensity: f32,
    radius: f32,
    _pad1: [f32; 3],
}

impl From<&PointLight> for GpuPointLight {
    fn from(light: &PointLight) -> Self {
        Self {
            position: light.position,
            _pad0: 0.0,
            color: light.color,
            intensity: light.intensity,
            radius: light.radius,
            _pad1: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn gpu_mirrors_match_the_wgsl_block_layout() {
        assert_eq!(size_of::<GpuFragmentParams>(), 32);
        assert_eq!(offset_of!(GpuFragmentParams, texturing), 24);

        assert_eq!(size_of::<GpuDirectionalLight>(), 32);
        assert_eq!(offset_of!(GpuDirectionalLight, color), 16);
        assert_eq!(offset_of!(GpuDirectionalLight, intensity), 28);

        assert_eq!(size_of::<GpuPointLight>(), 48);
        assert_eq!(offset_of!(GpuPointLight, color), 16);
        assert_eq!(offset_of!(GpuPointLight, intensity), 28);
        assert_eq!(offset_of!(GpuPointLight, radius), 32);
    }

    #[test]
    fn light_counts_clamp_to_available_data() {
        assert_eq!(clamped_count(3, 5), 3);
        assert_eq!(clamped_count(8, 5), 5);
        assert_eq!(clamped_count(-1, 5), 0);
    }

    #[test]
    fn padded_light_round_trips_its_fields() {
        let light = PointLight {
            position: [1.0, 2.0, 3.0],
            color: [0.5, 0.6, 0.7],
            intensity: 2.0,
            radius: 60.0,
        };
        let gpu = GpuPointLight::from(&light);
        assert_eq!(gpu.position, light.position);
        assert_eq!(gpu.color, light.color);
        assert_eq!(gpu.intensity, light.intensity);
        assert_eq!(gpu.radius, light.radius);
    }
}
