use bytemuck::{bytes_of, cast_slice, Pod, Zeroable};
use log::warn;

use crate::kernels::{self, MAX_KERNEL_SIZE};
use crate::shader_types::ConvolutionKernel;

use super::shader;
use super::RendererOptions;

/// Format of the offscreen color targets the effect chain ping-pongs
/// between. Needs to double as a writable storage texture.
pub(crate) const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Uniform block for one kernel pass; mirrors `KernelParams` in the post
/// shader.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct KernelParams {
    size: i32,
    _pad: [i32; 3],
}

/// Dedicated weight/param buffers for one kernel pass. Each enabled effect
/// owns a slot so queued uploads for the same frame cannot clobber each
/// other.
struct KernelSlot {
    weights: wgpu::Buffer,
    params: wgpu::Buffer,
}

struct Target {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl Target {
    fn create(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Convolution and color post-processing over the rendered frame, plus the
/// final blit onto the surface.
pub(crate) struct PostProcess {
    conv_pipeline: wgpu::ComputePipeline,
    invert_pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    slots: [KernelSlot; 3],
    blit_pipeline: wgpu::RenderPipeline,
    blit_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    targets: [Target; 2],
    width: u32,
    height: u32,
}

impl PostProcess {
    pub(crate) fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("post-shader"),
            source: wgpu::ShaderSource::Wgsl(shader::POST.into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: TARGET_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(
                            std::num::NonZeroU64::new(std::mem::size_of::<KernelParams>() as u64)
                                .unwrap(),
                        ),
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("post-pipeline-layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let conv_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("conv-pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "apply_kernel",
        });
        let invert_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("invert-pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "invert_color",
        });

        let slots = std::array::from_fn(|index| KernelSlot {
            weights: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("kernel-weights-{index}")),
                size: (MAX_KERNEL_SIZE * MAX_KERNEL_SIZE * std::mem::size_of::<f32>()) as u64,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
            params: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("kernel-params-{index}")),
                size: std::mem::size_of::<KernelParams>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
        });

        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blit-shader"),
            source: wgpu::ShaderSource::Wgsl(shader::BLIT.into()),
        });
        let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blit-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let blit_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("blit-pipeline-layout"),
                bind_group_layouts: &[&blit_layout],
                push_constant_ranges: &[],
            });
        let blit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("blit-pipeline"),
            layout: Some(&blit_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &blit_shader,
                entry_point: "fullscreen_vertex",
                buffers: &[],
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &blit_shader,
                entry_point: "blit_fragment",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("blit-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let targets = [
            Target::create(device, width, height, "post-target-a"),
            Target::create(device, width, height, "post-target-b"),
        ];

        Self {
            conv_pipeline,
            invert_pipeline,
            layout,
            slots,
            blit_pipeline,
            blit_layout,
            sampler,
            targets,
            width,
            height,
        }
    }

    pub(crate) fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.targets = [
            Target::create(device, self.width, self.height, "post-target-a"),
            Target::create(device, self.width, self.height, "post-target-b"),
        ];
    }

    /// Color attachment the geometry pass renders into.
    pub(crate) fn color_attachment(&self) -> &wgpu::TextureView {
        &self.targets[0].view
    }

    /// Encodes the enabled effect passes and returns the view holding the
    /// final image.
    pub(crate) fn run(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        options: &RendererOptions,
    ) -> &wgpu::TextureView {
        let mut source = 0usize;

        let kernel_size = kernels::scale_kernel_size(options.blur_size, MAX_KERNEL_SIZE);
        let mut kernel_passes: Vec<(usize, Vec<f32>, i32)> = Vec::new();
        if options.box_blur && kernel_size > 1 {
            kernel_passes.push((0, kernels::box_blur(kernel_size), kernel_size as i32));
        }
        if options.gaussian_blur && kernel_size > 1 {
            kernel_passes.push((1, kernels::gaussian_blur(kernel_size), kernel_size as i32));
        }
        if options.sharpen {
            kernel_passes.push((2, kernels::sharpen(3), 3));
        }

        for (slot_index, weights, size) in &kernel_passes {
            let kernel = ConvolutionKernel {
                size: *size,
                mat: weights,
            };
            if let Err(err) = kernels::validate(&kernel) {
                warn!("skipping malformed post-process kernel: {err}");
                continue;
            }
            let slot = &self.slots[*slot_index];
            queue.write_buffer(&slot.weights, 0, cast_slice(kernel.mat));
            queue.write_buffer(
                &slot.params,
                0,
                bytes_of(&KernelParams {
                    size: kernel.size,
                    _pad: [0; 3],
                }),
            );
            self.encode_pass(device, encoder, &self.conv_pipeline, slot, source);
            source ^= 1;
        }

        if options.invert_colors {
            self.encode_pass(device, encoder, &self.invert_pipeline, &self.slots[0], source);
            source ^= 1;
        }

        &self.targets[source].view
    }

    fn encode_pass(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::ComputePipeline,
        slot: &KernelSlot,
        source: usize,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("post-bind-group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&self.targets[source].view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&self.targets[source ^ 1].view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: slot.weights.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: slot.params.as_entire_binding(),
                },
            ],
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("post-pass"),
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(self.width.div_ceil(8), self.height.div_ceil(8), 1);
    }

    /// Draws the final image onto the surface.
    pub(crate) fn blit(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::TextureView,
        destination: &wgpu::TextureView,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blit-bind-group"),
            layout: &self.blit_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("blit-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: destination,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: true,
                },
            })],
            depth_stencil_attachment: None,
        });
        pass.set_pipeline(&self.blit_pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
