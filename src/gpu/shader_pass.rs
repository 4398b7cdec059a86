//! Render pipelines for solver stages.
//!
//! A [`StagePipeline`] is one compiled stage: a WGSL module, a bind group
//! layout of `uniform + N unfilterable textures`, and a uniform buffer split
//! into 256-byte aligned slots. Passes that run more than once per frame with
//! different parameters (one per force impulse) write each run's uniforms to
//! their own slot and bind it with a dynamic offset, since every
//! `queue.write_buffer` lands before the frame's command buffer executes.

use bytemuck::Pod;

use super::texture::FieldTexture;

const SLOT_ALIGNMENT: u64 = 256;

/// Which geometry a run draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Draw {
    /// The full face inset by the boundary space: two triangles.
    Face,
    /// The quad around `params.center`: two triangles.
    Quad,
    /// The outer ring of cells: four lines, drawn with `fs_boundary`.
    Boundary,
}

pub struct StageDesc<'a> {
    pub label: &'static str,
    pub source: &'a str,
    /// `vs_face` or `vs_quad`.
    pub vertex: &'static str,
    /// Texture inputs bound at 1..=inputs.
    pub inputs: u32,
    pub format: wgpu::TextureFormat,
    pub additive: bool,
    /// Size of the stage's `Params` block.
    pub uniform_size: u64,
    pub slots: u32,
    /// Also build the `vs_boundary`/`fs_boundary` line pipeline.
    pub boundary: bool,
}

pub struct StagePipeline {
    label: &'static str,
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    boundary: Option<wgpu::RenderPipeline>,
    uniform_buffer: wgpu::Buffer,
    uniform_size: u64,
    stride: u64,
    slots: u32,
    inputs: u32,
}

impl StagePipeline {
    pub fn new(device: &wgpu::Device, desc: &StageDesc) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.source.into()),
        });

        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: wgpu::BufferSize::new(desc.uniform_size),
            },
            count: None,
        }];
        for binding in 1..=desc.inputs {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(desc.label),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let blend = desc.additive.then_some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        });

        let build = |vertex: &str, fragment: &str, topology: wgpu::PrimitiveTopology| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some(vertex),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fragment),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: desc.format,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let pipeline = build(desc.vertex, "fs_main", wgpu::PrimitiveTopology::TriangleList);
        let boundary = desc
            .boundary
            .then(|| build("vs_boundary", "fs_boundary", wgpu::PrimitiveTopology::LineList));

        let stride = desc.uniform_size.div_ceil(SLOT_ALIGNMENT) * SLOT_ALIGNMENT;
        let slots = desc.slots.max(1);
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: stride * slots as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            label: desc.label,
            layout,
            pipeline,
            boundary,
            uniform_buffer,
            uniform_size: desc.uniform_size,
            stride,
            slots,
            inputs: desc.inputs,
        }
    }

    pub fn slots(&self) -> u32 {
        self.slots
    }

    /// Upload one run's parameters.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range or `params` is not the stage's block.
    pub fn write<T: Pod>(&self, queue: &wgpu::Queue, slot: u32, params: &T) {
        assert!(slot < self.slots, "{}: uniform slot {} of {}", self.label, slot, self.slots);
        let bytes = bytemuck::bytes_of(params);
        assert_eq!(bytes.len() as u64, self.uniform_size, "{}: uniform block size", self.label);
        queue.write_buffer(&self.uniform_buffer, self.stride * slot as u64, bytes);
    }

    /// Record one run into `encoder`, keeping the target's existing contents
    /// outside the drawn geometry.
    ///
    /// # Panics
    ///
    /// Panics if an input is the output texture or the input count does not
    /// match the layout.
    pub fn run(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        draw: Draw,
        slot: u32,
        inputs: &[&FieldTexture],
        output: &FieldTexture,
    ) {
        assert_eq!(inputs.len() as u32, self.inputs, "{}: input count", self.label);
        assert!(
            inputs.iter().all(|t| t.id() != output.id()),
            "{}: output texture is also bound as an input",
            self.label
        );

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &self.uniform_buffer,
                offset: 0,
                size: wgpu::BufferSize::new(self.uniform_size),
            }),
        }];
        for (i, input) in inputs.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: i as u32 + 1,
                resource: wgpu::BindingResource::TextureView(input.view()),
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(self.label),
            layout: &self.layout,
            entries: &entries,
        });

        let (pipeline, vertices) = match draw {
            Draw::Face | Draw::Quad => (&self.pipeline, 6),
            Draw::Boundary => match &self.boundary {
                Some(pipeline) => (pipeline, 8),
                None => {
                    log::warn!("{}: no boundary pipeline, skipping", self.label);
                    return;
                }
            },
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(self.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output.view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[(self.stride * slot as u64) as u32]);
        pass.draw(0..vertices, 0..1);
    }
}
