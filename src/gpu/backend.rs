use std::sync::Arc;

use glam::UVec2;
use winit::window::Window;

use super::output::OutputPipeline;
use super::shader_pass::{Draw, StageDesc, StagePipeline};
use super::texture::{GpuFields, SCALAR_FORMAT, VECTOR_FORMAT};
use super::uniforms::*;
use super::GpuContext;
use crate::backend::FluidBackend;
use crate::error::{FluidError, GpuError};
use crate::grid::GridSize;
use crate::shaders;
use crate::source::{ForceImpulse, FrameSources, SwirlImpulse};
use crate::stages::output::OutputStyle;
use crate::stages::StageContext;

/// Uniform slots for passes that run once per impulse.
const IMPULSE_SLOTS: u32 = 64;

struct Pipelines {
    advection: StagePipeline,
    external_force: StagePipeline,
    swirl: StagePipeline,
    curl: StagePipeline,
    vortex: StagePipeline,
    viscous: StagePipeline,
    divergence: StagePipeline,
    poisson: StagePipeline,
    pressure: StagePipeline,
    density: StagePipeline,
    gradient: StagePipeline,
    output: OutputPipeline,
}

fn face<'a, T>(label: &'static str, source: &'a str, inputs: u32, format: wgpu::TextureFormat) -> StageDesc<'a> {
    StageDesc {
        label,
        source,
        vertex: "vs_face",
        inputs,
        format,
        additive: false,
        uniform_size: std::mem::size_of::<T>() as u64,
        slots: 1,
        boundary: false,
    }
}

fn impulse<'a, T>(label: &'static str, source: &'a str) -> StageDesc<'a> {
    StageDesc {
        vertex: "vs_quad",
        additive: true,
        slots: IMPULSE_SLOTS,
        ..face::<T>(label, source, 0, VECTOR_FORMAT)
    }
}

impl Pipelines {
    fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let advection = shaders::advection();
        let external_force = shaders::external_force();
        let swirl = shaders::swirl();
        let curl = shaders::curl();
        let vortex = shaders::vortex();
        let viscous = shaders::viscous();
        let divergence = shaders::divergence();
        let poisson = shaders::poisson();
        let pressure = shaders::pressure();
        let density = shaders::density();
        let gradient = shaders::gradient();

        Self {
            advection: StagePipeline::new(
                device,
                &StageDesc {
                    boundary: true,
                    ..face::<AdvectionParams>("Advection", &advection, 1, VECTOR_FORMAT)
                },
            ),
            external_force: StagePipeline::new(device, &impulse::<ForceParams>("External Force", &external_force)),
            swirl: StagePipeline::new(device, &impulse::<SwirlParams>("Swirl", &swirl)),
            curl: StagePipeline::new(device, &face::<HeaderParams>("Curl", &curl, 1, SCALAR_FORMAT)),
            vortex: StagePipeline::new(device, &face::<VortexParams>("Vortex", &vortex, 2, VECTOR_FORMAT)),
            viscous: StagePipeline::new(device, &face::<ViscousParams>("Viscous", &viscous, 2, VECTOR_FORMAT)),
            divergence: StagePipeline::new(device, &face::<StepParams>("Divergence", &divergence, 1, SCALAR_FORMAT)),
            poisson: StagePipeline::new(device, &face::<HeaderParams>("Poisson", &poisson, 2, SCALAR_FORMAT)),
            pressure: StagePipeline::new(
                device,
                &StageDesc {
                    boundary: true,
                    ..face::<StepParams>("Pressure", &pressure, 2, VECTOR_FORMAT)
                },
            ),
            density: StagePipeline::new(device, &face::<DensityParams>("Density", &density, 2, VECTOR_FORMAT)),
            gradient: StagePipeline::new(device, &face::<HeaderParams>("Gradient", &gradient, 2, VECTOR_FORMAT)),
            output: OutputPipeline::new(device, surface_format),
        }
    }
}

/// Borrowed pieces of the backend for recording one stage.
struct Frame<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    pipelines: &'a Pipelines,
    fields: &'a mut GpuFields,
    encoder: &'a mut wgpu::CommandEncoder,
}

/// Runs every stage as wgpu render passes and presents to a window surface.
pub struct GpuBackend {
    context: GpuContext,
    pipelines: Pipelines,
    fields: Option<GpuFields>,
    encoder: Option<wgpu::CommandEncoder>,
    viscous_active: bool,
}

impl GpuBackend {
    pub fn new(context: GpuContext, style: &OutputStyle) -> Self {
        let pipelines = Pipelines::new(&context.device, context.format());
        pipelines.output.set_style(&context.queue, style);
        Self {
            context,
            pipelines,
            fields: None,
            encoder: None,
            viscous_active: false,
        }
    }

    /// Create the device and surface for `window` and compile every stage.
    pub async fn from_window(window: Arc<Window>, style: &OutputStyle) -> Result<Self, GpuError> {
        let context = GpuContext::new(window).await?;
        Ok(Self::new(context, style))
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    pub fn set_style(&self, style: &OutputStyle) {
        self.pipelines.output.set_style(&self.context.queue, style);
    }

    fn frame(&mut self, stage: &'static str) -> Result<Frame<'_>, FluidError> {
        let fields = self.fields.as_mut().ok_or(FluidError::Uninitialized(stage))?;
        let device = &self.context.device;
        let encoder = self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            })
        });
        Ok(Frame {
            device,
            queue: &self.context.queue,
            pipelines: &self.pipelines,
            fields,
            encoder,
        })
    }

    fn impulses<T, P: bytemuck::Pod>(
        &mut self,
        stage: &'static str,
        impulses: &[T],
        params: impl Fn(&T) -> P,
        pick: impl Fn(&Pipelines) -> &StagePipeline,
    ) -> Result<(), FluidError> {
        let mut f = self.frame(stage)?;
        let pipeline = pick(f.pipelines);
        let slots = pipeline.slots() as usize;
        if impulses.len() > slots {
            log::warn!("{}: {} impulses this frame, only {} applied", stage, impulses.len(), slots);
        }
        for (slot, impulse) in impulses.iter().take(slots).enumerate() {
            pipeline.write(f.queue, slot as u32, &params(impulse));
            pipeline.run(f.device, f.encoder, Draw::Quad, slot as u32, &[], f.fields.velocity.read());
        }
        Ok(())
    }
}

impl FluidBackend for GpuBackend {
    fn resize(&mut self, viewport: UVec2, grid: GridSize) -> Result<(), FluidError> {
        self.context.resize(viewport);
        self.encoder = None;
        self.fields = Some(GpuFields::new(&self.context.device, grid));
        self.viscous_active = false;
        Ok(())
    }

    fn grid(&self) -> Option<GridSize> {
        self.fields.as_ref().map(GpuFields::grid)
    }

    fn begin_frame(&mut self) -> Result<(), FluidError> {
        self.frame("frame")?;
        self.viscous_active = false;
        Ok(())
    }

    fn advect(&mut self, ctx: &StageContext, is_bfecc: bool) -> Result<(), FluidError> {
        let mut f = self.frame("advection")?;
        let pipeline = &f.pipelines.advection;
        pipeline.write(f.queue, 0, &AdvectionParams::new(ctx, is_bfecc));

        let velocity = &mut f.fields.velocity;
        pipeline.run(f.device, f.encoder, Draw::Face, 0, &[velocity.read()], velocity.write());
        if ctx.boundary.is_walled() {
            pipeline.run(f.device, f.encoder, Draw::Boundary, 0, &[velocity.read()], velocity.write());
        }
        velocity.swap();
        Ok(())
    }

    fn apply_forces(&mut self, ctx: &StageContext, forces: &[ForceImpulse]) -> Result<(), FluidError> {
        let header = PassHeader::new(ctx);
        self.impulses(
            "external force",
            forces,
            |impulse| ForceParams {
                header,
                center: impulse.center.to_array(),
                extent: impulse.extent.to_array(),
                force: impulse.force.to_array(),
                ..Default::default()
            },
            |p| &p.external_force,
        )
    }

    fn apply_swirls(&mut self, ctx: &StageContext, swirls: &[SwirlImpulse]) -> Result<(), FluidError> {
        let header = PassHeader::new(ctx);
        self.impulses(
            "swirl",
            swirls,
            |impulse| SwirlParams {
                header,
                center: impulse.center.to_array(),
                extent: impulse.extent.to_array(),
                strength: impulse.strength,
                ..Default::default()
            },
            |p| &p.swirl,
        )
    }

    fn confine_vorticity(&mut self, ctx: &StageContext, strength: f32) -> Result<(), FluidError> {
        let mut f = self.frame("vortex")?;
        let fields = f.fields;

        f.pipelines.curl.write(f.queue, 0, &HeaderParams::new(ctx));
        f.pipelines
            .curl
            .run(f.device, f.encoder, Draw::Face, 0, &[fields.velocity.read()], &fields.curl);

        let params = VortexParams {
            header: PassHeader::new(ctx),
            dt: ctx.dt,
            strength,
            ..Default::default()
        };
        f.pipelines.vortex.write(f.queue, 0, &params);
        f.pipelines.vortex.run(
            f.device,
            f.encoder,
            Draw::Face,
            0,
            &[fields.velocity.read(), &fields.curl],
            fields.velocity.write(),
        );
        fields.velocity.swap();
        Ok(())
    }

    fn diffuse(&mut self, ctx: &StageContext, viscosity: f32, iterations: u32) -> Result<(), FluidError> {
        let mut f = self.frame("viscous")?;
        if iterations == 0 {
            self.viscous_active = false;
            return Ok(());
        }
        let pipeline = &f.pipelines.viscous;
        let params = ViscousParams {
            header: PassHeader::new(ctx),
            viscosity,
            dt: ctx.dt,
            ..Default::default()
        };
        pipeline.write(f.queue, 0, &params);

        let GpuFields { velocity, viscous, .. } = f.fields;
        let velocity = velocity.read();
        pipeline.run(f.device, f.encoder, Draw::Face, 0, &[velocity, velocity], viscous.write());
        viscous.swap();
        for _ in 1..iterations {
            pipeline.run(f.device, f.encoder, Draw::Face, 0, &[velocity, viscous.read()], viscous.write());
            viscous.swap();
        }
        self.viscous_active = true;
        Ok(())
    }

    fn divergence(&mut self, ctx: &StageContext) -> Result<(), FluidError> {
        let viscous_active = self.viscous_active;
        let mut f = self.frame("divergence")?;
        let fields = f.fields;
        let input = if viscous_active { fields.viscous.read() } else { fields.velocity.read() };
        f.pipelines.divergence.write(f.queue, 0, &StepParams::new(ctx));
        f.pipelines
            .divergence
            .run(f.device, f.encoder, Draw::Face, 0, &[input], &fields.divergence);
        Ok(())
    }

    fn solve_pressure(&mut self, ctx: &StageContext, iterations: u32) -> Result<(), FluidError> {
        let mut f = self.frame("poisson")?;
        let pipeline = &f.pipelines.poisson;
        pipeline.write(f.queue, 0, &HeaderParams::new(ctx));
        let GpuFields { pressure, divergence, .. } = f.fields;
        for _ in 0..iterations {
            pipeline.run(f.device, f.encoder, Draw::Face, 0, &[pressure.read(), &*divergence], pressure.write());
            pressure.swap();
        }
        Ok(())
    }

    fn subtract_gradient(&mut self, ctx: &StageContext) -> Result<(), FluidError> {
        let viscous_active = self.viscous_active;
        let mut f = self.frame("pressure")?;
        let GpuFields { velocity, viscous, pressure, .. } = f.fields;
        let input = if viscous_active { viscous.read() } else { velocity.read() };
        let pipeline = &f.pipelines.pressure;
        pipeline.write(f.queue, 0, &StepParams::new(ctx));
        pipeline.run(f.device, f.encoder, Draw::Face, 0, &[pressure.read(), input], velocity.write());
        if ctx.boundary.is_walled() {
            pipeline.run(f.device, f.encoder, Draw::Boundary, 0, &[pressure.read(), input], velocity.write());
        }
        velocity.swap();
        Ok(())
    }

    fn transport_density(&mut self, ctx: &StageContext, sources: &FrameSources, dissipation: f32) -> Result<(), FluidError> {
        let mut f = self.frame("density")?;
        let params = DensityParams::new(ctx, dissipation, sources.points.as_slice(), sources.lines.as_slice());
        f.pipelines.density.write(f.queue, 0, &params);
        let GpuFields { velocity, density, .. } = f.fields;
        f.pipelines
            .density
            .run(f.device, f.encoder, Draw::Face, 0, &[velocity.read(), density.read()], density.write());
        density.swap();
        Ok(())
    }

    fn compute_gradient(&mut self, ctx: &StageContext) -> Result<(), FluidError> {
        let mut f = self.frame("gradient")?;
        let fields = f.fields;
        f.pipelines.gradient.write(f.queue, 0, &HeaderParams::new(ctx));
        f.pipelines.gradient.run(
            f.device,
            f.encoder,
            Draw::Face,
            0,
            &[fields.density.read(), fields.velocity.read()],
            &fields.gradient,
        );
        Ok(())
    }

    /// Submit the frame's passes and composite to the surface.
    ///
    /// The solver work is submitted even when no surface texture is
    /// available, so the simulation keeps advancing. A lost or outdated
    /// surface is reconfigured before the error is returned.
    fn present(&mut self, _ctx: &StageContext) -> Result<(), FluidError> {
        let fields = self.fields.as_ref().ok_or(FluidError::Uninitialized("output"))?;
        let device = &self.context.device;
        let mut encoder = self.encoder.take().unwrap_or_else(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            })
        });

        let frame = match self.context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(e) => {
                self.context.queue.submit(std::iter::once(encoder.finish()));
                if matches!(e, wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) {
                    self.context.reconfigure();
                }
                return Err(e.into());
            }
        };

        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.pipelines
            .output
            .run(device, &mut encoder, fields.density.read(), &fields.gradient, &view);

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
