use anyhow::Result;
use glam::{Mat4, Vec3};
use winit::dpi::LogicalSize;

use prism_engine::core::{App, AppControl, FrameCtx};
use prism_engine::device::GpuInit;
use prism_engine::logging::{LoggingConfig, init_logging};
use prism_engine::window::{Runtime, RuntimeConfig};
use prism_trace::{
    Camera, KernelSource, Mesh, PresentMaterial, RenderTarget, TraceError, Tracer, TracerConfig,
};

const ORBIT_RADIUS: f32 = 4.0;
const ORBIT_HEIGHT: f32 = 1.5;
/// Radians per second.
const ORBIT_SPEED: f32 = 0.4;
const FOV_DEGREES: f32 = 50.0;
const STATS_EVERY: u64 = 120;

/// Unit cube resting on a ground plane.
fn demo_scene() -> Mesh {
    let mut ground = Mesh::ground_plane(4.0);
    for v in &mut ground.vertices {
        v.y -= 0.5;
    }

    let mut scene = Mesh::unit_cube();
    scene.append(&ground);
    scene
}

/// Resources that exist only while a window and its GPU are alive.
struct Live {
    tracer: Tracer,
    target: RenderTarget,
    material: PresentMaterial,
}

struct Viewer {
    config: TracerConfig,
    live: Option<Live>,
    angle: f32,
}

impl Viewer {
    fn new(config: TracerConfig) -> Self {
        Self {
            config,
            live: None,
            angle: 0.0,
        }
    }

    fn camera(&self) -> Camera {
        Camera::orbit(Vec3::ZERO, ORBIT_RADIUS, ORBIT_HEIGHT, self.angle, FOV_DEGREES)
    }

    fn start(&self, ctx: &mut FrameCtx<'_, '_>) -> prism_trace::Result<Live> {
        let (width, height) = ctx.window.physical_size();
        let rctx = ctx.render_ctx();

        let target = RenderTarget::new(rctx.device, width.max(1), height.max(1))?;
        let material = PresentMaterial::new(&rctx);
        let source = KernelSource::wgsl("prism demo kernel", include_str!("shaders/trace.wgsl"));

        let mut tracer = Tracer::new(self.config.clone());
        tracer.init(
            &rctx,
            &source,
            &demo_scene(),
            &Mat4::IDENTITY,
            &self.camera(),
            &target,
        )?;

        Ok(Live {
            tracer,
            target,
            material,
        })
    }
}

impl App for Viewer {
    fn on_start(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let info = ctx.gpu.adapter_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);

        match self.start(ctx) {
            Ok(live) => {
                self.live = Some(live);
                AppControl::Continue
            }
            Err(err) => {
                log::error!("tracer initialization failed: {err}");
                AppControl::Exit
            }
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        self.angle += ctx.time.dt * ORBIT_SPEED;
        let camera = self.camera();

        let Some(live) = self.live.as_mut() else {
            return AppControl::Exit;
        };

        let size = ctx.window.physical_size();
        if size != live.target.size() && size.0 > 0 && size.1 > 0 {
            match live.target.resized(ctx.gpu.device(), size.0, size.1) {
                Ok(target) => live.target = target,
                Err(err) => log::warn!("keeping {:?} render target: {err}", live.target.size()),
            }
        }

        let mut failure = None;
        let control = ctx.render(wgpu::Color::BLACK, |rctx, surface| {
            if let Err(err) = live.tracer.tick(
                rctx,
                surface.encoder,
                &camera,
                &live.target,
                &mut live.material,
            ) {
                failure = Some(err);
                return AppControl::Exit;
            }
            live.material.blit(surface);
            AppControl::Continue
        });

        if let Some(err) = failure {
            match err {
                TraceError::Device(err) => log::error!("{err}"),
                err => log::error!("frame failed: {err}"),
            }
            return AppControl::Exit;
        }

        if ctx.time.frame_index % STATS_EVERY == 0 {
            let (w, h) = live.target.size();
            log::debug!(
                "frame {}: {} dispatches, grid {:?}",
                ctx.time.frame_index,
                live.tracer.frames_dispatched(),
                live.tracer.last_grid(),
            );
            ctx.window.set_title(&format!(
                "prism | {w}x{h} | {} triangles | {:.0} fps",
                live.tracer.triangle_count().unwrap_or(0),
                ctx.time.fps,
            ));
        }

        control
    }

    fn on_exit(&mut self) {
        if let Some(mut live) = self.live.take() {
            live.tracer.teardown();
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = TracerConfig::default().with_env_overrides();
    log::info!(
        "dispatch rounding {:?}, uniform refresh {:?}",
        config.dispatch_rounding,
        config.uniform_refresh
    );

    Runtime::run(
        RuntimeConfig {
            title: "prism".to_string(),
            initial_size: LogicalSize::new(960.0, 540.0),
        },
        GpuInit::default(),
        Viewer::new(config),
    )
}
