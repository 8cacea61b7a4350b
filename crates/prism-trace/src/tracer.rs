use glam::Mat4;
use wgpu::util::DeviceExt;

use prism_engine::render::RenderCtx;

use crate::camera::{Camera, CameraParams, KernelUniforms};
use crate::config::{TracerConfig, UniformRefresh};
use crate::dispatch::{dispatch_grid, is_empty_grid};
use crate::error::{DeviceError, Result, TraceError};
use crate::geometry::triangulate;
use crate::kernel::{Kernel, KernelBindings, KernelSource};
use crate::lifecycle::{Lifecycle, Phase};
use crate::material::PresentMaterial;
use crate::mesh::Mesh;
use crate::resource::ResourceOwner;
use crate::target::RenderTarget;
use crate::upload::TriangleBuffer;

/// Kernel state that only exists between `init` and `teardown`.
struct Bound {
    kernel: Kernel,
    bind_group: wgpu::BindGroup,
    /// Generation of the render target `bind_group` writes into.
    target_generation: u64,
    /// Parameters most recently written to the uniform buffer.
    sent: CameraParams,
}

/// Uploads a mesh once, then dispatches the path-tracing kernel every frame.
///
/// Lifecycle is explicit: [`init`](Self::init) once, [`tick`](Self::tick) per frame,
/// [`teardown`](Self::teardown) at the end (also done on drop). The camera is passed
/// in on every call rather than looked up globally.
pub struct Tracer {
    config: TracerConfig,
    lifecycle: Lifecycle,

    triangles: ResourceOwner<TriangleBuffer>,
    params: ResourceOwner<wgpu::Buffer>,
    bound: Option<Bound>,

    frames: u64,
    last_grid: Option<[u32; 3]>,
    warned_empty_grid: bool,
}

impl Tracer {
    pub fn new(config: TracerConfig) -> Self {
        Self {
            config,
            lifecycle: Lifecycle::default(),
            triangles: ResourceOwner::new(),
            params: ResourceOwner::new(),
            bound: None,
            frames: 0,
            last_grid: None,
            warned_empty_grid: false,
        }
    }

    /// Uploads `mesh` in world space, writes the camera uniforms and binds every
    /// kernel slot.
    ///
    /// Either everything is committed or nothing is: on error the tracer stays
    /// `Uninitialized` and anything allocated so far has been released.
    pub fn init(
        &mut self,
        ctx: &RenderCtx<'_>,
        source: &KernelSource,
        mesh: &Mesh,
        local_to_world: &Mat4,
        camera: &Camera,
        target: &RenderTarget,
    ) -> Result<()> {
        self.lifecycle.check_init()?;
        check_device(ctx)?;

        let soup = triangulate(mesh, local_to_world)?;

        let mut triangles = ResourceOwner::new();
        triangles.acquire(TriangleBuffer::upload(ctx.device, &self.config.label, &soup)?)?;

        let sent = CameraParams::new(*camera, target.size());
        let mut params = ResourceOwner::new();
        params.acquire(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} params", self.config.label)),
            contents: bytemuck::bytes_of(&sent.uniforms()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        }))?;

        let kernel = Kernel::new(ctx.device, source, &self.config.entry_point)?;
        let bind_group = bind_kernel(ctx.device, &kernel, target, &triangles, &params)?;

        // Commit. The replaced owners are empty, so dropping them releases nothing.
        self.triangles = triangles;
        self.params = params;
        self.bound = Some(Bound {
            kernel,
            bind_group,
            target_generation: target.generation(),
            sent,
        });
        self.lifecycle.commit_init();

        log::info!(
            "tracer initialized: {} triangles, target {}x{}, {:?} dispatch, {:?} uniforms",
            soup.len(),
            sent.resolution.0,
            sent.resolution.1,
            self.config.dispatch_rounding,
            self.config.uniform_refresh,
        );
        Ok(())
    }

    /// Records one kernel dispatch into `encoder`, then assigns `target` as the
    /// material's main texture.
    ///
    /// A target with a new generation (the host resized or replaced it) is rebound
    /// before dispatch. Uniforms are rewritten per [`UniformRefresh`].
    pub fn tick(
        &mut self,
        ctx: &RenderCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        camera: &Camera,
        target: &RenderTarget,
        material: &mut PresentMaterial,
    ) -> Result<()> {
        self.lifecycle.check_tick()?;
        check_device(ctx)?;

        let bound = self.bound.as_mut().ok_or(TraceError::NotInitialized)?;

        if bound.target_generation != target.generation() {
            bound.bind_group = bind_kernel(ctx.device, &bound.kernel, target, &self.triangles, &self.params)?;
            bound.target_generation = target.generation();
            log::debug!(
                "tracer rebound to render target generation {}",
                target.generation()
            );
        }

        let next = CameraParams::new(*camera, target.size());
        if needs_upload(self.config.uniform_refresh, &bound.sent, &next) {
            if let Some(buffer) = self.params.get() {
                ctx.queue
                    .write_buffer(buffer, 0, bytemuck::bytes_of(&next.uniforms()));
            }
            bound.sent = next;
        }

        let (width, height) = target.size();
        let grid = dispatch_grid(width, height, self.config.dispatch_rounding);
        if is_empty_grid(grid) {
            if !self.warned_empty_grid {
                log::warn!("render target {width}x{height} yields an empty dispatch grid; skipping");
                self.warned_empty_grid = true;
            }
        } else {
            bound.kernel.dispatch(encoder, &bound.bind_group, grid);
            self.frames += 1;
        }
        self.last_grid = Some(grid);

        material.set_main_texture(ctx.device, target);
        self.lifecycle.commit_tick();
        Ok(())
    }

    /// Releases the GPU buffers and moves to `Destroyed`.
    ///
    /// Safe in any phase and idempotent; returns whether this call did the teardown.
    pub fn teardown(&mut self) -> bool {
        let Some(previous) = self.lifecycle.destroy() else {
            return false;
        };

        self.bound = None;
        let released = self.triangles.release() | self.params.release();
        if previous != Phase::Uninitialized {
            log::info!(
                "tracer torn down after {} frames (buffers released: {released})",
                self.frames
            );
        }
        true
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// Triangles resident on the GPU; `None` outside `Initialized`/`Active`.
    pub fn triangle_count(&self) -> Option<u32> {
        self.triangles.get().map(TriangleBuffer::count)
    }

    /// Number of frames whose dispatch was actually recorded.
    pub fn frames_dispatched(&self) -> u64 {
        self.frames
    }

    /// Grid used by the most recent `tick`.
    pub fn last_grid(&self) -> Option<[u32; 3]> {
        self.last_grid
    }

    /// Camera parameters currently in the uniform buffer.
    pub fn uploaded_params(&self) -> Option<&CameraParams> {
        self.bound.as_ref().map(|b| &b.sent)
    }
}

impl Drop for Tracer {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn check_device(ctx: &RenderCtx<'_>) -> Result<()> {
    match ctx.health.lost_reason() {
        Some(reason) => Err(DeviceError::Lost(reason).into()),
        None => Ok(()),
    }
}

fn needs_upload(policy: UniformRefresh, sent: &CameraParams, next: &CameraParams) -> bool {
    match policy {
        UniformRefresh::Once => false,
        UniformRefresh::OnChange => sent != next,
    }
}

fn bind_kernel(
    device: &wgpu::Device,
    kernel: &Kernel,
    target: &RenderTarget,
    triangles: &ResourceOwner<TriangleBuffer>,
    params: &ResourceOwner<wgpu::Buffer>,
) -> Result<wgpu::BindGroup> {
    let (Some(triangles), Some(params)) = (triangles.get(), params.get()) else {
        return Err(TraceError::NotInitialized);
    };
    debug_assert_eq!(params.size(), KernelUniforms::SIZE);

    let bindings = KernelBindings {
        result: target.view(),
        triangles: triangles.buffer(),
        params,
    };
    Ok(kernel.bind(device, &bindings)?)
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::dispatch::DispatchRounding;
    use crate::error::{GeometryError, ResourceError};
    use crate::test_support::{headless, read_target_u16};

    /// Writes 1.0 everywhere when it sees the unit cube, fov 60 and a 32-wide target.
    const COUNTING_KERNEL: &str = r#"
struct Triangle { v0: array<f32, 3>, v1: array<f32, 3>, v2: array<f32, 3> }
struct Params {
    pos: vec3<f32>, forward: vec3<f32>, up: vec3<f32>, right: vec3<f32>,
    screenSize: vec2<f32>, fov: f32,
}

@group(0) @binding(0) var Result: texture_storage_2d<rgba16float, write>;
@group(0) @binding(1) var<storage, read> triangles: array<Triangle>;
@group(0) @binding(2) var<uniform> params: Params;

@compute @workgroup_size(8, 8, 1)
fn CSMain(@builtin(global_invocation_id) id: vec3<u32>) {
    if (f32(id.x) >= params.screenSize.x || f32(id.y) >= params.screenSize.y) {
        return;
    }
    let count = f32(arrayLength(&triangles)) / 12.0;
    textureStore(Result, vec2<i32>(id.xy), vec4<f32>(count, params.fov / 60.0, params.screenSize.x / 32.0, 1.0));
}
"#;

    /// f16 bit pattern of 1.0.
    const HALF_ONE: u16 = 0x3C00;

    fn counting_kernel() -> KernelSource {
        KernelSource::wgsl("counting", COUNTING_KERNEL)
    }

    #[test]
    fn teardown_before_init_is_safe_and_idempotent() {
        let mut tracer = Tracer::new(TracerConfig::default());
        assert!(tracer.teardown());
        assert!(!tracer.teardown());
        assert_eq!(tracer.phase(), Phase::Destroyed);
        assert_eq!(tracer.triangle_count(), None);
    }

    #[test]
    fn uniform_refresh_policy() {
        let a = CameraParams::new(Camera::default(), (800, 600));
        let mut b = a;
        b.resolution = (1024, 768);

        assert!(!needs_upload(UniformRefresh::OnChange, &a, &a));
        assert!(needs_upload(UniformRefresh::OnChange, &a, &b));
        assert!(!needs_upload(UniformRefresh::Once, &a, &b));
    }

    #[test]
    fn full_lifecycle_on_gpu() {
        let Some(gpu) = headless() else { return };
        let ctx = gpu.render_ctx();
        let target = RenderTarget::new(gpu.device(), 32, 20).unwrap();
        let mut material = PresentMaterial::new(&ctx);
        let mut tracer = Tracer::new(TracerConfig::default());
        let camera = Camera::default();

        let mut encoder = gpu.device().create_command_encoder(&Default::default());
        assert!(matches!(
            tracer.tick(&ctx, &mut encoder, &camera, &target, &mut material),
            Err(TraceError::NotInitialized)
        ));

        tracer
            .init(&ctx, &counting_kernel(), &Mesh::unit_cube(), &Mat4::IDENTITY, &camera, &target)
            .unwrap();
        assert_eq!(tracer.phase(), Phase::Initialized);
        assert_eq!(tracer.triangle_count(), Some(12));

        tracer
            .tick(&ctx, &mut encoder, &camera, &target, &mut material)
            .unwrap();
        gpu.queue().submit([encoder.finish()]);

        assert_eq!(tracer.phase(), Phase::Active);
        assert_eq!(tracer.frames_dispatched(), 1);
        assert_eq!(tracer.last_grid(), Some([4, 3, 1]));
        assert_eq!(material.main_texture_generation(), Some(target.generation()));

        let texels = read_target_u16(&gpu, &target);
        assert!(texels.iter().all(|&t| t == HALF_ONE), "kernel output mismatch");

        assert!(tracer.teardown());
        assert!(!tracer.teardown());
        assert_eq!(tracer.triangle_count(), None);

        let mut encoder = gpu.device().create_command_encoder(&Default::default());
        assert!(matches!(
            tracer.tick(&ctx, &mut encoder, &camera, &target, &mut material),
            Err(TraceError::Destroyed)
        ));
    }

    #[test]
    fn truncating_dispatch_grid() {
        let Some(gpu) = headless() else { return };
        let ctx = gpu.render_ctx();
        let target = RenderTarget::new(gpu.device(), 800, 599).unwrap();
        let mut material = PresentMaterial::new(&ctx);
        let mut tracer = Tracer::new(TracerConfig {
            dispatch_rounding: DispatchRounding::Truncate,
            ..TracerConfig::default()
        });
        let camera = Camera::default();

        tracer
            .init(&ctx, &counting_kernel(), &Mesh::unit_cube(), &Mat4::IDENTITY, &camera, &target)
            .unwrap();
        let mut encoder = gpu.device().create_command_encoder(&Default::default());
        tracer
            .tick(&ctx, &mut encoder, &camera, &target, &mut material)
            .unwrap();
        gpu.queue().submit([encoder.finish()]);

        assert_eq!(tracer.last_grid(), Some([100, 74, 1]));
    }

    #[test]
    fn failed_init_leaves_tracer_inert() {
        let Some(gpu) = headless() else { return };
        let ctx = gpu.render_ctx();
        let target = RenderTarget::new(gpu.device(), 16, 16).unwrap();
        let mut tracer = Tracer::new(TracerConfig::default());
        let camera = Camera::default();

        let ragged = Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1]);
        let err = tracer
            .init(&ctx, &counting_kernel(), &ragged, &Mat4::IDENTITY, &camera, &target)
            .unwrap_err();
        assert!(matches!(
            err,
            TraceError::Geometry(GeometryError::IndexCountNotMultipleOfThree { count: 2 })
        ));
        assert_eq!(tracer.phase(), Phase::Uninitialized);
        assert_eq!(tracer.triangle_count(), None);

        let empty = Mesh::new(vec![Vec3::ZERO], vec![]);
        let err = tracer
            .init(&ctx, &counting_kernel(), &empty, &Mat4::IDENTITY, &camera, &target)
            .unwrap_err();
        assert!(matches!(
            err,
            TraceError::Resource(ResourceError::EmptyTriangleBuffer)
        ));
        assert_eq!(tracer.phase(), Phase::Uninitialized);

        // A valid mesh still initializes afterwards.
        tracer
            .init(&ctx, &counting_kernel(), &Mesh::unit_cube(), &Mat4::IDENTITY, &camera, &target)
            .unwrap();
        assert!(matches!(
            tracer.init(&ctx, &counting_kernel(), &Mesh::unit_cube(), &Mat4::IDENTITY, &camera, &target),
            Err(TraceError::AlreadyInitialized)
        ));
    }

    #[test]
    fn resized_target_is_rebound_and_uniforms_follow() {
        let Some(gpu) = headless() else { return };
        let ctx = gpu.render_ctx();
        let mut target = RenderTarget::new(gpu.device(), 64, 64).unwrap();
        let mut material = PresentMaterial::new(&ctx);
        let mut tracer = Tracer::new(TracerConfig::default());
        let camera = Camera::default();

        tracer
            .init(&ctx, &counting_kernel(), &Mesh::unit_cube(), &Mat4::IDENTITY, &camera, &target)
            .unwrap();

        for _ in 0..3 {
            let mut encoder = gpu.device().create_command_encoder(&Default::default());
            tracer
                .tick(&ctx, &mut encoder, &camera, &target, &mut material)
                .unwrap();
            gpu.queue().submit([encoder.finish()]);
        }
        // Same target every frame: bound once.
        assert_eq!(material.rebinds(), 1);

        target = target.resized(gpu.device(), 100, 50).unwrap();
        let moved = Camera::look_at(Vec3::new(2.0, 1.0, 2.0), Vec3::ZERO, Vec3::Y, 45.0);
        let mut encoder = gpu.device().create_command_encoder(&Default::default());
        tracer
            .tick(&ctx, &mut encoder, &moved, &target, &mut material)
            .unwrap();
        gpu.queue().submit([encoder.finish()]);

        assert_eq!(material.rebinds(), 2);
        assert_eq!(material.main_texture_generation(), Some(target.generation()));
        assert_eq!(tracer.last_grid(), Some([13, 7, 1]));
        assert_eq!(
            tracer.uploaded_params(),
            Some(&CameraParams::new(moved, (100, 50)))
        );
        assert_eq!(tracer.frames_dispatched(), 4);
    }

    #[test]
    fn once_policy_keeps_initial_uniforms() {
        let Some(gpu) = headless() else { return };
        let ctx = gpu.render_ctx();
        let target = RenderTarget::new(gpu.device(), 16, 16).unwrap();
        let mut material = PresentMaterial::new(&ctx);
        let mut tracer = Tracer::new(TracerConfig {
            uniform_refresh: UniformRefresh::Once,
            ..TracerConfig::default()
        });
        let start = Camera::default();

        tracer
            .init(&ctx, &counting_kernel(), &Mesh::unit_cube(), &Mat4::IDENTITY, &start, &target)
            .unwrap();

        let moved = Camera::orbit(Vec3::ZERO, 5.0, 1.0, 0.5, 60.0);
        let mut encoder = gpu.device().create_command_encoder(&Default::default());
        tracer
            .tick(&ctx, &mut encoder, &moved, &target, &mut material)
            .unwrap();
        gpu.queue().submit([encoder.finish()]);

        assert_eq!(
            tracer.uploaded_params(),
            Some(&CameraParams::new(start, (16, 16)))
        );
    }

    #[test]
    fn lost_device_surfaces_as_device_error() {
        let Some(gpu) = headless() else { return };
        let ctx = gpu.render_ctx();
        let target = RenderTarget::new(gpu.device(), 16, 16).unwrap();
        let mut material = PresentMaterial::new(&ctx);
        let mut tracer = Tracer::new(TracerConfig::default());
        let camera = Camera::default();

        tracer
            .init(&ctx, &counting_kernel(), &Mesh::unit_cube(), &Mat4::IDENTITY, &camera, &target)
            .unwrap();

        gpu.health().mark_lost("simulated");
        let mut encoder = gpu.device().create_command_encoder(&Default::default());
        let err = tracer
            .tick(&ctx, &mut encoder, &camera, &target, &mut material)
            .unwrap_err();
        assert!(matches!(err, TraceError::Device(DeviceError::Lost(ref r)) if r == "simulated"));
        assert_eq!(tracer.frames_dispatched(), 0);
    }

    #[test]
    fn missing_entry_point_fails_init_cleanly() {
        let Some(gpu) = headless() else { return };
        let ctx = gpu.render_ctx();
        let target = RenderTarget::new(gpu.device(), 16, 16).unwrap();
        let mut tracer = Tracer::new(TracerConfig {
            entry_point: "main".to_string(),
            ..TracerConfig::default()
        });
        let camera = Camera::default();

        let err = tracer
            .init(&ctx, &counting_kernel(), &Mesh::unit_cube(), &Mat4::IDENTITY, &camera, &target)
            .unwrap_err();
        assert!(
            matches!(err, TraceError::Resource(ResourceError::KernelCompile(_))),
            "unexpected error: {err}"
        );
        assert_eq!(tracer.phase(), Phase::Uninitialized);
        assert_eq!(tracer.triangle_count(), None);
    }

    #[test]
    fn invalid_wgsl_fails_init_cleanly() {
        let Some(gpu) = headless() else { return };
        let ctx = gpu.render_ctx();
        let target = RenderTarget::new(gpu.device(), 16, 16).unwrap();
        let mut tracer = Tracer::new(TracerConfig::default());
        let camera = Camera::default();

        let broken = KernelSource::wgsl("broken", "@compute @workgroup_size(8, 8, 1) fn CSMain( {");
        let err = tracer
            .init(&ctx, &broken, &Mesh::unit_cube(), &Mat4::IDENTITY, &camera, &target)
            .unwrap_err();
        assert!(matches!(
            err,
            TraceError::Resource(ResourceError::KernelCompile(_))
        ));
        assert_eq!(tracer.phase(), Phase::Uninitialized);

        // The same tracer still accepts a good kernel afterwards.
        tracer
            .init(&ctx, &counting_kernel(), &Mesh::unit_cube(), &Mat4::IDENTITY, &camera, &target)
            .unwrap();
        assert_eq!(tracer.phase(), Phase::Initialized);
    }

    #[test]
    fn empty_truncated_grid_skips_dispatch_but_assigns_material() {
        let Some(gpu) = headless() else { return };
        let ctx = gpu.render_ctx();
        let target = RenderTarget::new(gpu.device(), 4, 4).unwrap();
        let mut material = PresentMaterial::new(&ctx);
        let mut tracer = Tracer::new(TracerConfig {
            dispatch_rounding: DispatchRounding::Truncate,
            ..TracerConfig::default()
        });
        let camera = Camera::default();

        tracer
            .init(&ctx, &counting_kernel(), &Mesh::unit_cube(), &Mat4::IDENTITY, &camera, &target)
            .unwrap();
        for _ in 0..2 {
            let mut encoder = gpu.device().create_command_encoder(&Default::default());
            tracer
                .tick(&ctx, &mut encoder, &camera, &target, &mut material)
                .unwrap();
            gpu.queue().submit([encoder.finish()]);
        }

        assert_eq!(tracer.last_grid(), Some([0, 0, 1]));
        assert_eq!(tracer.frames_dispatched(), 0);
        assert_eq!(tracer.phase(), Phase::Active);
        assert_eq!(material.main_texture_generation(), Some(target.generation()));
        assert_eq!(material.rebinds(), 1);
    }
}
