//! Host side of a GPU path tracer.
//!
//! Turns a [`Mesh`] into a world-space triangle soup, uploads it once, marshals the
//! [`Camera`] into the kernel's uniform block and dispatches the compute kernel over
//! the [`RenderTarget`] every frame. The [`PresentMaterial`] then composites the
//! target onto the surface.
//!
//! ```no_run
//! # fn frame(
//! #     ctx: &prism_engine::render::RenderCtx<'_>,
//! #     encoder: &mut wgpu::CommandEncoder,
//! #     source: &prism_trace::KernelSource,
//! # ) -> prism_trace::Result<()> {
//! use prism_trace::{Camera, Mesh, PresentMaterial, RenderTarget, Tracer, TracerConfig};
//!
//! let target = RenderTarget::new(ctx.device, 800, 600)?;
//! let mut material = PresentMaterial::new(ctx);
//! let camera = Camera::default();
//!
//! let mut tracer = Tracer::new(TracerConfig::default());
//! tracer.init(ctx, source, &Mesh::unit_cube(), &glam::Mat4::IDENTITY, &camera, &target)?;
//! tracer.tick(ctx, encoder, &camera, &target, &mut material)?;
//! tracer.teardown();
//! # Ok(())
//! # }
//! ```

pub mod camera;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod kernel;
pub mod lifecycle;
pub mod material;
pub mod mesh;
pub mod resource;
pub mod target;
pub mod tracer;
pub mod upload;

pub use camera::{Camera, CameraParams, KernelUniforms};
pub use config::{TracerConfig, UniformRefresh};
pub use dispatch::{DispatchRounding, WORKGROUP_SIZE, dispatch_grid};
pub use error::{DeviceError, GeometryError, ResourceError, Result, TraceError};
pub use geometry::{Triangle, triangulate};
pub use kernel::{Kernel, KernelBindings, KernelSource};
pub use lifecycle::Phase;
pub use material::PresentMaterial;
pub use mesh::Mesh;
pub use resource::{Release, ResourceOwner};
pub use target::RenderTarget;
pub use tracer::Tracer;
pub use upload::TriangleBuffer;
