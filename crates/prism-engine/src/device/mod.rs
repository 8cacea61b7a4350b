//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue (windowed or headless)
//! - creating & configuring the Surface (swapchain)
//! - acquiring frames and providing encoders/views for rendering
//! - tracking device loss so higher layers can surface it

mod frame;
mod gpu;
mod headless;
mod health;
mod init;
mod surface;

pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use headless::HeadlessGpu;
pub use health::DeviceHealth;
pub use init::GpuInit;
pub use surface::SurfaceErrorAction;
