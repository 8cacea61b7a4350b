use std::sync::Arc;

use anyhow::{Context, Result};

use super::{DeviceHealth, GpuInit};
use crate::render::RenderCtx;

/// Surface-less GPU context for offline rendering and tests.
pub struct HeadlessGpu {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    health: Arc<DeviceHealth>,
}

impl HeadlessGpu {
    /// Color format offscreen passes render into.
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    /// Requests an adapter without a compatible surface and opens a device on it.
    pub async fn new(init: GpuInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: init.force_fallback_adapter,
            })
            .await
            .context("failed to find a GPU adapter for headless use")?;

        let (device, queue) = adapter
            .request_device(&init.device_descriptor("prism headless device"))
            .await
            .context("failed to create headless wgpu device/queue")?;

        let health = DeviceHealth::watch(&device);
        log::debug!("headless adapter: {:?}", adapter.get_info().name);

        Ok(Self {
            adapter,
            device,
            queue,
            health,
        })
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn health(&self) -> &DeviceHealth {
        &self.health
    }

    /// Render context for offscreen work; there is no swapchain, so the presentation
    /// format is [`HeadlessGpu::FORMAT`].
    pub fn render_ctx(&self) -> RenderCtx<'_> {
        RenderCtx::new(&self.device, &self.queue, Self::FORMAT, &self.health)
    }
}
