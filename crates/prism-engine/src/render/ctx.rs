use crate::device::DeviceHealth;

/// Device/queue handles plus the presentation format for the current frame.
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    pub health: &'a DeviceHealth,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        health: &'a DeviceHealth,
    ) -> Self {
        Self {
            device,
            queue,
            surface_format,
            health,
        }
    }
}

/// Where a frame is recorded: the frame encoder and the swapchain color view.
pub struct SurfaceTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
    pub extent: (u32, u32),
}

impl<'a> SurfaceTarget<'a> {
    #[inline]
    pub fn new(
        encoder: &'a mut wgpu::CommandEncoder,
        color_view: &'a wgpu::TextureView,
        extent: (u32, u32),
    ) -> Self {
        Self {
            encoder,
            color_view,
            extent,
        }
    }
}
