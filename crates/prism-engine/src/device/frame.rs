/// One acquired swapchain image plus the encoder that records into it.
///
/// Short-lived: the surface texture is presented when the frame is dropped after
/// submission, and holding it blocks acquisition of the next one.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

impl GpuFrame {
    /// Size of the acquired swapchain image in physical pixels.
    pub fn extent(&self) -> (u32, u32) {
        let size = self.surface_texture.texture.size();
        (size.width, size.height)
    }
}
