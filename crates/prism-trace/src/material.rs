use prism_engine::render::{RenderCtx, SurfaceTarget};

use crate::target::RenderTarget;

/// Composites the render target onto the surface (fullscreen textured triangle).
///
/// `set_main_texture` is a reference assignment: the bind group is only rebuilt
/// when the target's generation differs from the one already bound.
pub struct PresentMaterial {
    surface_format: wgpu::TextureFormat,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    bind_group: Option<wgpu::BindGroup>,
    bound_generation: Option<u64>,
    rebinds: u64,

    warned_unbound: bool,
}

impl PresentMaterial {
    pub fn new(ctx: &RenderCtx<'_>) -> Self {
        let device = ctx.device;
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("prism blit shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("prism blit bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("prism blit pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("prism blit pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("prism blit sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            surface_format: ctx.surface_format,
            pipeline,
            bind_group_layout,
            sampler,
            bind_group: None,
            bound_generation: None,
            rebinds: 0,
            warned_unbound: false,
        }
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Makes `target` the texture this material samples.
    pub fn set_main_texture(&mut self, device: &wgpu::Device, target: &RenderTarget) {
        if self.bound_generation == Some(target.generation()) {
            return;
        }

        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("prism blit bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(target.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        }));
        self.bound_generation = Some(target.generation());
        self.rebinds += 1;
        self.warned_unbound = false;
    }

    /// Generation of the currently bound target, if any.
    pub fn main_texture_generation(&self) -> Option<u64> {
        self.bound_generation
    }

    /// Number of times a new texture has actually been bound.
    pub fn rebinds(&self) -> u64 {
        self.rebinds
    }

    /// Draws the bound texture over the whole `dest` surface.
    ///
    /// Returns `false` (and draws nothing) if no texture has been assigned yet.
    pub fn blit(&mut self, dest: &mut SurfaceTarget<'_>) -> bool {
        let Some(bind_group) = self.bind_group.as_ref() else {
            if !self.warned_unbound {
                log::warn!("PresentMaterial: blit without a main texture; skipped");
                self.warned_unbound = true;
            }
            return false;
        };

        let mut rpass = dest.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("prism blit pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: dest.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.draw(0..3, 0..1);
        true
    }
}

#[cfg(test)]
mod tests {
    use prism_engine::device::HeadlessGpu;

    use super::*;
    use crate::test_support::{headless, read_texture};

    const SIZE: u32 = 16;

    fn extent() -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: SIZE,
            height: SIZE,
            depth_or_array_layers: 1,
        }
    }

    /// Render target whose every texel is `rgba`, given as f16 bit patterns.
    fn filled_target(gpu: &HeadlessGpu, rgba: [u16; 4]) -> RenderTarget {
        let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("filled target"),
            size: extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: RenderTarget::FORMAT,
            usage: RenderTarget::USAGE | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let texels: Vec<u16> = (0..SIZE * SIZE).flat_map(|_| rgba).collect();
        gpu.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&texels),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(SIZE * 8),
                rows_per_image: Some(SIZE),
            },
            extent(),
        );

        RenderTarget::from_texture(texture).unwrap()
    }

    fn screen(gpu: &HeadlessGpu) -> wgpu::Texture {
        gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen surface"),
            size: extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HeadlessGpu::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    fn blit_into(gpu: &HeadlessGpu, material: &mut PresentMaterial, screen: &wgpu::Texture) -> bool {
        let view = screen.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu.device().create_command_encoder(&Default::default());
        let drawn = material.blit(&mut SurfaceTarget::new(&mut encoder, &view, (SIZE, SIZE)));
        gpu.queue().submit([encoder.finish()]);
        drawn
    }

    #[test]
    fn blit_without_main_texture_is_skipped() {
        let Some(gpu) = headless() else { return };
        let mut material = PresentMaterial::new(&gpu.render_ctx());
        let screen = screen(&gpu);

        assert!(!blit_into(&gpu, &mut material, &screen));
        assert!(!blit_into(&gpu, &mut material, &screen));
        assert_eq!(material.main_texture_generation(), None);

        let pixels = read_texture(&gpu, &screen, 4);
        assert!(pixels.iter().all(|&b| b == 0), "skipped blit wrote pixels");
    }

    #[test]
    fn blit_copies_main_texture_to_surface() {
        let Some(gpu) = headless() else { return };
        let mut material = PresentMaterial::new(&gpu.render_ctx());
        let screen = screen(&gpu);

        // (1, 0, 1, 1) in f16.
        let target = filled_target(&gpu, [0x3C00, 0x0000, 0x3C00, 0x3C00]);
        material.set_main_texture(gpu.device(), &target);
        material.set_main_texture(gpu.device(), &target);
        assert_eq!(material.rebinds(), 1);

        assert!(blit_into(&gpu, &mut material, &screen));

        let pixels = read_texture(&gpu, &screen, 4);
        assert_eq!(pixels.len(), (SIZE * SIZE * 4) as usize);
        for px in pixels.chunks_exact(4) {
            assert_eq!(px, [255, 0, 255, 255]);
        }
    }
}
