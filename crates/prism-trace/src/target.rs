//! Host-owned render target the kernel writes and the material samples.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ResourceError;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// The 2-D image the kernel writes and the presentation material samples.
///
/// Owned by the host. Every texture gets a process-unique `generation`, so the
/// tracer and material can tell when the host replaced the target (e.g. on resize)
/// and rebind instead of writing into a stale view.
pub struct RenderTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    generation: u64,
}

impl RenderTarget {
    /// Storage format the kernel's `Result` image is declared with.
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    /// Usages a target needs: kernel writes, material samples.
    pub const USAGE: wgpu::TextureUsages = wgpu::TextureUsages::STORAGE_BINDING
        .union(wgpu::TextureUsages::TEXTURE_BINDING);

    /// Allocates a new `width × height` target.
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Result<Self, ResourceError> {
        check_extent(width, height, device.limits().max_texture_dimension_2d)?;

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("prism render target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            // COPY_SRC so hosts can read the image back (screenshots, tests).
            usage: Self::USAGE | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        Ok(Self::wrap(texture))
    }

    /// Adopts an externally created texture after checking it can serve as a target.
    pub fn from_texture(texture: wgpu::Texture) -> Result<Self, ResourceError> {
        let size = texture.size();
        check_extent(size.width, size.height, u32::MAX)?;

        let missing = Self::USAGE.difference(texture.usage());
        if !missing.is_empty() {
            return Err(ResourceError::TargetUsage { missing });
        }
        if texture.format() != Self::FORMAT {
            return Err(ResourceError::TargetFormat {
                expected: Self::FORMAT,
                actual: texture.format(),
            });
        }

        Ok(Self::wrap(texture))
    }

    /// Returns a fresh target of the new size, with a new generation.
    ///
    /// `self` is left for the caller to drop. On error the caller keeps `self`.
    pub fn resized(&self, device: &wgpu::Device, width: u32, height: u32) -> Result<Self, ResourceError> {
        let next = Self::new(device, width, height)?;
        log::debug!(
            "render target resized {}x{} -> {width}x{height} (generation {} -> {})",
            self.width,
            self.height,
            self.generation,
            next.generation
        );
        Ok(next)
    }

    fn wrap(texture: wgpu::Texture) -> Self {
        let size = texture.size();
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "render target {}x{} (generation {generation})",
            size.width,
            size.height
        );
        Self {
            texture,
            view,
            width: size.width,
            height: size.height,
            generation,
        }
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }
}

fn check_extent(width: u32, height: u32, max: u32) -> Result<(), ResourceError> {
    if width == 0 || height == 0 {
        return Err(ResourceError::EmptyTarget { width, height });
    }
    if width > max || height > max {
        return Err(ResourceError::TargetTooLarge { width, height, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::headless;

    #[test]
    fn extent_checks() {
        assert_eq!(
            check_extent(0, 10, 8192),
            Err(ResourceError::EmptyTarget { width: 0, height: 10 })
        );
        assert_eq!(
            check_extent(9000, 10, 8192),
            Err(ResourceError::TargetTooLarge {
                width: 9000,
                height: 10,
                max: 8192
            })
        );
        assert_eq!(check_extent(800, 600, 8192), Ok(()));
    }

    #[test]
    fn resized_target_gets_new_generation() {
        let Some(gpu) = headless() else { return };
        let a = RenderTarget::new(gpu.device(), 64, 32).unwrap();
        let b = a.resized(gpu.device(), 128, 64).unwrap();
        assert_eq!(a.size(), (64, 32));
        assert_eq!(b.size(), (128, 64));
        assert!(b.generation() > a.generation());
    }

    #[test]
    fn failed_resize_leaves_original_usable() {
        let Some(gpu) = headless() else { return };
        let a = RenderTarget::new(gpu.device(), 64, 32).unwrap();
        let max = gpu.device().limits().max_texture_dimension_2d;

        assert_eq!(
            a.resized(gpu.device(), 0, 32).err(),
            Some(ResourceError::EmptyTarget { width: 0, height: 32 })
        );
        assert!(matches!(
            a.resized(gpu.device(), max + 1, 32),
            Err(ResourceError::TargetTooLarge { .. })
        ));
        assert_eq!(a.size(), (64, 32));

        let b = a.resized(gpu.device(), 32, 32).unwrap();
        assert_eq!(b.size(), (32, 32));
        assert_ne!(b.generation(), a.generation());
    }

    #[test]
    fn foreign_texture_without_storage_usage_is_rejected() {
        let Some(gpu) = headless() else { return };
        let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("sample-only"),
            size: wgpu::Extent3d {
                width: 16,
                height: 16,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: RenderTarget::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        assert!(matches!(
            RenderTarget::from_texture(texture),
            Err(ResourceError::TargetUsage { missing }) if missing == wgpu::TextureUsages::STORAGE_BINDING
        ));
    }
}
