//! Triangle buffer creation.

use wgpu::util::DeviceExt;

use crate::error::ResourceError;
use crate::geometry::Triangle;
use crate::resource::Release;

/// GPU-resident, read-only array of [`Triangle`]s bound at the kernel's `triangles` slot.
///
/// Sized exactly `count × 36` bytes and written once at creation.
#[derive(Debug)]
pub struct TriangleBuffer {
    buffer: wgpu::Buffer,
    count: u32,
}

impl TriangleBuffer {
    /// Creates the storage buffer and uploads `triangles` in one step.
    pub fn upload(
        device: &wgpu::Device,
        label: &str,
        triangles: &[Triangle],
    ) -> Result<Self, ResourceError> {
        let size = checked_size(triangles.len(), &device.limits())?;
        let count = u32::try_from(triangles.len()).map_err(|_| ResourceError::BufferTooLarge {
            size,
            max: u64::from(u32::MAX) * Triangle::SIZE,
        })?;

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} triangles")),
            contents: bytemuck::cast_slice(triangles),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        });

        log::debug!("uploaded {count} triangles ({size} bytes)");
        Ok(Self { buffer, count })
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub fn size_bytes(&self) -> u64 {
        self.buffer.size()
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

impl Release for TriangleBuffer {
    fn release(&mut self) {
        log::debug!("releasing triangle buffer ({} triangles)", self.count);
        self.buffer.destroy();
    }
}

/// Byte size of `count` triangles, checked against the device's buffer limits.
fn checked_size(count: usize, limits: &wgpu::Limits) -> Result<u64, ResourceError> {
    if count == 0 {
        return Err(ResourceError::EmptyTriangleBuffer);
    }

    let max = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
    let size = (count as u64).saturating_mul(Triangle::SIZE);
    if size > max {
        return Err(ResourceError::BufferTooLarge { size, max });
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::*;
    use crate::geometry::triangulate;
    use crate::mesh::Mesh;
    use crate::test_support::{headless, read_buffer};

    fn limits(binding: u64, buffer: u64) -> wgpu::Limits {
        wgpu::Limits {
            max_storage_buffer_binding_size: binding.try_into().unwrap(),
            max_buffer_size: buffer,
            ..wgpu::Limits::default()
        }
    }

    #[test]
    fn empty_soup_is_rejected() {
        assert_eq!(
            checked_size(0, &wgpu::Limits::default()),
            Err(ResourceError::EmptyTriangleBuffer)
        );
    }

    #[test]
    fn size_is_count_times_stride() {
        assert_eq!(checked_size(12, &wgpu::Limits::default()), Ok(432));
    }

    #[test]
    fn smaller_of_the_two_limits_applies() {
        assert_eq!(
            checked_size(4, &limits(100, 1 << 20)),
            Err(ResourceError::BufferTooLarge { size: 144, max: 100 })
        );
        assert_eq!(
            checked_size(4, &limits(1 << 20, 72)),
            Err(ResourceError::BufferTooLarge { size: 144, max: 72 })
        );
        assert_eq!(checked_size(2, &limits(72, 72)), Ok(72));
    }

    #[test]
    fn uploaded_bytes_match_triangles() {
        let Some(gpu) = headless() else { return };
        let tris = triangulate(&Mesh::unit_cube(), &Mat4::from_translation(Vec3::X)).unwrap();

        let buf = TriangleBuffer::upload(gpu.device(), "test", &tris).unwrap();
        assert_eq!(buf.count(), 12);
        assert_eq!(buf.size_bytes(), 12 * Triangle::SIZE);

        // STORAGE-only buffers cannot be mapped; copy out through a staging buffer.
        let bytes = read_buffer(&gpu, buf.buffer());
        let back: &[Triangle] = bytemuck::cast_slice(&bytes);
        assert_eq!(back, tris.as_slice());
    }
}
