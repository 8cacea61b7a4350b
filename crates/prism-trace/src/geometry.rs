//! Mesh → world-space triangle soup.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::error::GeometryError;
use crate::mesh::Mesh;

/// One world-space triangle as the kernel reads it: 9 tightly packed floats.
///
/// Matches `struct Triangle { v0: array<f32, 3>, v1: array<f32, 3>, v2: array<f32, 3> }`
/// in WGSL (stride 36; `vec3<f32>` would pad to 48).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Triangle {
    pub v0: [f32; 3],
    pub v1: [f32; 3],
    pub v2: [f32; 3],
}

const _: () = assert!(std::mem::size_of::<Triangle>() == 9 * std::mem::size_of::<f32>());

impl Triangle {
    pub const SIZE: u64 = std::mem::size_of::<Triangle>() as u64;

    #[inline]
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self {
            v0: v0.to_array(),
            v1: v1.to_array(),
            v2: v2.to_array(),
        }
    }

    #[inline]
    pub fn vertices(&self) -> [Vec3; 3] {
        [self.v0, self.v1, self.v2].map(Vec3::from_array)
    }
}

/// Flattens `mesh` into world-space triangles.
///
/// Every consecutive index triple becomes one [`Triangle`], in index order, with each
/// vertex transformed as a point (translation applied). The whole index list is
/// validated before any triangle is produced, so an error never yields partial data.
pub fn triangulate(mesh: &Mesh, local_to_world: &Mat4) -> Result<Vec<Triangle>, GeometryError> {
    validate(mesh)?;

    let tris = mesh
        .indices
        .chunks_exact(3)
        .map(|tri| {
            let [a, b, c] = [tri[0], tri[1], tri[2]]
                .map(|i| local_to_world.transform_point3(mesh.vertices[i as usize]));
            Triangle::new(a, b, c)
        })
        .collect();

    Ok(tris)
}

fn validate(mesh: &Mesh) -> Result<(), GeometryError> {
    let count = mesh.indices.len();
    if count % 3 != 0 {
        return Err(GeometryError::IndexCountNotMultipleOfThree { count });
    }

    let vertex_count = mesh.vertices.len();
    match mesh
        .indices
        .iter()
        .position(|&i| i as usize >= vertex_count)
    {
        Some(pos) => Err(GeometryError::IndexOutOfBounds {
            triangle: pos / 3,
            index: mesh.indices[pos],
            vertex_count,
        }),
        None => Ok(()),
    }
}
