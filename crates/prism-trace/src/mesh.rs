use glam::Vec3;

/// Indexed triangle mesh in object space.
///
/// Content is not validated on construction; [`triangulate`](crate::geometry::triangulate)
/// rejects malformed index lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Number of whole triangles described by the index list.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned cube of edge length 1 centered on the origin.
    ///
    /// 8 shared corners, 12 triangles, counter-clockwise when viewed from outside.
    pub fn unit_cube() -> Self {
        let h = 0.5;
        let vertices = vec![
            Vec3::new(-h, -h, -h), // 0
            Vec3::new(h, -h, -h),  // 1
            Vec3::new(h, h, -h),   // 2
            Vec3::new(-h, h, -h),  // 3
            Vec3::new(-h, -h, h),  // 4
            Vec3::new(h, -h, h),   // 5
            Vec3::new(h, h, h),    // 6
            Vec3::new(-h, h, h),   // 7
        ];
        #[rustfmt::skip]
        let indices = vec![
            4, 5, 6,  4, 6, 7, // +z
            1, 0, 3,  1, 3, 2, // -z
            5, 1, 2,  5, 2, 6, // +x
            0, 4, 7,  0, 7, 3, // -x
            7, 6, 2,  7, 2, 3, // +y
            0, 1, 5,  0, 5, 4, // -y
        ];
        Self { vertices, indices }
    }

    /// Axis-aligned quad in the XZ plane at y = 0, facing +Y.
    pub fn ground_plane(half_extent: f32) -> Self {
        let e = half_extent;
        Self {
            vertices: vec![
                Vec3::new(-e, 0.0, -e),
                Vec3::new(-e, 0.0, e),
                Vec3::new(e, 0.0, e),
                Vec3::new(e, 0.0, -e),
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    /// Appends `other`, rebasing its indices onto this mesh's vertex list.
    pub fn append(&mut self, other: &Mesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_normal(m: &Mesh, t: usize) -> Vec3 {
        let [a, b, c] = [0, 1, 2].map(|j| m.vertices[m.indices[3 * t + j] as usize]);
        (b - a).cross(c - a).normalize()
    }

    #[test]
    fn unit_cube_shape() {
        let cube = Mesh::unit_cube();
        assert_eq!(cube.vertices.len(), 8);
        assert_eq!(cube.indices.len(), 36);
        assert_eq!(cube.triangle_count(), 12);
    }

    #[test]
    fn unit_cube_faces_point_outward() {
        let cube = Mesh::unit_cube();
        for t in 0..cube.triangle_count() {
            let centroid = [0, 1, 2]
                .map(|j| cube.vertices[cube.indices[3 * t + j] as usize])
                .into_iter()
                .sum::<Vec3>()
                / 3.0;
            assert!(face_normal(&cube, t).dot(centroid) > 0.0, "triangle {t} faces inward");
        }
    }

    #[test]
    fn ground_plane_faces_up() {
        let plane = Mesh::ground_plane(2.0);
        assert_eq!(plane.triangle_count(), 2);
        for t in 0..2 {
            assert!(face_normal(&plane, t).abs_diff_eq(Vec3::Y, 1e-6));
        }
    }

    #[test]
    fn append_rebases_indices() {
        let mut scene = Mesh::unit_cube();
        scene.append(&Mesh::ground_plane(1.0));
        assert_eq!(scene.vertices.len(), 12);
        assert_eq!(scene.triangle_count(), 14);
        assert_eq!(&scene.indices[36..], &[8, 9, 10, 8, 10, 11]);
    }
}
