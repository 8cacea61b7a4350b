//! Camera description and its kernel uniform layout.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Pinhole camera, passed explicitly by the host every frame.
///
/// `forward`, `up` and `right` are expected to be an orthonormal basis; use
/// [`Camera::look_at`] to derive one. `fov_degrees` is the vertical field of view.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    pub fov_degrees: f32,
}

impl Camera {
    /// Builds a right-handed basis looking from `position` toward `target`.
    ///
    /// When the view direction is parallel to `up_hint`, the world X axis is used as
    /// `right` so the basis stays finite.
    pub fn look_at(position: Vec3, target: Vec3, up_hint: Vec3, fov_degrees: f32) -> Self {
        let forward = (target - position).try_normalize().unwrap_or(Vec3::NEG_Z);
        let right = forward.cross(up_hint).try_normalize().unwrap_or(Vec3::X);
        let up = right.cross(forward);
        Self {
            position,
            forward,
            up,
            right,
            fov_degrees,
        }
    }

    /// Camera on a circle of `radius` around `center` at `height`, looking at `center`.
    pub fn orbit(center: Vec3, radius: f32, height: f32, angle: f32, fov_degrees: f32) -> Self {
        let offset = Vec3::new(angle.sin() * radius, height, angle.cos() * radius);
        Self::look_at(center + offset, center, Vec3::Y, fov_degrees)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::look_at(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y, 60.0)
    }
}

/// Everything the kernel needs to generate primary rays: camera plus output size.
///
/// The resolution comes from the render target, not the window.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraParams {
    pub camera: Camera,
    pub resolution: (u32, u32),
}

impl CameraParams {
    pub fn new(camera: Camera, resolution: (u32, u32)) -> Self {
        Self { camera, resolution }
    }

    pub fn uniforms(&self) -> KernelUniforms {
        let c = &self.camera;
        KernelUniforms {
            pos: c.position.to_array(),
            _pad0: 0.0,
            forward: c.forward.to_array(),
            _pad1: 0.0,
            up: c.up.to_array(),
            _pad2: 0.0,
            right: c.right.to_array(),
            _pad3: 0.0,
            screen_size: Vec2::new(self.resolution.0 as f32, self.resolution.1 as f32).to_array(),
            fov: c.fov_degrees,
            _pad4: 0.0,
        }
    }
}

/// Uniform block bound at the `params` slot.
///
/// WGSL layout: each `vec3<f32>` is 16-byte aligned, `screenSize` sits at 64 and
/// `fov` at 72; the struct rounds up to 80 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct KernelUniforms {
    pub pos: [f32; 3],
    pub _pad0: f32,
    pub forward: [f32; 3],
    pub _pad1: f32,
    pub up: [f32; 3],
    pub _pad2: f32,
    pub right: [f32; 3],
    pub _pad3: f32,
    pub screen_size: [f32; 2],
    pub fov: f32,
    pub _pad4: f32,
}

impl KernelUniforms {
    pub const SIZE: u64 = std::mem::size_of::<KernelUniforms>() as u64;
}
