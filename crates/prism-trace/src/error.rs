//! Error taxonomy for the tracer.
//!
//! Geometry and resource errors abort initialization and leave the tracer inert.
//! Device errors come from the graphics layer and are only surfaced, never retried.

use thiserror::Error;

/// Malformed mesh content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("index count {count} is not a multiple of 3")]
    IndexCountNotMultipleOfThree { count: usize },

    #[error("triangle {triangle}: vertex index {index} out of bounds (vertex count: {vertex_count})")]
    IndexOutOfBounds {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },
}

/// GPU resource allocation, binding and release failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("mesh has no triangles; refusing to allocate an empty triangle buffer")]
    EmptyTriangleBuffer,

    #[error("triangle buffer of {size} bytes exceeds the device limit of {max} bytes")]
    BufferTooLarge { size: u64, max: u64 },

    #[error("kernel has no resource slot named {0:?}")]
    UnknownSlot(String),

    #[error("render target must be non-empty, got {width}x{height}")]
    EmptyTarget { width: u32, height: u32 },

    #[error("render target {width}x{height} exceeds the device limit of {max} texels per side")]
    TargetTooLarge { width: u32, height: u32, max: u32 },

    #[error("render target texture lacks {missing:?} usage")]
    TargetUsage { missing: wgpu::TextureUsages },

    #[error("render target format is {actual:?}, kernel writes {expected:?}")]
    TargetFormat {
        expected: wgpu::TextureFormat,
        actual: wgpu::TextureFormat,
    },

    #[error("kernel failed to compile: {0}")]
    KernelCompile(String),

    #[error("resource already acquired; release it before acquiring another")]
    AlreadyAcquired,
}

/// Failures reported by the graphics device itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("GPU device lost: {0}")]
    Lost(String),
}

/// Umbrella error returned by [`Tracer`](crate::Tracer) operations.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("tracer is not initialized")]
    NotInitialized,

    #[error("tracer is already initialized")]
    AlreadyInitialized,

    #[error("tracer has been torn down")]
    Destroyed,
}

pub type Result<T, E = TraceError> = std::result::Result<T, E>;
