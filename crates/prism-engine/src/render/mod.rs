//! Renderer-facing handles.
//!
//! Renderers and compute drivers receive a [`RenderCtx`] (device, queue, surface
//! format, device health) and record into a [`SurfaceTarget`] (the frame's encoder
//! plus the swapchain view). Each renderer owns its own GPU resources.

mod ctx;

pub use ctx::{RenderCtx, SurfaceTarget};
