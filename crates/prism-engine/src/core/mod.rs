//! Core engine-facing contracts.
//!
//! The stable interface between the runtime (platform loop) and applications:
//! an explicit lifecycle (`on_start` / `on_frame` / `on_exit`) and a per-frame context.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
