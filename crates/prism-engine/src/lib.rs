//! Prism engine crate.
//!
//! Platform + GPU runtime pieces (device, window loop, frame timing, logging)
//! used by the tracer and the viewer.

pub mod core;
pub mod device;
pub mod logging;
pub mod render;
pub mod time;
pub mod window;
