use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Device-loss tracker shared between wgpu's callback thread and the frame loop.
///
/// wgpu reports loss asynchronously; nothing in the frame loop can recover from it,
/// so consumers only poll [`DeviceHealth::is_lost`] and surface the reason.
#[derive(Debug, Default)]
pub struct DeviceHealth {
    lost: AtomicBool,
    reason: Mutex<Option<String>>,
}

impl DeviceHealth {
    /// Installs the device-lost callback on `device` and returns the shared tracker.
    pub fn watch(device: &wgpu::Device) -> Arc<Self> {
        let health = Arc::new(Self::default());
        let sink = Arc::clone(&health);

        device.set_device_lost_callback(move |reason, message| {
            log::error!("GPU device lost ({reason:?}): {message}");
            sink.mark_lost(format!("{reason:?}: {message}"));
        });

        health
    }

    /// Records a loss. The first reason wins.
    pub fn mark_lost(&self, reason: impl Into<String>) {
        if self.lost.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Ok(mut slot) = self.reason.lock() {
            *slot = Some(reason.into());
        }
    }

    #[inline]
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    /// Returns the recorded loss reason, if any.
    pub fn lost_reason(&self) -> Option<String> {
        if !self.is_lost() {
            return None;
        }
        self.reason
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
            .or_else(|| Some("unknown".to_string()))
    }
}
