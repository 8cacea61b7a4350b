//! Exactly-once ownership of GPU resources.

use crate::error::ResourceError;

/// A resource whose GPU memory can be freed explicitly.
pub trait Release {
    fn release(&mut self);
}

impl Release for wgpu::Buffer {
    fn release(&mut self) {
        self.destroy();
    }
}

#[derive(Debug)]
enum Slot<R> {
    Empty,
    Held(R),
    Released,
}

/// Holds at most one resource and releases it exactly once.
///
/// `release` before anything was acquired is a no-op, and so is every `release`
/// after the first. Dropping the owner releases a still-held resource.
#[derive(Debug)]
pub struct ResourceOwner<R: Release> {
    slot: Slot<R>,
}

impl<R: Release> ResourceOwner<R> {
    pub fn new() -> Self {
        Self { slot: Slot::Empty }
    }

    /// Takes ownership of `resource`.
    ///
    /// Only an empty owner accepts a resource. A rejected resource is released
    /// immediately so creation and release stay paired.
    pub fn acquire(&mut self, mut resource: R) -> Result<(), ResourceError> {
        if !matches!(self.slot, Slot::Empty) {
            resource.release();
            return Err(ResourceError::AlreadyAcquired);
        }
        self.slot = Slot::Held(resource);
        Ok(())
    }

    pub fn get(&self) -> Option<&R> {
        match &self.slot {
            Slot::Held(r) => Some(r),
            _ => None,
        }
    }

    #[inline]
    pub fn is_held(&self) -> bool {
        matches!(self.slot, Slot::Held(_))
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        matches!(self.slot, Slot::Released)
    }

    /// Releases the held resource. Returns whether anything was released.
    pub fn release(&mut self) -> bool {
        match std::mem::replace(&mut self.slot, Slot::Released) {
            Slot::Held(mut r) => {
                r.release();
                true
            }
            Slot::Empty => {
                self.slot = Slot::Empty;
                false
            }
            Slot::Released => false,
        }
    }
}

impl<R: Release> Default for ResourceOwner<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Release> Drop for ResourceOwner<R> {
    fn drop(&mut self) {
        self.release();
    }
}
