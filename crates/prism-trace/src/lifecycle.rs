//! Tracer lifecycle: `Uninitialized → Initialized → Active → Destroyed`.

use crate::error::TraceError;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    /// Nothing allocated; `init` may run.
    #[default]
    Uninitialized,
    /// Buffers created and kernel parameters bound; no frame dispatched yet.
    Initialized,
    /// At least one frame dispatched.
    Active,
    /// Resources released. Terminal.
    Destroyed,
}

/// Guards the legal transitions. Holds no resources itself.
#[derive(Debug, Default)]
pub struct Lifecycle {
    phase: Phase,
}

impl Lifecycle {
    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Checks that `init` may start.
    pub fn check_init(&self) -> Result<(), TraceError> {
        match self.phase {
            Phase::Uninitialized => Ok(()),
            Phase::Initialized | Phase::Active => Err(TraceError::AlreadyInitialized),
            Phase::Destroyed => Err(TraceError::Destroyed),
        }
    }

    /// Records a fully successful `init`.
    pub fn commit_init(&mut self) {
        debug_assert_eq!(self.phase, Phase::Uninitialized);
        self.phase = Phase::Initialized;
    }

    /// Checks that a frame may be dispatched.
    pub fn check_tick(&self) -> Result<(), TraceError> {
        match self.phase {
            Phase::Initialized | Phase::Active => Ok(()),
            Phase::Uninitialized => Err(TraceError::NotInitialized),
            Phase::Destroyed => Err(TraceError::Destroyed),
        }
    }

    /// Records a dispatched frame.
    pub fn commit_tick(&mut self) {
        if self.phase == Phase::Initialized {
            self.phase = Phase::Active;
        }
    }

    /// Moves to `Destroyed`. Returns the phase left, or `None` if already destroyed.
    pub fn destroy(&mut self) -> Option<Phase> {
        match self.phase {
            Phase::Destroyed => None,
            prev => {
                self.phase = Phase::Destroyed;
                Some(prev)
            }
        }
    }
}
