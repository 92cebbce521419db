//! Reentrancy guard held across calls into the token service

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::LedgerError;

/// Non-blocking exclusive flag. `acquire` fails immediately if already held.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: AtomicBool,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> Result<GuardScope<'_>, LedgerError> {
        self.entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| LedgerError::ReentrantCall)?;
        Ok(GuardScope { guard: self })
    }

    pub fn is_held(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }

    fn release(&self) {
        self.entered.store(false, Ordering::Release);
    }
}

/// Held guard; released on drop, including early returns
#[derive(Debug)]
pub struct GuardScope<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for GuardScope<'_> {
    fn drop(&mut self) {
        self.guard.release();
    }
}
