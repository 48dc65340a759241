use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation token handed into background tasks. Tasks check it before
/// each side-effecting continuation; once the owner dies, the rest of the
/// task is a no-op rather than a mutation of torn-down state.
#[derive(Clone)]
pub struct Liveness {
    alive: Arc<AtomicBool>,
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

impl Liveness {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn kill(&self) {
        self.alive.store(false, Ordering::Release);
    }
}
