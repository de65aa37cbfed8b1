use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation observed by long-running bakes.
///
/// Implementations are polled, never waited on, and may be polled concurrently from several
/// worker threads.
pub trait AbortSignal: Sync {
    fn should_abort(&self) -> bool;
}

impl AbortSignal for AtomicBool {
    fn should_abort(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<T: AbortSignal + Send + ?Sized> AbortSignal for Arc<T> {
    fn should_abort(&self) -> bool {
        self.as_ref().should_abort()
    }
}

/// Signal that never requests cancellation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverAbort;

impl AbortSignal for NeverAbort {
    fn should_abort(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_flag_reports_latest_store() {
        let flag = Arc::new(AtomicBool::new(false));
        assert!(!flag.should_abort());
        flag.store(true, Ordering::Relaxed);
        assert!(flag.should_abort());
        assert!(!NeverAbort.should_abort());
    }
}
