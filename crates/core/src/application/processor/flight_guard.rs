// Single-flight guard

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Holds an in-flight flag until dropped
///
/// The flag is cleared on drop, so a pass that unwinds cannot leave it set.
#[derive(Debug)]
pub struct FlightGuard {
    flag: Arc<AtomicBool>,
}

impl FlightGuard {
    /// Set the flag if it is clear; `None` if someone else holds it
    pub fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_drop() {
        let flag = Arc::new(AtomicBool::new(false));

        let guard = FlightGuard::acquire(&flag).unwrap();
        assert!(flag.load(Ordering::SeqCst));
        assert!(FlightGuard::acquire(&flag).is_none());

        drop(guard);
        assert!(!flag.load(Ordering::SeqCst));
        assert!(FlightGuard::acquire(&flag).is_some());
    }
}
