//! Client-side state containers.
//!
//! Each store exclusively owns its slice of state and is a cheap-clone
//! handle over shared inner state. Network-calling actions return per-call
//! `Result`s; a store additionally keeps an advisory last-error string and
//! an in-flight counter for display surfaces.

pub mod cart;
pub mod catalog;
pub mod session;

pub use cart::CartStore;
pub use catalog::CatalogStore;
pub use session::{SessionError, SessionStore};

use std::sync::atomic::{AtomicU32, Ordering};

/// RAII marker for one in-flight action.
///
/// Increments the store's counter on creation and decrements it when the
/// action's future completes or is dropped, so `busy()` never sticks.
pub(crate) struct BusyGuard<'a> {
    counter: &'a AtomicU32,
}

impl<'a> BusyGuard<'a> {
    pub(crate) fn enter(counter: &'a AtomicU32) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self { counter }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_guard_balances_counter() {
        let counter = AtomicU32::new(0);
        {
            let _outer = BusyGuard::enter(&counter);
            let _inner = BusyGuard::enter(&counter);
            assert_eq!(counter.load(Ordering::Relaxed), 2);
        }
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }
}
