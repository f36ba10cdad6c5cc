//! Cart store: persisted line items and their derived totals.

use std::sync::{Arc, Mutex, PoisonError};

use rust_decimal::Decimal;
use tracing::warn;

use sokoni_core::{CartLine, Product};

use crate::storage::{SharedKv, keys};

struct CartInner {
    kv: SharedKv,
    lines: Mutex<Vec<CartLine>>,
}

/// Owns the in-memory, persisted list of cart lines.
///
/// Every operation is synchronous and ends in a best-effort write of the
/// whole list through the persistence port; a write failure is logged and
/// never surfaced, so the in-memory cart stays usable.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

impl CartStore {
    /// Create a store, eagerly loading any persisted lines.
    ///
    /// A payload that no longer parses is logged and treated as an empty
    /// cart.
    #[must_use]
    pub fn new(kv: SharedKv) -> Self {
        let lines = match kv.get(keys::CART) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(lines) => lines,
                Err(e) => {
                    warn!(error = %e, "discarding unreadable persisted cart");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to read persisted cart");
                Vec::new()
            }
        };

        Self {
            inner: Arc::new(CartInner {
                kv,
                lines: Mutex::new(lines),
            }),
        }
    }

    /// Add `quantity` of `product`: merges into an existing line for the
    /// same product id, or appends a new one.
    pub fn add_item(&self, product: &Product, quantity: u32) {
        let mut lines = self.lock();
        if let Some(line) = lines.iter_mut().find(|l| l.product_id == product.id) {
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            lines.push(CartLine::from_product(product, quantity));
        }
        self.persist(&lines);
    }

    /// Remove the line for `product_id`; no-op when absent.
    pub fn remove_item(&self, product_id: &str) {
        let mut lines = self.lock();
        lines.retain(|l| l.product_id != product_id);
        self.persist(&lines);
    }

    /// Overwrite the line's quantity; `quantity <= 0` removes the line.
    /// No-op when `product_id` is absent.
    pub fn set_quantity(&self, product_id: &str, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(product_id);
            return;
        }

        let mut lines = self.lock();
        if let Some(line) = lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
            self.persist(&lines);
        }
    }

    /// Increase the line's quantity by one; no-op when absent.
    pub fn increment_quantity(&self, product_id: &str) {
        let mut lines = self.lock();
        if let Some(line) = lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = line.quantity.saturating_add(1);
            self.persist(&lines);
        }
    }

    /// Decrease the line's quantity by one, flooring at 1. A line at
    /// quantity 1 is left untouched, never auto-removed.
    pub fn decrement_quantity(&self, product_id: &str) {
        let mut lines = self.lock();
        if let Some(line) = lines
            .iter_mut()
            .find(|l| l.product_id == product_id && l.quantity > 1)
        {
            line.quantity -= 1;
            self.persist(&lines);
        }
    }

    /// Empty the cart.
    pub fn clear(&self) {
        let mut lines = self.lock();
        lines.clear();
        self.persist(&lines);
    }

    // =========================================================================
    // Derived state
    // =========================================================================

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.lock().iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Sum of `final_price * quantity` across all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lock().iter().map(CartLine::subtotal).sum()
    }

    /// Snapshot of the current lines.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.lock().clone()
    }

    /// True when the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CartLine>> {
        self.inner
            .lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Best-effort write of the whole list through the persistence port.
    fn persist(&self, lines: &[CartLine]) {
        match serde_json::to_string(lines) {
            Ok(json) => {
                if let Err(e) = self.inner.kv.set(keys::CART, &json) {
                    warn!(error = %e, "failed to persist cart");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize cart"),
        }
    }
}
