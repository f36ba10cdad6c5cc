//! Product as served by the catalog endpoints.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A catalog product, consumed as the backend serves it.
///
/// `final_price` and `in_stock` are computed server-side (discount applied,
/// stock and active flag combined) and are trusted as received; the console
/// never recomputes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Backend-issued identifier (opaque string).
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub discount_percentage: Decimal,
    /// Price after discount, as computed by the backend.
    #[serde(default)]
    pub final_price: Decimal,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Whether the backend applied a discount to this product.
    #[must_use]
    pub fn has_discount(&self) -> bool {
        self.discount_percentage > Decimal::ZERO
    }
}
