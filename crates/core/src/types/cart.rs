//! Cart line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::product::Product;

/// One product-and-quantity pair within the cart.
///
/// A line snapshots the product fields the cart needs for display and
/// totals at the moment the product is added; later catalog changes do not
/// flow back into existing lines. The whole list is what the cart store
/// persists.
///
/// ## Invariants
///
/// - `product_id` is unique within a cart (the store merges on add)
/// - `quantity` is always >= 1 (zero or negative means removal)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    pub price: Decimal,
    pub final_price: Decimal,
    #[serde(default)]
    pub discount_percentage: Decimal,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub in_stock: bool,
    pub quantity: u32,
}

impl CartLine {
    /// Build a line from a catalog product, clamping the quantity to the
    /// line invariant.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            image_url: product.image_url.clone(),
            price: product.price,
            final_price: product.final_price,
            discount_percentage: product.discount_percentage,
            brand: product.brand.clone(),
            stock: product.stock,
            in_stock: product.in_stock,
            quantity: quantity.max(1),
        }
    }

    /// `final_price * quantity` for this line.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.final_price * Decimal::from(self.quantity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: &str, final_price: Decimal) -> Product {
        Product {
            id: id.to_owned(),
            name: format!("Product {id}"),
            description: String::new(),
            price: final_price,
            category: String::new(),
            stock: 5,
            image_url: String::new(),
            brand: String::new(),
            discount_percentage: Decimal::ZERO,
            final_price,
            in_stock: true,
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_from_product_clamps_quantity() {
        let line = CartLine::from_product(&product("p-1", Decimal::TEN), 0);
        assert_eq!(line.quantity, 1);
    }

    #[test]
    fn test_subtotal() {
        let line = CartLine::from_product(&product("p-1", Decimal::TEN), 2);
        assert_eq!(line.subtotal(), Decimal::from(20));
    }

    #[test]
    fn test_persisted_roundtrip() {
        let line = CartLine::from_product(&product("p-1", Decimal::new(1999, 2)), 3);
        let json = serde_json::to_string(&line).unwrap();
        let back: CartLine = serde_json::from_str(&json).unwrap();
        assert_eq!(back, line);
    }
}
