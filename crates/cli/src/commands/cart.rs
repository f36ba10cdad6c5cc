//! Cart commands. Every mutation persists through the shared state file,
//! so the cart survives between invocations and across sign-in state.

use tracing::info;

use sokoni_console::stores::CartStore;

use super::Context;

/// Fetch a product and add it to the cart.
///
/// # Errors
///
/// Returns an error if configuration fails to load, the product fetch
/// fails, or no product has the given id.
pub async fn add(product_id: &str, quantity: u32) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load()?;
    let product = ctx
        .catalog()
        .fetch_product(product_id)
        .await?
        .ok_or_else(|| format!("Product not found: {product_id}"))?;

    let cart = ctx.cart();
    cart.add_item(&product, quantity);
    info!("Added {} x{} to the cart", product.name, quantity.max(1));
    print_summary(&cart);
    Ok(())
}

/// Remove a product's line from the cart.
///
/// # Errors
///
/// Returns an error if configuration fails to load.
pub fn remove(product_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load()?;
    let cart = ctx.cart();
    cart.remove_item(product_id);
    info!("Removed {product_id} from the cart");
    print_summary(&cart);
    Ok(())
}

/// Set a cart line's quantity; zero (or less) removes the line.
///
/// # Errors
///
/// Returns an error if configuration fails to load.
pub fn set(product_id: &str, quantity: i64) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load()?;
    let cart = ctx.cart();
    cart.set_quantity(product_id, quantity);
    print_summary(&cart);
    Ok(())
}

/// Increase a cart line's quantity by one.
///
/// # Errors
///
/// Returns an error if configuration fails to load.
pub fn increment(product_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load()?;
    let cart = ctx.cart();
    cart.increment_quantity(product_id);
    print_summary(&cart);
    Ok(())
}

/// Decrease a cart line's quantity by one, flooring at one.
///
/// # Errors
///
/// Returns an error if configuration fails to load.
pub fn decrement(product_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load()?;
    let cart = ctx.cart();
    cart.decrement_quantity(product_id);
    print_summary(&cart);
    Ok(())
}

/// Show the cart lines and total.
///
/// # Errors
///
/// Returns an error if configuration fails to load.
pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load()?;
    let cart = ctx.cart();
    let lines = cart.lines();
    if lines.is_empty() {
        info!("Cart is empty");
        return Ok(());
    }

    info!("Cart");
    for line in &lines {
        info!(
            "  {} - {} x{} @ {} = {}",
            line.product_id,
            line.name,
            line.quantity,
            line.final_price,
            line.subtotal()
        );
    }
    info!("Total: {} ({} items)", cart.total(), cart.count());
    Ok(())
}

/// Remove every cart line.
///
/// # Errors
///
/// Returns an error if configuration fails to load.
pub fn clear() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load()?;
    ctx.cart().clear();
    info!("Cart cleared");
    Ok(())
}

fn print_summary(cart: &CartStore) {
    info!("Cart: {} items, total {}", cart.count(), cart.total());
}
