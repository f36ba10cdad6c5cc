//! Catalog commands: list, search, browse by category, show one product.

use tracing::info;

use sokoni_core::{Product, ProductPage, total_pages};

use super::Context;

/// List one page of the catalog.
///
/// # Errors
///
/// Returns an error if configuration fails to load or the fetch fails.
pub async fn list(page: u32, page_size: u32) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load()?;
    let result = ctx.catalog().fetch_products(page, page_size).await?;
    print_page("Products", page, page_size, &result);
    Ok(())
}

/// Search the catalog.
///
/// # Errors
///
/// Returns an error if configuration fails to load or the search fails.
pub async fn search(
    query: &str,
    page: u32,
    page_size: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load()?;
    match ctx.catalog().search_products(query, page, page_size).await? {
        Some(result) => {
            print_page(&format!("Results for \"{}\"", query.trim()), page, page_size, &result);
        }
        None => info!("Nothing to search for"),
    }
    Ok(())
}

/// List one page of a category.
///
/// # Errors
///
/// Returns an error if configuration fails to load or the fetch fails.
pub async fn category(
    category: &str,
    page: u32,
    page_size: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load()?;
    let result = ctx
        .catalog()
        .fetch_by_category(category, page, page_size)
        .await?;
    print_page(&format!("Category \"{category}\""), page, page_size, &result);
    Ok(())
}

/// Show one product in full.
///
/// # Errors
///
/// Returns an error if configuration fails to load, the fetch fails, or no
/// product has the given id.
pub async fn show(id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load()?;
    let product = ctx
        .catalog()
        .fetch_product(id)
        .await?
        .ok_or_else(|| format!("Product not found: {id}"))?;

    info!("{}", product.name);
    info!("  Id: {}", product.id);
    if !product.description.is_empty() {
        info!("  Description: {}", product.description);
    }
    if !product.category.is_empty() {
        info!("  Category: {}", product.category);
    }
    if !product.brand.is_empty() {
        info!("  Brand: {}", product.brand);
    }
    if product.has_discount() {
        info!(
            "  Price: {} ({}% off, was {})",
            product.final_price, product.discount_percentage, product.price
        );
    } else {
        info!("  Price: {}", product.price);
    }
    info!("  Stock: {} ({})", product.stock, stock_label(&product));
    if !product.image_url.is_empty() {
        info!("  Image: {}", product.image_url);
    }
    Ok(())
}

fn print_page(heading: &str, page: u32, page_size: u32, result: &ProductPage) {
    let pages = total_pages(result.total, page_size);
    info!("{heading} (page {page} of {pages}, {} total)", result.total);
    if result.products.is_empty() {
        info!("  (no products)");
        return;
    }
    for product in &result.products {
        info!(
            "  {} - {} ({}) [{}]",
            product.id,
            product.name,
            product.final_price,
            stock_label(product)
        );
    }
}

fn stock_label(product: &Product) -> &'static str {
    if product.in_stock {
        "in stock"
    } else {
        "out of stock"
    }
}
