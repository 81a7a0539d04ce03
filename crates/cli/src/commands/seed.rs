//! Catalog seeding command.
//!
//! Inserts (or refreshes, keyed by slug) the standard millet product range.
//! Safe to run repeatedly: `upsert` keeps existing product ids, so carts
//! referencing them stay valid.
//!
//! # Usage
//!
//! ```bash
//! mb-cli seed
//! ```

use rust_decimal::Decimal;
use tracing::info;

use millet_basket_storefront::db::{self, ProductDraft, ProductStore};

/// Seed the catalog with the standard millet product range.
///
/// # Errors
///
/// Returns an error if the database URL is missing or a write fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let database_url = super::database_url()?;

    info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;
    let store = ProductStore::postgres(pool);

    let drafts = catalog();
    let count = drafts.len();
    for draft in drafts {
        let product = store.upsert(draft).await?;
        info!(slug = %product.slug, id = %product.id, "seeded product");
    }

    info!("Seeding complete, {count} products in the catalog");
    Ok(())
}

fn catalog() -> Vec<ProductDraft> {
    vec![
        draft(
            "ragi-flour",
            "Ragi Flour (Finger Millet)",
            "Stone-ground finger millet flour, rich in calcium and iron.",
            "flour",
            100,
            Some(150),
            &["500g", "1kg"],
            Some(r#"{"500g":{"price":"100","comparePrice":"150"},"1kg":{"price":"180","comparePrice":"260"}}"#),
            Some(50),
        ),
        draft(
            "jowar-flakes",
            "Jowar Flakes (Sorghum)",
            "Crisp sorghum flakes for breakfast bowls and upma.",
            "flakes",
            80,
            None,
            &["250g", "500g"],
            Some(r#"{"250g":{"price":"80"},"500g":{"price":"150"}}"#),
            Some(30),
        ),
        draft(
            "bajra-flour",
            "Bajra Flour (Pearl Millet)",
            "Coarse pearl millet flour for rotis and bhakris.",
            "flour",
            90,
            Some(110),
            &["500g", "1kg"],
            Some(r#"{"500g":{"price":"90","comparePrice":"110"},"1kg":{"price":"170","comparePrice":"210"}}"#),
            Some(40),
        ),
        draft(
            "little-millet",
            "Little Millet (Samai)",
            "Whole little millet grain, a rice substitute that cooks in 15 minutes.",
            "grain",
            120,
            None,
            &["500g", "1kg"],
            Some(r#"{"500g":{"price":"120"},"1kg":{"price":"230"}}"#),
            Some(25),
        ),
        draft(
            "foxtail-millet",
            "Foxtail Millet (Thinai)",
            "Whole foxtail millet grain for pongal, khichdi, and pulao.",
            "grain",
            110,
            Some(130),
            &["500g", "1kg"],
            Some(r#"{"500g":{"price":"110","comparePrice":"130"},"1kg":{"price":"210","comparePrice":"250"}}"#),
            Some(35),
        ),
        draft(
            "millet-dosa-mix",
            "Millet Dosa Mix",
            "Ready-to-soak multi-millet dosa batter mix.",
            "mix",
            140,
            Some(160),
            &["500g"],
            Some(r#"{"500g":{"price":"140","comparePrice":"160"}}"#),
            None,
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn draft(
    slug: &str,
    name: &str,
    description: &str,
    category: &str,
    price: i64,
    compare_price: Option<i64>,
    weight_options: &[&str],
    weight_prices: Option<&str>,
    stock_quantity: Option<u32>,
) -> ProductDraft {
    ProductDraft {
        slug: slug.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        image_url: Some(format!("/images/products/{slug}.jpg")),
        category: Some(category.to_string()),
        price: Decimal::from(price),
        compare_price: compare_price.map(Decimal::from),
        weight_options: weight_options.iter().map(ToString::to_string).collect(),
        weight_prices: weight_prices.map(str::to_owned),
        stock_quantity,
        reviews: None,
    }
}
