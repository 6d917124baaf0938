//! Catalogue reads and helpers.
//!
//! Thin wrappers over `db::products` for the storefront listing and
//! product detail pages, plus price formatting and the config-driven
//! catalogue seeding run at startup.

use crate::config::catalogue::ProductSeed;
use crate::db::{self, DbPool};
use crate::errors::{Error, Result};
use crate::models::Product;
use tracing::{debug, info, instrument};

/// All products for the public listing, most recently added first.
///
/// # Errors
///
/// Returns `Error::Database` on any storage failure.
pub async fn storefront_listing(pool: &DbPool) -> Result<Vec<Product>> {
    db::list_products(pool).await
}

/// A single product for the detail page.
///
/// # Errors
///
/// Returns `Error::ProductNotFound` if no product has the given id.
/// Returns `Error::Database` on any storage failure.
pub async fn product_detail(pool: &DbPool, product_id: i64) -> Result<Product> {
    db::get_product(pool, product_id)
        .await?
        .ok_or(Error::ProductNotFound { product_id })
}

/// Formats an amount of minor currency units for display, e.g. 850 ->
/// "8.50". Totals are computed in integers throughout; this is the only
/// point where a price becomes a decimal string.
pub fn format_price(minor_units: i64) -> String {
    format!("{}.{:02}", minor_units / 100, (minor_units % 100).abs())
}

/// Seeds the catalogue from the configured product entries.
///
/// Seeding is idempotent by product name: an entry whose name already
/// exists in the catalogue is skipped, so repeated startups don't
/// duplicate products or reset stock levels.
///
/// # Returns
///
/// Returns `Ok(usize)` with the number of products actually inserted.
///
/// # Errors
///
/// Returns `Error::Validation` if a seed entry carries a negative price
/// or stock.
/// Returns `Error::Database` on any storage failure.
#[instrument(skip(pool, seeds))]
pub async fn seed_catalogue(pool: &DbPool, seeds: &[ProductSeed]) -> Result<usize> {
    let mut inserted = 0;
    for seed in seeds {
        if db::get_product_by_name(pool, &seed.name).await?.is_some() {
            debug!("Seed product '{}' already present; skipping", seed.name);
            continue;
        }
        db::insert_product(
            pool,
            &seed.name,
            &seed.description,
            seed.price,
            seed.stock,
            seed.image.as_deref(),
        )
        .await?;
        inserted += 1;
    }
    info!(
        "Catalogue seeding complete: {} of {} entries inserted",
        inserted,
        seeds.len()
    );
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{init_test_tracing, setup_test_db};
    use crate::errors::Result;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(850), "8.50");
        assert_eq!(format_price(5), "0.05");
        assert_eq!(format_price(0), "0.00");
        assert_eq!(format_price(100), "1.00");
        assert_eq!(format_price(120_050), "1200.50");
    }

    #[tokio::test]
    async fn test_product_detail_not_found() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let result = product_detail(&pool, 42).await;
        assert!(matches!(
            result,
            Err(Error::ProductNotFound { product_id: 42 })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_seed_catalogue_idempotent() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let seeds = vec![
            ProductSeed {
                name: "Mug".to_string(),
                description: "Stoneware mug".to_string(),
                price: 850,
                stock: 40,
                image: None,
            },
            ProductSeed {
                name: "Poster".to_string(),
                description: "A2 print".to_string(),
                price: 1200,
                stock: 15,
                image: Some("poster.png".to_string()),
            },
        ];

        let inserted = seed_catalogue(&pool, &seeds).await?;
        assert_eq!(inserted, 2);

        // Mutate stock, then reseed: nothing is re-inserted or reset.
        let mug = db::get_product_by_name(&pool, "Mug").await?.unwrap();
        db::decrement_stock(&pool, mug.id, 5).await?;

        let reinserted = seed_catalogue(&pool, &seeds).await?;
        assert_eq!(reinserted, 0, "Reseeding inserts nothing");

        let mug_after = db::get_product_by_name(&pool, "Mug").await?.unwrap();
        assert_eq!(mug_after.stock, 35, "Reseeding does not reset stock");
        assert_eq!(storefront_listing(&pool).await?.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_storefront_listing_newest_first() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        db::insert_product(&pool, "Old", "d", 100, 1, None).await?;
        db::insert_product(&pool, "New", "d", 200, 2, None).await?;

        let listing = storefront_listing(&pool).await?;
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].name, "New");
        assert_eq!(listing[1].name, "Old");

        Ok(())
    }
}
