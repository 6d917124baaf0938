//! Catalogue seed entries from config.toml
//!
//! Products listed under `[[products]]` are inserted into the catalogue on
//! startup if no product with the same name exists yet. Prices are given
//! in minor currency units (e.g. pence), matching the products table.

use serde::Deserialize;

/// Configuration for a single seeded product
#[derive(Debug, Deserialize, Clone)]
pub struct ProductSeed {
    /// Display name of the product
    pub name: String,
    /// Longer description shown on the product detail page
    pub description: String,
    /// Unit price in minor currency units
    pub price: i64,
    /// Initial stock level
    pub stock: i64,
    /// Optional image reference (filename in the upload store)
    #[serde(default)]
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_product_seed() {
        let toml_str = r#"
            name = "T-shirt"
            description = "Plain cotton tee"
            price = 1499
            stock = 25
        "#;

        let seed: ProductSeed = toml::from_str(toml_str).unwrap();
        assert_eq!(seed.name, "T-shirt");
        assert_eq!(seed.price, 1499);
        assert_eq!(seed.stock, 25);
        assert!(seed.image.is_none());
    }
}
