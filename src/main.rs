use dotenvy::dotenv;
use shopfront::core::catalogue;
use shopfront::errors::Result;
use shopfront::{config, db};
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Bootstraps the store: opens (creating if needed) the database and seeds
/// the catalogue from config.toml. The web frontend is a separate concern
/// and attaches to the same database.
#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file (as early as possible)
    dotenv().ok(); // Non-fatal, env vars can be set externally
    info!("Attempted to load .env file.");

    // 3. Load the application configuration; a missing config.toml means
    // defaults with an empty seed list.
    let app_config = if Path::new("config.toml").exists() {
        config::load_default_config()
            .inspect_err(|e| error!("Failed to load configuration: {}", e))?
    } else {
        info!("No config.toml found; using defaults.");
        config::AppConfig::default()
    };

    // 4. Initialize database
    let db_path = app_config.database_path();
    if let Some(parent) = Path::new(&db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let db_pool = db::init_db(&db_path)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed the catalogue from configuration (idempotent by name)
    let inserted = catalogue::seed_catalogue(&db_pool, &app_config.products)
        .await
        .inspect_err(|e| error!("Failed to seed catalogue: {}", e))?;

    let listing = catalogue::storefront_listing(&db_pool).await?;
    info!(
        "Store ready: {} product(s) in catalogue ({} newly seeded).",
        listing.len(),
        inserted
    );

    Ok(())
}
