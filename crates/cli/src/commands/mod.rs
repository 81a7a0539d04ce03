//! CLI command implementations.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;

/// Resolve the storefront database URL from the environment.
///
/// Prefers `STOREFRONT_DATABASE_URL`, falling back to `DATABASE_URL`,
/// matching how the storefront itself resolves it.
pub fn database_url() -> Result<SecretString, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "STOREFRONT_DATABASE_URL (or DATABASE_URL) not set".into())
}
