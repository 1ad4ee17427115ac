use std::time::Duration;

use crate::config::get_config;
use crate::error::Result;
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Sized for a handful of console operators plus the session sweeper,
/// not end-user traffic.
fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(8)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
}

pub async fn create_pool() -> Result<PgPool> {
    let config = get_config();
    let pool = pool_options().connect(&config.database_url).await?;
    Ok(pool)
}
