pub mod couriers;
pub mod db;
pub mod orders;

use std::{env, str::FromStr, time::Duration};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};

pub use db::SqliteDatabase;

use crate::db::traits::FulfillmentError;

const SQLITE_DB_URL: &str = "sqlite://data/gfs_store.db";

pub fn db_url() -> String {
    let result = env::var("GFS_DATABASE_URL").unwrap_or_else(|_| {
        info!("GFS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, FulfillmentError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
