//! Test database setup and management
#![allow(dead_code)]

use sea_orm::{DatabaseConnection, DbErr};
use std::sync::Once;

static INIT_LOGGING: Once = Once::new();

/// Route `log` output through the test harness once per binary.
fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// A private in-memory SQLite database. Each call gets a fresh one.
pub async fn get_test_db() -> Result<DatabaseConnection, DbErr> {
    civicos::db::connect("sqlite::memory:").await
}

/// Setup test database - create the schema and reset process-global state
///
/// The politician detail cache and the rate limiter outlive a single test,
/// and ids restart at 1 in every fresh database, so both are cleared here.
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    init_logging();

    let db = get_test_db().await?;
    civicos::db::create_schema(&db).await?;

    civicos::cache::invalidate_all_politician_details();
    civicos::rate_limit::RATE_LIMITER.clear_all();

    Ok(db)
}
