//! One-shot ingestion run. Prints the report as JSON.

use anyhow::Context;
use civicos::app_config;
use civicos::ingest::fetch::HttpFetcher;
use civicos::ingest::IngestionPipeline;
use env_logger::Env;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    app_config::init();

    let config = app_config::get_config();
    if config.server.database_url.is_empty() {
        anyhow::bail!("DATABASE_URL must be set.");
    }

    let db = civicos::db::connect(&config.server.database_url)
        .await
        .context("Failed to connect to the database")?;
    civicos::db::create_schema(&db)
        .await
        .context("Failed to create the database schema")?;

    let fetcher = HttpFetcher::new(&config.scraper).context("Failed to create the scraper client")?;
    let pipeline = IngestionPipeline::new(Arc::new(fetcher), config.ingest);

    let report = pipeline.run(&db).await.context("Ingestion run failed")?;

    let fallbacks = report.sources.iter().filter(|s| s.is_fallback()).count();
    if fallbacks > 0 {
        log::warn!("{} of {} sources used sample data", fallbacks, report.sources.len());
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
