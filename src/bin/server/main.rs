use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use civicos::ai::AiClient;
use civicos::app_config;
use civicos::auth::JwtKeys;
use civicos::ingest::fetch::HttpFetcher;
use civicos::ingest::{IngestError, IngestionPipeline};
use civicos::middleware::ClientCtx;
use env_logger::Env;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_lib_mods();
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

    let keys = Data::new(JwtKeys::from_config(&config.auth));

    let fetcher = HttpFetcher::new(&config.scraper).context("Failed to create the scraper client")?;
    let pipeline = Data::new(IngestionPipeline::new(
        Arc::new(fetcher),
        config.ingest.clone(),
    ));

    let ai = Data::new(AiClient::new(config.ai.clone()).context("Failed to create the AI client")?);
    if !ai.is_enabled() {
        log::info!("No AI API key configured; the assistant will use canned replies.");
    }

    // Spawn rate limiter cleanup task
    actix_web::rt::spawn(async {
        let mut interval = actix_web::rt::time::interval(Duration::from_secs(300)); // Every 5 minutes
        loop {
            interval.tick().await;
            civicos::rate_limit::sweep_global();
            log::debug!("Rate limiter cleanup completed");
        }
    });

    if config.ingest.schedule_minutes > 0 {
        spawn_scheduled_ingestion(
            db.clone(),
            pipeline.clone(),
            Duration::from_secs(config.ingest.schedule_minutes * 60),
        );
    }

    let db = Data::new(db);
    log::info!("Listening on {}", config.server.bind);

    HttpServer::new(move || {
        // Order of middleware IS IMPORTANT and is in REVERSE EXECUTION ORDER.
        App::new()
            .app_data(db.clone())
            .app_data(keys.clone())
            .app_data(pipeline.clone())
            .app_data(ai.clone())
            // Security headers - applied to all responses
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_FRAME_OPTIONS, "DENY"))
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
                    .add(("Cache-Control", "no-store")),
            )
            .wrap(ClientCtx::default())
            .wrap(Logger::new("%a \"%r\" %s %Dms"))
            .configure(civicos::web::configure)
    })
    .bind(config.server.bind.as_str())?
    .run()
    .await?;

    Ok(())
}

/// Runs the pipeline on a fixed interval. A tick that finds a run in
/// progress is skipped.
fn spawn_scheduled_ingestion(
    db: DatabaseConnection,
    pipeline: Data<IngestionPipeline>,
    every: Duration,
) {
    log::info!("Scheduled ingestion every {} minutes", every.as_secs() / 60);

    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(every);
        loop {
            interval.tick().await;
            match pipeline.run(&db).await {
                Ok(report) => log::info!(
                    "Scheduled ingestion finished: {} inserted, {} updated",
                    report.inserted,
                    report.updated
                ),
                Err(IngestError::AlreadyRunning) => {
                    log::info!("Skipping scheduled ingestion, a run is in progress")
                }
                Err(e) => log::error!("Scheduled ingestion failed: {}", e),
            }
        }
    });
}

/// Initialize third party crates we rely on but don't have control over.
fn init_lib_mods() {
    if let Err(e) = dotenv::dotenv() {
        eprintln!("No .env file loaded: {}", e);
    }
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}
