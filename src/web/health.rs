use super::response::ApiResponse;
use crate::ingest::IngestionPipeline;
use actix_web::{get, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Serialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(health);
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Health {
    status: &'static str,
    database: bool,
    ingestion_running: bool,
    version: &'static str,
}

/// 503 when the database does not answer a ping.
#[get("/api/health")]
async fn health(
    db: web::Data<DatabaseConnection>,
    pipeline: web::Data<IngestionPipeline>,
) -> HttpResponse {
    let database = match db.ping().await {
        Ok(()) => true,
        Err(e) => {
            log::error!("Health check database ping failed: {}", e);
            false
        }
    };

    let mut body = ApiResponse::ok(Health {
        status: if database { "ok" } else { "degraded" },
        database,
        ingestion_running: pipeline.is_running(),
        version: env!("CARGO_PKG_VERSION"),
    });

    if database {
        body.into_response()
    } else {
        body.success = false;
        body.message = "Database unavailable".to_string();
        HttpResponse::ServiceUnavailable().json(body)
    }
}
