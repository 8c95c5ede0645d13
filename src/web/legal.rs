//! Legal reference: acts, Criminal Code sections and case law.
//!
//! Reads go to the database first. An empty table triggers the legal-acts
//! ingestion source, which falls back to bundled sample data. Case law is
//! always the bundled set.

use super::error::ApiError;
use super::politicians::contains_ci;
use super::response::{ApiResponse, PageRequest, Pagination};
use crate::ingest::{sample, IngestionPipeline};
use crate::middleware::ClientCtx;
use crate::orm::legal_acts::{self, CATEGORY_CRIMINAL_CODE};
use crate::orm::legal_cases;
use actix_web::{get, web, HttpResponse};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};

/// Results per kind returned by a search.
const SEARCH_LIMIT: u64 = 50;

/// `act_number` prefix of individual Criminal Code sections.
const SECTION_PREFIX: &str = "s. ";

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(overview)
        .service(search)
        .service(list_acts)
        .service(criminal_code);
}

async fn ensure_loaded(
    db: &DatabaseConnection,
    pipeline: &IngestionPipeline,
) -> Result<(), ApiError> {
    if legal_acts::Entity::find().count(db).await? == 0 {
        log::info!("Legal acts table is empty, loading");
        let report = pipeline.ingest_legal_acts(db).await;
        if let Some(e) = report.error {
            return Err(ApiError::internal(format!("Loading legal acts failed: {}", e)));
        }
    }

    // Rulings are never scraped, so a live acts load leaves them to us.
    sample::populate_sample_legal_cases(db).await?;
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CategoryCount {
    category: String,
    count: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LegalOverview {
    total_acts: u64,
    criminal_code_sections: u64,
    total_cases: u64,
    categories: Vec<CategoryCount>,
    recent_acts: Vec<legal_acts::Model>,
}

#[get("/api/legal")]
async fn overview(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    pipeline: web::Data<IngestionPipeline>,
) -> Result<HttpResponse, ApiError> {
    ensure_loaded(&db, &pipeline).await?;

    let total_acts = legal_acts::Entity::find().count(db.get_ref()).await?;
    let criminal_code_sections = legal_acts::Entity::find()
        .filter(legal_acts::Column::Category.eq(CATEGORY_CRIMINAL_CODE))
        .filter(legal_acts::Column::ActNumber.starts_with(SECTION_PREFIX))
        .count(db.get_ref())
        .await?;
    let total_cases = legal_cases::Entity::find().count(db.get_ref()).await?;

    let categories: Vec<(String, i64)> = legal_acts::Entity::find()
        .select_only()
        .column(legal_acts::Column::Category)
        .column_as(legal_acts::Column::Id.count(), "count")
        .group_by(legal_acts::Column::Category)
        .order_by_asc(legal_acts::Column::Category)
        .into_tuple()
        .all(db.get_ref())
        .await?;

    let recent_acts = legal_acts::Entity::find()
        .order_by_desc(legal_acts::Column::UpdatedAt)
        .order_by_asc(legal_acts::Column::Title)
        .limit(5)
        .all(db.get_ref())
        .await?;

    Ok(ApiResponse::ok(LegalOverview {
        total_acts,
        criminal_code_sections,
        total_cases,
        categories: categories
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category,
                count: count.max(0) as u64,
            })
            .collect(),
        recent_acts,
    })
    .timed(client.request_time_as_string())
    .into_response())
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Serialize)]
struct SearchResults {
    acts: Vec<legal_acts::Model>,
    cases: Vec<legal_cases::Model>,
}

#[get("/api/legal/search")]
async fn search(
    db: web::Data<DatabaseConnection>,
    pipeline: web::Data<IngestionPipeline>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ApiError> {
    let term = query.q.as_deref().map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return Err(ApiError::bad_request("Search query is required"));
    }

    ensure_loaded(&db, &pipeline).await?;

    let acts = legal_acts::Entity::find()
        .filter(
            Condition::any()
                .add(contains_ci(legal_acts::Column::Title, term))
                .add(contains_ci(legal_acts::Column::Summary, term))
                .add(contains_ci(legal_acts::Column::ActNumber, term)),
        )
        .order_by_asc(legal_acts::Column::Title)
        .limit(SEARCH_LIMIT)
        .all(db.get_ref())
        .await?;

    let cases = legal_cases::Entity::find()
        .filter(
            Condition::any()
                .add(contains_ci(legal_cases::Column::CaseName, term))
                .add(contains_ci(legal_cases::Column::Citation, term))
                .add(contains_ci(legal_cases::Column::Summary, term)),
        )
        .order_by_desc(legal_cases::Column::DecisionDate)
        .limit(SEARCH_LIMIT)
        .all(db.get_ref())
        .await?;

    Ok(ApiResponse::ok(SearchResults { acts, cases }).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct ActsQuery {
    pub category: Option<String>,
    pub jurisdiction: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[get("/api/legal/acts")]
async fn list_acts(
    db: web::Data<DatabaseConnection>,
    pipeline: web::Data<IngestionPipeline>,
    query: web::Query<ActsQuery>,
) -> Result<HttpResponse, ApiError> {
    ensure_loaded(&db, &pipeline).await?;

    let mut cond = Condition::all();
    if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
        cond = cond.add(legal_acts::Column::Category.eq(category));
    }
    if let Some(jurisdiction) = query.jurisdiction.as_deref().filter(|j| !j.is_empty()) {
        cond = cond.add(contains_ci(legal_acts::Column::Jurisdiction, jurisdiction));
    }

    let page = PageRequest::from_parts(query.page, query.limit);
    let paginator = legal_acts::Entity::find()
        .filter(cond)
        .order_by_asc(legal_acts::Column::Title)
        .paginate(db.get_ref(), page.limit);

    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page.page - 1).await?;

    Ok(ApiResponse::ok(items)
        .paginated(Pagination::new(page, total))
        .into_response())
}

/// The Criminal Code and its sections. A live scrape only lists the Code
/// itself, so the bundled sections are loaded when none are stored.
#[get("/api/legal/criminal-code")]
async fn criminal_code(
    db: web::Data<DatabaseConnection>,
    pipeline: web::Data<IngestionPipeline>,
) -> Result<HttpResponse, ApiError> {
    ensure_loaded(&db, &pipeline).await?;

    let sections = legal_acts::Entity::find()
        .filter(legal_acts::Column::Category.eq(CATEGORY_CRIMINAL_CODE))
        .filter(legal_acts::Column::ActNumber.starts_with(SECTION_PREFIX))
        .count(db.get_ref())
        .await?;
    if sections == 0 {
        sample::populate_sample_legal_acts(db.get_ref()).await?;
    }

    let items = legal_acts::Entity::find()
        .filter(legal_acts::Column::Category.eq(CATEGORY_CRIMINAL_CODE))
        .order_by_asc(legal_acts::Column::Title)
        .all(db.get_ref())
        .await?;

    Ok(ApiResponse::ok(items).into_response())
}
