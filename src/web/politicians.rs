//! Politician directory, statements and the ingestion trigger.

use super::error::ApiError;
use super::response::{ApiResponse, PageRequest, Pagination};
use crate::app_config;
use crate::auth::AuthUser;
use crate::cache;
use crate::ingest::{IngestError, IngestionPipeline};
use crate::middleware::ClientCtx;
use crate::orm::politicians::{self, Expenses};
use crate::orm::politician_statements;
use crate::permission::{ADMIN_DATA_MANAGE, STATEMENTS_VERIFY};
use crate::rate_limit;
use actix_web::{get, post, web, HttpResponse};
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, NotSet,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_politicians)
        .service(run_ingestion)
        .service(view_politician)
        .service(list_statements)
        .service(create_statement);
}

#[derive(Debug, Default, Deserialize)]
pub struct PoliticianQuery {
    pub level: Option<String>,
    pub jurisdiction: Option<String>,
    pub party: Option<String>,
    pub search: Option<String>,
    pub location: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Case-insensitive substring match on a column. `%` and `_` in `needle`
/// match themselves.
pub(super) fn contains_ci<C>(column: C, needle: &str) -> sea_orm::sea_query::SimpleExpr
where
    C: sea_orm::sea_query::IntoColumnRef,
{
    let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape('\\'))
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn list_condition(q: &PoliticianQuery) -> Condition {
    let mut cond = Condition::all();

    if let Some(level) = non_empty(&q.level) {
        cond = cond.add(politicians::Column::Level.eq(level.to_lowercase()));
    }
    if let Some(jurisdiction) = non_empty(&q.jurisdiction) {
        cond = cond.add(contains_ci(politicians::Column::Jurisdiction, jurisdiction));
    }
    if let Some(party) = non_empty(&q.party) {
        cond = cond.add(contains_ci(politicians::Column::Party, party));
    }
    if let Some(search) = non_empty(&q.search) {
        cond = cond.add(
            Condition::any()
                .add(contains_ci(politicians::Column::Name, search))
                .add(contains_ci(politicians::Column::Party, search))
                .add(contains_ci(politicians::Column::Riding, search)),
        );
    }
    if let Some(location) = non_empty(&q.location) {
        cond = cond.add(
            Condition::any()
                .add(contains_ci(politicians::Column::Riding, location))
                .add(contains_ci(politicians::Column::Jurisdiction, location)),
        );
    }

    cond
}

#[get("/api/politicians")]
async fn list_politicians(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    query: web::Query<PoliticianQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = PageRequest::from_parts(query.page, query.limit);

    let paginator = politicians::Entity::find()
        .filter(list_condition(&query))
        .order_by_desc(politicians::Column::TrustScore)
        .order_by_asc(politicians::Column::Name)
        .paginate(db.get_ref(), page.limit);

    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page.page - 1).await?;

    Ok(ApiResponse::ok(items)
        .paginated(Pagination::new(page, total))
        .timed(client.request_time_as_string())
        .into_response())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CampaignFinance {
    year: Option<i32>,
    total_spending: f64,
    travel: f64,
    hospitality: f64,
    office: f64,
}

impl From<&Expenses> for CampaignFinance {
    fn from(e: &Expenses) -> Self {
        Self {
            year: e.year,
            total_spending: e.total,
            travel: e.travel,
            hospitality: e.hospitality,
            office: e.office,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TruthTracking {
    total_statements: u64,
    verified_statements: u64,
    /// Percentage of verified statements; absent with no statements.
    accuracy_rate: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PoliticianDetail {
    #[serde(flatten)]
    politician: politicians::Model,
    statement_count: u64,
    position_count: usize,
    campaign_finance: CampaignFinance,
    truth_tracking: TruthTracking,
}

async fn load_detail(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<serde_json::Value>, ApiError> {
    let politician = match politicians::Entity::find_by_id(id).one(db).await? {
        Some(p) => p,
        None => return Ok(None),
    };

    let statements = politician_statements::Entity::find()
        .filter(politician_statements::Column::PoliticianId.eq(id));
    let statement_count = statements.clone().count(db).await?;
    let verified = statements
        .filter(politician_statements::Column::IsVerified.eq(true))
        .count(db)
        .await?;

    let detail = PoliticianDetail {
        statement_count,
        position_count: politician.policy_positions.len(),
        campaign_finance: CampaignFinance::from(&politician.expenses),
        truth_tracking: TruthTracking {
            total_statements: statement_count,
            verified_statements: verified,
            accuracy_rate: (statement_count > 0)
                .then(|| ((verified as f64 / statement_count as f64) * 100.0).round() as u32),
        },
        politician,
    };

    serde_json::to_value(detail)
        .map(Some)
        .map_err(|e| ApiError::internal(format!("Failed to serialize politician {}: {}", id, e)))
}

#[get("/api/politicians/{id}")]
async fn view_politician(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let detail = match cache::get_politician_detail(id) {
        Some(detail) => detail,
        None => {
            let detail = load_detail(&db, id)
                .await?
                .ok_or_else(|| ApiError::not_found("Politician not found"))?;
            cache::store_politician_detail(id, detail.clone());
            detail
        }
    };

    Ok(ApiResponse::ok(detail)
        .timed(client.request_time_as_string())
        .into_response())
}

#[get("/api/politicians/{id}/statements")]
async fn list_statements(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    query: web::Query<super::response::PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    if politicians::Entity::find_by_id(id).one(db.get_ref()).await?.is_none() {
        return Err(ApiError::not_found("Politician not found"));
    }

    let page = PageRequest::from(&*query);
    let paginator = politician_statements::Entity::find()
        .filter(politician_statements::Column::PoliticianId.eq(id))
        .order_by_desc(politician_statements::Column::CreatedAt)
        .order_by_desc(politician_statements::Column::Id)
        .paginate(db.get_ref(), page.limit);

    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page.page - 1).await?;

    Ok(ApiResponse::ok(items)
        .paginated(Pagination::new(page, total))
        .into_response())
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StatementRequest {
    #[validate(length(min = 1))]
    pub content: String,
    #[validate(length(max = 500))]
    pub source: Option<String>,
    /// `YYYY-MM-DD`
    pub statement_date: Option<String>,
    /// Honored only for callers allowed to verify statements.
    #[serde(default)]
    pub verified: bool,
}

#[post("/api/politicians/{id}/statements")]
async fn create_statement(
    user: AuthUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    body: web::Json<StatementRequest>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;
    let id = path.into_inner();

    let content = body.content.trim();
    if content.is_empty() {
        return Err(ApiError::bad_request("Statement content is required"));
    }
    let max = app_config::limits().max_statement_length as usize;
    if content.chars().count() > max {
        return Err(ApiError::bad_request(format!(
            "Statement exceeds {} characters",
            max
        )));
    }

    let statement_date = match body.statement_date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| ApiError::bad_request("statementDate must be YYYY-MM-DD"))?,
        ),
    };

    if politicians::Entity::find_by_id(id).one(db.get_ref()).await?.is_none() {
        return Err(ApiError::not_found("Politician not found"));
    }

    rate_limit::check_post_rate_limit(user.id)?;

    let statement = politician_statements::ActiveModel {
        id: NotSet,
        politician_id: Set(id),
        content: Set(content.to_string()),
        source: Set(body.source.clone().filter(|s| !s.trim().is_empty())),
        statement_date: Set(statement_date),
        is_verified: Set(body.verified && user.can(STATEMENTS_VERIFY)),
        created_by: Set(Some(user.id)),
        created_at: Set(Utc::now().naive_utc()),
    }
    .insert(db.get_ref())
    .await?;

    cache::invalidate_politician_detail(id);

    Ok(ApiResponse::with_message("Statement recorded", statement).created())
}

/// Runs the whole pipeline before responding.
#[post("/api/politicians/ingest")]
async fn run_ingestion(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    pipeline: web::Data<IngestionPipeline>,
) -> Result<HttpResponse, ApiError> {
    let user = client.require_permission(ADMIN_DATA_MANAGE)?;
    log::info!("Ingestion requested by user {}", user.id);

    let report = pipeline.run(db.get_ref()).await.map_err(|e| match e {
        IngestError::AlreadyRunning => {
            ApiError::conflict("An ingestion run is already in progress")
        }
        IngestError::Database(e) => ApiError::internal(format!("Ingestion failed: {}", e)),
    })?;

    Ok(ApiResponse::with_message("Ingestion complete", report)
        .timed(client.request_time_as_string())
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filters_are_ignored() {
        let q = PoliticianQuery {
            level: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(non_empty(&q.level).is_none());
        assert!(list_condition(&q).is_empty());
    }

    #[test]
    fn test_filters_compose() {
        let q = PoliticianQuery {
            level: Some("Federal".to_string()),
            search: Some("doe".to_string()),
            ..Default::default()
        };
        assert_eq!(list_condition(&q).len(), 2);
    }

    #[test]
    fn test_like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("plain"), "plain");
    }
}
