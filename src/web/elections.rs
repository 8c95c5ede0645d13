//! Election listings and detail with candidates.

use super::error::ApiError;
use super::politicians::contains_ci;
use super::response::{ApiResponse, PageRequest, Pagination};
use crate::middleware::ClientCtx;
use crate::orm::elections::{self, ElectionStatus};
use crate::orm::{candidate_policies, electoral_candidates};
use actix_web::{get, web, HttpResponse};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_elections).service(view_election);
}

#[derive(Debug, Default, Deserialize)]
pub struct ElectionQuery {
    #[serde(rename = "type")]
    pub election_type: Option<String>,
    pub jurisdiction: Option<String>,
    pub status: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

fn parse_status(raw: &str) -> Result<ElectionStatus, ApiError> {
    match raw.to_lowercase().as_str() {
        "upcoming" => Ok(ElectionStatus::Upcoming),
        "ongoing" => Ok(ElectionStatus::Ongoing),
        "completed" => Ok(ElectionStatus::Completed),
        _ => Err(ApiError::bad_request(
            "status must be one of upcoming, ongoing, completed",
        )),
    }
}

/// Status is derived from the date at read time; the stored value is only
/// as fresh as the last ingestion.
fn list_condition(q: &ElectionQuery, today: NaiveDate) -> Result<Condition, ApiError> {
    let mut cond = Condition::all();

    if let Some(kind) = q.election_type.as_deref().filter(|t| !t.is_empty()) {
        cond = cond.add(elections::Column::ElectionType.eq(kind.to_lowercase()));
    }
    if let Some(jurisdiction) = q.jurisdiction.as_deref().filter(|j| !j.is_empty()) {
        cond = cond.add(contains_ci(elections::Column::Jurisdiction, jurisdiction));
    }
    if let Some(status) = q.status.as_deref().filter(|s| !s.is_empty()) {
        cond = cond.add(match parse_status(status)? {
            ElectionStatus::Upcoming => elections::Column::ElectionDate.gt(today),
            ElectionStatus::Ongoing => elections::Column::ElectionDate.eq(today),
            ElectionStatus::Completed => elections::Column::ElectionDate.lt(today),
        });
    }

    Ok(cond)
}

fn refresh_status(mut election: elections::Model, today: NaiveDate) -> elections::Model {
    election.status = ElectionStatus::for_date(election.election_date, today);
    election
}

#[get("/api/elections")]
async fn list_elections(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ElectionQuery>,
) -> Result<HttpResponse, ApiError> {
    let today = Utc::now().date_naive();
    let page = PageRequest::from_parts(query.page, query.limit);

    let paginator = elections::Entity::find()
        .filter(list_condition(&query, today)?)
        .order_by_desc(elections::Column::ElectionDate)
        .order_by_asc(elections::Column::Title)
        .paginate(db.get_ref(), page.limit);

    let total = paginator.num_items().await?;
    let items: Vec<_> = paginator
        .fetch_page(page.page - 1)
        .await?
        .into_iter()
        .map(|e| refresh_status(e, today))
        .collect();

    Ok(ApiResponse::ok(items)
        .paginated(Pagination::new(page, total))
        .timed(client.request_time_as_string())
        .into_response())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CandidateDetail {
    #[serde(flatten)]
    candidate: electoral_candidates::Model,
    policies: Vec<candidate_policies::Model>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ElectionDetail {
    #[serde(flatten)]
    election: elections::Model,
    candidates: Vec<CandidateDetail>,
}

#[get("/api/elections/{id}")]
async fn view_election(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let election = elections::Entity::find_by_id(path.into_inner())
        .one(db.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Election not found"))?;

    let candidates = election
        .find_related(electoral_candidates::Entity)
        .order_by_asc(electoral_candidates::Column::Name)
        .all(db.get_ref())
        .await?;

    let mut policies: HashMap<i32, Vec<candidate_policies::Model>> = HashMap::new();
    if !candidates.is_empty() {
        for policy in candidate_policies::Entity::find()
            .filter(candidate_policies::Column::CandidateId.is_in(candidates.iter().map(|c| c.id)))
            .order_by_asc(candidate_policies::Column::Id)
            .all(db.get_ref())
            .await?
        {
            policies.entry(policy.candidate_id).or_default().push(policy);
        }
    }

    let detail = ElectionDetail {
        election: refresh_status(election, Utc::now().date_naive()),
        candidates: candidates
            .into_iter()
            .map(|candidate| CandidateDetail {
                policies: policies.remove(&candidate.id).unwrap_or_default(),
                candidate,
            })
            .collect(),
    };

    Ok(ApiResponse::ok(detail).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!(parse_status("Upcoming").unwrap(), ElectionStatus::Upcoming);
        assert!(parse_status("cancelled").is_err());
    }

    #[test]
    fn test_invalid_status_rejects_query() {
        let q = ElectionQuery {
            status: Some("later".to_string()),
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert!(list_condition(&q, today).is_err());
    }

    #[test]
    fn test_refresh_status() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let now = today.and_hms_opt(0, 0, 0).unwrap();
        let election = elections::Model {
            id: 1,
            election_type: "federal".to_string(),
            jurisdiction: "Canada".to_string(),
            title: "General election".to_string(),
            election_date: NaiveDate::from_ymd_opt(2025, 4, 28).unwrap(),
            status: ElectionStatus::Upcoming,
            description: None,
            source_name: None,
            source_url: None,
            registration_deadline: None,
            advance_voting_start: None,
            advance_voting_end: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(refresh_status(election, today).status, ElectionStatus::Completed);
    }
}
