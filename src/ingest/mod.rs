//! Civic data ingestion: scrape external sites, upsert by natural key,
//! fall back to built-in sample data per source, then recompute trust scores.

pub mod fetch;
pub mod parse;
pub mod sample;
pub mod score;
pub mod upsert;

use crate::app_config::{IngestConfig, SourceConfig};
use crate::orm::legal_acts::CATEGORY_CRIMINAL_CODE;
use fetch::{scrape, DataSourceResult, FallbackReason, HtmlSource};
use futures::future::join_all;
use parse::{ElectionRecord, LegalActRecord, PoliticianRecord};
use sea_orm::{DatabaseConnection, DbErr};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use upsert::{ElectionInput, LegalActInput, PoliticianInput, UpsertCounts};

#[derive(Debug)]
pub enum IngestError {
    /// Another run holds the guard
    AlreadyRunning,
    Database(DbErr),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::AlreadyRunning => write!(f, "An ingestion run is already in progress"),
            IngestError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<DbErr> for IngestError {
    fn from(e: DbErr) -> Self {
        IngestError::Database(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "reason")]
pub enum SourceStatus {
    Live,
    Fallback(FallbackReason),
    /// Database error partway through; earlier records stay committed.
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub name: String,
    pub url: String,
    pub status: SourceStatus,
    /// Records parsed from the live page
    pub scraped: usize,
    pub inserted: u32,
    pub updated: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceReport {
    fn new(source: &SourceConfig, status: SourceStatus) -> Self {
        Self {
            name: source.name.clone(),
            url: source.url.clone(),
            status,
            scraped: 0,
            inserted: 0,
            updated: 0,
            error: None,
        }
    }

    fn with_counts(mut self, counts: UpsertCounts) -> Self {
        self.inserted = counts.inserted;
        self.updated = counts.updated;
        self
    }

    fn failed(mut self, counts: UpsertCounts, e: DbErr) -> Self {
        log::error!("Ingestion of {} failed: {}", self.name, e);
        self.status = SourceStatus::Failed;
        self.error = Some(e.to_string());
        self.with_counts(counts)
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.status, SourceStatus::Fallback(_))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionReport {
    pub inserted: u32,
    pub updated: u32,
    pub scored: u32,
    pub sources: Vec<SourceReport>,
}

impl IngestionReport {
    fn push(&mut self, source: SourceReport) {
        self.inserted += source.inserted;
        self.updated += source.updated;
        self.sources.push(source);
    }
}

/// Clears the running flag when a run ends, including on early return.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct IngestionPipeline {
    source: Arc<dyn HtmlSource>,
    config: IngestConfig,
    running: AtomicBool,
}

impl IngestionPipeline {
    pub fn new(source: Arc<dyn HtmlSource>, config: IngestConfig) -> Self {
        Self {
            source,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn try_start(&self) -> Result<RunGuard<'_>, IngestError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| RunGuard(&self.running))
            .map_err(|_| IngestError::AlreadyRunning)
    }

    /// Full run: elections (three levels concurrently), politicians, legal
    /// acts, then a scoring pass. A failing source is reported and skipped.
    pub async fn run(&self, db: &DatabaseConnection) -> Result<IngestionReport, IngestError> {
        let _guard = self.try_start()?;
        log::info!("Ingestion run started");

        let mut report = IngestionReport::default();

        let elections = join_all([
            self.ingest_elections(db, &self.config.federal_elections),
            self.ingest_elections(db, &self.config.provincial_elections),
            self.ingest_elections(db, &self.config.municipal_elections),
        ])
        .await;
        for source in elections {
            report.push(source);
        }

        report.push(self.ingest_politicians(db).await);
        report.push(self.ingest_legal_acts(db).await);

        report.scored = score::calculate_trust_scores(db).await?;

        for source in &report.sources {
            log::info!(
                "{}: {:?}, {} inserted, {} updated",
                source.name,
                source.status,
                source.inserted,
                source.updated
            );
        }
        log::info!(
            "Ingestion run finished: {} inserted, {} updated, {} scored",
            report.inserted,
            report.updated,
            report.scored
        );

        Ok(report)
    }

    pub async fn ingest_elections(&self, db: &DatabaseConnection, source: &SourceConfig) -> SourceReport {
        let scraped = scrape(self.source.as_ref(), &source.url, |html| {
            parse::parse_elections(html, &source.selectors, &source.url)
        })
        .await;

        match scraped {
            DataSourceResult::Live(records) => {
                let mut report = SourceReport::new(source, SourceStatus::Live);
                report.scraped = records.len();
                let mut counts = UpsertCounts::default();
                for record in records {
                    match upsert::upsert_election(db, election_input(source, record)).await {
                        Ok((_, outcome)) => counts.record(outcome),
                        Err(e) => return report.failed(counts, e),
                    }
                }
                report.with_counts(counts)
            }
            DataSourceResult::Fallback(reason) => {
                let report = SourceReport::new(source, SourceStatus::Fallback(reason));
                log::info!("Populating sample {} elections ({:?})", source.level, reason);
                match sample::populate_sample_elections(db, &source.level).await {
                    Ok(counts) => report.with_counts(counts),
                    Err(e) => report.failed(UpsertCounts::default(), e),
                }
            }
        }
    }

    pub async fn ingest_politicians(&self, db: &DatabaseConnection) -> SourceReport {
        let source = &self.config.politicians;
        let scraped = scrape(self.source.as_ref(), &source.url, |html| {
            parse::parse_politicians(html, &source.selectors, &source.url)
        })
        .await;

        match scraped {
            DataSourceResult::Live(records) => {
                let mut report = SourceReport::new(source, SourceStatus::Live);
                report.scraped = records.len();
                let mut counts = UpsertCounts::default();
                for record in records {
                    match upsert::upsert_politician(db, politician_input(source, record)).await {
                        Ok((_, outcome)) => counts.record(outcome),
                        Err(e) => return report.failed(counts, e),
                    }
                }
                report.with_counts(counts)
            }
            DataSourceResult::Fallback(reason) => {
                let report = SourceReport::new(source, SourceStatus::Fallback(reason));
                log::info!("Populating sample politicians ({:?})", reason);
                match sample::populate_sample_politicians(db).await {
                    Ok(counts) => report.with_counts(counts),
                    Err(e) => report.failed(UpsertCounts::default(), e),
                }
            }
        }
    }

    pub async fn ingest_legal_acts(&self, db: &DatabaseConnection) -> SourceReport {
        let source = &self.config.legal_acts;
        let scraped = scrape(self.source.as_ref(), &source.url, |html| {
            parse::parse_legal_acts(html, &source.selectors, &source.url)
        })
        .await;

        match scraped {
            DataSourceResult::Live(records) => {
                let mut report = SourceReport::new(source, SourceStatus::Live);
                report.scraped = records.len();
                let mut counts = UpsertCounts::default();
                for record in records {
                    match upsert::upsert_legal_act(db, legal_act_input(source, record)).await {
                        Ok((_, outcome)) => counts.record(outcome),
                        Err(e) => return report.failed(counts, e),
                    }
                }
                if let Err(e) = sample::populate_sample_legal_cases(db).await {
                    return report.failed(counts, e);
                }
                report.with_counts(counts)
            }
            DataSourceResult::Fallback(reason) => {
                let report = SourceReport::new(source, SourceStatus::Fallback(reason));
                log::info!("Populating sample legal acts ({:?})", reason);
                match sample::populate_sample_legal_acts(db).await {
                    Ok(counts) => report.with_counts(counts),
                    Err(e) => report.failed(UpsertCounts::default(), e),
                }
            }
        }
    }
}

fn election_input(source: &SourceConfig, record: ElectionRecord) -> ElectionInput {
    let region = record.region.map(|region| match record.district_type {
        Some(kind) => format!("Region: {} ({})", region, kind.as_str()),
        None => format!("Region: {}", region),
    });
    let description = match (record.description, region) {
        (Some(d), Some(r)) => Some(format!("{}. {}", d.trim_end_matches('.'), r)),
        (d, r) => d.or(r),
    };

    ElectionInput {
        election_type: source.level.clone(),
        jurisdiction: source.jurisdiction.clone(),
        title: record.title,
        election_date: record.election_date,
        description,
        source_name: Some(source.name.clone()),
        source_url: record.source_url.or_else(|| Some(source.url.clone())),
        registration_deadline: None,
        advance_voting_start: None,
        advance_voting_end: None,
    }
}

fn position_for_level(level: &str) -> &'static str {
    match level {
        "federal" => "Member of Parliament",
        "provincial" => "Member of Provincial Parliament",
        _ => "Councillor",
    }
}

fn politician_input(source: &SourceConfig, record: PoliticianRecord) -> PoliticianInput {
    PoliticianInput {
        name: record.name,
        level: source.level.clone(),
        jurisdiction: source.jurisdiction.clone(),
        party: record.party,
        position: Some(position_for_level(&source.level).to_string()),
        riding: record.riding,
        civic_level: record.district_type.map(|d| d.as_str().to_string()),
        source_url: record.source_url,
        details: None,
    }
}

fn legal_act_input(source: &SourceConfig, record: LegalActRecord) -> LegalActInput {
    let category = if record.title.eq_ignore_ascii_case("Criminal Code") {
        CATEGORY_CRIMINAL_CODE
    } else {
        sample::CATEGORY_FEDERAL_ACT
    };

    LegalActInput {
        category: category.to_string(),
        jurisdiction: source.jurisdiction.clone(),
        title: record.title,
        act_number: record.act_number,
        summary: None,
        source_url: record.source_url,
        enacted_date: None,
        last_amended: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_election_description_merges_region() {
        let source = IngestConfig::default().municipal_elections;
        let record = ElectionRecord {
            title: "By-election".to_string(),
            election_date: NaiveDate::from_ymd_opt(2024, 6, 24).unwrap(),
            description: Some("Vacancy.".to_string()),
            region: Some("Toronto Centre".to_string()),
            district_type: Some(parse::DistrictType::Urban),
            source_url: None,
        };

        let input = election_input(&source, record);
        assert_eq!(input.election_type, "municipal");
        assert_eq!(input.description.as_deref(), Some("Vacancy. Region: Toronto Centre (urban)"));
        assert_eq!(input.source_url.as_deref(), Some(source.url.as_str()));
    }

    #[test]
    fn test_criminal_code_category() {
        let source = IngestConfig::default().legal_acts;
        let record = LegalActRecord {
            title: "Criminal Code".to_string(),
            act_number: None,
            source_url: None,
        };
        assert_eq!(legal_act_input(&source, record).category, CATEGORY_CRIMINAL_CODE);
    }

    struct Offline;

    #[async_trait::async_trait]
    impl HtmlSource for Offline {
        async fn fetch(&self, _url: &str) -> Result<String, fetch::FetchError> {
            Err(fetch::FetchError::Transport("offline".to_string()))
        }
    }

    #[test]
    fn test_run_guard_is_exclusive() {
        let pipeline = IngestionPipeline::new(Arc::new(Offline), IngestConfig::default());

        let guard = pipeline.try_start().unwrap();
        assert!(pipeline.is_running());
        assert!(matches!(pipeline.try_start(), Err(IngestError::AlreadyRunning)));

        drop(guard);
        assert!(!pipeline.is_running());
        assert!(pipeline.try_start().is_ok());
    }

    #[test]
    fn test_status_serializes_with_reason() {
        let json = serde_json::to_value(SourceStatus::Fallback(FallbackReason::HttpStatus)).unwrap();
        assert_eq!(json["kind"], "fallback");
        assert_eq!(json["reason"], "httpStatus");

        let json = serde_json::to_value(SourceStatus::Live).unwrap();
        assert_eq!(json["kind"], "live");
    }
}
