//! Integration tests for the ingestion pipeline

mod common;

use async_trait::async_trait;
use civicos::app_config::IngestConfig;
use civicos::ingest::fetch::{FallbackReason, FetchError, HtmlSource};
use civicos::ingest::upsert::{upsert_politician, PoliticianInput};
use civicos::ingest::{IngestError, IngestionPipeline, SourceStatus};
use civicos::orm::{electoral_candidates, elections, legal_acts, politicians};
use common::{database::*, fixtures::*};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

const MEMBERS_HTML: &str = r#"
<html><body>
  <div class="ce-mip-mp-tile">
    <a href="/members/en/dana-whitfield(1001)">
      <div class="ce-mip-mp-name">Dana Whitfield</div>
      <div class="ce-mip-mp-party">Liberal</div>
      <div class="ce-mip-mp-constituency">Toronto Centre</div>
    </a>
  </div>
  <div class="ce-mip-mp-tile">
    <a href="/members/en/lee-harper(1002)">
      <div class="ce-mip-mp-name">Lee Harper</div>
      <div class="ce-mip-mp-party">Conservative</div>
      <div class="ce-mip-mp-constituency">Peace River--Westlock</div>
    </a>
  </div>
</body></html>
"#;

async fn all_politicians(db: &sea_orm::DatabaseConnection) -> Vec<politicians::Model> {
    politicians::Entity::find()
        .order_by_asc(politicians::Column::Id)
        .all(db)
        .await
        .expect("Query failed")
}

#[actix_rt::test]
#[serial]
async fn test_offline_sources_fall_back_once_each() {
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let source = StubSource::offline();
    let pipeline = IngestionPipeline::new(source.clone(), IngestConfig::default());

    let report = pipeline.run(&db).await.expect("Ingestion failed");

    // Three election levels, politicians, legal acts
    assert_eq!(report.sources.len(), 5);
    assert_eq!(source.calls(), 5);
    for s in &report.sources {
        assert_eq!(s.status, SourceStatus::Fallback(FallbackReason::HttpStatus), "{}", s.name);
        assert_eq!(s.scraped, 0);
        assert!(s.inserted > 0, "{} populated nothing", s.name);
    }

    assert_eq!(elections::Entity::find().count(&db).await.unwrap(), 3);
    assert_eq!(politicians::Entity::find().count(&db).await.unwrap(), 5);
    assert!(legal_acts::Entity::find().count(&db).await.unwrap() > 0);
    assert!(electoral_candidates::Entity::find().count(&db).await.unwrap() > 0);
    assert_eq!(report.scored, 5);
}

#[actix_rt::test]
#[serial]
async fn test_second_run_is_idempotent() {
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let pipeline = IngestionPipeline::new(StubSource::offline(), IngestConfig::default());

    let first = pipeline.run(&db).await.expect("First run failed");
    let politicians_before = all_politicians(&db).await;
    let elections_before = elections::Entity::find().count(&db).await.unwrap();
    let candidates_before = electoral_candidates::Entity::find().count(&db).await.unwrap();
    let acts_before = legal_acts::Entity::find().count(&db).await.unwrap();

    let second = pipeline.run(&db).await.expect("Second run failed");

    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, first.inserted + first.updated);
    assert_eq!(elections::Entity::find().count(&db).await.unwrap(), elections_before);
    assert_eq!(
        electoral_candidates::Entity::find().count(&db).await.unwrap(),
        candidates_before
    );
    assert_eq!(legal_acts::Entity::find().count(&db).await.unwrap(), acts_before);

    let politicians_after = all_politicians(&db).await;
    assert_eq!(politicians_before.len(), politicians_after.len());
    for (before, after) in politicians_before.iter().zip(&politicians_after) {
        assert_eq!(before.id, after.id);
        assert_eq!(before.name, after.name);
        assert_eq!(before.party, after.party);
        assert_eq!(before.trust_score, after.trust_score);
        assert_eq!(before.committees, after.committees);
        assert_eq!(before.created_at, after.created_at);
    }
}

#[actix_rt::test]
#[serial]
async fn test_concurrent_upserts_create_one_row() {
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");

    let input = || PoliticianInput {
        name: "Quinn Avery".to_string(),
        level: "municipal".to_string(),
        jurisdiction: "Toronto".to_string(),
        party: None,
        position: Some("Councillor".to_string()),
        riding: Some("Ward 10".to_string()),
        civic_level: None,
        source_url: None,
        details: None,
    };

    let (a, b) = futures::join!(upsert_politician(&db, input()), upsert_politician(&db, input()));
    let (a, _) = a.expect("First upsert failed");
    let (b, _) = b.expect("Second upsert failed");

    assert_eq!(a.id, b.id);
    let rows = politicians::Entity::find()
        .filter(politicians::Column::Name.eq("Quinn Avery"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[actix_rt::test]
#[serial]
async fn test_live_politicians_are_upserted() {
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let config = IngestConfig::default();
    let source = StubSource::with_pages(&[(config.politicians.url.as_str(), MEMBERS_HTML)]);
    let pipeline = IngestionPipeline::new(source, config);

    let report = pipeline.ingest_politicians(&db).await;

    assert_eq!(report.status, SourceStatus::Live);
    assert_eq!(report.scraped, 2);
    assert_eq!(report.inserted, 2);

    let dana = politicians::Entity::find()
        .filter(politicians::Column::Name.eq("Dana Whitfield"))
        .one(&db)
        .await
        .unwrap()
        .expect("Scraped politician missing");
    assert_eq!(dana.party.as_deref(), Some("Liberal"));
    assert_eq!(dana.riding.as_deref(), Some("Toronto Centre"));
    assert_eq!(dana.level, "federal");
    assert_eq!(dana.civic_level.as_deref(), Some("urban"));
    assert_eq!(dana.position.as_deref(), Some("Member of Parliament"));
}

#[actix_rt::test]
#[serial]
async fn test_page_without_matches_falls_back() {
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let config = IngestConfig::default();
    let source = StubSource::with_pages(&[(
        config.politicians.url.as_str(),
        "<html><body><p>Maintenance</p></body></html>",
    )]);
    let pipeline = IngestionPipeline::new(source, config);

    let report = pipeline.ingest_politicians(&db).await;

    assert_eq!(report.status, SourceStatus::Fallback(FallbackReason::NoRecords));
    assert_eq!(report.inserted, 5);
}

#[actix_rt::test]
#[serial]
async fn test_scores_stay_in_bounds() {
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let pipeline = IngestionPipeline::new(StubSource::offline(), IngestConfig::default());

    pipeline.run(&db).await.expect("Ingestion failed");

    for p in all_politicians(&db).await {
        assert!((0..=100).contains(&p.trust_score), "{} scored {}", p.name, p.trust_score);
    }
}

/// Answers after a pause so a run stays in flight.
struct SlowSource;

#[async_trait]
impl HtmlSource for SlowSource {
    async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
        actix_web::rt::time::sleep(Duration::from_millis(300)).await;
        Err(FetchError::Transport("timed out".to_string()))
    }
}

#[actix_rt::test]
#[serial]
async fn test_overlapping_run_is_rejected() {
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let pipeline = IngestionPipeline::new(Arc::new(SlowSource), IngestConfig::default());

    let (first, second) = futures::join!(pipeline.run(&db), async {
        actix_web::rt::time::sleep(Duration::from_millis(50)).await;
        pipeline.run(&db).await
    });

    assert!(first.is_ok());
    assert!(matches!(second, Err(IngestError::AlreadyRunning)));
    assert!(!pipeline.is_running());
}
