//! Test fixtures for creating test data
#![allow(dead_code)]

use actix_web::dev::ServiceResponse;
use actix_web::test;
use actix_web::web::{Data, ServiceConfig};
use async_trait::async_trait;
use chrono::Utc;
use civicos::ai::AiClient;
use civicos::app_config::{AiConfig, IngestConfig};
use civicos::auth::{hash_password, JwtKeys};
use civicos::ingest::fetch::{FetchError, HtmlSource};
use civicos::ingest::upsert::{upsert_politician, PoliticianDetails, PoliticianInput};
use civicos::ingest::IngestionPipeline;
use civicos::orm::politicians::{Expenses, VotingRecord};
use civicos::orm::users::{self, Role};
use civicos::orm::{politicians, social_posts};
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr, NotSet};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_PASSWORD: &str = "password123";
const TEST_SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";

pub fn test_keys() -> JwtKeys {
    JwtKeys::new(TEST_SECRET, 1)
}

/// Create a test user with known credentials
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
    role: Role,
) -> Result<users::Model, DbErr> {
    let password = hash_password(TEST_PASSWORD)
        .map_err(|e| DbErr::Custom(format!("Password hashing failed: {}", e)))?;
    let now = Utc::now().naive_utc();

    users::ActiveModel {
        id: NotSet,
        username: Set(username.to_string()),
        email: Set(format!("{}@test.com", username)),
        password: Set(password),
        role: Set(role),
        display_name: Set(None),
        bio: Set(None),
        location: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}

/// `Authorization` header carrying a valid token for `user`
pub fn bearer(user: &users::Model) -> (&'static str, String) {
    let token = test_keys().issue(user).expect("Failed to issue token");
    ("Authorization", format!("Bearer {}", token))
}

/// Create a politician with enough detail for a non-trivial trust score
pub async fn create_test_politician(
    db: &DatabaseConnection,
    name: &str,
    level: &str,
    jurisdiction: &str,
) -> Result<politicians::Model, DbErr> {
    let (politician, _) = upsert_politician(
        db,
        PoliticianInput {
            name: name.to_string(),
            level: level.to_string(),
            jurisdiction: jurisdiction.to_string(),
            party: Some("Independent".to_string()),
            position: Some("Member of Parliament".to_string()),
            riding: Some(format!("{} Centre", jurisdiction)),
            civic_level: Some("urban".to_string()),
            source_url: None,
            details: Some(PoliticianDetails {
                policy_positions: vec!["Transit".to_string(), "Housing".to_string()],
                voting_record: VotingRecord {
                    yes: 80,
                    no: 15,
                    abstain: 5,
                },
                committees: vec!["Finance".to_string()],
                expenses: Expenses {
                    total: 250_000.0,
                    year: Some(2024),
                    ..Default::default()
                },
                is_incumbent: true,
                ..Default::default()
            }),
        },
    )
    .await?;

    Ok(politician)
}

pub async fn create_test_post(
    db: &DatabaseConnection,
    user_id: i32,
    content: &str,
    visibility: social_posts::Visibility,
) -> Result<social_posts::Model, DbErr> {
    let now = Utc::now().naive_utc();
    social_posts::ActiveModel {
        id: NotSet,
        user_id: Set(user_id),
        content: Set(content.to_string()),
        image_url: Set(None),
        visibility: Set(visibility),
        like_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}

/// In-memory page source. Unknown URLs answer 503.
#[derive(Default)]
pub struct StubSource {
    pages: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
}

impl StubSource {
    pub fn offline() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_pages(pages: &[(&str, &str)]) -> Arc<Self> {
        let source = Self::default();
        {
            let mut map = source.pages.lock().unwrap();
            for (url, html) in pages {
                map.insert(url.to_string(), html.to_string());
            }
        }
        Arc::new(source)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HtmlSource for StubSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(FetchError::Status(503))
    }
}

pub fn test_pipeline(source: Arc<StubSource>) -> Data<IngestionPipeline> {
    Data::new(IngestionPipeline::new(source, IngestConfig::default()))
}

/// Registers app data and every route, the way the server binary does.
pub fn configure_app(
    db: DatabaseConnection,
    pipeline: Data<IngestionPipeline>,
) -> impl FnOnce(&mut ServiceConfig) {
    move |conf: &mut ServiceConfig| {
        let ai = AiClient::new(AiConfig::default()).expect("Failed to create AI client");
        conf.app_data(Data::new(db))
            .app_data(Data::new(test_keys()))
            .app_data(pipeline)
            .app_data(Data::new(ai));
        civicos::web::configure(conf);
    }
}

pub async fn read_json(resp: ServiceResponse) -> serde_json::Value {
    let body = test::read_body(resp).await;
    serde_json::from_slice(&body).expect("Response body is not JSON")
}
