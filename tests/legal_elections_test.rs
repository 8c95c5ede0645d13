//! Integration tests for legal reference, elections, health and the assistant

mod common;

use actix_web::{test, App};
use civicos::app_config::IngestConfig;
use civicos::ingest::IngestionPipeline;
use civicos::middleware::ClientCtx;
use civicos::orm::users::Role;
use common::{database::*, fixtures::*};
use serde_json::json;
use serial_test::serial;

#[actix_rt::test]
#[serial]
async fn test_overview_loads_empty_table() {
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let source = StubSource::offline();

    let app = test::init_service(
        App::new()
            .wrap(ClientCtx::default())
            .configure(configure_app(db, test_pipeline(source.clone()))),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/legal").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let json = read_json(resp).await;
    assert_eq!(json["data"]["totalActs"], 9);
    assert_eq!(json["data"]["criminalCodeSections"], 4);
    assert_eq!(json["data"]["totalCases"], 4);
    assert_eq!(json["data"]["recentActs"].as_array().unwrap().len(), 5);
    assert!(json["processingTime"].is_string());
    assert_eq!(source.calls(), 1);

    // Already populated, no second fetch
    let req = test::TestRequest::get().uri("/api/legal").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
    assert_eq!(source.calls(), 1);
}

#[actix_rt::test]
#[serial]
async fn test_search_and_listing() {
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let app = test::init_service(
        App::new().configure(configure_app(db, test_pipeline(StubSource::offline()))),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/legal/search?q=%20").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::get().uri("/api/legal/search?q=FRAUD").to_request();
    let json = read_json(test::call_service(&app, req).await).await;
    let titles: Vec<&str> = json["data"]["acts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["title"].as_str().unwrap())
        .collect();
    assert_eq!(
        titles,
        vec!["Criminal Code, s. 322: Theft", "Criminal Code, s. 380: Fraud"]
    );
    assert!(json["data"]["cases"].as_array().unwrap().is_empty());

    let req = test::TestRequest::get().uri("/api/legal/search?q=charter").to_request();
    let json = read_json(test::call_service(&app, req).await).await;
    assert_eq!(json["data"]["acts"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"]["cases"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::get()
        .uri("/api/legal/acts?category=federal-act&limit=2")
        .to_request();
    let json = read_json(test::call_service(&app, req).await).await;
    assert_eq!(json["pagination"]["total"], 3);
    assert_eq!(json["pagination"]["totalPages"], 2);
    assert_eq!(json["data"][0]["title"], "Access to Information Act");

    let req = test::TestRequest::get().uri("/api/legal/criminal-code").to_request();
    let json = read_json(test::call_service(&app, req).await).await;
    let acts = json["data"].as_array().unwrap();
    assert_eq!(acts.len(), 5);
    assert!(acts.iter().all(|a| a["category"] == "criminal-code"));
    assert_eq!(acts[0]["title"], "Criminal Code");
}

#[actix_rt::test]
#[serial]
async fn test_search_finds_cases_after_live_load() {
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let source = StubSource::with_pages(&[(
        "https://laws-lois.justice.gc.ca/eng/acts/",
        r#"<ul id="alphaList">
             <li><a href="/eng/acts/C-46/">Criminal Code</a> <span class="htmlLink">R.S.C., 1985, c. C-46</span></li>
             <li><a href="/eng/acts/A-1/">Access to Information Act</a></li>
           </ul>"#,
    )]);

    let app = test::init_service(
        App::new().configure(configure_app(db, test_pipeline(source.clone()))),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/legal/search?q=charter").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let json = read_json(resp).await;
    assert!(json["data"]["acts"].as_array().unwrap().is_empty());
    assert_eq!(json["data"]["cases"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::get().uri("/api/legal").to_request();
    let json = read_json(test::call_service(&app, req).await).await;
    assert_eq!(json["data"]["totalActs"], 2);
    assert_eq!(json["data"]["totalCases"], 4);
    assert_eq!(source.calls(), 1);
}

#[actix_rt::test]
#[serial]
async fn test_election_listing_and_detail() {
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    IngestionPipeline::new(StubSource::offline(), IngestConfig::default())
        .run(&db)
        .await
        .expect("Ingestion failed");

    let app = test::init_service(
        App::new()
            .wrap(ClientCtx::default())
            .configure(configure_app(db, test_pipeline(StubSource::offline()))),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/elections").to_request();
    let json = read_json(test::call_service(&app, req).await).await;
    assert_eq!(json["pagination"]["total"], 3);

    let req = test::TestRequest::get()
        .uri("/api/elections?type=municipal")
        .to_request();
    let json = read_json(test::call_service(&app, req).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["jurisdiction"], "Toronto");

    let req = test::TestRequest::get()
        .uri("/api/elections?status=completed")
        .to_request();
    let json = read_json(test::call_service(&app, req).await).await;
    let completed = json["data"].as_array().unwrap();
    assert!(completed.len() >= 2);
    assert!(completed.iter().all(|e| e["status"] == "completed"));

    let req = test::TestRequest::get()
        .uri("/api/elections?status=someday")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::get()
        .uri("/api/elections?type=federal")
        .to_request();
    let json = read_json(test::call_service(&app, req).await).await;
    let id = json["data"][0]["id"].as_i64().unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/api/elections/{}", id))
        .to_request();
    let json = read_json(test::call_service(&app, req).await).await;
    assert_eq!(json["data"]["title"], "45th Canadian Federal General Election");
    assert_eq!(json["data"]["status"], "completed");
    let candidates = json["data"]["candidates"].as_array().unwrap();
    let names: Vec<&str> = candidates.iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Avery Tremblay", "Morgan Leblanc", "Riley Singh"]);
    assert_eq!(candidates[0]["policies"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::get().uri("/api/elections/9999").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_rt::test]
#[serial]
async fn test_health() {
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let app = test::init_service(
        App::new().configure(configure_app(db, test_pipeline(StubSource::offline()))),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let json = read_json(resp).await;
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["database"], true);
    assert_eq!(json["data"]["ingestionRunning"], false);
}

#[actix_rt::test]
#[serial]
async fn test_ai_chat_falls_back_without_key() {
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let user = create_test_user(&db, "curious", Role::Citizen).await.unwrap();

    let app = test::init_service(
        App::new().configure(configure_app(db, test_pipeline(StubSource::offline()))),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/ai/chat")
        .set_json(json!({ "message": "How do I vote?" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    let req = test::TestRequest::post()
        .uri("/api/ai/chat")
        .insert_header(bearer(&user))
        .set_json(json!({ "message": "" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::post()
        .uri("/api/ai/chat")
        .insert_header(bearer(&user))
        .set_json(json!({ "message": "How do I vote?" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let json = read_json(resp).await;
    assert_eq!(json["data"]["source"], "fallback");
    assert!(json["data"]["reply"].as_str().unwrap().contains("Elections Canada"));
}
