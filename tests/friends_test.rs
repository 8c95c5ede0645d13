//! Integration tests for friend requests and user profiles

mod common;

use actix_web::{test, App};
use civicos::middleware::ClientCtx;
use civicos::orm::users::Role;
use common::{database::*, fixtures::*};
use serde_json::json;
use serial_test::serial;

#[actix_rt::test]
#[serial]
async fn test_request_accept_and_remove() {
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let alice = create_test_user(&db, "alice", Role::Citizen).await.unwrap();
    let bob = create_test_user(&db, "bob", Role::Citizen).await.unwrap();

    let app = test::init_service(
        App::new()
            .wrap(ClientCtx::default())
            .configure(configure_app(db, test_pipeline(StubSource::offline()))),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/friends/request")
        .insert_header(bearer(&alice))
        .set_json(json!({ "friendId": bob.id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let request_id = read_json(resp).await["data"]["id"].as_i64().unwrap();

    // Bob sees it incoming, Alice sees it outgoing
    let req = test::TestRequest::get()
        .uri("/api/friends/requests")
        .insert_header(bearer(&bob))
        .to_request();
    let json = read_json(test::call_service(&app, req).await).await;
    assert_eq!(json["data"]["incoming"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"]["incoming"][0]["user"]["username"], "alice");
    assert!(json["data"]["outgoing"].as_array().unwrap().is_empty());

    let req = test::TestRequest::get()
        .uri("/api/friends/requests")
        .insert_header(bearer(&alice))
        .to_request();
    let json = read_json(test::call_service(&app, req).await).await;
    assert_eq!(json["data"]["outgoing"].as_array().unwrap().len(), 1);

    // Only the addressee can accept
    let req = test::TestRequest::post()
        .uri(&format!("/api/friends/{}/accept", request_id))
        .insert_header(bearer(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    let req = test::TestRequest::post()
        .uri(&format!("/api/friends/{}/accept", request_id))
        .insert_header(bearer(&bob))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(read_json(resp).await["data"]["status"], "accepted");

    let req = test::TestRequest::get()
        .uri("/api/friends")
        .insert_header(bearer(&alice))
        .to_request();
    let json = read_json(test::call_service(&app, req).await).await;
    let friends = json["data"].as_array().unwrap();
    assert_eq!(friends.len(), 1);
    assert_eq!(friends[0]["user"]["id"], bob.id);

    // Profile reflects the relation for the viewer
    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}", bob.id))
        .insert_header(bearer(&alice))
        .to_request();
    let json = read_json(test::call_service(&app, req).await).await;
    assert_eq!(json["data"]["friendCount"], 1);
    assert_eq!(json["data"]["friendshipStatus"], "accepted");

    // Either direction counts as already friends
    let req = test::TestRequest::post()
        .uri("/api/friends/request")
        .insert_header(bearer(&bob))
        .set_json(json!({ "friendId": alice.id }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 409);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/friends/{}", alice.id))
        .insert_header(bearer(&bob))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::get()
        .uri("/api/friends")
        .insert_header(bearer(&alice))
        .to_request();
    let json = read_json(test::call_service(&app, req).await).await;
    assert!(json["data"].as_array().unwrap().is_empty());

    let req = test::TestRequest::delete()
        .uri(&format!("/api/friends/{}", alice.id))
        .insert_header(bearer(&bob))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_rt::test]
#[serial]
async fn test_invalid_requests() {
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let carol = create_test_user(&db, "carol", Role::Citizen).await.unwrap();
    let dave = create_test_user(&db, "dave", Role::Citizen).await.unwrap();

    let app = test::init_service(
        App::new().configure(configure_app(db, test_pipeline(StubSource::offline()))),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/friends/request")
        .insert_header(bearer(&carol))
        .set_json(json!({ "friendId": carol.id }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::post()
        .uri("/api/friends/request")
        .insert_header(bearer(&carol))
        .set_json(json!({ "friendId": 9999 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    let req = test::TestRequest::post()
        .uri("/api/friends/request")
        .insert_header(bearer(&carol))
        .set_json(json!({ "friendId": dave.id }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    // Duplicate pending request
    let req = test::TestRequest::post()
        .uri("/api/friends/request")
        .insert_header(bearer(&carol))
        .set_json(json!({ "friendId": dave.id }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 409);

    let req = test::TestRequest::get().uri("/api/friends").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);
}

#[actix_rt::test]
#[serial]
async fn test_rejected_pair_can_request_again() {
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let erin = create_test_user(&db, "erin", Role::Citizen).await.unwrap();
    let frank = create_test_user(&db, "frank", Role::Citizen).await.unwrap();

    let app = test::init_service(
        App::new().configure(configure_app(db, test_pipeline(StubSource::offline()))),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/friends/request")
        .insert_header(bearer(&erin))
        .set_json(json!({ "friendId": frank.id }))
        .to_request();
    let request_id = read_json(test::call_service(&app, req).await).await["data"]["id"]
        .as_i64()
        .unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/friends/{}/reject", request_id))
        .insert_header(bearer(&frank))
        .to_request();
    let json = read_json(test::call_service(&app, req).await).await;
    assert_eq!(json["data"]["status"], "rejected");

    // Already answered
    let req = test::TestRequest::post()
        .uri(&format!("/api/friends/{}/accept", request_id))
        .insert_header(bearer(&frank))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 409);

    // Frank changes their mind and asks Erin instead
    let req = test::TestRequest::post()
        .uri("/api/friends/request")
        .insert_header(bearer(&frank))
        .set_json(json!({ "friendId": erin.id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let json = read_json(resp).await;
    assert_eq!(json["data"]["id"].as_i64().unwrap(), request_id);
    assert_eq!(json["data"]["userId"], frank.id);
    assert_eq!(json["data"]["friendId"], erin.id);
    assert_eq!(json["data"]["status"], "pending");

    let req = test::TestRequest::post()
        .uri(&format!("/api/friends/{}/accept", request_id))
        .insert_header(bearer(&erin))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
}

#[actix_rt::test]
#[serial]
async fn test_profile_update() {
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let grace = create_test_user(&db, "grace", Role::Citizen).await.unwrap();

    let app = test::init_service(
        App::new().configure(configure_app(db, test_pipeline(StubSource::offline()))),
    )
    .await;

    let req = test::TestRequest::put()
        .uri("/api/users/profile")
        .insert_header(bearer(&grace))
        .set_json(json!({ "bio": "Ward 4 volunteer", "location": "Halifax" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}", grace.id))
        .to_request();
    let json = read_json(test::call_service(&app, req).await).await;
    assert_eq!(json["data"]["bio"], "Ward 4 volunteer");
    assert_eq!(json["data"]["location"], "Halifax");
    assert!(json["data"].get("friendshipStatus").is_none());
    assert!(json["data"].get("email").is_none());

    let req = test::TestRequest::put()
        .uri("/api/users/profile")
        .insert_header(bearer(&grace))
        .set_json(json!({ "location": "" }))
        .to_request();
    let json = read_json(test::call_service(&app, req).await).await;
    assert!(json["data"]["location"].is_null());
    assert_eq!(json["data"]["bio"], "Ward 4 volunteer");
}

#[actix_rt::test]
#[serial]
async fn test_reciprocal_request_keeps_one_row() {
    use chrono::Utc;
    use civicos::orm::user_friends::{self, FriendshipStatus};
    use sea_orm::{ActiveModelTrait, EntityTrait, NotSet, PaginatorTrait, Set};

    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let gwen = create_test_user(&db, "gwen", Role::Citizen).await.unwrap();
    let hugo = create_test_user(&db, "hugo", Role::Citizen).await.unwrap();

    let app = test::init_service(
        App::new().configure(configure_app(db.clone(), test_pipeline(StubSource::offline()))),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/friends/request")
        .insert_header(bearer(&gwen))
        .set_json(json!({ "friendId": hugo.id }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    let req = test::TestRequest::post()
        .uri("/api/friends/request")
        .insert_header(bearer(&hugo))
        .set_json(json!({ "friendId": gwen.id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
    assert_eq!(read_json(resp).await["success"], false);

    assert_eq!(user_friends::Entity::find().count(&db).await.unwrap(), 1);

    // The pair index rejects the reversed row even without the lookup
    let now = Utc::now().naive_utc();
    let (low, high) = user_friends::pair(hugo.id, gwen.id);
    let reversed = user_friends::ActiveModel {
        id: NotSet,
        user_id: Set(hugo.id),
        friend_id: Set(gwen.id),
        pair_low: Set(low),
        pair_high: Set(high),
        status: Set(FriendshipStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&db)
    .await;
    assert!(reversed.is_err());
    assert_eq!(user_friends::Entity::find().count(&db).await.unwrap(), 1);
}
