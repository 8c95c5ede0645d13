//! Public profiles and profile editing.

use super::error::ApiError;
use super::response::ApiResponse;
use crate::auth::AuthUser;
use crate::middleware::ClientCtx;
use crate::orm::user_friends::{self, FriendshipStatus};
use crate::orm::{social_posts, users};
use actix_web::{get, put, web, HttpResponse};
use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(update_profile).service(view_user);
}

/// Author/friend block embedded in other payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
    pub display_name: Option<String>,
}

impl From<users::Model> for UserSummary {
    fn from(u: users::Model) -> Self {
        Self {
            id: u.id,
            username: u.username,
            display_name: u.display_name,
        }
    }
}

pub(super) async fn user_summaries(
    db: &DatabaseConnection,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, UserSummary>, ApiError> {
    let mut ids: Vec<i32> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    Ok(users::Entity::find()
        .filter(users::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, UserSummary::from(u)))
        .collect())
}

/// The friendship row between two users, in either orientation.
pub(super) async fn find_friendship(
    db: &DatabaseConnection,
    a: i32,
    b: i32,
) -> Result<Option<user_friends::Model>, ApiError> {
    let (low, high) = user_friends::pair(a, b);
    Ok(user_friends::Entity::find()
        .filter(user_friends::Column::PairLow.eq(low))
        .filter(user_friends::Column::PairHigh.eq(high))
        .one(db)
        .await?)
}

/// Ids of everyone with an accepted friendship with `user_id`.
pub(super) async fn accepted_friend_ids(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<i32>, ApiError> {
    Ok(user_friends::Entity::find()
        .filter(user_friends::Column::Status.eq(FriendshipStatus::Accepted))
        .filter(
            Condition::any()
                .add(user_friends::Column::UserId.eq(user_id))
                .add(user_friends::Column::FriendId.eq(user_id)),
        )
        .all(db)
        .await?
        .into_iter()
        .map(|f| f.other_party(user_id))
        .collect())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicProfile {
    id: i32,
    username: String,
    display_name: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    role: users::Role,
    created_at: NaiveDateTime,
    post_count: u64,
    friend_count: usize,
    /// Relation to the caller; absent for guests and for one's own profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    friendship_status: Option<FriendshipStatus>,
}

#[get("/api/users/{id}")]
async fn view_user(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let user = users::Entity::find_by_id(id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let post_count = social_posts::Entity::find()
        .filter(social_posts::Column::UserId.eq(id))
        .count(db.get_ref())
        .await?;
    let friend_count = accepted_friend_ids(&db, id).await?.len();

    let friendship_status = match client.get_id() {
        Some(viewer) if viewer != id => find_friendship(&db, viewer, id).await?.map(|f| f.status),
        _ => None,
    };

    Ok(ApiResponse::ok(PublicProfile {
        id: user.id,
        username: user.username,
        display_name: user.display_name,
        bio: user.bio,
        location: user.location,
        role: user.role,
        created_at: user.created_at,
        post_count,
        friend_count,
        friendship_status,
    })
    .into_response())
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[validate(length(max = 100))]
    pub display_name: Option<String>,
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
}

/// Omitted fields are left unchanged; empty strings clear them.
#[put("/api/users/profile")]
async fn update_profile(
    user: AuthUser,
    db: web::Data<DatabaseConnection>,
    body: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;

    let model = users::Entity::find_by_id(user.id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    fn cleared(value: &str) -> Option<String> {
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    let mut active: users::ActiveModel = model.into();
    if let Some(display_name) = &body.display_name {
        active.display_name = Set(cleared(display_name));
    }
    if let Some(bio) = &body.bio {
        active.bio = Set(cleared(bio));
    }
    if let Some(location) = &body.location {
        active.location = Set(cleared(location));
    }
    active.updated_at = Set(Utc::now().naive_utc());

    let updated = active.update(db.get_ref()).await?;
    Ok(ApiResponse::with_message("Profile updated", updated).into_response())
}
