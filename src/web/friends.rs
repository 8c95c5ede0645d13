//! Friend requests and friend lists.
//!
//! Accept and reject address the request by its friendship id. Removal
//! addresses the other user by user id and works on any status, so it also
//! cancels an outgoing request.

use super::error::ApiError;
use super::response::ApiResponse;
use super::users::{find_friendship, user_summaries, UserSummary};
use crate::auth::AuthUser;
use crate::orm::user_friends::{self, FriendshipStatus};
use crate::orm::users;
use crate::rate_limit;
use actix_web::{delete, get, post, web, HttpResponse};
use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait, NotSet,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use serde::{Deserialize, Serialize};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_friends)
        .service(list_requests)
        .service(send_request)
        .service(accept_request)
        .service(reject_request)
        .service(remove_friend);
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FriendEntry {
    friendship_id: i32,
    status: FriendshipStatus,
    user: Option<UserSummary>,
    since: NaiveDateTime,
}

async fn entries(
    db: &DatabaseConnection,
    rows: Vec<user_friends::Model>,
    me: i32,
) -> Result<Vec<FriendEntry>, ApiError> {
    let mut people = user_summaries(db, rows.iter().map(|f| f.other_party(me))).await?;

    Ok(rows
        .into_iter()
        .map(|f| FriendEntry {
            friendship_id: f.id,
            status: f.status,
            user: people.remove(&f.other_party(me)),
            since: f.updated_at,
        })
        .collect())
}

#[get("/api/friends")]
async fn list_friends(
    user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let rows = user_friends::Entity::find()
        .filter(user_friends::Column::Status.eq(FriendshipStatus::Accepted))
        .filter(
            Condition::any()
                .add(user_friends::Column::UserId.eq(user.id))
                .add(user_friends::Column::FriendId.eq(user.id)),
        )
        .order_by_desc(user_friends::Column::UpdatedAt)
        .all(db.get_ref())
        .await?;

    Ok(ApiResponse::ok(entries(&db, rows, user.id).await?).into_response())
}

#[derive(Serialize)]
struct PendingRequests {
    incoming: Vec<FriendEntry>,
    outgoing: Vec<FriendEntry>,
}

#[get("/api/friends/requests")]
async fn list_requests(
    user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let pending = user_friends::Entity::find()
        .filter(user_friends::Column::Status.eq(FriendshipStatus::Pending))
        .filter(
            Condition::any()
                .add(user_friends::Column::UserId.eq(user.id))
                .add(user_friends::Column::FriendId.eq(user.id)),
        )
        .order_by_desc(user_friends::Column::CreatedAt)
        .all(db.get_ref())
        .await?;

    let (incoming, outgoing): (Vec<_>, Vec<_>) =
        pending.into_iter().partition(|f| f.friend_id == user.id);

    Ok(ApiResponse::ok(PendingRequests {
        incoming: entries(&db, incoming, user.id).await?,
        outgoing: entries(&db, outgoing, user.id).await?,
    })
    .into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestBody {
    pub friend_id: i32,
}

#[post("/api/friends/request")]
async fn send_request(
    user: AuthUser,
    db: web::Data<DatabaseConnection>,
    body: web::Json<FriendRequestBody>,
) -> Result<HttpResponse, ApiError> {
    let target = body.friend_id;
    if target == user.id {
        return Err(ApiError::bad_request("You cannot send a friend request to yourself"));
    }
    if users::Entity::find_by_id(target).one(db.get_ref()).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    rate_limit::check_friend_request_rate_limit(user.id)?;
    let now = Utc::now().naive_utc();

    let friendship = match find_friendship(&db, user.id, target).await? {
        Some(existing) => match existing.status {
            FriendshipStatus::Accepted => return Err(ApiError::conflict("Already friends")),
            FriendshipStatus::Pending => {
                return Err(ApiError::conflict("Friend request already pending"))
            }
            // A rejected pair may be re-requested by either side.
            FriendshipStatus::Rejected => {
                let mut active: user_friends::ActiveModel = existing.into();
                active.user_id = Set(user.id);
                active.friend_id = Set(target);
                active.status = Set(FriendshipStatus::Pending);
                active.updated_at = Set(now);
                active.update(db.get_ref()).await?
            }
        },
        None => {
            let (low, high) = user_friends::pair(user.id, target);
            user_friends::ActiveModel {
                id: NotSet,
                user_id: Set(user.id),
                friend_id: Set(target),
                pair_low: Set(low),
                pair_high: Set(high),
                status: Set(FriendshipStatus::Pending),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(db.get_ref())
            .await
            .map_err(|e| match e.sql_err() {
                // The other side asked at the same moment.
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    ApiError::conflict("Friend request already pending")
                }
                _ => ApiError::from(e),
            })?
        }
    };

    log::debug!("User {} sent friend request {} to {}", user.id, friendship.id, target);
    Ok(ApiResponse::with_message("Friend request sent", friendship).created())
}

/// A pending request addressed to `me`.
async fn incoming_request(
    db: &DatabaseConnection,
    request_id: i32,
    me: i32,
) -> Result<user_friends::Model, ApiError> {
    let request = user_friends::Entity::find_by_id(request_id)
        .one(db)
        .await?
        .filter(|f| f.friend_id == me)
        .ok_or_else(|| ApiError::not_found("Friend request not found"))?;

    if request.status != FriendshipStatus::Pending {
        return Err(ApiError::conflict("Friend request is no longer pending"));
    }
    Ok(request)
}

async fn respond(
    db: &DatabaseConnection,
    request_id: i32,
    me: i32,
    status: FriendshipStatus,
) -> Result<user_friends::Model, ApiError> {
    let request = incoming_request(db, request_id, me).await?;
    let mut active: user_friends::ActiveModel = request.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(db).await?)
}

#[post("/api/friends/{id}/accept")]
async fn accept_request(
    user: AuthUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let friendship = respond(&db, path.into_inner(), user.id, FriendshipStatus::Accepted).await?;
    Ok(ApiResponse::with_message("Friend request accepted", friendship).into_response())
}

#[post("/api/friends/{id}/reject")]
async fn reject_request(
    user: AuthUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let friendship = respond(&db, path.into_inner(), user.id, FriendshipStatus::Rejected).await?;
    Ok(ApiResponse::with_message("Friend request rejected", friendship).into_response())
}

#[delete("/api/friends/{id}")]
async fn remove_friend(
    user: AuthUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let other = path.into_inner();
    let friendship = find_friendship(&db, user.id, other)
        .await?
        .ok_or_else(|| ApiError::not_found("Friendship not found"))?;

    friendship.delete(db.get_ref()).await?;
    Ok(ApiResponse::with_message("Friend removed", serde_json::Value::Null).into_response())
}
