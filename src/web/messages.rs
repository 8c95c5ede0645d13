//! Direct messages between users.

use super::error::ApiError;
use super::response::{ApiResponse, PageQuery, PageRequest, Pagination};
use super::users::{user_summaries, UserSummary};
use crate::app_config;
use crate::auth::AuthUser;
use crate::orm::{messages, users};
use crate::rate_limit;
use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, NotSet,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_conversations)
        .service(view_thread)
        .service(send_message);
}

fn between(a: i32, b: i32) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(messages::Column::SenderId.eq(a))
                .add(messages::Column::RecipientId.eq(b)),
        )
        .add(
            Condition::all()
                .add(messages::Column::SenderId.eq(b))
                .add(messages::Column::RecipientId.eq(a)),
        )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Conversation {
    user: Option<UserSummary>,
    last_message: messages::Model,
    unread_count: u32,
}

/// One entry per correspondent, most recent first.
#[get("/api/messages")]
async fn list_conversations(
    user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let all = messages::Entity::find()
        .filter(
            Condition::any()
                .add(messages::Column::SenderId.eq(user.id))
                .add(messages::Column::RecipientId.eq(user.id)),
        )
        .order_by_desc(messages::Column::CreatedAt)
        .order_by_desc(messages::Column::Id)
        .all(db.get_ref())
        .await?;

    let mut order: Vec<i32> = Vec::new();
    let mut latest: HashMap<i32, messages::Model> = HashMap::new();
    let mut unread: HashMap<i32, u32> = HashMap::new();

    for message in all {
        let other = if message.sender_id == user.id {
            message.recipient_id
        } else {
            message.sender_id
        };
        if message.recipient_id == user.id && !message.is_read {
            *unread.entry(other).or_default() += 1;
        }
        if !latest.contains_key(&other) {
            order.push(other);
            latest.insert(other, message);
        }
    }

    let mut people = user_summaries(&db, order.iter().copied()).await?;
    let conversations: Vec<Conversation> = order
        .into_iter()
        .filter_map(|other| {
            latest.remove(&other).map(|last_message| Conversation {
                user: people.remove(&other),
                last_message,
                unread_count: unread.get(&other).copied().unwrap_or(0),
            })
        })
        .collect();

    Ok(ApiResponse::ok(conversations).into_response())
}

/// Newest first. Viewing a thread marks the caller's incoming messages read.
#[get("/api/messages/{user_id}")]
async fn view_thread(
    user: AuthUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let other = path.into_inner();
    if users::Entity::find_by_id(other).one(db.get_ref()).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let page = PageRequest::from(&*query);
    let paginator = messages::Entity::find()
        .filter(between(user.id, other))
        .order_by_desc(messages::Column::CreatedAt)
        .order_by_desc(messages::Column::Id)
        .paginate(db.get_ref(), page.limit);

    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page.page - 1).await?;

    messages::Entity::update_many()
        .col_expr(messages::Column::IsRead, Expr::value(true))
        .filter(messages::Column::SenderId.eq(other))
        .filter(messages::Column::RecipientId.eq(user.id))
        .filter(messages::Column::IsRead.eq(false))
        .exec(db.get_ref())
        .await?;

    Ok(ApiResponse::ok(items)
        .paginated(Pagination::new(page, total))
        .into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub recipient_id: i32,
    pub content: String,
}

#[post("/api/messages")]
async fn send_message(
    user: AuthUser,
    db: web::Data<DatabaseConnection>,
    body: web::Json<NewMessage>,
) -> Result<HttpResponse, ApiError> {
    let content = body.content.trim();
    if content.is_empty() {
        return Err(ApiError::bad_request("Message content is required"));
    }
    let max = app_config::limits().max_message_length as usize;
    if content.chars().count() > max {
        return Err(ApiError::bad_request(format!(
            "Message exceeds {} characters",
            max
        )));
    }
    if body.recipient_id == user.id {
        return Err(ApiError::bad_request("You cannot message yourself"));
    }
    if users::Entity::find_by_id(body.recipient_id)
        .one(db.get_ref())
        .await?
        .is_none()
    {
        return Err(ApiError::not_found("Recipient not found"));
    }

    rate_limit::check_message_rate_limit(user.id)?;

    let message = messages::ActiveModel {
        id: NotSet,
        sender_id: Set(user.id),
        recipient_id: Set(body.recipient_id),
        content: Set(content.to_string()),
        is_read: Set(false),
        created_at: Set(Utc::now().naive_utc()),
    }
    .insert(db.get_ref())
    .await?;

    Ok(ApiResponse::with_message("Message sent", message).created())
}
