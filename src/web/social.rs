//! Social feed, posts and likes.

use super::error::ApiError;
use super::response::{ApiResponse, PageQuery, PageRequest, Pagination};
use super::users::{accepted_friend_ids, user_summaries, UserSummary};
use crate::app_config;
use crate::auth::AuthUser;
use crate::middleware::ClientCtx;
use crate::orm::social_posts::{self, Visibility};
use crate::orm::social_post_likes;
use crate::permission::SOCIAL_MODERATE;
use crate::rate_limit;
use actix_web::{delete, get, post, web, HttpResponse};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait, NotSet,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_feed)
        .service(create_post)
        .service(toggle_like)
        .service(delete_post);
}

/// Posts `viewer` may see: everything public, their own posts, and
/// friends-only posts from accepted friends.
fn feed_condition(viewer: Option<i32>, friends: &[i32]) -> Condition {
    let mut cond =
        Condition::any().add(social_posts::Column::Visibility.eq(Visibility::Public));

    if let Some(me) = viewer {
        cond = cond.add(social_posts::Column::UserId.eq(me));
        if !friends.is_empty() {
            cond = cond.add(
                Condition::all()
                    .add(social_posts::Column::Visibility.eq(Visibility::Friends))
                    .add(social_posts::Column::UserId.is_in(friends.to_vec())),
            );
        }
    }

    cond
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedItem {
    #[serde(flatten)]
    post: social_posts::Model,
    author: Option<UserSummary>,
    liked_by_me: bool,
}

#[get("/api/social/feed")]
async fn view_feed(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let viewer = client.get_id();
    let friends = match viewer {
        Some(me) => accepted_friend_ids(&db, me).await?,
        None => Vec::new(),
    };

    let page = PageRequest::from(&*query);
    let paginator = social_posts::Entity::find()
        .filter(feed_condition(viewer, &friends))
        .order_by_desc(social_posts::Column::CreatedAt)
        .order_by_desc(social_posts::Column::Id)
        .paginate(db.get_ref(), page.limit);

    let total = paginator.num_items().await?;
    let posts = paginator.fetch_page(page.page - 1).await?;

    let liked: HashSet<i32> = match viewer {
        Some(me) if !posts.is_empty() => social_post_likes::Entity::find()
            .filter(social_post_likes::Column::UserId.eq(me))
            .filter(social_post_likes::Column::PostId.is_in(posts.iter().map(|p| p.id)))
            .all(db.get_ref())
            .await?
            .into_iter()
            .map(|l| l.post_id)
            .collect(),
        _ => HashSet::new(),
    };

    let authors = user_summaries(&db, posts.iter().map(|p| p.user_id)).await?;
    let items: Vec<FeedItem> = posts
        .into_iter()
        .map(|post| FeedItem {
            author: authors.get(&post.user_id).cloned(),
            liked_by_me: liked.contains(&post.id),
            post,
        })
        .collect();

    Ok(ApiResponse::ok(items)
        .paginated(Pagination::new(page, total))
        .timed(client.request_time_as_string())
        .into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub content: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

fn validate_image_url(raw: &str) -> Result<String, ApiError> {
    let parsed =
        url::Url::parse(raw).map_err(|_| ApiError::bad_request("imageUrl is not a valid URL"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed.to_string()),
        _ => Err(ApiError::bad_request("imageUrl must use http or https")),
    }
}

#[post("/api/social/posts")]
async fn create_post(
    user: AuthUser,
    db: web::Data<DatabaseConnection>,
    body: web::Json<NewPost>,
) -> Result<HttpResponse, ApiError> {
    let content = body.content.trim();
    if content.is_empty() {
        return Err(ApiError::bad_request("Post content is required"));
    }
    let max = app_config::limits().max_post_length as usize;
    if content.chars().count() > max {
        return Err(ApiError::bad_request(format!("Post exceeds {} characters", max)));
    }

    let image_url = match body.image_url.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(validate_image_url(raw)?),
    };

    rate_limit::check_post_rate_limit(user.id)?;

    let now = Utc::now().naive_utc();
    let post = social_posts::ActiveModel {
        id: NotSet,
        user_id: Set(user.id),
        content: Set(content.to_string()),
        image_url: Set(image_url),
        visibility: Set(body.visibility.unwrap_or(Visibility::Public)),
        like_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db.get_ref())
    .await?;

    Ok(ApiResponse::with_message("Post created", post).created())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LikeState {
    liked: bool,
    like_count: i32,
}

/// Likes the post, or removes the caller's like if present.
#[post("/api/social/posts/{id}/like")]
async fn toggle_like(
    user: AuthUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let post_id = path.into_inner();
    let post = social_posts::Entity::find_by_id(post_id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    if post.visibility == Visibility::Friends
        && post.user_id != user.id
        && !accepted_friend_ids(&db, user.id).await?.contains(&post.user_id)
    {
        return Err(ApiError::not_found("Post not found"));
    }

    let txn = db.begin().await?;
    let existing = social_post_likes::Entity::find()
        .filter(social_post_likes::Column::PostId.eq(post_id))
        .filter(social_post_likes::Column::UserId.eq(user.id))
        .one(&txn)
        .await?;

    let liked = match existing {
        Some(like) => {
            like.delete(&txn).await?;
            social_posts::Entity::update_many()
                .col_expr(
                    social_posts::Column::LikeCount,
                    Expr::col(social_posts::Column::LikeCount).sub(1),
                )
                .filter(social_posts::Column::Id.eq(post_id))
                .filter(social_posts::Column::LikeCount.gt(0))
                .exec(&txn)
                .await?;
            false
        }
        None => {
            social_post_likes::ActiveModel {
                id: NotSet,
                post_id: Set(post_id),
                user_id: Set(user.id),
                created_at: Set(Utc::now().naive_utc()),
            }
            .insert(&txn)
            .await?;
            social_posts::Entity::update_many()
                .col_expr(
                    social_posts::Column::LikeCount,
                    Expr::col(social_posts::Column::LikeCount).add(1),
                )
                .filter(social_posts::Column::Id.eq(post_id))
                .exec(&txn)
                .await?;
            true
        }
    };

    let like_count = social_posts::Entity::find_by_id(post_id)
        .one(&txn)
        .await?
        .map(|p| p.like_count)
        .unwrap_or(0);
    txn.commit().await?;

    Ok(ApiResponse::ok(LikeState { liked, like_count }).into_response())
}

/// Authors may delete their own posts; moderators may delete any.
#[delete("/api/social/posts/{id}")]
async fn delete_post(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let user = client.require_login()?;
    let post_id = path.into_inner();
    let post = social_posts::Entity::find_by_id(post_id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    if !client.can_modify(post.user_id, SOCIAL_MODERATE) {
        return Err(ApiError::forbidden("You cannot delete this post"));
    }

    let author = post.user_id;
    let txn = db.begin().await?;
    social_post_likes::Entity::delete_many()
        .filter(social_post_likes::Column::PostId.eq(post_id))
        .exec(&txn)
        .await?;
    post.delete(&txn).await?;
    txn.commit().await?;

    if author != user.id {
        log::info!("Moderator {} deleted post {} by user {}", user.id, post_id, author);
    }

    Ok(ApiResponse::with_message("Post deleted", serde_json::Value::Null).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_url_scheme() {
        assert!(validate_image_url("https://example.org/a.png").is_ok());
        assert!(validate_image_url("javascript:alert(1)").is_err());
        assert!(validate_image_url("ftp://example.org/a.png").is_err());
        assert!(validate_image_url("not a url").is_err());
    }

    #[test]
    fn test_guest_feed_is_public_only() {
        assert_eq!(feed_condition(None, &[]).len(), 1);
        assert_eq!(feed_condition(Some(1), &[]).len(), 2);
        assert_eq!(feed_condition(Some(1), &[2, 3]).len(), 3);
    }
}
