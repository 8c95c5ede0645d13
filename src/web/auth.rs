//! Registration, login and current-user endpoints.

use super::error::ApiError;
use super::response::ApiResponse;
use crate::auth::{hash_password, verify_password, AuthUser, JwtKeys};
use crate::ip::client_key;
use crate::orm::users::{self, Role};
use crate::rate_limit;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, NotSet, PaginatorTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(register).service(login).service(me);
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 1000))]
    pub password: String,
    #[validate(length(max = 100))]
    pub display_name: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    #[validate(length(min = 1, max = 1000))]
    pub password: String,
}

#[derive(Serialize)]
struct TokenResponse {
    token: String,
    user: users::Model,
}

fn valid_username(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

async fn find_by_username(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<users::Model>, ApiError> {
    Ok(users::Entity::find()
        .filter(
            Expr::expr(Func::lower(Expr::col(users::Column::Username)))
                .eq(username.to_lowercase()),
        )
        .one(db)
        .await?)
}

async fn find_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<users::Model>, ApiError> {
    Ok(users::Entity::find()
        .filter(Expr::col(users::Column::Email).eq(email))
        .one(db)
        .await?)
}

/// The first account on an empty instance is the administrator.
#[post("/api/auth/register")]
async fn register(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    keys: web::Data<JwtKeys>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;
    rate_limit::check_registration_rate_limit(&client_key(&req))?;

    let username = body.username.trim().to_string();
    if !valid_username(&username) {
        return Err(ApiError::bad_request(
            "Username may only contain letters, numbers, '.', '_' and '-'",
        ));
    }
    let email = body.email.trim().to_lowercase();

    if find_by_username(&db, &username).await?.is_some() {
        return Err(ApiError::conflict("Username is already taken"));
    }
    if find_by_email(&db, &email).await?.is_some() {
        return Err(ApiError::conflict("Email is already registered"));
    }

    let password = hash_password(&body.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    let role = if users::Entity::find().count(db.get_ref()).await? == 0 {
        log::info!("Registering {} as the first administrator", username);
        Role::Admin
    } else {
        Role::Citizen
    };

    let now = Utc::now().naive_utc();
    let user = users::ActiveModel {
        id: NotSet,
        username: Set(username),
        email: Set(email),
        password: Set(password),
        role: Set(role),
        display_name: Set(body.display_name.clone().filter(|d| !d.trim().is_empty())),
        bio: Set(None),
        location: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db.get_ref())
    .await?;

    let token = keys.issue(&user)?;
    Ok(ApiResponse::with_message("Account created", TokenResponse { token, user }).created())
}

#[post("/api/auth/login")]
async fn login(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    keys: web::Data<JwtKeys>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;

    let ip = client_key(&req);
    let username = body.username.trim();
    rate_limit::check_login_rate_limit(&ip, username)?;

    let user = match find_by_username(&db, username).await? {
        Some(user) if verify_password(&body.password, &user.password) => user,
        _ => return Err(ApiError::unauthorized("Invalid username or password")),
    };

    rate_limit::clear_login_attempts(&ip, username);
    log::info!("User {} logged in", user.id);

    let token = keys.issue(&user)?;
    Ok(ApiResponse::with_message("Logged in", TokenResponse { token, user }).into_response())
}

#[get("/api/auth/me")]
async fn me(user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, ApiError> {
    let model = users::Entity::find_by_id(user.id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ApiResponse::ok(model).into_response())
}
