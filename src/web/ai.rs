//! Civic assistant chat.

use super::error::ApiError;
use super::response::ApiResponse;
use crate::ai::AiClient;
use crate::auth::AuthUser;
use actix_web::{post, web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(chat);
}

#[derive(Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 4000))]
    pub message: String,
}

#[post("/api/ai/chat")]
async fn chat(
    user: AuthUser,
    ai: web::Data<AiClient>,
    body: web::Json<ChatRequest>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;
    let message = body.message.trim();
    if message.is_empty() {
        return Err(ApiError::bad_request("Message is required"));
    }

    log::debug!("AI chat request from user {}", user.id);
    Ok(ApiResponse::ok(ai.ask(message).await).into_response())
}
