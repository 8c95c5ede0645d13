//! Success envelope and pagination helpers shared by every handler.

use crate::app_config;
use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self::with_message("OK", data)
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            pagination: None,
            processing_time: None,
        }
    }

    pub fn paginated(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn timed(mut self, processing_time: String) -> Self {
        self.processing_time = Some(processing_time);
        self
    }

    pub fn into_response(self) -> HttpResponse {
        HttpResponse::Ok().json(self)
    }

    pub fn created(self) -> HttpResponse {
        HttpResponse::Created().json(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: PageRequest, total: u64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + page.limit - 1) / page.limit
        };

        Self {
            page: page.page,
            limit: page.limit,
            total,
            total_pages,
            has_next: page.page < total_pages,
            has_prev: page.page > 1,
        }
    }
}

/// Raw `?page=&limit=` parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Normalized page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn from_parts(page: Option<u64>, limit: Option<u64>) -> Self {
        let limits = app_config::limits();
        Self::clamp(page, limit, limits.default_page_size, limits.max_page_size)
    }

    pub fn clamp(page: Option<u64>, limit: Option<u64>, default: u64, max: u64) -> Self {
        let max = max.max(1);
        let limit = match limit {
            Some(0) | None => default.clamp(1, max),
            Some(l) => l.min(max),
        };

        // Row offsets are signed 64-bit in SQL.
        let last_page = i64::MAX as u64 / limit;
        Self {
            page: page.unwrap_or(1).clamp(1, last_page),
            limit,
        }
    }
}

impl From<&PageQuery> for PageRequest {
    fn from(q: &PageQuery) -> Self {
        Self::from_parts(q.page, q.limit)
    }
}
