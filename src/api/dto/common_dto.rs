//! Response envelope and pagination types shared by all endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::persistence::Page;

/// Success envelope: `{ success: true, message?, data }`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Always `true`.
    pub success: bool,
    /// Optional human-readable note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Payload.
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wraps `data` without a message.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    /// Wraps `data` with a message.
    #[must_use]
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

/// Envelope for operations that return no payload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    /// Always `true`.
    pub success: bool,
    /// What happened.
    pub message: String,
}

impl MessageResponse {
    /// Creates a success message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Pagination query parameters for list endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100). Defaults to 20.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

/// Pagination metadata included in list responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total number of items.
    pub total: u64,
    /// Total number of pages.
    pub total_pages: u64,
}

/// Paginated success envelope.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Paginated<T> {
    /// Always `true`.
    pub success: bool,
    /// Items on this page.
    pub data: Vec<T>,
    /// Page position.
    pub pagination: PaginationMeta,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationParams {
    /// Clamps `per_page` to the allowed maximum of 100.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, 100),
        }
    }

    /// Offset/limit window for the repositories.
    #[must_use]
    pub fn page(&self) -> Page {
        let clamped = self.clamped();
        Page {
            offset: (clamped.page - 1).saturating_mul(clamped.per_page),
            limit: clamped.per_page,
        }
    }
}

impl<T> Paginated<T> {
    /// Builds a page from already-windowed items and the overall total.
    #[must_use]
    pub fn new(data: Vec<T>, params: &PaginationParams, total: u64) -> Self {
        let params = params.clamped();
        let total_pages = total.div_ceil(u64::from(params.per_page));
        Self {
            success: true,
            data,
            pagination: PaginationMeta {
                page: params.page,
                per_page: params.per_page,
                total,
                total_pages,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_window_from_params() {
        let params = PaginationParams {
            page: 3,
            per_page: 500,
        };
        assert_eq!(params.page(), Page { offset: 200, limit: 100 });

        let first = PaginationParams {
            page: 0,
            per_page: 0,
        };
        assert_eq!(first.page(), Page { offset: 0, limit: 1 });
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = Paginated::new(vec![1, 2], &PaginationParams::default(), 41);
        assert_eq!(page.pagination.total_pages, 3);
        let empty: Paginated<u8> = Paginated::new(Vec::new(), &PaginationParams::default(), 0);
        assert_eq!(empty.pagination.total_pages, 0);
    }

    #[test]
    fn envelope_omits_missing_message() {
        let json = serde_json::to_value(ApiResponse::ok(7)).unwrap_or_default();
        assert_eq!(json, serde_json::json!({ "success": true, "data": 7 }));
    }
}
