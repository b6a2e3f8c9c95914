//! Response envelope, pagination and request helpers shared by every resource.

pub mod middleware;
pub mod tracing;
pub mod utils;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::{PageRequest, SortOrder};
use crate::errors::AppError;

/// Uniform success envelope. Errors render the same shape from [`AppError`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: status.as_u16() < 400,
            pagination: None,
        }
    }

    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, data, message)
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, data, message)
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub remaining_pages: u64,
}

impl Pagination {
    pub fn new<F>(request: &PageRequest<F>, total: u64) -> Self {
        let total_pages = total.div_ceil(u64::from(request.limit));
        Self {
            current_page: request.page,
            total_pages,
            remaining_pages: total_pages.saturating_sub(u64::from(request.page)),
        }
    }
}

/// `page`, `limit`, `sortBy`, `sortType` query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_type: Option<SortOrder>,
}

impl PaginationParams {
    /// Validates the sort key with `parse` and clamps page and limit.
    pub fn into_request<F: Default>(
        self,
        default_limit: u32,
        parse: impl Fn(&str) -> Result<F, AppError>,
    ) -> Result<PageRequest<F>, AppError> {
        let sort_by = match self.sort_by.as_deref() {
            Some(raw) if !raw.trim().is_empty() => parse(raw.trim())?,
            _ => F::default(),
        };
        Ok(PageRequest::new(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(default_limit),
            sort_by,
            self.sort_type.unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::VideoSortField;

    #[test]
    fn pagination_counts_remaining_pages() {
        let request = PageRequest::new(2, 2, VideoSortField::Title, SortOrder::Asc);
        assert_eq!(
            Pagination::new(&request, 5),
            Pagination {
                current_page: 2,
                total_pages: 3,
                remaining_pages: 1,
            }
        );

        let beyond = PageRequest::new(9, 2, VideoSortField::Title, SortOrder::Asc);
        assert_eq!(Pagination::new(&beyond, 5).remaining_pages, 0);
        assert_eq!(Pagination::new(&beyond, 0).total_pages, 0);
    }

    #[test]
    fn params_fall_back_to_defaults() {
        let request = PaginationParams::default()
            .into_request(10, VideoSortField::parse)
            .unwrap();
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, 10);
        assert_eq!(request.sort_by, VideoSortField::CreatedAt);
        assert_eq!(request.order, SortOrder::Desc);

        let bad = PaginationParams {
            sort_by: Some("owner".into()),
            ..Default::default()
        };
        assert!(matches!(
            bad.into_request(10, VideoSortField::parse),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn envelope_marks_success_by_status() {
        let response = ApiResponse::created(1, "made");
        assert!(response.success);
        assert_eq!(response.status_code, 201);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("pagination").is_none());
        assert_eq!(json["statusCode"], 201);
    }
}
