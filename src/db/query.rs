use std::cmp::Ordering;

use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{CommentWithOwner, Video};

pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Sortable columns of the video listings. Only these names ever reach SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoSortField {
    #[default]
    CreatedAt,
    Title,
    Views,
    Duration,
}

impl VideoSortField {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "createdAt" => Ok(Self::CreatedAt),
            "title" => Ok(Self::Title),
            "views" => Ok(Self::Views),
            "duration" => Ok(Self::Duration),
            other => Err(AppError::InvalidArgument(format!(
                "Invalid sortBy field: {}",
                other
            ))),
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Title => "title",
            Self::Views => "views",
            Self::Duration => "duration",
        }
    }

    pub fn compare(self, a: &Video, b: &Video) -> Ordering {
        match self {
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::Title => a.title.cmp(&b.title),
            Self::Views => a.views.cmp(&b.views),
            Self::Duration => a.duration.total_cmp(&b.duration),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl CommentSortField {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "createdAt" => Ok(Self::CreatedAt),
            "updatedAt" => Ok(Self::UpdatedAt),
            other => Err(AppError::InvalidArgument(format!(
                "Invalid sortBy field: {}",
                other
            ))),
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }

    pub fn compare(self, a: &CommentWithOwner, b: &CommentWithOwner) -> Ordering {
        match self {
            Self::CreatedAt => a.comment.created_at.cmp(&b.comment.created_at),
            Self::UpdatedAt => a.comment.updated_at.cmp(&b.comment.updated_at),
        }
    }
}

/// A validated page window plus sort key. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest<F> {
    pub page: u32,
    pub limit: u32,
    pub sort_by: F,
    pub order: SortOrder,
}

impl<F> PageRequest<F> {
    pub fn new(page: u32, limit: u32, sort_by: F, order: SortOrder) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
            sort_by,
            order,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Slices an already sorted in-memory result set to this page.
    pub fn window<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset() as usize)
            .take(self.limit as usize)
            .collect()
    }
}
