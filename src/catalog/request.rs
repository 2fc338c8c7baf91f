use uuid::Uuid;
use vidhub_api::{PageQuery, VideoListQuery};

use super::pipeline::SortSpec;
use crate::error::AppError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Validated page window: `page >= 1`, `1 <= limit <= MAX_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, AppError> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);

        if page == 0 {
            return Err(AppError::invalid_argument("page must be at least 1"));
        }
        if limit == 0 {
            return Err(AppError::invalid_argument("limit must be at least 1"));
        }

        Ok(Self {
            page,
            limit: limit.min(MAX_LIMIT),
        })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl TryFrom<PageQuery> for Pagination {
    type Error = AppError;

    fn try_from(query: PageQuery) -> Result<Self, Self::Error> {
        Self::new(query.page, query.limit)
    }
}

/// Parsed listing request; building it validates the owner id.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRequest {
    pub text: Option<String>,
    pub owner: Option<Uuid>,
    pub sort: SortSpec,
    pub pagination: Pagination,
}

impl TryFrom<VideoListQuery> for CatalogRequest {
    type Error = AppError;

    fn try_from(query: VideoListQuery) -> Result<Self, Self::Error> {
        let owner = query
            .user_id
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(|raw| Uuid::parse_str(raw).map_err(|_| AppError::invalid_argument("Invalid userId")))
            .transpose()?;

        Ok(Self {
            text: query.query,
            owner,
            sort: SortSpec::from_request(query.sort_by.as_deref(), query.sort_type.as_deref()),
            pagination: Pagination::new(query.page, query.limit)?,
        })
    }
}
