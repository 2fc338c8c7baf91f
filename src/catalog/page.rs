use vidhub_api::VideoListResponse;

use super::request::Pagination;
use crate::db::models::video::CatalogEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub total_count: u64,
    pub total_pages: u64,
    pub current_page: u32,
}

impl PageInfo {
    pub fn new(total_count: u64, pagination: Pagination) -> Self {
        Self {
            total_count,
            total_pages: total_count.div_ceil(u64::from(pagination.limit())),
            current_page: pagination.page(),
        }
    }
}

/// One window of catalog rows plus the page metadata.
#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub entries: Vec<CatalogEntry>,
    pub info: PageInfo,
}

impl CatalogPage {
    pub fn into_response<T: From<CatalogEntry>>(self) -> VideoListResponse<T> {
        VideoListResponse {
            videos: self.entries.into_iter().map(T::from).collect(),
            total_videos: self.info.total_count,
            total_pages: self.info.total_pages,
            current_page: self.info.current_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        let info = PageInfo::new(25, Pagination::new(Some(3), Some(10)).unwrap());
        assert_eq!(info.total_pages, 3);
        assert_eq!(info.current_page, 3);
    }

    #[test]
    fn exact_multiple_has_no_extra_page() {
        let info = PageInfo::new(20, Pagination::new(None, Some(10)).unwrap());
        assert_eq!(info.total_pages, 2);
    }

    #[test]
    fn empty_catalog_has_zero_pages() {
        let info = PageInfo::new(0, Pagination::default());
        assert_eq!(info.total_pages, 0);
        assert_eq!(info.current_page, 1);
    }
}
