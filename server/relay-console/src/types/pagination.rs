//! Pagination types shared by list endpoints

use audit_engine::{AuditLogPage, PageRequest};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::{PaginationInfo, ResponseMetadata};

/// Standard pagination parameters for list endpoints
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema, Clone)]
pub struct PaginationParams {
    #[param(example = 1, minimum = 1)]
    pub page: Option<u32>,

    #[param(example = 20, minimum = 1, maximum = 100)]
    pub page_size: Option<u32>,
}

impl PaginationParams {
    /// Page window with configured defaults and upper bound applied
    pub fn to_request(&self, default_page_size: u32, max_page_size: u32) -> PageRequest {
        PageRequest::bounded(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(default_page_size),
            max_page_size,
        )
    }
}

/// Response metadata describing a page of audit entries
pub fn page_metadata(page: &AuditLogPage, request_id: &str) -> ResponseMetadata {
    ResponseMetadata {
        pagination: Some(PaginationInfo {
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages(),
            has_next: page.has_next(),
            has_previous: page.page > 1,
        }),
        total_count: Some(page.total),
        request_id: Some(request_id.to_string()),
    }
}

/// Metadata for unpaginated collections
pub fn collection_metadata(total: usize, request_id: &str) -> ResponseMetadata {
    ResponseMetadata {
        pagination: None,
        total_count: Some(u64::try_from(total).unwrap_or(u64::MAX)),
        request_id: Some(request_id.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        let params = PaginationParams::default();
        let request = params.to_request(20, 100);
        assert_eq!(request.page(), 1);
        assert_eq!(request.page_size(), 20);

        let params = PaginationParams {
            page: Some(0),
            page_size: Some(500),
        };
        let request = params.to_request(20, 50);
        assert_eq!(request.page(), 1);
        assert_eq!(request.page_size(), 50);
    }

    #[test]
    fn test_page_metadata() {
        let page = AuditLogPage {
            entries: Vec::new(),
            total: 45,
            page: 2,
            page_size: 20,
        };
        let meta = page_metadata(&page, "req-1");
        let pagination = meta.pagination.unwrap();
        assert_eq!(pagination.total_pages, 3);
        assert!(pagination.has_next);
        assert!(pagination.has_previous);
        assert_eq!(meta.total_count, Some(45));
    }
}
