// Filtering and pagination of audit entries
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entry::{ActorRole, AuditAction, AuditLogEntry, EntityType};
use crate::error::{AuditError, AuditResult};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Criteria for listing and exporting audit entries. Unset fields match
/// everything; date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuditLogFilter {
    pub account_id: Option<i64>,
    pub actor_id: Option<String>,
    pub actor_role: Option<ActorRole>,
    pub entity_type: Option<EntityType>,
    pub action: Option<AuditAction>,
    pub success: Option<bool>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl AuditLogFilter {
    pub fn for_account(account_id: i64) -> Self {
        Self {
            account_id: Some(account_id),
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns [`AuditError::InvalidFilter`] when the date range is inverted.
    pub fn validate(&self) -> AuditResult<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(AuditError::InvalidFilter(format!(
                    "start_date {start} is after end_date {end}"
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.account_id.map_or(true, |id| entry.account_id == Some(id))
            && self.actor_id.as_deref().map_or(true, |id| entry.actor_id == id)
            && self.actor_role.map_or(true, |role| entry.actor_role == role)
            && self.entity_type.map_or(true, |t| entry.entity_type == t)
            && self.action.map_or(true, |a| entry.action == a)
            && self.success.map_or(true, |s| entry.success == s)
            && self.start_date.map_or(true, |start| entry.timestamp >= start)
            && self.end_date.map_or(true, |end| entry.timestamp <= end)
    }
}

/// A 1-based page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Clamp `page` to at least 1 and `page_size` to `1..=MAX_PAGE_SIZE`
    pub fn new(page: u32, page_size: u32) -> Self {
        Self::bounded(page, page_size, MAX_PAGE_SIZE)
    }

    /// Like [`new`](Self::new) with a caller-supplied upper bound
    pub fn bounded(page: u32, page_size: u32, max_page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, max_page_size.max(1)),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// One page of entries, newest first
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AuditLogPage {
    pub entries: Vec<AuditLogEntry>,
    /// Entries matching the filter across all pages
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl AuditLogPage {
    pub fn total_pages(&self) -> u32 {
        if self.total == 0 {
            return 1;
        }
        let pages = self.total.div_ceil(u64::from(self.page_size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn sample() -> AuditLogEntry {
        AuditLogEntry {
            id: Uuid::new_v4(),
            sequence: 1,
            request_id: "req".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 10, 8, 30, 0).unwrap(),
            actor_id: "12".to_string(),
            actor_role: ActorRole::Agent,
            actor_ip: None,
            entity_type: EntityType::Label,
            action: AuditAction::Create,
            account_id: Some(4),
            cw_entity_id: Some(1),
            before: None,
            after: None,
            success: false,
            error_message: Some("duplicate title".to_string()),
            hash: String::new(),
            prev_hash: String::new(),
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(AuditLogFilter::default().matches(&sample()));
    }

    #[test]
    fn test_each_field_narrows() {
        let entry = sample();
        let cases = [
            AuditLogFilter { account_id: Some(5), ..Default::default() },
            AuditLogFilter { actor_id: Some("13".into()), ..Default::default() },
            AuditLogFilter { actor_role: Some(ActorRole::SuperAdmin), ..Default::default() },
            AuditLogFilter { entity_type: Some(EntityType::Team), ..Default::default() },
            AuditLogFilter { action: Some(AuditAction::Delete), ..Default::default() },
            AuditLogFilter { success: Some(true), ..Default::default() },
        ];
        for filter in cases {
            assert!(!filter.matches(&entry), "{filter:?} should not match");
        }

        let matching = AuditLogFilter {
            account_id: Some(4),
            actor_id: Some("12".into()),
            actor_role: Some(ActorRole::Agent),
            entity_type: Some(EntityType::Label),
            action: Some(AuditAction::Create),
            success: Some(false),
            ..Default::default()
        };
        assert!(matching.matches(&entry));
    }

    #[test]
    fn test_date_bounds_are_inclusive() {
        let entry = sample();
        let exact = AuditLogFilter {
            start_date: Some(entry.timestamp),
            end_date: Some(entry.timestamp),
            ..Default::default()
        };
        assert!(exact.matches(&entry));

        let later = AuditLogFilter {
            start_date: Some(entry.timestamp + Duration::seconds(1)),
            ..Default::default()
        };
        assert!(!later.matches(&entry));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let now = Utc::now();
        let filter = AuditLogFilter {
            start_date: Some(now),
            end_date: Some(now - Duration::days(1)),
            ..Default::default()
        };
        assert!(matches!(filter.validate(), Err(AuditError::InvalidFilter(_))));
    }

    #[test]
    fn test_page_request_clamps() {
        let page = PageRequest::new(0, 0);
        assert_eq!((page.page(), page.page_size()), (1, 1));
        assert_eq!(PageRequest::new(2, 1_000).page_size(), MAX_PAGE_SIZE);
        assert_eq!(PageRequest::bounded(1, 80, 50).page_size(), 50);
        assert_eq!(PageRequest::new(3, 10).offset(), 20);
    }

    #[test]
    fn test_total_pages() {
        let page = |total| AuditLogPage { entries: vec![], total, page: 1, page_size: 20 };
        assert_eq!(page(0).total_pages(), 1);
        assert_eq!(page(100).total_pages(), 5);
        assert_eq!(page(101).total_pages(), 6);
        assert!(page(21).has_next());
        assert!(!page(20).has_next());
    }
}
