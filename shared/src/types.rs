//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Largest page a list endpoint will return
pub const MAX_PER_PAGE: u32 = 100;

/// Pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl Pagination {
    /// SQL `LIMIT`, clamped to `1..=MAX_PER_PAGE`
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page.clamp(1, MAX_PER_PAGE))
    }

    /// SQL `OFFSET` for the (1-based) page
    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * self.limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_starts_at_zero() {
        assert_eq!(Pagination::default().offset(), 0);
        assert_eq!(Pagination::default().limit(), 20);
    }

    #[test]
    fn test_page_size_is_clamped() {
        let p = Pagination {
            page: 3,
            per_page: 1000,
        };
        assert_eq!(p.limit(), 100);
        assert_eq!(p.offset(), 200);

        let zero = Pagination {
            page: 0,
            per_page: 0,
        };
        assert_eq!(zero.limit(), 1);
        assert_eq!(zero.offset(), 0);
    }
}
