use serde::Deserialize;

use crate::core::models::common;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 200;

fn default_page() -> i64 {
    1
}

fn default_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

impl From<Pagination> for common::Pagination {
    fn from(Pagination { page, size }: Pagination) -> Self {
        let size = size.clamp(1, MAX_PAGE_SIZE);
        common::Pagination::new(size, Some(page.max(1).saturating_sub(1).saturating_mul(size)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_start_at_one() {
        let pagination: common::Pagination = Pagination { page: 3, size: 10 }.into();
        assert_eq!(pagination.limit(), 10);
        assert_eq!(pagination.offset(), 20);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let pagination: common::Pagination = Pagination { page: 0, size: 10_000 }.into();
        assert_eq!(pagination.limit(), MAX_PAGE_SIZE);
        assert_eq!(pagination.offset(), 0);
    }

    #[test]
    fn huge_page_saturates_instead_of_overflowing() {
        let pagination: common::Pagination = Pagination { page: i64::MAX, size: MAX_PAGE_SIZE }.into();
        assert_eq!(pagination.limit(), MAX_PAGE_SIZE);
        assert_eq!(pagination.offset(), i64::MAX);
    }
}
