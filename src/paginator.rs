//! Offset/limit arithmetic shared by the find and aggregate paths.
//!
//! Pages are 1-indexed. A page below 1 is treated as the first page (offset 0)
//! and a limit of 0 or less falls back to [`DEFAULT_LIMIT`], so none of the
//! computations here can fail or divide by zero.

use serde::{Deserialize, Serialize};

use crate::utils::num::i64_to_u64_saturating_nonnegative;

pub const DEFAULT_LIMIT: i64 = 10;

/// Internal pagination state derived from a total record count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginator {
    pub total_record: u64,
    pub total_page: u64,
    pub offset: u64,
    pub limit: u64,
    pub page: u64,
    pub prev_page: u64,
    pub next_page: u64,
}

/// Caller-facing pagination block. `prev`/`next` are 0 when there is no such page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationData {
    pub total: u64,
    pub page: u64,
    #[serde(rename = "perPage")]
    pub per_page: u64,
    pub prev: u64,
    pub next: u64,
    #[serde(rename = "totalPage")]
    pub total_page: u64,
}

/// Number of documents to skip to reach `page`.
#[must_use]
pub fn skip(page: i64, limit: i64) -> u64 {
    if page < 1 {
        return 0;
    }
    let per = i64_to_u64_saturating_nonnegative(limit);
    (i64_to_u64_saturating_nonnegative(page) - 1).saturating_mul(per)
}

/// Clamps a requested page/limit pair the same way [`Paginator::new`] does,
/// with `default_limit` standing in for non-positive limits.
#[must_use]
pub fn normalize(page: i64, limit: i64, default_limit: i64) -> (i64, i64) {
    let page = page.max(1);
    let limit = if limit > 0 {
        limit
    } else if default_limit > 0 {
        default_limit
    } else {
        DEFAULT_LIMIT
    };
    (page, limit)
}

impl Paginator {
    #[must_use]
    pub fn new(total_record: u64, page: i64, limit: i64) -> Self {
        let (page, limit) = normalize(page, limit, DEFAULT_LIMIT);
        let offset = skip(page, limit);
        let page = i64_to_u64_saturating_nonnegative(page);
        let limit = i64_to_u64_saturating_nonnegative(limit);
        let total_page = total_record.div_ceil(limit);
        let prev_page = if page > 1 { page - 1 } else { page };
        let next_page = if page == total_page { page } else { page.saturating_add(1) };
        Self { total_record, total_page, offset, limit, page, prev_page, next_page }
    }

    #[must_use]
    pub fn pagination_data(&self) -> PaginationData {
        let mut data = PaginationData {
            total: self.total_record,
            page: self.page,
            per_page: self.limit,
            prev: 0,
            next: 0,
            total_page: self.total_page,
        };
        if self.page != self.prev_page && self.total_record > 0 {
            data.prev = self.prev_page;
        }
        if self.page != self.next_page && self.total_record > 0 && self.page <= self.total_page {
            data.next = self.next_page;
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_of_three() {
        let p = Paginator::new(25, 1, 10);
        assert_eq!(p.total_page, 3);
        assert_eq!(p.offset, 0);
        let d = p.pagination_data();
        assert_eq!((d.prev, d.next), (0, 2));
    }

    #[test]
    fn last_page_of_three() {
        let p = Paginator::new(25, 3, 10);
        assert_eq!(p.offset, 20);
        let d = p.pagination_data();
        assert_eq!((d.prev, d.next, d.total_page), (2, 0, 3));
    }

    #[test]
    fn empty_result_has_no_neighbours() {
        let d = Paginator::new(0, 1, 10).pagination_data();
        assert_eq!(d, PaginationData { total: 0, page: 1, per_page: 10, prev: 0, next: 0, total_page: 0 });
        let d = Paginator::new(0, 4, 10).pagination_data();
        assert_eq!((d.prev, d.next), (0, 0));
    }

    #[test]
    fn non_positive_inputs_are_coerced() {
        let p = Paginator::new(30, -3, 0);
        assert_eq!((p.page, p.limit, p.offset), (1, DEFAULT_LIMIT as u64, 0));
        assert_eq!(skip(0, 10), 0);
        assert_eq!(skip(-7, 10), 0);
        assert_eq!(skip(4, 25), 75);
    }

    #[test]
    fn page_past_the_end_keeps_prev_only() {
        let d = Paginator::new(25, 5, 10).pagination_data();
        assert_eq!((d.prev, d.next), (4, 0));
    }

    #[test]
    fn normalize_prefers_configured_default() {
        assert_eq!(normalize(0, 0, 25), (1, 25));
        assert_eq!(normalize(2, 5, 25), (2, 5));
        assert_eq!(normalize(2, -1, 0), (2, DEFAULT_LIMIT));
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let v = serde_json::to_value(Paginator::new(25, 2, 10).pagination_data()).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"total":25,"page":2,"perPage":10,"prev":1,"next":3,"totalPage":3})
        );
    }
}
