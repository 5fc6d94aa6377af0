//! Bounds-checked pagination filters shared by every list operation
//!
//! Both filter variants clamp out-of-range limits to their maximum page size
//! rather than falling back to the default; limits below one and absent
//! limits use the default page size.

use serde::{Deserialize, Serialize};

/// Default page size for offset pagination
pub const DEFAULT_OFFSET_PAGE_SIZE: i64 = 50;
/// Largest page an offset filter will request
pub const MAX_OFFSET_PAGE_SIZE: i64 = 200;
/// Default page size for token pagination against the tuple store
pub const DEFAULT_TOKEN_PAGE_SIZE: i64 = 50;
/// Largest page the tuple store accepts
pub const MAX_TOKEN_PAGE_SIZE: i64 = 100;

fn clamp_limit(limit: i64, default: i64, max: i64) -> i64 {
    if limit < 1 {
        default
    } else if limit > max {
        max
    } else {
        limit
    }
}

/// Limit/offset pagination for database-backed lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LimitOffsetPagination {
    limit: i64,
    offset: i64,
}

impl LimitOffsetPagination {
    /// Build a filter, normalizing out-of-range values instead of rejecting them
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: clamp_limit(limit, DEFAULT_OFFSET_PAGE_SIZE, MAX_OFFSET_PAGE_SIZE),
            offset: offset.max(0),
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}

impl Default for LimitOffsetPagination {
    fn default() -> Self {
        Self::new(DEFAULT_OFFSET_PAGE_SIZE, 0)
    }
}

/// Limit/token pagination over the tuple store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenPagination {
    limit: i64,
    token: String,
}

impl TokenPagination {
    /// Build a filter; an empty token requests the first page
    pub fn new(limit: i64, token: impl Into<String>) -> Self {
        Self {
            limit: clamp_limit(limit, DEFAULT_TOKEN_PAGE_SIZE, MAX_TOKEN_PAGE_SIZE),
            token: token.into(),
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Default for TokenPagination {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_PAGE_SIZE, "")
    }
}

/// Page numbers returned alongside an offset filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: i64,
    pub next_page: Option<i64>,
}

/// Turn a requested page size and page number into an offset filter.
///
/// When either value is absent the first page of the default size is used.
/// `next_page` is only set when rows remain beyond the requested page.
pub fn create_pagination(
    size: Option<i64>,
    page: Option<i64>,
    total: i64,
) -> (PageInfo, LimitOffsetPagination) {
    let (size, page) = match (size, page) {
        (Some(size), Some(page)) => (
            clamp_limit(size, DEFAULT_OFFSET_PAGE_SIZE, MAX_OFFSET_PAGE_SIZE),
            page.max(0),
        ),
        _ => (DEFAULT_OFFSET_PAGE_SIZE, 0),
    };
    let filter = LimitOffsetPagination::new(size, size.saturating_mul(page));
    let next_page = page
        .checked_add(1)
        .filter(|next| next.saturating_mul(size) < total);
    (PageInfo { page, next_page }, filter)
}

/// Offset filter for lists whose total is not cheaply known.
///
/// The filter asks for one row more than the page size; pass the fetched rows
/// to [`ProbePage::finish`] to learn whether another page exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePage {
    pub page: i64,
    pub size: i64,
    pub filter: LimitOffsetPagination,
}

impl ProbePage {
    /// Trim the probe row, if present, and report the next page number
    pub fn finish<T>(&self, mut rows: Vec<T>) -> (Vec<T>, Option<i64>) {
        if rows.len() as i64 > self.size {
            rows.truncate(self.size as usize);
            (rows, self.page.checked_add(1))
        } else {
            (rows, None)
        }
    }
}

pub fn create_pagination_without_total(size: Option<i64>, page: Option<i64>) -> ProbePage {
    let (size, page) = match (size, page) {
        (Some(size), Some(page)) => (
            clamp_limit(size, DEFAULT_OFFSET_PAGE_SIZE, MAX_OFFSET_PAGE_SIZE),
            page.max(0),
        ),
        _ => (DEFAULT_OFFSET_PAGE_SIZE, 0),
    };
    // Built directly: the probe row may push the limit one past the maximum.
    let filter = LimitOffsetPagination {
        limit: size + 1,
        offset: size.saturating_mul(page),
    };
    ProbePage { page, size, filter }
}
