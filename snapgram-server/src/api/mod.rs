pub mod auth;
pub mod comments;
pub mod error;
pub mod follows;
pub mod posts;
pub mod profile;

pub use error::{ApiError, ApiResult};

use serde::Deserialize;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;

/// `?limit=&offset=` on list endpoints
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl PageQuery {
    /// (limit, offset) clamped to sane bounds
    pub fn bounds(&self) -> (i64, i64) {
        (self.limit.clamp(1, MAX_PAGE_SIZE), self.offset.max(0))
    }
}

/// Parse a numeric path id, naming the resource in the error
pub(crate) fn parse_id(raw: &str, what: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid {} ID", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds_clamped() {
        let page = PageQuery {
            limit: 10_000,
            offset: -5,
        };
        assert_eq!(page.bounds(), (MAX_PAGE_SIZE, 0));

        let page = PageQuery { limit: 0, offset: 3 };
        assert_eq!(page.bounds(), (1, 3));

        assert_eq!(PageQuery::default().bounds(), (DEFAULT_PAGE_SIZE, 0));
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("12", "post").unwrap(), 12);
        assert!(matches!(parse_id("abc", "post"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_id("0", "user"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_id("-1", "user"), Err(ApiError::BadRequest(_))));
    }
}
