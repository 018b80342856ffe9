use serde::Serialize;

pub(crate) const fn default_limit() -> i64 {
    10
}

pub(crate) const MAX_LIMIT: i64 = 100;

/// All list endpoints share the same window rules: `limit` defaults to
/// 10 and is capped at 100, `offset` defaults to 0 and never goes
/// negative.
pub(crate) fn clamp_window(offset: i64, limit: i64) -> (i64, i64) {
    (offset.max(0), limit.clamp(1, MAX_LIMIT))
}

#[derive(Debug, Serialize)]
pub(crate) struct PaginatedResponse<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: i64,
    pub(crate) offset: i64,
    pub(crate) limit: i64,
}
