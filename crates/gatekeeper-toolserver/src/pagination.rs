use gatekeeper_contract::PageMeta;

/// Clamps a caller-requested limit to the configured maximum (spec §4.4,
/// "Limit clamped to 50 regardless of requested value"). `None` defaults
/// to `max_limit` as well — every list tool has a bounded default, never
/// unbounded.
pub fn clamp_limit(requested: Option<u32>, max_limit: u32) -> u32 {
    requested.map(|l| l.min(max_limit)).unwrap_or(max_limit).max(1)
}

/// Applies the `limit + 1`-fetch-and-trim pattern (spec §4.4): the
/// backend query must already have fetched `limit + 1` rows in total
/// order; this trims the lookahead row and reports whether more exist.
pub fn trim_page<T>(mut rows: Vec<T>, limit: u32) -> (Vec<T>, bool) {
    let limit = limit as usize;
    if rows.len() > limit {
        rows.truncate(limit);
        (rows, true)
    } else {
        (rows, false)
    }
}

/// Builds the pagination metadata for a success envelope, given whether
/// more rows exist and the already-encoded cursor for the last returned
/// row (only present when `has_more`).
pub fn build_page_meta(returned_count: u32, has_more: bool, next_cursor: Option<String>) -> PageMeta {
    debug_assert!(
        has_more == next_cursor.is_some(),
        "nextCursor must be present iff hasMore (spec §8 invariant)"
    );
    PageMeta {
        has_more,
        next_cursor,
        returned_count,
        total_estimate: None,
        hint: None,
        truncated: Some(has_more),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_limit_caps_at_max() {
        assert_eq!(clamp_limit(Some(999), 50), 50);
        assert_eq!(clamp_limit(Some(10), 50), 10);
        assert_eq!(clamp_limit(None, 50), 50);
    }

    #[test]
    fn trim_page_reports_has_more_on_lookahead_row() {
        let rows = vec![1, 2, 3, 4];
        let (page, has_more) = trim_page(rows, 3);
        assert_eq!(page, vec![1, 2, 3]);
        assert!(has_more);
    }

    #[test]
    fn trim_page_exact_count_has_no_more() {
        let rows = vec![1, 2, 3];
        let (page, has_more) = trim_page(rows, 3);
        assert_eq!(page, vec![1, 2, 3]);
        assert!(!has_more);
    }
}
