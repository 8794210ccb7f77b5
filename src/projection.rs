use std::cmp::Reverse;

use crate::model::{Case, SortKey, ViewParameters};
use crate::parse_timestamp_ms;

/// Derive the displayed sequence from the loaded collection and the
/// user-selected view parameters. Pure: same inputs, same output, and
/// equal sort keys preserve the input's relative order (stable sort).
///
/// Timestamp sorts are newest-first; cases with unparseable timestamps
/// order after all parseable ones. Priority sorts critical-first.
#[must_use]
pub fn project(cases: &[Case], params: &ViewParameters) -> Vec<Case> {
    let mut kept: Vec<Case> = cases
        .iter()
        .filter(|case| params.filter.matches(case.status))
        .cloned()
        .collect();

    match params.sort {
        SortKey::Created => {
            kept.sort_by_cached_key(|case| Reverse(parse_timestamp_ms(&case.created_at)));
        }
        SortKey::Updated => {
            kept.sort_by_cached_key(|case| Reverse(parse_timestamp_ms(&case.updated_at)));
        }
        SortKey::Priority => kept.sort_by_cached_key(|case| case.priority.rank()),
    }

    kept
}
