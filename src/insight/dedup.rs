//! Case-insensitive insight deduplication.

use std::collections::HashSet;

use super::GraphInsight;

/// Drop insights whose lower-cased description repeats an earlier one.
///
/// First occurrences keep their relative order.
#[must_use]
pub fn deduplicate(insights: Vec<GraphInsight>) -> Vec<GraphInsight> {
    let mut seen = HashSet::with_capacity(insights.len());
    insights
        .into_iter()
        .filter(|insight| seen.insert(insight.dedup_key()))
        .collect()
}
