//! Navigation history ordering and ranking.

use crate::model::NavigationEntry;
use chrono::{DateTime, Utc};

/// Entries kept per profile; older ones are evicted.
pub const MAX_HISTORY_ENTRIES: usize = 1000;

/// Default number of results from a history query.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Records a visit: bumps an existing entry and moves it to the front, or
/// prepends a new one. Truncates to [`MAX_HISTORY_ENTRIES`].
pub(crate) fn record_visit(
    history: &mut Vec<NavigationEntry>,
    url: &str,
    title: &str,
    at: DateTime<Utc>,
) {
    let entry = match history.iter().position(|e| e.url == url) {
        Some(idx) => {
            let mut existing = history.remove(idx);
            existing.visit_count = existing.visit_count.saturating_add(1);
            existing.last_visit = at;
            if !title.is_empty() {
                existing.title = title.to_string();
            }
            existing
        }
        None => NavigationEntry {
            url: url.to_string(),
            title: title.to_string(),
            visit_count: 1,
            first_visit: at,
            last_visit: at,
        },
    };
    history.insert(0, entry);
    history.truncate(MAX_HISTORY_ENTRIES);
}

/// `visit_count / (1 + days since last visit)`.
pub fn score(entry: &NavigationEntry, now: DateTime<Utc>) -> f64 {
    let days = ((now - entry.last_visit).num_seconds().max(0) as f64) / 86_400.0;
    f64::from(entry.visit_count) / (1.0 + days)
}

/// Filters by case-insensitive substring over URL and title, then returns
/// the `limit` best-scoring entries. Ties keep most-recent-first order.
pub(crate) fn rank(
    history: &[NavigationEntry],
    query: Option<&str>,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<NavigationEntry> {
    let needle = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let mut matches: Vec<(f64, &NavigationEntry)> = history
        .iter()
        .filter(|e| match &needle {
            Some(n) => e.url.to_lowercase().contains(n) || e.title.to_lowercase().contains(n),
            None => true,
        })
        .map(|e| (score(e, now), e))
        .collect();

    matches.sort_by(|a, b| b.0.total_cmp(&a.0));
    matches
        .into_iter()
        .take(limit)
        .map(|(_, e)| e.clone())
        .collect()
}
