use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Bookkeeping kept in memory for every cached verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMetadata {
    pub cached_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl EntryMetadata {
    pub fn new(cached_at: DateTime<Utc>) -> Self {
        Self {
            cached_at,
            last_accessed: cached_at,
        }
    }
}

/// Retention policy: an LRU size cap plus a time-to-live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum number of cached verdicts
    pub max_entries: usize,
    /// Maximum age for cache entries in days
    pub max_age_days: u64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_age_days: 90,
        }
    }
}

impl RetentionPolicy {
    pub fn new(max_entries: usize, max_age_days: u64) -> Self {
        Self {
            max_entries: max_entries.max(1),
            max_age_days,
        }
    }

    /// Keys to evict so the index fits under `max_entries`, least recently
    /// used first.
    pub fn select_lru_overflow(&self, index: &HashMap<String, EntryMetadata>) -> Vec<String> {
        let excess = index.len().saturating_sub(self.max_entries);
        if excess == 0 {
            return Vec::new();
        }

        let mut entries: Vec<(&String, &EntryMetadata)> = index.iter().collect();
        // Oldest access first; key order breaks ties deterministically.
        entries.sort_by(|(ka, a), (kb, b)| a.last_accessed.cmp(&b.last_accessed).then(ka.cmp(kb)));
        entries
            .into_iter()
            .take(excess)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Keys cached longer ago than `max_age_days`.
    pub fn select_expired(
        &self,
        index: &HashMap<String, EntryMetadata>,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let mut expired: Vec<String> = index
            .iter()
            .filter(|(_, metadata)| self.is_expired(metadata, now))
            .map(|(key, _)| key.clone())
            .collect();
        expired.sort();
        expired
    }

    fn is_expired(&self, metadata: &EntryMetadata, now: DateTime<Utc>) -> bool {
        let max_age = i64::try_from(self.max_age_days)
            .ok()
            .and_then(Duration::try_days)
            .unwrap_or(Duration::MAX);
        now.signed_duration_since(metadata.cached_at) > max_age
    }
}

/// Statistics from a pruning operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneStats {
    pub expired: usize,
    pub over_capacity: usize,
    pub orphaned_embeddings: usize,
    pub entries_remaining: usize,
}

impl std::fmt::Display for PruneStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pruned {} expired and {} over-capacity entries, {} orphaned embeddings; {} entries remain",
            self.expired, self.over_capacity, self.orphaned_embeddings, self.entries_remaining
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with_ages(hours: &[(&str, i64)], now: DateTime<Utc>) -> HashMap<String, EntryMetadata> {
        hours
            .iter()
            .map(|(key, h)| (key.to_string(), EntryMetadata::new(now - Duration::hours(*h))))
            .collect()
    }

    #[test]
    fn test_no_overflow_under_limit() {
        let now = Utc::now();
        let index = index_with_ages(&[("a", 1), ("b", 2)], now);
        assert!(RetentionPolicy::new(5, 90).select_lru_overflow(&index).is_empty());
    }

    #[test]
    fn test_lru_overflow_picks_least_recently_used() {
        let now = Utc::now();
        let mut index = index_with_ages(&[("a", 5), ("b", 4), ("c", 3), ("d", 2)], now);
        // Touching "a" makes "b" the least recently used.
        index.get_mut("a").unwrap().last_accessed = now;

        let evicted = RetentionPolicy::new(2, 90).select_lru_overflow(&index);
        assert_eq!(evicted, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_select_expired() {
        let now = Utc::now();
        let index = index_with_ages(&[("old", 24 * 3), ("fresh", 1)], now);
        let policy = RetentionPolicy::new(10, 2);
        assert_eq!(policy.select_expired(&index, now), vec!["old".to_string()]);
        assert!(RetentionPolicy::new(10, 90)
            .select_expired(&index, now)
            .is_empty());
    }
}
