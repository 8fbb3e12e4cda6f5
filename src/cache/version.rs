//! Local version tracking
//!
//! Per-process `key -> last written version` table used as a staleness
//! guard on reads. The table is sharded, so increments on different keys do
//! not contend and increments on one key are atomic.
//!
//! Forgetting a key only stops it from being checked on reads. The number
//! last issued for the key is kept, so versions observed by this process
//! keep increasing for as long as it runs.

use super::keys::glob_match;
use dashmap::DashMap;

#[derive(Debug, Clone, Copy, Default)]
struct KeyVersion {
    /// Highest version ever issued for the key
    issued: u64,
    /// Whether reads compare against `issued`
    tracked: bool,
}

#[derive(Debug, Default)]
pub struct VersionTracker {
    versions: DashMap<String, KeyVersion>,
}

impl VersionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next version for `key` (first write is 1) and track it
    pub fn next_version(&self, key: &str) -> u64 {
        let mut entry = self.versions.entry(key.to_owned()).or_default();
        entry.issued += 1;
        entry.tracked = true;
        entry.issued
    }

    /// Version reads are checked against, if the key is tracked
    pub fn current(&self, key: &str) -> Option<u64> {
        self.versions
            .get(key)
            .filter(|v| v.tracked)
            .map(|v| v.issued)
    }

    /// Stop checking reads of `key`
    pub fn forget(&self, key: &str) {
        if let Some(mut entry) = self.versions.get_mut(key) {
            entry.tracked = false;
        }
    }

    /// Stop checking reads of every key matching the glob `pattern`
    pub fn forget_matching(&self, pattern: &str) -> usize {
        let mut forgotten = 0;
        for mut entry in self.versions.iter_mut() {
            if entry.tracked && glob_match(pattern, entry.key()) {
                entry.tracked = false;
                forgotten += 1;
            }
        }
        forgotten
    }

    pub fn forget_all(&self) {
        for mut entry in self.versions.iter_mut() {
            entry.tracked = false;
        }
    }

    /// Number of keys whose reads are checked
    pub fn len(&self) -> usize {
        self.versions.iter().filter(|v| v.tracked).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_versions_increment_by_one() {
        let tracker = VersionTracker::new();
        assert_eq!(tracker.current("k"), None);
        assert_eq!(tracker.next_version("k"), 1);
        assert_eq!(tracker.next_version("k"), 2);
        assert_eq!(tracker.next_version("other"), 1);
        assert_eq!(tracker.current("k"), Some(2));
    }

    #[test]
    fn test_forget_matching_only_touches_matches() {
        let tracker = VersionTracker::new();
        tracker.next_version("metrics:list:a");
        tracker.next_version("metrics:detail:b");
        tracker.next_version("sources:list:a");

        assert_eq!(tracker.forget_matching("metrics:*"), 2);
        assert_eq!(tracker.current("metrics:list:a"), None);
        assert_eq!(tracker.current("sources:list:a"), Some(1));

        tracker.forget_all();
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_forgotten_keys_never_reuse_versions() {
        let tracker = VersionTracker::new();
        assert_eq!(tracker.next_version("k"), 1);
        assert_eq!(tracker.next_version("k"), 2);

        tracker.forget("k");
        assert_eq!(tracker.current("k"), None);
        assert_eq!(tracker.next_version("k"), 3);

        tracker.forget_matching("*");
        assert_eq!(tracker.next_version("k"), 4);

        tracker.forget_all();
        assert_eq!(tracker.next_version("k"), 5);
        assert_eq!(tracker.current("k"), Some(5));
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let tracker = Arc::new(VersionTracker::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                tokio::spawn(async move {
                    for _ in 0..250 {
                        tracker.next_version("hot");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(tracker.current("hot"), Some(2000));
    }
}
