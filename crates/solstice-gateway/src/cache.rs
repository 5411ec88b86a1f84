//! Filesystem response cache.
//!
//! Content-addressed: each cacheable request hashes to a key `K` and the
//! stored body lives at `<dir>/<K>.json` with the file mtime as the TTL
//! anchor. All operations are best-effort; I/O problems degrade to a miss
//! (reads) or a no-op (writes) and never fail a request. Concurrent
//! writers race benignly: last writer wins per key.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Default time-to-live for cached responses.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Filesystem-backed response cache with TTL.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    /// Create a cache rooted at `dir` with the given TTL.
    #[must_use = "returns the constructed cache"]
    pub fn new(dir: PathBuf, ttl: Duration) -> Self {
        Self { dir, ttl }
    }

    /// Cache directory root.
    #[must_use = "returns the cache directory"]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Look up a cached response; `None` on miss, expiry, or any I/O or
    /// parse problem. Expired entries are unlinked opportunistically.
    #[must_use = "returns the cached response if fresh"]
    pub fn get(&self, key: &str) -> Option<Value> {
        let path = self.path_for(key);

        let age = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|mtime| mtime.elapsed().ok())?;

        if age > self.ttl {
            debug!(key, age_secs = age.as_secs(), "cache entry expired");
            if let Err(e) = fs::remove_file(&path) {
                warn!(key, error = %e, "failed to unlink expired cache entry");
            }
            return None;
        }

        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) => {
                debug!(key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                debug!(key, "cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "corrupt cache entry, treating as miss");
                None
            }
        }
    }

    /// Store a response body under `key`, refreshing the TTL anchor.
    /// Failures are logged and ignored.
    pub fn set(&self, key: &str, value: &Value) {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            warn!(error = %e, "failed to create cache directory");
            return;
        }
        let path = self.path_for(key);
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                if let Err(e) = fs::write(&path, bytes) {
                    warn!(key, error = %e, "cache write failed");
                } else {
                    debug!(key, "cache store");
                }
            }
            Err(e) => warn!(key, error = %e, "cache serialization failed"),
        }
    }

    /// Remove every cached entry. Best-effort.
    pub fn clear(&self) {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, "failed to clear response cache"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_after_set_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path().to_path_buf(), DEFAULT_TTL);
        let body = json!({"id": "resp_1", "output": [{"type": "message"}]});

        assert_eq!(cache.get("k1"), None);
        cache.set("k1", &body);
        assert_eq!(cache.get("k1"), Some(body));
    }

    #[test]
    fn test_expired_entry_is_miss_and_unlinked() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path().to_path_buf(), Duration::from_secs(0));
        cache.set("k1", &json!({"id": "resp_1"}));

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get("k1"), None);
        assert!(!dir.path().join("k1.json").exists());
    }

    #[test]
    fn test_corrupt_entry_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path().to_path_buf(), DEFAULT_TTL);
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(dir.path().join("k1.json"), b"{not json").unwrap();
        assert_eq!(cache.get("k1"), None);
    }

    #[test]
    fn test_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path().to_path_buf(), DEFAULT_TTL);
        cache.set("k1", &json!({"v": 1}));
        cache.set("k1", &json!({"v": 2}));
        assert_eq!(cache.get("k1"), Some(json!({"v": 2})));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path().join("cache"), DEFAULT_TTL);
        cache.set("k1", &json!({"v": 1}));
        cache.clear();
        assert_eq!(cache.get("k1"), None);
        cache.clear();
    }
}
