use std::collections::BTreeMap;
use std::path::PathBuf;

use tokio::sync::Mutex;

/// Replies longer than this never enter the cache.
pub const MAX_CACHED_REPLY_CHARS: usize = 1500;

/// Exact-match question → answer store backed by a single JSON object file.
///
/// All mutation serializes through one lock so concurrent handlers cannot
/// interleave the read-modify-write cycle. Reads treat every failure
/// (missing file, bad JSON) as a miss.
pub struct ReplyCache {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ReplyCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates the backing file as an empty object when missing.
    pub async fn ensure_file(&self) -> std::io::Result<()> {
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(());
        }
        tokio::fs::write(&self.path, "{}").await
    }

    async fn read_all(&self) -> BTreeMap<String, String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => BTreeMap::new(),
        }
    }

    /// Exact match on the normalized question.
    pub async fn lookup(&self, question: &str) -> Option<String> {
        self.read_all().await.remove(&normalize(question))
    }

    /// Read-modify-write of the whole file; last write wins. Overlong
    /// replies are skipped so the file stays prompt-sized.
    pub async fn store(&self, question: &str, answer: &str) {
        if answer.chars().count() > MAX_CACHED_REPLY_CHARS {
            tracing::debug!("reply too long to cache ({} chars)", answer.chars().count());
            return;
        }

        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_all().await;
        entries.insert(normalize(question), answer.to_string());
        match serde_json::to_string_pretty(&entries) {
            Ok(json) => {
                if let Err(err) = tokio::fs::write(&self.path, json).await {
                    tracing::warn!("reply cache write failed: {err}");
                }
            }
            Err(err) => tracing::warn!("reply cache serialization failed: {err}"),
        }
    }

    /// Wipes every entry; the file becomes `{}`.
    pub async fn clear(&self) {
        let _guard = self.write_lock.lock().await;
        if let Err(err) = tokio::fs::write(&self.path, "{}").await {
            tracing::warn!("reply cache clear failed: {err}");
        }
    }

    /// Entry count for the status readout.
    pub async fn len(&self) -> usize {
        self.read_all().await.len()
    }
}

fn normalize(question: &str) -> String {
    question.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache_in(dir: &TempDir) -> ReplyCache {
        ReplyCache::new(dir.path().join("reply.json"))
    }

    #[tokio::test]
    async fn lookup_normalizes_trim_and_case() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.store("hello", "namaste!").await;

        assert_eq!(cache.lookup("Hello").await.as_deref(), Some("namaste!"));
        assert_eq!(cache.lookup(" hello ").await.as_deref(), Some("namaste!"));
        assert_eq!(cache.lookup("HELLO").await.as_deref(), Some("namaste!"));
        assert_eq!(cache.lookup("hola").await, None);
    }

    #[tokio::test]
    async fn storing_twice_is_idempotent_and_last_write_wins() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        cache.store("hi", "pehla").await;
        cache.store("hi", "pehla").await;
        assert_eq!(cache.len().await, 1);

        cache.store("HI ", "dusra").await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.lookup("hi").await.as_deref(), Some("dusra"));
    }

    #[tokio::test]
    async fn missing_file_is_a_miss_not_an_error() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        assert_eq!(cache.lookup("hi").await, None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_empty_and_recovers_on_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reply.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let cache = ReplyCache::new(path.clone());
        assert_eq!(cache.lookup("hi").await, None);

        cache.store("hi", "thik hai").await;
        assert_eq!(cache.lookup("hi").await.as_deref(), Some("thik hai"));
    }

    #[tokio::test]
    async fn growth_is_unbounded() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        for i in 0..300 {
            cache.store(&format!("sawal {i}"), &format!("jawab {i}")).await;
        }
        assert_eq!(cache.len().await, 300);
        assert_eq!(cache.lookup("sawal 123").await.as_deref(), Some("jawab 123"));
    }

    #[tokio::test]
    async fn overlong_replies_are_not_cached() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.store("long", &"x".repeat(MAX_CACHED_REPLY_CHARS + 1)).await;
        assert_eq!(cache.lookup("long").await, None);

        cache.store("edge", &"x".repeat(MAX_CACHED_REPLY_CHARS)).await;
        assert!(cache.lookup("edge").await.is_some());
    }

    #[tokio::test]
    async fn clear_leaves_an_empty_object() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.store("hi", "hello").await;
        cache.clear().await;

        assert_eq!(cache.len().await, 0);
        let raw = tokio::fs::read_to_string(dir.path().join("reply.json")).await.unwrap();
        assert_eq!(raw, "{}");
    }

    #[tokio::test]
    async fn ensure_file_creates_but_never_truncates() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.ensure_file().await.unwrap();
        let raw = tokio::fs::read_to_string(dir.path().join("reply.json")).await.unwrap();
        assert_eq!(raw, "{}");

        cache.store("hi", "hello").await;
        cache.ensure_file().await.unwrap();
        assert_eq!(cache.len().await, 1);
    }
}
