//! Endpoint key cache.
//!
//! One cached [`CipherKey`] per endpoint, shared by every connection of that
//! endpoint. Each accessor holds the lock for its whole read-check-act
//! sequence, so concurrent connections see either the old key or the new one,
//! never a torn update.

use pairlink_crypto::CipherKey;
use tokio::sync::RwLock;

/// Lock-guarded cached session key.
#[derive(Debug, Default)]
pub struct KeyCache {
    key: RwLock<Option<CipherKey>>,
}

impl KeyCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current key, if any.
    pub async fn get(&self) -> Option<CipherKey> {
        self.key.read().await.clone()
    }

    /// Whether a key is cached.
    pub async fn is_empty(&self) -> bool {
        self.key.read().await.is_none()
    }

    /// Replace the cached key.
    pub async fn store(&self, key: CipherKey) {
        *self.key.write().await = Some(key);
    }

    /// Drop the cached key unconditionally.
    pub async fn invalidate(&self) {
        *self.key.write().await = None;
    }

    /// Drop the cached key only if it is still `stale`.
    ///
    /// A concurrent call may already have replaced the key after its own
    /// handshake; that newer key must survive. Returns whether a key was
    /// dropped.
    pub async fn invalidate_if(&self, stale: &CipherKey) -> bool {
        let mut guard = self.key.write().await;
        if guard.as_ref() == Some(stale) {
            *guard = None;
            true
        } else {
            false
        }
    }

    /// Cached key, generating and storing one if absent.
    pub async fn get_or_generate(&self) -> CipherKey {
        let mut guard = self.key.write().await;
        guard.get_or_insert_with(CipherKey::generate).clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn starts_empty() {
        let cache = KeyCache::new();
        assert!(cache.is_empty().await);
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn get_or_generate_is_stable() {
        let cache = KeyCache::new();
        let first = cache.get_or_generate().await;
        let second = cache.get_or_generate().await;
        assert_eq!(first, second);
        assert_eq!(cache.get().await, Some(first));
    }

    #[tokio::test]
    async fn invalidate_if_spares_newer_key() {
        let cache = KeyCache::new();
        let stale = CipherKey::generate();
        let fresh = CipherKey::generate();

        cache.store(fresh.clone()).await;
        assert!(!cache.invalidate_if(&stale).await);
        assert_eq!(cache.get().await, Some(fresh.clone()));

        assert!(cache.invalidate_if(&fresh).await);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn invalidate_clears() {
        let cache = KeyCache::new();
        cache.store(CipherKey::generate()).await;
        cache.invalidate().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_generation_agrees() {
        let cache = Arc::new(KeyCache::new());
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_or_generate().await })
            })
            .collect();

        let mut keys = Vec::new();
        for task in tasks {
            keys.push(task.await.unwrap());
        }
        assert!(keys.windows(2).all(|pair| pair[0] == pair[1]));
    }
}
