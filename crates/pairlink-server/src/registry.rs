//! Topic → handler routing table.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::handler::Handler;

/// Handlers by topic, shared by every connection task.
///
/// Registration may happen while the server is serving; lookups take the
/// read lock only for the clone of the handler pointer.
#[derive(Default)]
pub struct Registry {
    handlers: RwLock<HashMap<String, Arc<dyn Handler>>>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `topic`, replacing any previous one.
    ///
    /// Returns whether a handler was replaced.
    pub async fn register(&self, topic: impl Into<String>, handler: Arc<dyn Handler>) -> bool {
        self.handlers.write().await.insert(topic.into(), handler).is_some()
    }

    /// Handler for `topic`.
    pub async fn get(&self, topic: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.read().await.get(topic).cloned()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").finish_non_exhaustive()
    }
}
