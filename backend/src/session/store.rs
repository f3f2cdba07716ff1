use super::models::SessionEntry;
use shared::SessionId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Per-session state, keyed by the id the client echoes back. Entries idle for
/// longer than the timeout are dropped the next time the store is touched.
#[derive(Clone)]
pub struct SessionStore {
    entries: Arc<RwLock<HashMap<SessionId, SessionEntry>>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Stores `entry` under `id`, replacing whatever that session held before.
    pub async fn insert(&self, id: SessionId, entry: SessionEntry) {
        let mut entries = self.entries.write().await;
        Self::purge(&mut entries, self.idle_timeout);
        if entries.insert(id, entry).is_some() {
            log::debug!("Replaced image for session {}", id);
        }
    }

    pub async fn get(&self, id: &SessionId) -> Option<SessionEntry> {
        let mut entries = self.entries.write().await;
        Self::purge(&mut entries, self.idle_timeout);
        entries.get_mut(id).map(|entry| {
            entry.touch();
            entry.clone()
        })
    }

    pub async fn remove(&self, id: &SessionId) -> bool {
        self.entries.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    fn purge(entries: &mut HashMap<SessionId, SessionEntry>, idle_timeout: Duration) -> usize {
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now, idle_timeout));
        let purged = before - entries.len();
        if purged > 0 {
            log::info!("Expired {} idle session(s)", purged);
        }
        purged
    }
}
