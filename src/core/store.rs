/// In-memory group state
///
/// Holds the single authoritative copy of the group and the clipboard slot
/// (the copy of the API key used for copy-to-clipboard). Every public write
/// is one atomic replacement, either of the whole group or of one named
/// field, under a single write lock.

use std::sync::Arc;
use tokio::sync::RwLock;

use super::group::Group;

/// What happened to a requested write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreWrite {
    Applied,
    /// The store was closed before the write arrived
    Disposed,
    /// Another write landed after the caller read its version
    Stale,
}

/// Point-in-time copy of the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub group: Group,
    pub clipboard: String,
    pub version: u64,
}

#[derive(Debug)]
struct StoreState {
    group: Group,
    clipboard: String,
    version: u64,
    disposed: bool,
}

#[derive(Debug, Clone)]
pub struct GroupStateStore {
    state: Arc<RwLock<StoreState>>,
}

impl GroupStateStore {
    /// Create a store from a freshly loaded group
    pub fn load(group: Group) -> Self {
        let clipboard = group.api_key.clone().unwrap_or_default();

        Self {
            state: Arc::new(RwLock::new(StoreState {
                group,
                clipboard,
                version: 0,
                disposed: false,
            })),
        }
    }

    /// Replace the whole group and resync the clipboard slot
    pub async fn replace(&self, group: Group) -> StoreWrite {
        let mut state = self.state.write().await;
        if state.disposed {
            return StoreWrite::Disposed;
        }

        state.clipboard = group.api_key.clone().unwrap_or_default();
        state.group = group;
        state.version += 1;
        StoreWrite::Applied
    }

    /// Replace the whole group only if nothing was written since `expected_version`
    pub async fn replace_if_current(&self, group: Group, expected_version: u64) -> StoreWrite {
        let mut state = self.state.write().await;
        if state.disposed {
            return StoreWrite::Disposed;
        }
        if state.version != expected_version {
            return StoreWrite::Stale;
        }

        state.clipboard = group.api_key.clone().unwrap_or_default();
        state.group = group;
        state.version += 1;
        StoreWrite::Applied
    }

    /// Replace only the member list. `patch` receives the current members.
    pub async fn patch_members<F>(&self, patch: F) -> StoreWrite
    where
        F: FnOnce(&[String]) -> Vec<String>,
    {
        let mut state = self.state.write().await;
        if state.disposed {
            return StoreWrite::Disposed;
        }

        let members = patch(&state.group.members);
        state.group.members = members;
        state.version += 1;
        StoreWrite::Applied
    }

    /// Set the group's API key and the clipboard slot together
    pub async fn set_api_key(&self, key: String) -> StoreWrite {
        let mut state = self.state.write().await;
        if state.disposed {
            return StoreWrite::Disposed;
        }

        state.clipboard = key.clone();
        state.group.api_key = Some(key);
        state.version += 1;
        StoreWrite::Applied
    }

    /// `None` once the store is disposed
    pub async fn snapshot(&self) -> Option<StoreSnapshot> {
        let state = self.state.read().await;
        if state.disposed {
            return None;
        }

        Some(StoreSnapshot {
            group: state.group.clone(),
            clipboard: state.clipboard.clone(),
            version: state.version,
        })
    }

    pub async fn version(&self) -> u64 {
        self.state.read().await.version
    }

    /// Discard the group. Later writes are ignored.
    pub async fn dispose(&self) {
        self.state.write().await.disposed = true;
    }

    pub async fn is_disposed(&self) -> bool {
        self.state.read().await.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::group::sample_group;

    #[tokio::test]
    async fn test_load_captures_clipboard() {
        let mut group = sample_group();
        group.api_key = Some("k1".to_string());

        let store = GroupStateStore::load(group.clone());
        let snap = store.snapshot().await.unwrap();
        assert_eq!(snap.clipboard, "k1");
        assert_eq!(snap.group, group);
        assert_eq!(snap.version, 0);

        let store = GroupStateStore::load(sample_group());
        assert_eq!(store.snapshot().await.unwrap().clipboard, "");
    }

    #[tokio::test]
    async fn test_patch_members_preserves_other_fields() {
        let store = GroupStateStore::load(sample_group());
        let before = store.snapshot().await.unwrap();

        let write = store
            .patch_members(|members| members.iter().filter(|m| *m != "a").cloned().collect())
            .await;
        assert_eq!(write, StoreWrite::Applied);

        let after = store.snapshot().await.unwrap();
        assert_eq!(after.group.members, vec!["b"]);
        assert_eq!(after.group.name, before.group.name);
        assert_eq!(after.group.tree_depth, before.group.tree_depth);
        assert_eq!(after.version, before.version + 1);
    }

    #[tokio::test]
    async fn test_set_api_key_updates_both_slots() {
        let store = GroupStateStore::load(sample_group());
        store.set_api_key("K2".to_string()).await;

        let snap = store.snapshot().await.unwrap();
        assert_eq!(snap.clipboard, "K2");
        assert_eq!(snap.group.api_key.as_deref(), Some("K2"));
    }

    #[tokio::test]
    async fn test_replace_if_current_rejects_stale() {
        let store = GroupStateStore::load(sample_group());
        let issued_at = store.version().await;

        store.patch_members(|m| m.to_vec()).await;

        let mut newer = sample_group();
        newer.api_enabled = true;
        assert_eq!(
            store.replace_if_current(newer.clone(), issued_at).await,
            StoreWrite::Stale
        );
        assert!(!store.snapshot().await.unwrap().group.api_enabled);

        let current = store.version().await;
        assert_eq!(
            store.replace_if_current(newer, current).await,
            StoreWrite::Applied
        );
        assert!(store.snapshot().await.unwrap().group.api_enabled);
    }

    #[tokio::test]
    async fn test_disposed_store_ignores_writes() {
        let store = GroupStateStore::load(sample_group());
        store.dispose().await;

        assert!(store.is_disposed().await);
        assert_eq!(store.set_api_key("k".to_string()).await, StoreWrite::Disposed);
        assert_eq!(store.replace(sample_group()).await, StoreWrite::Disposed);
        assert_eq!(store.patch_members(|_| Vec::new()).await, StoreWrite::Disposed);
        assert!(store.snapshot().await.is_none());
    }
}
