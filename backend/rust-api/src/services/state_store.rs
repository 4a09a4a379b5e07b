use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::StateKey;

/// Host storage channel: one opaque string per learner and content item.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self, key: &StateKey) -> Result<Option<String>>;
    async fn save(&self, key: &StateKey, state: &str) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryStateStore {
    states: RwLock<HashMap<StateKey, String>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self, key: &StateKey) -> Result<Option<String>> {
        Ok(self.states.read().await.get(key).cloned())
    }

    async fn save(&self, key: &StateKey, state: &str) -> Result<()> {
        self.states
            .write()
            .await
            .insert(key.clone(), state.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keeps_one_value_per_key() {
        let store = InMemoryStateStore::new();
        let key = StateKey {
            user_id: "u1".into(),
            content_id: "c1".into(),
        };

        assert_eq!(store.load(&key).await.unwrap(), None);
        store.save(&key, "first").await.unwrap();
        store.save(&key, "second{submitted}").await.unwrap();
        assert_eq!(
            store.load(&key).await.unwrap().as_deref(),
            Some("second{submitted}")
        );
    }
}
