use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::inventory::{partition_expiring, ExpiringItems, Item};
use crate::layout::Position;

use super::{ItemSink, ItemSource, StoreError};

/// In-process item store. Keeps insertion order, records every successful
/// position write, and can be told to fail upcoming writes.
#[derive(Debug, Default)]
pub struct MemoryItemStore {
    items: RwLock<Vec<Item>>,
    writes: RwLock<Vec<(String, Position)>>,
    failures: RwLock<VecDeque<StoreError>>,
    update_delay: RwLock<Option<Duration>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            items: RwLock::new(items),
            ..Self::default()
        }
    }

    pub async fn insert(&self, item: Item) {
        self.items.write().await.push(item);
    }

    pub async fn item(&self, item_id: &str) -> Option<Item> {
        self.items.read().await.iter().find(|i| i.id == item_id).cloned()
    }

    /// Successful position writes, oldest first.
    pub async fn writes(&self) -> Vec<(String, Position)> {
        self.writes.read().await.clone()
    }

    /// Make the next `count` position updates fail with `error`.
    pub async fn fail_next_updates(&self, count: usize, error: StoreError) {
        let mut failures = self.failures.write().await;
        for _ in 0..count {
            failures.push_back(error.clone());
        }
    }

    pub async fn set_update_delay(&self, delay: Option<Duration>) {
        *self.update_delay.write().await = delay;
    }
}

#[async_trait]
impl ItemSource for MemoryItemStore {
    async fn list_items(&self, fridge_id: &str) -> Result<Vec<Item>, StoreError> {
        Ok(self
            .items
            .read()
            .await
            .iter()
            .filter(|item| item.fridge_id == fridge_id)
            .cloned()
            .collect())
    }

    async fn expiring_items(&self, days: i64) -> Result<ExpiringItems, StoreError> {
        Ok(partition_expiring(&self.items.read().await, days, Utc::now()))
    }
}

#[async_trait]
impl ItemSink for MemoryItemStore {
    async fn update_position(&self, item_id: &str, position: Position) -> Result<(), StoreError> {
        let delay = *self.update_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failures.write().await.pop_front() {
            return Err(error);
        }

        let mut items = self.items.write().await;
        let item = items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| StoreError::NotFound(item_id.to_string()))?;
        item.position = Some(position);

        self.writes.write().await.push((item_id.to_string(), position));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_by_fridge_and_records_writes() {
        let store = MemoryItemStore::with_items(vec![
            Item::new("a", "우유", "fridge-1"),
            Item::new("b", "사과", "fridge-2"),
        ]);

        let listed = store.list_items("fridge-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "a");

        store.update_position("a", Position::new(35.0, 43.0)).await.unwrap();
        assert_eq!(store.item("a").await.unwrap().position, Some(Position::new(35.0, 43.0)));
        assert_eq!(store.writes().await, vec![("a".to_string(), Position::new(35.0, 43.0))]);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_in_order() {
        let store = MemoryItemStore::with_items(vec![Item::new("a", "우유", "f")]);
        store.fail_next_updates(1, StoreError::Transport("connection reset".into())).await;

        let first = store.update_position("a", Position::new(1.0, 1.0)).await;
        assert!(matches!(first, Err(StoreError::Transport(_))));
        assert!(store.update_position("a", Position::new(1.0, 1.0)).await.is_ok());

        let missing = store.update_position("zzz", Position::new(1.0, 1.0)).await;
        assert!(matches!(missing, Err(StoreError::NotFound(id)) if id == "zzz"));
    }
}
