//! Item and category record storage.
//!
//! Persistence mechanics are a collaborator concern, so the seam is the
//! `RecordStore` trait. The in-process default is `MemoryStore`, which keeps
//! the durable-snapshot semantics the pipeline relies on: writes are
//! serialized per store, and only the run owning an item ever mutates it.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;

use vidnote_models::{CategoryId, CategoryRecord, ItemId, ItemRecord, ItemStatus};

use crate::error::{StoreError, StoreResult};

/// Aggregate counts over all records.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub total_items: usize,
    pub completed_items: usize,
    pub processing_items: usize,
    pub error_items: usize,
    pub total_categories: usize,
}

/// CRUD over item and category records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new item. Fails with `Conflict` when the source URL is
    /// already known.
    async fn insert_item(&self, item: ItemRecord) -> StoreResult<()>;

    async fn get_item(&self, id: &ItemId) -> StoreResult<Option<ItemRecord>>;

    /// Look up an item by its (unique) source URL.
    async fn find_item_by_url(&self, source_url: &str) -> StoreResult<Option<ItemRecord>>;

    /// Replace an existing item record. Bumps `updated_at`.
    async fn update_item(&self, item: ItemRecord) -> StoreResult<()>;

    /// Delete an item. Returns whether a record existed.
    async fn delete_item(&self, id: &ItemId) -> StoreResult<bool>;

    /// List items, newest first, optionally filtered by category.
    async fn list_items(&self, category: Option<&CategoryId>) -> StoreResult<Vec<ItemRecord>>;

    /// Insert a new category. Fails with `Conflict` when the name is taken.
    async fn insert_category(&self, category: CategoryRecord) -> StoreResult<()>;

    async fn get_category(&self, id: &CategoryId) -> StoreResult<Option<CategoryRecord>>;

    async fn find_category_by_name(&self, name: &str) -> StoreResult<Option<CategoryRecord>>;

    async fn list_categories(&self) -> StoreResult<Vec<CategoryRecord>>;

    async fn count_categories(&self) -> StoreResult<usize>;

    async fn count_items_in_category(&self, id: &CategoryId) -> StoreResult<usize>;

    async fn stats(&self) -> StoreResult<StoreStats>;
}

#[derive(Default)]
struct Tables {
    items: HashMap<ItemId, ItemRecord>,
    categories: HashMap<CategoryId, CategoryRecord>,
}

/// In-memory record store.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_item(&self, item: ItemRecord) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .items
            .values()
            .any(|existing| existing.source_url == item.source_url)
        {
            return Err(StoreError::conflict(format!(
                "item already exists for URL {}",
                item.source_url
            )));
        }
        tables.items.insert(item.id.clone(), item);
        Ok(())
    }

    async fn get_item(&self, id: &ItemId) -> StoreResult<Option<ItemRecord>> {
        Ok(self.tables.read().await.items.get(id).cloned())
    }

    async fn find_item_by_url(&self, source_url: &str) -> StoreResult<Option<ItemRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .items
            .values()
            .find(|item| item.source_url == source_url)
            .cloned())
    }

    async fn update_item(&self, mut item: ItemRecord) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.items.contains_key(&item.id) {
            return Err(StoreError::not_found(format!("item {}", item.id)));
        }
        item.updated_at = Utc::now();
        tables.items.insert(item.id.clone(), item);
        Ok(())
    }

    async fn delete_item(&self, id: &ItemId) -> StoreResult<bool> {
        Ok(self.tables.write().await.items.remove(id).is_some())
    }

    async fn list_items(&self, category: Option<&CategoryId>) -> StoreResult<Vec<ItemRecord>> {
        let tables = self.tables.read().await;
        let mut items: Vec<ItemRecord> = tables
            .items
            .values()
            .filter(|item| match category {
                Some(id) => item.category_id.as_ref() == Some(id),
                None => true,
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn insert_category(&self, category: CategoryRecord) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .categories
            .values()
            .any(|existing| existing.name == category.name)
        {
            return Err(StoreError::conflict(format!(
                "category {} already exists",
                category.name
            )));
        }
        tables.categories.insert(category.id.clone(), category);
        Ok(())
    }

    async fn get_category(&self, id: &CategoryId) -> StoreResult<Option<CategoryRecord>> {
        Ok(self.tables.read().await.categories.get(id).cloned())
    }

    async fn find_category_by_name(&self, name: &str) -> StoreResult<Option<CategoryRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .categories
            .values()
            .find(|category| category.name == name)
            .cloned())
    }

    async fn list_categories(&self) -> StoreResult<Vec<CategoryRecord>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<CategoryRecord> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(categories)
    }

    async fn count_categories(&self) -> StoreResult<usize> {
        Ok(self.tables.read().await.categories.len())
    }

    async fn count_items_in_category(&self, id: &CategoryId) -> StoreResult<usize> {
        Ok(self
            .tables
            .read()
            .await
            .items
            .values()
            .filter(|item| item.category_id.as_ref() == Some(id))
            .count())
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let tables = self.tables.read().await;
        let count = |status: ItemStatus| {
            tables
                .items
                .values()
                .filter(|item| item.status == status)
                .count()
        };
        Ok(StoreStats {
            total_items: tables.items.len(),
            completed_items: count(ItemStatus::Completed),
            processing_items: count(ItemStatus::Processing),
            error_items: count(ItemStatus::Error),
            total_categories: tables.categories.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str) -> ItemRecord {
        ItemRecord::new(url, "key", "Title", "")
    }

    #[tokio::test]
    async fn test_url_uniqueness() {
        let store = MemoryStore::new();
        store.insert_item(item("https://youtu.be/a")).await.unwrap();

        let err = store
            .insert_item(item("https://youtu.be/a"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let found = store
            .find_item_by_url("https://youtu.be/a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.source_url, "https://youtu.be/a");
    }

    #[tokio::test]
    async fn test_update_requires_existing() {
        let store = MemoryStore::new();
        let record = item("https://youtu.be/a");
        let err = store.update_item(record.clone()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        store.insert_item(record.clone()).await.unwrap();
        let mut updated = record;
        updated.title = "Resolved".to_string();
        store.update_item(updated).await.unwrap();

        let fetched = store
            .find_item_by_url("https://youtu.be/a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.title, "Resolved");
    }

    #[tokio::test]
    async fn test_list_filters_by_category() {
        let store = MemoryStore::new();
        let category = CategoryRecord::new("education", "", "#EF4444");
        let category_id = category.id.clone();
        store.insert_category(category).await.unwrap();

        let mut a = item("https://youtu.be/a");
        a.category_id = Some(category_id.clone());
        store.insert_item(a).await.unwrap();
        store.insert_item(item("https://youtu.be/b")).await.unwrap();

        assert_eq!(store.list_items(None).await.unwrap().len(), 2);
        assert_eq!(
            store.list_items(Some(&category_id)).await.unwrap().len(),
            1
        );
        assert_eq!(
            store.count_items_in_category(&category_id).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_category_name_uniqueness() {
        let store = MemoryStore::new();
        store
            .insert_category(CategoryRecord::new("music", "", "#111111"))
            .await
            .unwrap();
        let err = store
            .insert_category(CategoryRecord::new("music", "", "#222222"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.count_categories().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = MemoryStore::new();
        let mut a = item("https://youtu.be/a");
        a.complete();
        let mut b = item("https://youtu.be/b");
        b.fail("boom");
        store.insert_item(a).await.unwrap();
        store.insert_item(b).await.unwrap();
        store.insert_item(item("https://youtu.be/c")).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.completed_items, 1);
        assert_eq!(stats.error_items, 1);
        assert_eq!(stats.processing_items, 0);
    }
}
