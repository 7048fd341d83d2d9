//! Inventory business logic. Every operation loads the whole collection,
//! works on it in memory and, when it changes something, saves it back.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::error::{AppError, AppResult};
use crate::models::{Item, UpdateItem};
use crate::store::{ids, FileStore};

/// Attempts at drawing an id not already in the collection.
const ID_ATTEMPTS: usize = 16;

/// A stored photo file and the name it is stored under.
#[derive(Debug)]
pub struct Photo {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct InventoryService {
    store: Arc<FileStore>,
}

impl InventoryService {
    pub fn new(store: Arc<FileStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Create an item. `photo` is the name of an upload already written to the
    /// uploads directory; it is deleted again if the request is rejected.
    #[instrument(skip(self, description))]
    pub async fn register(
        &self,
        name: Option<String>,
        description: Option<String>,
        photo: Option<String>,
    ) -> AppResult<Item> {
        let name = match name {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                if let Some(photo) = photo {
                    self.store.remove_photo(&photo).await?;
                }
                return Err(AppError::BadRequest("inventory_name is required".to_string()));
            }
        };

        let _guard = self.store.write_lock().await;
        let mut collection = self.store.load().await?;

        let mut id = ids::generate_id();
        for _ in 1..ID_ATTEMPTS {
            if !collection.contains(&id) {
                break;
            }
            id = ids::generate_id();
        }
        if collection.contains(&id) {
            warn!(id = %id, "Id generator kept colliding; keeping duplicate id");
        }

        let item = Item::new(id, name, description.unwrap_or_default(), photo);
        collection.items.push(item.clone());
        self.store.save(&collection).await?;

        info!(id = %item.id, name = %item.name, photo = ?item.photo, "Registered item");
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> AppResult<Vec<Item>> {
        Ok(self.store.load().await?.items)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> AppResult<Item> {
        self.store
            .load()
            .await?
            .find(id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    /// Apply only the fields present in `changes`.
    #[instrument(skip(self, changes))]
    pub async fn update(&self, id: &str, changes: UpdateItem) -> AppResult<Item> {
        let _guard = self.store.write_lock().await;
        let mut collection = self.store.load().await?;
        let item = collection.find_mut(id).ok_or(AppError::NotFound)?;

        if let Some(name) = changes.name {
            item.name = name;
        }
        if let Some(description) = changes.description {
            item.description = description;
        }
        item.touch();

        let updated = item.clone();
        self.store.save(&collection).await?;

        info!(id = %id, "Updated item");
        Ok(updated)
    }

    /// Point the item at a newly uploaded photo. The previous file is deleted
    /// once the document is saved; if the save fails the new upload is.
    #[instrument(skip(self))]
    pub async fn replace_photo(&self, id: &str, photo: Option<String>) -> AppResult<Item> {
        let _guard = self.store.write_lock().await;
        let mut collection = self.store.load().await?;

        let Some(item) = collection.find_mut(id) else {
            if let Some(photo) = photo {
                self.store.remove_photo(&photo).await?;
            }
            return Err(AppError::NotFound);
        };
        let Some(photo) = photo else {
            return Err(AppError::BadRequest("photo file is required".to_string()));
        };

        let old = item.photo.replace(photo.clone());
        item.touch();

        let updated = item.clone();
        if let Err(e) = self.store.save(&collection).await {
            self.store.remove_photo(&photo).await?;
            return Err(e.into());
        }
        if let Some(old) = old {
            self.store.remove_photo(&old).await?;
        }

        info!(id = %id, photo = ?updated.photo, "Replaced item photo");
        Ok(updated)
    }

    /// Photo file of an item; not found covers a missing item, an item
    /// without a photo and a photo file that is gone from disk.
    #[instrument(skip(self))]
    pub async fn photo(&self, id: &str) -> AppResult<Photo> {
        let collection = self.store.load().await?;
        let name = collection
            .find(id)
            .and_then(|it| it.photo.clone())
            .ok_or(AppError::PhotoNotFound)?;

        match self.store.existing_photo(&name).await? {
            Some(path) => Ok(Photo { name, path }),
            None => {
                warn!(id = %id, photo = %name, "Item references a missing photo file");
                Err(AppError::PhotoNotFound)
            }
        }
    }

    /// Remove an item and its photo file. Returns the deleted id.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> AppResult<String> {
        let _guard = self.store.write_lock().await;
        let mut collection = self.store.load().await?;
        let removed = collection.remove(id).ok_or(AppError::NotFound)?;

        self.store.save(&collection).await?;
        if let Some(photo) = &removed.photo {
            self.store.remove_photo(photo).await?;
        }

        info!(id = %removed.id, "Deleted item");
        Ok(removed.id)
    }

    /// Look an item up by id; `id` is required.
    #[instrument(skip(self))]
    pub async fn search(&self, id: Option<&str>) -> AppResult<Item> {
        let id = id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::BadRequest("id is required".to_string()))?;
        self.get(id).await
    }
}
