use crate::access::{Actor, Capability};
use crate::error::Error;
use crate::model::{Category, Item, ModelId};
use crate::storage::CatalogStorage;
use std::sync::Arc;

/// Read-only catalog browsing for clinic managers filling a cart.
pub struct CatalogService<S> {
    storage: Arc<S>,
}

impl<S: CatalogStorage> CatalogService<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub async fn browse(&self, actor: &Actor) -> Result<Vec<Item>, Error> {
        actor.authorize(Capability::ManageCart)?;
        self.storage.list_items().await
    }

    pub async fn browse_category(
        &self,
        actor: &Actor,
        category_id: ModelId,
    ) -> Result<Vec<Item>, Error> {
        actor.authorize(Capability::ManageCart)?;
        self.storage.items_in_category(category_id).await
    }

    pub async fn search(&self, actor: &Actor, description: &str) -> Result<Vec<Item>, Error> {
        actor.authorize(Capability::ManageCart)?;
        self.storage.search_items(description).await
    }

    /// Categories with their item counts, for the browse sidebar.
    pub async fn categories(&self, actor: &Actor) -> Result<Vec<(Category, i64)>, Error> {
        actor.authorize(Capability::ManageCart)?;
        self.storage.list_categories().await
    }
}
