use crate::error::Error;
use crate::model::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Storage contracts, split by the service that consumes them. A backend
/// implements the subset it serves; `SqliteStorage` implements all four.
///
/// Pending-order reads come back in presentation order already: priority
/// rank ascending (High first), then time ordered ascending, recomputed on
/// every read and never persisted.

#[async_trait]
pub trait CatalogStorage: Send + Sync {
    async fn list_items(&self) -> Result<Vec<Item>, Error>;

    async fn get_item(&self, id: ModelId) -> Result<Option<Item>, Error>;

    async fn items_in_category(&self, category_id: ModelId) -> Result<Vec<Item>, Error>;

    /// Substring match on the item description.
    async fn search_items(&self, needle: &str) -> Result<Vec<Item>, Error>;

    /// Categories together with their item counts.
    async fn list_categories(&self) -> Result<Vec<(Category, i64)>, Error>;

    async fn get_place(&self, id: ModelId) -> Result<Option<Place>, Error>;

    async fn get_clinic_manager(&self, id: ModelId) -> Result<Option<ClinicManager>, Error>;
}

#[async_trait]
pub trait CartStorage: Send + Sync {
    /// The manager's open cart, if one exists. At most one is ever open.
    async fn open_cart(&self, clinic_manager_id: ModelId) -> Result<Option<Order>, Error>;

    async fn create_cart(&self, clinic_manager_id: ModelId) -> Result<Order, Error>;

    async fn insert_line_item(
        &self,
        order_id: ModelId,
        item_id: ModelId,
        quantity: i64,
    ) -> Result<LineItem, Error>;

    async fn cart_lines(&self, order_id: ModelId) -> Result<Vec<CartLine>, Error>;

    /// Compare-and-set checkout: moves the order from `Cart` to
    /// `QueuedForProcessing`, stamping priority and time. Returns false if
    /// the order was not in `Cart` state.
    async fn submit_cart(
        &self,
        order_id: ModelId,
        priority: Priority,
        time_ordered: DateTime<Utc>,
    ) -> Result<bool, Error>;
}

#[async_trait]
pub trait OrderStorage: Send + Sync {
    async fn get_order(&self, id: ModelId) -> Result<Option<Order>, Error>;

    /// Orders in the given state, priority/FIFO ordered.
    async fn orders_with_status(&self, status: OrderStatus) -> Result<Vec<Order>, Error>;

    /// The manager's submitted orders (everything but the open cart).
    async fn orders_for_manager(&self, clinic_manager_id: ModelId) -> Result<Vec<Order>, Error>;

    /// Atomic compare-and-set on the status column. Returns false if the
    /// order was no longer in `from`.
    async fn advance_status(
        &self,
        id: ModelId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, Error>;
}

#[async_trait]
pub trait DispatchStorage: Send + Sync {
    /// Dispatch-ready orders not yet claimed by any load, priority/FIFO
    /// ordered.
    async fn unassigned_dispatchable(&self) -> Result<Vec<Order>, Error>;

    /// Creates a load and claims the given orders for it, in one
    /// transaction. Every order must still be dispatch-ready and unclaimed.
    async fn create_load(&self, order_ids: &[ModelId]) -> Result<ModelId, Error>;

    async fn undispatched_loads(&self) -> Result<Vec<DroneLoadDetail>, Error>;

    async fn get_load(&self, id: ModelId) -> Result<Option<DroneLoadDetail>, Error>;

    /// Atomic test-and-set on the dispatched flag. Returns false if the
    /// flag was already set.
    async fn mark_dispatched(&self, id: ModelId) -> Result<bool, Error>;

    /// Destination clinic of each constituent order, in the priority/FIFO
    /// order the orders were packed in.
    async fn load_clinics(&self, id: ModelId) -> Result<Vec<Place>, Error>;
}
