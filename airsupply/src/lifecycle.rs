use crate::access::{Actor, Capability};
use crate::error::Error;
use crate::model::{CartLine, ModelId, Order, OrderStatus};
use crate::storage::{CartStorage, OrderStorage};
use std::sync::Arc;
use tracing::info;

/// Warehouse-side order lifecycle: the priority queue read and the two
/// processing transitions. `finish_processing` is strict — it requires a
/// prior `begin_processing`.
pub struct LifecycleService<S> {
    storage: Arc<S>,
}

impl<S: OrderStorage + CartStorage> LifecycleService<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Orders awaiting processing, High first, FIFO within a priority.
    pub async fn processing_queue(&self, actor: &Actor) -> Result<Vec<Order>, Error> {
        actor.authorize(Capability::ProcessOrders)?;
        self.storage
            .orders_with_status(OrderStatus::QueuedForProcessing)
            .await
    }

    pub async fn begin_processing(&self, actor: &Actor, order_id: ModelId) -> Result<Order, Error> {
        actor.authorize(Capability::ProcessOrders)?;
        self.advance(
            order_id,
            OrderStatus::QueuedForProcessing,
            OrderStatus::ProcessingByWarehouse,
        )
        .await
    }

    pub async fn finish_processing(
        &self,
        actor: &Actor,
        order_id: ModelId,
    ) -> Result<Order, Error> {
        actor.authorize(Capability::ProcessOrders)?;
        self.advance(
            order_id,
            OrderStatus::ProcessingByWarehouse,
            OrderStatus::QueuedForDispatch,
        )
        .await
    }

    /// The manager's submitted orders, newest first.
    pub async fn orders_for_manager(&self, actor: &Actor) -> Result<Vec<Order>, Error> {
        actor.authorize(Capability::ManageCart)?;
        let manager = actor.clinic_manager_id()?;
        self.storage.orders_for_manager(manager).await
    }

    /// Order detail with its lines. A manager only sees their own orders;
    /// someone else's order reads as absent rather than leaking that it
    /// exists.
    pub async fn order_detail(
        &self,
        actor: &Actor,
        order_id: ModelId,
    ) -> Result<(Order, Vec<CartLine>), Error> {
        actor.authorize(Capability::ManageCart)?;
        let manager = actor.clinic_manager_id()?;
        let order = self.fetch(order_id).await?;
        if order.clinic_manager_id != Some(manager) {
            return Err(Error::NotFound {
                entity: "order",
                id: order_id,
            });
        }
        let lines = self.storage.cart_lines(order_id).await?;
        Ok((order, lines))
    }

    async fn fetch(&self, order_id: ModelId) -> Result<Order, Error> {
        self.storage
            .get_order(order_id)
            .await?
            .ok_or(Error::NotFound {
                entity: "order",
                id: order_id,
            })
    }

    async fn advance(
        &self,
        order_id: ModelId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, Error> {
        let order = self.fetch(order_id).await?;
        if order.status != from {
            return Err(Error::InvalidTransition {
                order: order_id,
                from: order.status,
                to,
            });
        }
        // Re-checked by the storage CAS; a lost race reads as the same
        // invalid transition.
        let advanced = self.storage.advance_status(order_id, from, to).await?;
        if !advanced {
            let current = self.fetch(order_id).await?;
            return Err(Error::InvalidTransition {
                order: order_id,
                from: current.status,
                to,
            });
        }
        info!(order = order_id, from = %from, to = %to, "order advanced");
        self.fetch(order_id).await
    }
}
