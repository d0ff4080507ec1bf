use crate::access::{Actor, Capability};
use crate::error::Error;
use crate::model::{CartLine, LineItem, ModelId, Order, OrderStatus, Priority};
use crate::storage::{CartStorage, CatalogStorage, OrderStorage};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Cart accumulation for clinic managers. Every manager has exactly one
/// open cart, created on first use; add and checkout hold a per-owner lock
/// across the weight check so two concurrent adds cannot jointly breach the
/// ceiling.
pub struct CartService<S> {
    storage: Arc<S>,
    cart_ceiling_kg: f64,
    owner_locks: Mutex<HashMap<ModelId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S: CartStorage + CatalogStorage + OrderStorage> CartService<S> {
    pub fn new(storage: Arc<S>, cart_ceiling_kg: f64) -> Self {
        Self {
            storage,
            cart_ceiling_kg,
            owner_locks: Mutex::new(HashMap::new()),
        }
    }

    fn owner_lock(&self, clinic_manager_id: ModelId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.owner_locks.lock().expect("owner lock map poisoned");
        locks
            .entry(clinic_manager_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    async fn ensure_cart(&self, clinic_manager_id: ModelId) -> Result<Order, Error> {
        match self.storage.open_cart(clinic_manager_id).await? {
            Some(cart) => Ok(cart),
            None => self.storage.create_cart(clinic_manager_id).await,
        }
    }

    /// The manager's open cart, creating it on first use.
    pub async fn current_cart(&self, actor: &Actor) -> Result<Order, Error> {
        actor.authorize(Capability::ManageCart)?;
        let manager = actor.clinic_manager_id()?;
        let lock = self.owner_lock(manager);
        let _guard = lock.lock().await;
        self.ensure_cart(manager).await
    }

    pub async fn cart_lines(&self, actor: &Actor) -> Result<Vec<CartLine>, Error> {
        actor.authorize(Capability::ManageCart)?;
        let manager = actor.clinic_manager_id()?;
        let cart = self.ensure_cart(manager).await?;
        self.storage.cart_lines(cart.id).await
    }

    /// Adds `quantity` of an item to the cart, rejecting the add outright if
    /// it would push the cart past the weight ceiling.
    pub async fn add_line_item(
        &self,
        actor: &Actor,
        item_id: ModelId,
        quantity: i64,
    ) -> Result<LineItem, Error> {
        actor.authorize(Capability::ManageCart)?;
        if quantity <= 0 {
            return Err(Error::Validation(format!(
                "quantity must be positive, got {}",
                quantity
            )));
        }
        let manager = actor.clinic_manager_id()?;
        let lock = self.owner_lock(manager);
        let _guard = lock.lock().await;

        let cart = self.ensure_cart(manager).await?;
        let item = self
            .storage
            .get_item(item_id)
            .await?
            .ok_or(Error::NotFound {
                entity: "item",
                id: item_id,
            })?;

        let candidate_kg = cart.total_weight_kg + item.weight_kg * quantity as f64;
        if candidate_kg > self.cart_ceiling_kg {
            warn!(
                cart = cart.id,
                candidate_kg, "rejecting line item over cart ceiling"
            );
            return Err(Error::CapacityExceeded {
                attempted_kg: candidate_kg,
                ceiling_kg: self.cart_ceiling_kg,
            });
        }

        let line = self
            .storage
            .insert_line_item(cart.id, item_id, quantity)
            .await?;
        debug!(cart = cart.id, item = item_id, quantity, "added line item");
        Ok(line)
    }

    /// Turns the cart into a queued order with the given priority and hands
    /// the manager a fresh empty cart. An empty cart cannot be checked out.
    pub async fn checkout(&self, actor: &Actor, priority: Priority) -> Result<Order, Error> {
        actor.authorize(Capability::ManageCart)?;
        let manager = actor.clinic_manager_id()?;
        let lock = self.owner_lock(manager);
        let _guard = lock.lock().await;

        let cart = self.ensure_cart(manager).await?;
        let lines = self.storage.cart_lines(cart.id).await?;
        if lines.is_empty() {
            return Err(Error::Validation(
                "cannot check out an empty cart".to_string(),
            ));
        }
        // Mirrors the add-time check; catches a ceiling lowered since the
        // items went in.
        if cart.total_weight_kg > self.cart_ceiling_kg {
            return Err(Error::CapacityExceeded {
                attempted_kg: cart.total_weight_kg,
                ceiling_kg: self.cart_ceiling_kg,
            });
        }

        let submitted = self
            .storage
            .submit_cart(cart.id, priority, Utc::now())
            .await?;
        if !submitted {
            return Err(Error::InvalidTransition {
                order: cart.id,
                from: cart.status,
                to: OrderStatus::QueuedForProcessing,
            });
        }

        // Replacement cart, so subsequent adds do not collide with the
        // submitted order.
        self.storage.create_cart(manager).await?;

        let order = self.storage.get_order(cart.id).await?.ok_or(Error::NotFound {
            entity: "order",
            id: cart.id,
        })?;
        info!(
            order = order.id,
            priority = %priority,
            weight_kg = order.total_weight_kg,
            "cart checked out"
        );
        Ok(order)
    }
}
