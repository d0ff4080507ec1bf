use crate::access::{Actor, Capability};
use crate::error::Error;
use crate::model::{DroneLoadDetail, ModelId, Order, Place, Waypoint};
use crate::storage::DispatchStorage;
use std::iter;
use std::sync::Arc;
use tracing::{info, warn};

/// Greedy, order-preserving packing of dispatch-ready orders into
/// capacity-bounded batches. Orders are walked in their priority/FIFO
/// order and never reordered to improve packing; a new batch opens when the
/// next order would exceed the ceiling. An order alone heavier than the
/// ceiling cannot be packed and comes back in `oversize`.
pub fn pack_orders(orders: &[Order], ceiling_kg: f64) -> Packing {
    let mut loads: Vec<Vec<ModelId>> = Vec::new();
    let mut oversize = Vec::new();
    let mut current: Vec<ModelId> = Vec::new();
    let mut current_kg = 0.0;

    for order in orders {
        if order.total_weight_kg > ceiling_kg {
            oversize.push(order.id);
            continue;
        }
        if current_kg + order.total_weight_kg > ceiling_kg && !current.is_empty() {
            loads.push(std::mem::take(&mut current));
            current_kg = 0.0;
        }
        current.push(order.id);
        current_kg += order.total_weight_kg;
    }
    if !current.is_empty() {
        loads.push(current);
    }

    Packing { loads, oversize }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packing {
    pub loads: Vec<Vec<ModelId>>,
    pub oversize: Vec<ModelId>,
}

/// A load's route: depot, each constituent order's clinic in packing order,
/// depot return. Re-derivable any number of times; no routing optimization.
#[derive(Debug, Clone)]
pub struct Itinerary {
    depot: Place,
    stops: Vec<Place>,
}

impl Itinerary {
    pub fn new(depot: Place, stops: Vec<Place>) -> Self {
        Self { depot, stops }
    }

    /// Ordered waypoint sequence, restartable — every call yields a fresh
    /// iterator over the same route.
    pub fn places(&self) -> impl Iterator<Item = &Place> {
        iter::once(&self.depot)
            .chain(self.stops.iter())
            .chain(iter::once(&self.depot))
    }

    /// Flat (latitude, longitude, altitude) records for the export
    /// collaborator.
    pub fn waypoints(&self) -> impl Iterator<Item = Waypoint> + '_ {
        self.places().map(Waypoint::from)
    }
}

/// Dispatcher-side batching and dispatch. Load formation and dispatch are
/// serialized behind one lock so an order can never be claimed by two loads
/// and the dispatched flag flips exactly once.
pub struct DispatchService<S> {
    storage: Arc<S>,
    load_ceiling_kg: f64,
    depot: Place,
    batch_lock: tokio::sync::Mutex<()>,
}

impl<S: DispatchStorage> DispatchService<S> {
    pub fn new(storage: Arc<S>, load_ceiling_kg: f64, depot: Place) -> Self {
        Self {
            storage,
            load_ceiling_kg,
            depot,
            batch_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Packs all unassigned dispatch-ready orders into new loads and
    /// returns the created load ids. Idempotent: orders already in a load
    /// are not candidates.
    pub async fn form_loads(&self, actor: &Actor) -> Result<Vec<ModelId>, Error> {
        actor.authorize(Capability::DispatchLoads)?;
        let _guard = self.batch_lock.lock().await;

        let candidates = self.storage.unassigned_dispatchable().await?;
        let packing = pack_orders(&candidates, self.load_ceiling_kg);
        for &order_id in &packing.oversize {
            warn!(
                order = order_id,
                ceiling_kg = self.load_ceiling_kg,
                "order exceeds the load ceiling on its own; left unassigned"
            );
        }

        let mut load_ids = Vec::with_capacity(packing.loads.len());
        for batch in &packing.loads {
            load_ids.push(self.storage.create_load(batch).await?);
        }
        info!(
            loads = load_ids.len(),
            orders = candidates.len(),
            "load formation complete"
        );
        Ok(load_ids)
    }

    /// Undispatched loads with their orders and derived weights.
    pub async fn pending_loads(&self, actor: &Actor) -> Result<Vec<DroneLoadDetail>, Error> {
        actor.authorize(Capability::DispatchLoads)?;
        self.storage.undispatched_loads().await
    }

    /// Sends a load out. Terminal: the flag flips exactly once and a second
    /// call signals `AlreadyDispatched`.
    pub async fn dispatch(&self, actor: &Actor, load_id: ModelId) -> Result<DroneLoadDetail, Error> {
        actor.authorize(Capability::DispatchLoads)?;
        let _guard = self.batch_lock.lock().await;

        let load = self.fetch_load(load_id).await?;
        if load.dispatched {
            return Err(Error::AlreadyDispatched { load: load_id });
        }
        if !self.storage.mark_dispatched(load_id).await? {
            return Err(Error::AlreadyDispatched { load: load_id });
        }
        info!(load = load_id, "drone load dispatched");
        self.fetch_load(load_id).await
    }

    /// The load's route as an itinerary over its orders' clinics.
    pub async fn itinerary(&self, actor: &Actor, load_id: ModelId) -> Result<Itinerary, Error> {
        actor.authorize(Capability::DispatchLoads)?;
        // Existence check first so a bad id reads as NotFound, not an empty
        // route.
        self.fetch_load(load_id).await?;
        let stops = self.storage.load_clinics(load_id).await?;
        Ok(Itinerary::new(self.depot.clone(), stops))
    }

    async fn fetch_load(&self, load_id: ModelId) -> Result<DroneLoadDetail, Error> {
        self.storage
            .get_load(load_id)
            .await?
            .ok_or(Error::NotFound {
                entity: "drone load",
                id: load_id,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrderStatus;

    fn order(id: ModelId, weight_kg: f64) -> Order {
        Order {
            id,
            clinic_manager_id: None,
            status: OrderStatus::QueuedForDispatch,
            priority: None,
            time_ordered: None,
            drone_load_id: None,
            total_weight_kg: weight_kg,
        }
    }

    #[test]
    fn packs_greedily_without_reordering() {
        let orders = [order(1, 10.0), order(2, 8.0), order(3, 5.0), order(4, 2.0)];
        let packing = pack_orders(&orders, 20.0);
        assert_eq!(packing.loads, vec![vec![1, 2], vec![3, 4]]);
        assert!(packing.oversize.is_empty());
    }

    #[test]
    fn never_emits_a_load_over_the_ceiling() {
        let orders = [order(1, 9.0), order(2, 9.0), order(3, 9.0)];
        let packing = pack_orders(&orders, 20.0);
        assert_eq!(packing.loads, vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn exact_fit_stays_in_one_load() {
        let orders = [order(1, 12.0), order(2, 8.0)];
        let packing = pack_orders(&orders, 20.0);
        assert_eq!(packing.loads, vec![vec![1, 2]]);
    }

    #[test]
    fn oversize_order_is_left_out() {
        let orders = [order(1, 30.0), order(2, 5.0)];
        let packing = pack_orders(&orders, 20.0);
        assert_eq!(packing.loads, vec![vec![2]]);
        assert_eq!(packing.oversize, vec![1]);
    }

    #[test]
    fn empty_candidate_set_packs_to_nothing() {
        let packing = pack_orders(&[], 20.0);
        assert!(packing.loads.is_empty());
        assert!(packing.oversize.is_empty());
    }

    #[test]
    fn itinerary_restarts_from_the_depot_every_time() {
        let depot = Place {
            id: 0,
            name: "Depot".to_string(),
            latitude: 22.170257,
            longitude: 114.131376,
            altitude_m: 161.0,
        };
        let clinic = Place {
            id: 1,
            name: "Clinic".to_string(),
            latitude: 22.266040,
            longitude: 113.997882,
            altitude_m: 17.0,
        };
        let itinerary = Itinerary::new(depot.clone(), vec![clinic.clone()]);

        for _ in 0..2 {
            let names: Vec<&str> = itinerary.places().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["Depot", "Clinic", "Depot"]);
        }

        let waypoints: Vec<Waypoint> = itinerary.waypoints().collect();
        assert_eq!(waypoints[0], Waypoint::from(&depot));
        assert_eq!(waypoints[1], Waypoint::from(&clinic));
        assert_eq!(waypoints[2], Waypoint::from(&depot));
    }
}
