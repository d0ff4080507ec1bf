use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type ModelId = i64;

/// Checkout priority. Rank is the primary sort key for every pending-order
/// read: High before Medium before Low, FIFO within a rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn rank(self) -> i64 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "High" => Ok(Priority::High),
            "Medium" => Ok(Priority::Medium),
            "Low" => Ok(Priority::Low),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order lifecycle states. `Cart` is initial, `Dispatched` terminal; the
/// machine only ever advances one step forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Cart,
    QueuedForProcessing,
    ProcessingByWarehouse,
    QueuedForDispatch,
    Dispatched,
}

impl OrderStatus {
    /// Stored column value. Kept identical to the historical data format.
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Cart => "Cart",
            OrderStatus::QueuedForProcessing => "Queued for Processing",
            OrderStatus::ProcessingByWarehouse => "Processing by Warehouse",
            OrderStatus::QueuedForDispatch => "Queued for Dispatch",
            OrderStatus::Dispatched => "Dispatched",
        }
    }

    pub fn can_advance_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Cart, OrderStatus::QueuedForProcessing)
                | (OrderStatus::QueuedForProcessing, OrderStatus::ProcessingByWarehouse)
                | (OrderStatus::ProcessingByWarehouse, OrderStatus::QueuedForDispatch)
                | (OrderStatus::QueuedForDispatch, OrderStatus::Dispatched)
        )
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cart" => Ok(OrderStatus::Cart),
            "Queued for Processing" => Ok(OrderStatus::QueuedForProcessing),
            "Processing by Warehouse" => Ok(OrderStatus::ProcessingByWarehouse),
            "Queued for Dispatch" => Ok(OrderStatus::QueuedForDispatch),
            "Dispatched" => Ok(OrderStatus::Dispatched),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: ModelId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ModelId,
    pub description: String,
    pub category_id: ModelId,
    pub weight_kg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: ModelId,
    pub order_id: ModelId,
    pub item_id: ModelId,
    pub quantity: i64,
}

/// An order row together with its computed total weight. A cart is just an
/// order whose status is `Cart`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: ModelId,
    pub clinic_manager_id: Option<ModelId>,
    pub status: OrderStatus,
    pub priority: Option<Priority>,
    pub time_ordered: Option<DateTime<Utc>>,
    pub drone_load_id: Option<ModelId>,
    pub total_weight_kg: f64,
}

/// A line item joined with its catalog item, as presented in cart and order
/// detail reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub line_item: LineItem,
    pub item: Item,
}

impl CartLine {
    pub fn weight_kg(&self) -> f64 {
        self.item.weight_kg * self.line_item.quantity as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroneLoad {
    pub id: ModelId,
    pub dispatched: bool,
}

/// A drone load with its constituent orders, in the order they were packed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroneLoadDetail {
    pub id: ModelId,
    pub dispatched: bool,
    pub orders: Vec<Order>,
}

impl DroneLoadDetail {
    pub fn total_weight_kg(&self) -> f64 {
        self.orders.iter().map(|o| o.total_weight_kg).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub id: ModelId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicManager {
    pub id: ModelId,
    pub user_id: ModelId,
    pub clinic_id: ModelId,
}

/// Flat itinerary record consumed by the export collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
}

impl From<&Place> for Waypoint {
    fn from(place: &Place) -> Self {
        Waypoint {
            latitude: place.latitude,
            longitude: place.longitude,
            altitude_m: place.altitude_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_rank_orders_high_first() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[test]
    fn priority_round_trips_through_text() {
        for p in [Priority::High, Priority::Medium, Priority::Low] {
            assert_eq!(p.as_str().parse::<Priority>().unwrap(), p);
        }
        assert!("Urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn status_round_trips_through_text() {
        for s in [
            OrderStatus::Cart,
            OrderStatus::QueuedForProcessing,
            OrderStatus::ProcessingByWarehouse,
            OrderStatus::QueuedForDispatch,
            OrderStatus::Dispatched,
        ] {
            assert_eq!(s.as_str().parse::<OrderStatus>().unwrap(), s);
        }
        assert!("Pending".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn status_only_advances_one_step() {
        use OrderStatus::*;
        assert!(Cart.can_advance_to(QueuedForProcessing));
        assert!(QueuedForProcessing.can_advance_to(ProcessingByWarehouse));
        assert!(ProcessingByWarehouse.can_advance_to(QueuedForDispatch));
        assert!(QueuedForDispatch.can_advance_to(Dispatched));

        // No skips, no regressions, no self-loops
        assert!(!Cart.can_advance_to(ProcessingByWarehouse));
        assert!(!QueuedForProcessing.can_advance_to(QueuedForDispatch));
        assert!(!QueuedForDispatch.can_advance_to(QueuedForProcessing));
        assert!(!Dispatched.can_advance_to(Dispatched));
        assert!(!Dispatched.can_advance_to(Cart));
    }
}
