//! Role-based ordering and dispatch workflow for a medical-supply drone
//! delivery operation.
//!
//! Clinic managers fill weight-bounded carts from the catalog and check
//! them out as prioritized orders; warehouse personnel work the priority
//! queue; dispatchers batch dispatch-ready orders into capacity-bounded
//! drone loads and send them out.

pub mod access;
pub mod cart;
pub mod catalog;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod notify;
pub mod sqlite_storage;
pub mod storage;

pub use error::Error;
pub use model::ModelId;
