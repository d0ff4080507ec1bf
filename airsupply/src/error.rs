use crate::access::{Capability, Role};
use crate::model::{ModelId, OrderStatus};
use thiserror::Error;

/// Error taxonomy for the ordering workflow. Every operation returns one of
/// these; failures leave state untouched and the core never retries.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: ModelId },

    #[error("order {order}: cannot move from {from} to {to}")]
    InvalidTransition {
        order: ModelId,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("weight ceiling exceeded: {attempted_kg:.3} kg against a {ceiling_kg:.3} kg ceiling")]
    CapacityExceeded { attempted_kg: f64, ceiling_kg: f64 },

    #[error("drone load {load} already dispatched")]
    AlreadyDispatched { load: ModelId },

    #[error("role {role} is not allowed to {action}")]
    Forbidden { role: Role, action: Capability },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}
