use crate::error::Error;
use crate::model::ModelId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authenticated roles. `Administrator` satisfies every capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    ClinicManager,
    Dispatcher,
    WarehousePersonnel,
    Administrator,
}

/// What a protected operation requires. Each service entry point declares
/// exactly one of these and checks it once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capability {
    ManageCart,
    ProcessOrders,
    DispatchLoads,
}

impl Role {
    pub fn allows(self, action: Capability) -> bool {
        match self {
            Role::Administrator => true,
            Role::ClinicManager => action == Capability::ManageCart,
            Role::WarehousePersonnel => action == Capability::ProcessOrders,
            Role::Dispatcher => action == Capability::DispatchLoads,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::ClinicManager => "clinic manager",
            Role::Dispatcher => "dispatcher",
            Role::WarehousePersonnel => "warehouse personnel",
            Role::Administrator => "administrator",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Capability::ManageCart => "manage carts",
            Capability::ProcessOrders => "process orders",
            Capability::DispatchLoads => "dispatch loads",
        };
        f.write_str(s)
    }
}

/// The identity a collaborator authenticated for us: user, role, and the
/// linked clinic manager record when the role carries one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: ModelId,
    pub role: Role,
    pub clinic_manager: Option<ModelId>,
}

impl Actor {
    pub fn new(user_id: ModelId, role: Role) -> Self {
        Self {
            user_id,
            role,
            clinic_manager: None,
        }
    }

    pub fn with_clinic_manager(mut self, clinic_manager: ModelId) -> Self {
        self.clinic_manager = Some(clinic_manager);
        self
    }

    /// `Forbidden` on a role mismatch, never `NotFound`, so callers can
    /// distinguish "doesn't exist" from "not permitted".
    pub fn authorize(&self, action: Capability) -> Result<(), Error> {
        if self.role.allows(action) {
            Ok(())
        } else {
            Err(Error::Forbidden {
                role: self.role,
                action,
            })
        }
    }

    pub fn clinic_manager_id(&self) -> Result<ModelId, Error> {
        self.clinic_manager
            .ok_or_else(|| Error::Validation("actor has no linked clinic manager".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_role_gets_exactly_its_own_capability() {
        let cases = [
            (Role::ClinicManager, Capability::ManageCart),
            (Role::WarehousePersonnel, Capability::ProcessOrders),
            (Role::Dispatcher, Capability::DispatchLoads),
        ];
        for (role, own) in cases {
            for action in [
                Capability::ManageCart,
                Capability::ProcessOrders,
                Capability::DispatchLoads,
            ] {
                assert_eq!(role.allows(action), action == own, "{role} / {action}");
            }
        }
    }

    #[test]
    fn administrator_satisfies_everything() {
        for action in [
            Capability::ManageCart,
            Capability::ProcessOrders,
            Capability::DispatchLoads,
        ] {
            assert!(Role::Administrator.allows(action));
        }
    }

    #[test]
    fn authorize_signals_forbidden_not_not_found() {
        let actor = Actor::new(7, Role::Dispatcher);
        let err = actor.authorize(Capability::ManageCart).unwrap_err();
        assert!(matches!(
            err,
            Error::Forbidden {
                role: Role::Dispatcher,
                action: Capability::ManageCart,
            }
        ));
    }
}
