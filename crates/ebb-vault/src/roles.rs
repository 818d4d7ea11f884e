//! Role table and deposit allow-list.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use ebb_core::error::AuthError;
use ebb_core::types::Address;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, bincode::Encode, bincode::Decode,
)]
pub enum Role {
    /// Opens epochs, funds rewards and manages vault settings.
    Admin,
    /// Deploying factory; may move the vault between tiers.
    Factory,
}

#[derive(Debug, Clone, Default, bincode::Encode, bincode::Decode)]
pub struct RoleTable {
    holders: HashMap<Role, Address>,
}

impl RoleTable {
    pub fn new(admin: Address, factory: Address) -> Self {
        let mut holders = HashMap::new();
        holders.insert(Role::Admin, admin);
        holders.insert(Role::Factory, factory);
        Self { holders }
    }

    pub fn holder(&self, role: Role) -> Option<Address> {
        self.holders.get(&role).copied()
    }

    pub fn grant(&mut self, role: Role, who: Address) {
        self.holders.insert(role, who);
    }

    pub fn require(&self, role: Role, caller: &Address) -> Result<(), AuthError> {
        if self.holder(role) == Some(*caller) {
            return Ok(());
        }
        Err(match role {
            Role::Admin => AuthError::NotAdmin(*caller),
            Role::Factory => AuthError::NotFactory(*caller),
        })
    }
}

/// Optional gate on who may deposit.
#[derive(Debug, Clone, Default, bincode::Encode, bincode::Decode)]
pub struct AllowList {
    active: bool,
    approved: HashSet<Address>,
}

impl AllowList {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn set(&mut self, who: Address, allowed: bool) {
        if allowed {
            self.approved.insert(who);
        } else {
            self.approved.remove(&who);
        }
    }

    pub fn permits(&self, who: &Address) -> bool {
        !self.active || self.approved.contains(who)
    }

    pub fn require(&self, who: &Address) -> Result<(), AuthError> {
        if self.permits(who) {
            Ok(())
        } else {
            Err(AuthError::NotAllowed(*who))
        }
    }
}
