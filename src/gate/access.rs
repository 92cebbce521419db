//! Ownership-based access control

use parking_lot::RwLock;

use crate::error::LedgerError;
use crate::loan::Address;

/// Access-control capability consumed by the ledger
pub trait AccessControl: Send + Sync {
    fn is_owner(&self, caller: &Address) -> bool;

    fn current_owner(&self) -> Address;

    /// Fails closed with `NotOwner`
    fn assert_owner(&self, caller: &Address) -> Result<(), LedgerError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(LedgerError::NotOwner)
        }
    }
}

/// Single-owner access control
#[derive(Debug)]
pub struct Ownable {
    owner: RwLock<Address>,
}

impl Ownable {
    pub fn new(owner: Address) -> Self {
        Self {
            owner: RwLock::new(owner),
        }
    }

    /// Hand ownership to `new_owner`. Owner only.
    pub fn transfer_ownership(&self, caller: &Address, new_owner: Address) -> Result<(), LedgerError> {
        let mut owner = self.owner.write();
        if *owner != *caller {
            return Err(LedgerError::NotOwner);
        }

        tracing::info!(previous = %*owner, new_owner = %new_owner, "Ownership transferred");
        *owner = new_owner;
        Ok(())
    }
}

impl AccessControl for Ownable {
    fn is_owner(&self, caller: &Address) -> bool {
        *self.owner.read() == *caller
    }

    fn current_owner(&self) -> Address {
        self.owner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_owner() {
        let owner = Address::new("owner");
        let access = Ownable::new(owner.clone());

        assert!(access.assert_owner(&owner).is_ok());
        assert_eq!(
            access.assert_owner(&Address::new("mallory")),
            Err(LedgerError::NotOwner)
        );
    }

    #[test]
    fn test_transfer_ownership() {
        let owner = Address::new("owner");
        let next = Address::new("next");
        let access = Ownable::new(owner.clone());

        assert_eq!(
            access.transfer_ownership(&next, next.clone()),
            Err(LedgerError::NotOwner)
        );
        assert_eq!(access.current_owner(), owner);

        access.transfer_ownership(&owner, next.clone()).unwrap();
        assert_eq!(access.current_owner(), next);
        assert!(!access.is_owner(&owner));
    }
}
