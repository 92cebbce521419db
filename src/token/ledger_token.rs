//! In-memory fungible token backing the ledger

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;

use super::{TokenError, TokenService};
use crate::loan::{Address, Amount};

/// Token metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name: "MicroLoan Token".to_string(),
            symbol: "MLT".to_string(),
            decimals: 18,
        }
    }
}

#[derive(Debug, Default)]
struct Balances {
    accounts: HashMap<Address, Amount>,
    total_supply: Amount,
}

impl Balances {
    fn balance(&self, account: &Address) -> Amount {
        self.accounts.get(account).copied().unwrap_or(0)
    }

    fn debit(&mut self, account: &Address, amount: Amount) -> Result<(), TokenError> {
        let available = self.balance(account);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                account: account.clone(),
                available,
                required: amount,
            });
        }
        self.accounts.insert(account.clone(), available - amount);
        Ok(())
    }

    fn credit(&mut self, account: &Address, amount: Amount) -> Result<(), TokenError> {
        let updated = self
            .balance(account)
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow)?;
        self.accounts.insert(account.clone(), updated);
        Ok(())
    }
}

/// Token held entirely in process memory. Mint and burn are trusted calls
/// made by the ledger that owns this token.
#[derive(Debug, Default)]
pub struct LedgerToken {
    metadata: TokenMetadata,
    balances: RwLock<Balances>,
}

impl LedgerToken {
    pub fn new(metadata: TokenMetadata) -> Self {
        Self {
            metadata,
            balances: RwLock::new(Balances::default()),
        }
    }

    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    pub fn total_supply(&self) -> Amount {
        self.balances.read().total_supply
    }
}

impl TokenService for LedgerToken {
    fn mint(&self, to: &Address, amount: Amount) -> Result<(), TokenError> {
        let mut balances = self.balances.write();
        let total_supply = balances
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow)?;
        balances.credit(to, amount)?;
        balances.total_supply = total_supply;

        tracing::debug!(to = %to, amount = %amount, "Tokens minted");
        Ok(())
    }

    fn burn(&self, from: &Address, amount: Amount) -> Result<(), TokenError> {
        let mut balances = self.balances.write();
        balances.debit(from, amount)?;
        balances.total_supply -= amount;

        tracing::debug!(from = %from, amount = %amount, "Tokens burned");
        Ok(())
    }

    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.read().balance(account)
    }

    fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> bool {
        let mut balances = self.balances.write();
        if let Err(e) = balances.debit(from, amount) {
            tracing::warn!(from = %from, to = %to, amount = %amount, error = %e, "Token transfer rejected");
            return false;
        }
        if let Err(e) = balances.credit(to, amount) {
            // undo the debit; the credit overflowed
            let restored = balances.balance(from) + amount;
            balances.accounts.insert(from.clone(), restored);
            tracing::warn!(from = %from, to = %to, amount = %amount, error = %e, "Token transfer rejected");
            return false;
        }

        tracing::debug!(from = %from, to = %to, amount = %amount, "Tokens transferred");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_and_burn_track_supply() {
        let token = LedgerToken::default();
        let alice = Address::new("alice");

        token.mint(&alice, 500).unwrap();
        assert_eq!(token.balance_of(&alice), 500);
        assert_eq!(token.total_supply(), 500);

        token.burn(&alice, 200).unwrap();
        assert_eq!(token.balance_of(&alice), 300);
        assert_eq!(token.total_supply(), 300);
    }

    #[test]
    fn test_burn_more_than_balance_fails() {
        let token = LedgerToken::default();
        let alice = Address::new("alice");
        token.mint(&alice, 10).unwrap();

        let err = token.burn(&alice, 11).unwrap_err();
        assert_eq!(
            err,
            TokenError::InsufficientBalance {
                account: alice.clone(),
                available: 10,
                required: 11,
            }
        );
        assert_eq!(token.balance_of(&alice), 10);
        assert_eq!(token.total_supply(), 10);
    }

    #[test]
    fn test_transfer() {
        let token = LedgerToken::default();
        let alice = Address::new("alice");
        let bob = Address::new("bob");
        token.mint(&alice, 100).unwrap();

        assert!(token.transfer(&alice, &bob, 40));
        assert_eq!(token.balance_of(&alice), 60);
        assert_eq!(token.balance_of(&bob), 40);

        assert!(!token.transfer(&alice, &bob, 61));
        assert_eq!(token.balance_of(&alice), 60);
        assert_eq!(token.balance_of(&bob), 40);
        assert_eq!(token.total_supply(), 100);
    }

    #[test]
    fn test_transfer_to_self_keeps_balance() {
        let token = LedgerToken::default();
        let alice = Address::new("alice");
        token.mint(&alice, 100).unwrap();

        assert!(token.transfer(&alice, &alice, 100));
        assert_eq!(token.balance_of(&alice), 100);
    }

    #[test]
    fn test_mint_overflow() {
        let token = LedgerToken::default();
        let alice = Address::new("alice");
        token.mint(&alice, Amount::MAX).unwrap();
        assert_eq!(token.mint(&alice, 1), Err(TokenError::SupplyOverflow));
        assert_eq!(token.balance_of(&alice), Amount::MAX);
    }

    #[test]
    fn test_default_metadata() {
        let token = LedgerToken::default();
        assert_eq!(token.metadata().symbol, "MLT");
        assert_eq!(token.metadata().decimals, 18);
    }
}
