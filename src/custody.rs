// Custody vault
// In-memory balance book keyed by (owner, token). The executor debits the
// committer here before touching any venue and credits the recipient only
// after every guard has passed, so funds are always in exactly one place.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::{SwapError, ValidationError};
use crate::venues::adapter::{Address, Token};

#[derive(Default)]
pub struct CustodyVault {
    balances: RwLock<HashMap<(Address, Token), u128>>,
}

impl CustodyVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to an owner's balance. Also the refund and payout
    /// primitive inside the swap path.
    pub async fn deposit(&self, owner: &Address, token: &Token, amount: u128) {
        if amount == 0 {
            return;
        }
        let mut balances = self.balances.write().await;
        let entry = balances.entry((owner.clone(), token.clone())).or_default();
        *entry = entry.saturating_add(amount);
        debug!(owner = %owner, token = %token, amount = amount, balance = *entry, "credit");
    }

    /// Debit `amount` from an owner's balance, failing without any change if
    /// the balance cannot cover it.
    pub async fn withdraw(
        &self,
        owner: &Address,
        token: &Token,
        amount: u128,
    ) -> Result<(), SwapError> {
        let mut balances = self.balances.write().await;
        let key = (owner.clone(), token.clone());
        let available = balances.get(&key).copied().unwrap_or(0);
        if available < amount {
            return Err(ValidationError::InsufficientBalance {
                owner: owner.clone(),
                token: token.clone(),
                available,
                required: amount,
            }
            .into());
        }
        let remaining = available - amount;
        if remaining == 0 {
            balances.remove(&key);
        } else {
            balances.insert(key, remaining);
        }
        debug!(owner = %owner, token = %token, amount = amount, balance = remaining, "debit");
        Ok(())
    }

    pub async fn balance_of(&self, owner: &Address, token: &Token) -> u128 {
        self.balances
            .read()
            .await
            .get(&(owner.clone(), token.clone()))
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn usdc() -> Token {
        Token::from("USDC")
    }

    #[tokio::test]
    async fn deposits_accumulate() {
        let vault = CustodyVault::new();
        let owner = Address::from("trader-1");
        vault.deposit(&owner, &usdc(), 500).await;
        vault.deposit(&owner, &usdc(), 250).await;
        assert_eq!(vault.balance_of(&owner, &usdc()).await, 750);
    }

    #[tokio::test]
    async fn withdraw_rejects_overdraft_without_change() {
        let vault = CustodyVault::new();
        let owner = Address::from("trader-1");
        vault.deposit(&owner, &usdc(), 100).await;

        let err = vault.withdraw(&owner, &usdc(), 101).await.unwrap_err();
        assert!(matches!(
            err,
            SwapError::Validation(ValidationError::InsufficientBalance {
                available: 100,
                required: 101,
                ..
            })
        ));
        assert_eq!(vault.balance_of(&owner, &usdc()).await, 100);
    }

    #[tokio::test]
    async fn withdraw_full_balance_drains() {
        let vault = CustodyVault::new();
        let owner = Address::from("trader-1");
        vault.deposit(&owner, &usdc(), 100).await;
        vault.withdraw(&owner, &usdc(), 100).await.unwrap();
        assert_eq!(vault.balance_of(&owner, &usdc()).await, 0);
    }

    #[tokio::test]
    async fn balances_are_per_owner_and_token() {
        let vault = CustodyVault::new();
        let a = Address::from("trader-a");
        let b = Address::from("trader-b");
        vault.deposit(&a, &usdc(), 100).await;
        vault.deposit(&a, &Token::from("WETH"), 5).await;
        vault.deposit(&b, &usdc(), 7).await;

        vault.withdraw(&a, &usdc(), 40).await.unwrap();
        assert_eq!(vault.balance_of(&a, &usdc()).await, 60);
        assert_eq!(vault.balance_of(&a, &Token::from("WETH")).await, 5);
        assert_eq!(vault.balance_of(&b, &usdc()).await, 7);
    }

    #[tokio::test]
    async fn concurrent_deposits_all_land() {
        let vault = Arc::new(CustodyVault::new());
        let owner = Address::from("trader-1");
        let mut handles = Vec::new();
        for _ in 0..16 {
            let vault = Arc::clone(&vault);
            let owner = owner.clone();
            handles.push(tokio::spawn(async move {
                vault.deposit(&owner, &Token::from("USDC"), 10).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(vault.balance_of(&owner, &usdc()).await, 160);
    }
}
