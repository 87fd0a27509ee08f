//! Pool share token ledger

use crate::errors::StableSwapError;
use std::collections::HashMap;
use types::{Address, U256Ext, U256};

/// LP token balances and supply
#[derive(Debug, Clone, Default)]
pub struct LpToken {
    total_supply: U256,
    balances: HashMap<Address, U256>,
}

impl LpToken {
    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn balance_of(&self, owner: &Address) -> U256 {
        self.balances.get(owner).copied().unwrap_or_default()
    }

    pub fn mint(&mut self, to: Address, amount: U256) -> Result<(), StableSwapError> {
        let supply = self.total_supply.try_add(amount)?;
        let balance = self.balance_of(&to).try_add(amount)?;
        self.total_supply = supply;
        self.balances.insert(to, balance);
        Ok(())
    }

    /// Fails without touching the ledger when `from` holds less than `amount`
    pub fn ensure_burnable(&self, from: &Address, amount: U256) -> Result<(), StableSwapError> {
        if self.balance_of(from) < amount {
            return Err(StableSwapError::BurnExceedsBalance);
        }
        Ok(())
    }

    pub fn burn(&mut self, from: Address, amount: U256) -> Result<(), StableSwapError> {
        self.ensure_burnable(&from, amount)?;
        let balance = self.balance_of(&from) - amount;
        self.total_supply = self.total_supply.try_sub(amount)?;
        self.balances.insert(from, balance);
        Ok(())
    }

    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), StableSwapError> {
        let from_balance = self.balance_of(&from);
        if from_balance < amount {
            return Err(StableSwapError::TransferExceedsBalance);
        }
        self.balances.insert(from, from_balance - amount);
        let to_balance = self.balance_of(&to).try_add(amount)?;
        self.balances.insert(to, to_balance);
        Ok(())
    }
}
