//! Staking venue seam

use crate::errors::VaultError;
use tracing::debug;
use types::{U256Ext, U256};

/// Where the vault parks idle funds to earn rewards
///
/// Rewards only leave the source through [`harvest`](YieldSource::harvest);
/// `unstake` returns principal alone.
pub trait YieldSource {
    fn stake(&mut self, amount: U256) -> Result<(), VaultError>;

    /// Return up to `amount` of principal; the result is what actually came back
    fn unstake(&mut self, amount: U256) -> Result<U256, VaultError>;

    /// Claim every pending reward
    fn harvest(&mut self) -> Result<U256, VaultError>;

    fn pending_reward(&self) -> U256;

    fn staked(&self) -> U256;

    /// Return all principal and forfeit pending rewards
    fn emergency_withdraw(&mut self) -> Result<U256, VaultError>;
}

/// In-memory staking venue with explicitly accrued rewards
#[derive(Debug, Clone, Default)]
pub struct StakingPool {
    staked: U256,
    pending: U256,
}

impl StakingPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` of rewards to the staker
    pub fn accrue(&mut self, amount: U256) -> Result<(), VaultError> {
        self.pending = self.pending.try_add(amount)?;
        debug!(reward = %amount, pending = %self.pending, "accrue");
        Ok(())
    }
}

impl YieldSource for StakingPool {
    fn stake(&mut self, amount: U256) -> Result<(), VaultError> {
        self.staked = self.staked.try_add(amount)?;
        Ok(())
    }

    fn unstake(&mut self, amount: U256) -> Result<U256, VaultError> {
        if amount > self.staked {
            return Err(VaultError::InsufficientStake);
        }
        self.staked -= amount;
        Ok(amount)
    }

    fn harvest(&mut self) -> Result<U256, VaultError> {
        Ok(std::mem::take(&mut self.pending))
    }

    fn pending_reward(&self) -> U256 {
        self.pending
    }

    fn staked(&self) -> U256 {
        self.staked
    }

    fn emergency_withdraw(&mut self) -> Result<U256, VaultError> {
        self.pending = U256::zero();
        Ok(std::mem::take(&mut self.staked))
    }
}
