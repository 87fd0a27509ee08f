//! Pool trait definitions for a unified quoting interface

use crate::errors::StableSwapError;
use crate::pool::StableSwapPool;
use serde::Serialize;
use types::{Timestamp, U256};

/// Pool type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PoolType {
    StableSwapTwo,
    StableSwapThree,
}

/// Read-only quoting interface shared by pool implementations
pub trait AmmPool {
    /// Output of coin `j` for `amount_in` of coin `i`
    fn get_amount_out(
        &self,
        i: usize,
        j: usize,
        amount_in: U256,
        now: Timestamp,
    ) -> Result<U256, StableSwapError>;

    /// Input of coin `i` required to receive `amount_out` of coin `j`
    fn get_amount_in(
        &self,
        i: usize,
        j: usize,
        amount_out: U256,
        now: Timestamp,
    ) -> Result<U256, StableSwapError>;

    /// Current coin balances
    fn get_liquidity(&self) -> Vec<U256>;

    /// Trading fee with 1e10 precision
    fn get_fee(&self) -> U256;

    fn pool_type(&self) -> PoolType;
}

impl AmmPool for StableSwapPool {
    fn get_amount_out(
        &self,
        i: usize,
        j: usize,
        amount_in: U256,
        now: Timestamp,
    ) -> Result<U256, StableSwapError> {
        self.get_dy(i, j, amount_in, now)
    }

    fn get_amount_in(
        &self,
        i: usize,
        j: usize,
        amount_out: U256,
        now: Timestamp,
    ) -> Result<U256, StableSwapError> {
        self.get_dx(i, j, amount_out, U256::MAX, now)
    }

    fn get_liquidity(&self) -> Vec<U256> {
        self.balances().to_vec()
    }

    fn get_fee(&self) -> U256 {
        self.fee()
    }

    fn pool_type(&self) -> PoolType {
        if self.n_coins() == 2 {
            PoolType::StableSwapTwo
        } else {
            PoolType::StableSwapThree
        }
    }
}
