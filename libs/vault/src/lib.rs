//! # Ballast Share Vault
//!
//! Auto-compounding single-asset vault. Depositors receive shares priced
//! against the vault's whole balance (idle plus staked); every harvest
//! restakes the rewards, so the share price only moves up with yield.
//!
//! The staking venue sits behind the [`YieldSource`] trait. [`StakingPool`] is
//! the in-memory venue used by the simulator and tests.

pub mod errors;
pub mod events;
pub mod share_vault;
pub mod yield_source;

pub use errors::VaultError;
pub use events::{DepositEvent, HarvestEvent, WithdrawEvent};
pub use share_vault::{ShareVault, VaultUserInfo};
pub use yield_source::{StakingPool, YieldSource};
