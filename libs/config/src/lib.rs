//! # Ballast Centralized Configuration
//!
//! This crate provides configuration loading and the protocol constants shared
//! by the vault, StableSwap and voting engines.
//!
//! ## Features
//!
//! - **Protocol Constants**: fee caps, fixed-point scales, ramp limits, week length
//! - **Engine Configuration**: roles, vault fees, pool parameters, voting windows
//!
//! ## Usage
//!
//! ```rust
//! use config::protocol;
//!
//! let cap = protocol::vault::MAX_PERFORMANCE_FEE;
//! let week = protocol::escrow::WEEK;
//! assert!(cap <= 10_000 && week == 604_800);
//! ```

pub mod engine_config;
pub mod protocol;

// Re-export commonly used types
pub use engine_config::{
    load_config, EngineConfig, GaugeTypeSettings, GlobalConfig, PoolSettings, RoleConfig,
    VaultSettings, VotingSettings,
};
