//! # Ballast AMM Library - StableSwap Pool Engine
//!
//! ## Purpose
//!
//! Exact-integer StableSwap pools for two or three like-valued coins. The
//! invariant solvers live in [`stableswap_math`]; [`pool`] wraps them in a
//! ledger that tracks coin balances, LP shares, admin fees and the owner's
//! parameter controls (A ramping, delayed fee changes, kill switch).
//!
//! ## Integration Points
//!
//! - **Input**: [`config::PoolSettings`] for deployment, a [`types::Tx`] per call
//! - **Output**: typed events from [`events`], errors from [`errors`]
//! - **Precision**: coin amounts in native decimals, math over 1e18-normalized balances
//!
//! ## Rounding
//!
//! Every division floors. Newton solvers stop within one unit of the real root,
//! so quotes agree with executed trades exactly but inverse quotes
//! (`get_dx` against `get_dy`) only agree up to that tolerance.

pub mod errors;
pub mod events;
pub mod lp_token;
pub mod pool;
pub mod pool_traits;
pub mod stableswap_math;

pub use errors::StableSwapError;
pub use events::*;
pub use lp_token::LpToken;
pub use pool::StableSwapPool;
pub use pool_traits::{AmmPool, PoolType};
pub use stableswap_math::StableSwapMath;
