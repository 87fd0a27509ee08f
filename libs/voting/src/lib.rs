//! # Ballast Voting
//!
//! Two ledgers that work together:
//!
//! - [`escrow::VotingEscrow`] locks tokens for up to four years and tracks
//!   linearly decaying voting power.
//! - [`gauge::GaugeController`] lets escrow holders split their power across
//!   gauges; gauge weights decay along the same weekly schedule.
//!
//! The controller reads voting power through [`VotingPowerSource`], so it
//! never owns the escrow.

pub mod errors;
pub mod escrow;
pub mod events;
pub mod gauge;
pub mod power;

pub use errors::{EscrowError, GaugeError};
pub use escrow::{week_floor, LockedBalance, Point, VotingEscrow};
pub use events::*;
pub use gauge::{GaugeController, GaugeKey, VoteSlope, WeightPoint};
pub use power::VotingPowerSource;
