//! # Ballast Simulator
//!
//! Builds every engine from an [`EngineConfig`](config::EngineConfig) and
//! replays a [`Scenario`] of timestamped operations against them. Each step
//! yields a [`Report`]: the operation's event, or the reason it was rejected.
//! Rejections never stop the replay because every engine operation is atomic.

pub mod engines;
pub mod scenario;

pub use engines::{Engines, Report, StepError};
pub use scenario::{Op, Scenario, Step};
