//! Common types shared by every engine

pub mod errors;
pub mod fixed_point;
pub mod identifiers;
