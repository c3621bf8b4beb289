//! Nutrition calculation module
//!
//! Unit normalization, per-serving scaling and dish-level aggregation.

pub mod aggregate;
pub mod converter;
pub mod units;

pub use aggregate::{aggregate, aggregate_with, OptionalFieldPolicy, UnknownPolicy};
pub use converter::{normalize, normalize_strict, scale, scale_grams};
pub use units::{Unit, UnitCategory, UnitError};
