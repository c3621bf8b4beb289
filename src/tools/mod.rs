//! Menutri Tools module
//!
//! Tool implementations behind the MCP surface. Each function takes the
//! service state it needs and returns a serializable response.

pub mod components;
pub mod dishes;
pub mod food_search;
pub mod nutrition;
pub mod status;
