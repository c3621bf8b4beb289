//! Menu Nutrition (menutri) Library
//!
//! Dish nutrition for restaurant menus: unit normalization, per-serving
//! scaling and aggregation, plus the persistence, food database and MCP
//! layers around them.

pub mod build_info;
pub mod config;
pub mod db;
pub mod draft;
pub mod fooddb;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod tools;
