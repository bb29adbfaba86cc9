//! Shared types and configuration for Centime.
//!
//! This crate provides common types used across all other crates:
//! - Money types with decimal precision
//! - Configuration management

pub mod config;
pub mod types;

pub use config::AppConfig;
pub use types::{Currency, Money};
