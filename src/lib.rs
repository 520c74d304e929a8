//! Rosetta construction and data-access middleware for Solana.
//!
//! Translates between Rosetta operations and Solana transactions: operations
//! are matched, compiled into instructions and assembled into a transaction,
//! and transactions are decoded back into operations.

pub mod api;
pub mod config;
pub mod constants;
pub mod domain;
pub mod logging;
pub mod models;
pub mod services;
