//! # Services Module
//!
//! Endpoint logic behind the HTTP handlers and the Solana node client it uses.

pub mod call;
pub use call::*;

pub mod construction;
pub use construction::*;

pub mod data;
pub use data::*;

pub mod network;
pub use network::*;

pub mod provider;
pub use provider::*;
