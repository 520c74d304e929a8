//! # API Controllers Module
//!
//! Handles HTTP endpoints for the Rosetta API.
//!
//! ## Controllers
//!
//! * `construction` - `/construction/*` endpoints
//! * `network` - `/network/*` endpoints
//! * `data` - `/block`, `/block/transaction` and `/account/balance` endpoints
//! * `call` - `/call` endpoint

pub mod call;
pub mod construction;
pub mod data;
pub mod network;
