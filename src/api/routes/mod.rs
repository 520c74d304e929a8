//! # API Routes Module
//!
//! Configures HTTP routes for the Rosetta API.
//!
//! ## Routes
//!
//! * `/health` - Health check endpoint
//! * `/network/*` - Network list, options and status
//! * `/block`, `/block/transaction` - Confirmed blocks and transactions
//! * `/account/balance` - Native and token balances
//! * `/construction/*` - Transaction construction flow
//! * `/call` - JSON-RPC passthrough

pub mod call;
pub mod construction;
pub mod data;
pub mod health;
pub mod network;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::init)
        .configure(network::init)
        .configure(data::init)
        .configure(construction::init)
        .configure(call::init);
}
