//! Clients for the node the middleware fronts.

mod solana;
pub use solana::*;
