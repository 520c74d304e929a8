//! Constants shared across the service.

mod logging;
pub use logging::*;

mod server;
pub use server::*;

mod solana;
pub use solana::*;
