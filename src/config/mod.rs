//! Startup configuration read from the environment.

mod server_config;
pub use server_config::*;
