/// Default bind address of the HTTP server.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default port used when running offline without `PORT`.
pub const DEFAULT_PORT: u16 = 8080;

/// Default timeout for calls to the Solana node, in seconds.
pub const DEFAULT_RPC_TIMEOUT_SECONDS: u64 = 30;

/// Time the server waits for in-flight requests on shutdown, in seconds.
pub const SHUTDOWN_TIMEOUT_SECONDS: u64 = 5;
