//! Chain constants for the Solana Rosetta implementation.

/// Blockchain name reported in every network identifier.
pub const BLOCKCHAIN: &str = "solana";

pub const MAINNET_NETWORK: &str = "mainnet";
pub const TESTNET_NETWORK: &str = "testnet";
pub const DEVNET_NETWORK: &str = "devnet";

pub const MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
pub const TESTNET_RPC_URL: &str = "https://api.testnet.solana.com";
pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";

pub const MAINNET_GENESIS_HASH: &str = "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdpKuc147dw2N9d";
pub const TESTNET_GENESIS_HASH: &str = "4uhcVJyU9pJkvQyS88uRDiswHXSCkY3zQawwpjk2NsNY";
pub const DEVNET_GENESIS_HASH: &str = "EtWTRABZaYq6iMfeYKouRu166VU2xqa1wcaWoxPkrZBG";

/// Symbol of the native currency.
pub const NATIVE_SYMBOL: &str = "SOL";

/// Decimals of the native currency (lamports per SOL = 10^9).
pub const NATIVE_DECIMALS: u32 = 9;

/// Separates the program family from the action in an operation type.
pub const OPERATION_TYPE_SEPARATOR: &str = "__";

/// Key of the durable nonce reference in request metadata and options.
pub const WITH_NONCE_KEY: &str = "with_nonce";

pub const SUCCESS_STATUS: &str = "SUCCESS";
pub const FAILURE_STATUS: &str = "FAILURE";

pub const ROSETTA_VERSION: &str = "1.4.10";
pub const NODE_VERSION: &str = "1.4.17";
pub const MIDDLEWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Length of an ed25519 signature in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// JSON-RPC methods `/call` is allowed to forward to the node.
pub const CALL_METHODS: &[&str] = &[
    "getAccountInfo",
    "getBalance",
    "getBlockTime",
    "getClusterNodes",
    "getConfirmedBlock",
    "getConfirmedBlocks",
    "getConfirmedBlocksWithLimit",
    "getConfirmedSignaturesForAddress",
    "getConfirmedSignaturesForAddress2",
    "getConfirmedTransaction",
    "getEpochInfo",
    "getEpochSchedule",
    "getFeeCalculatorForBlockhash",
    "getFeeRateGovernor",
    "getFees",
    "getFirstAvailableBlock",
    "getGenesisHash",
    "getHealth",
    "getIdentity",
    "getInflationGovernor",
    "getInflationRate",
    "getLargestAccounts",
    "getLeaderSchedule",
    "getMinimumBalanceForRentExemption",
    "getMultipleAccounts",
    "getProgramAccounts",
    "getRecentBlockhash",
    "getSnapshotSlot",
    "getSignatureStatuses",
    "getSlot",
    "getSlotLeader",
    "getSupply",
    "getTokenAccountBalance",
    "getTokenAccountsByDelegate",
    "getTokenAccountsByOwner",
    "getTokenSupply",
    "getTransactionCount",
    "getVersion",
    "getVoteAccounts",
    "minimumLedgerSlot",
    "requestAirdrop",
    "sendTransaction",
    "simulateTransaction",
];
