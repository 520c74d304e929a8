//! Confirmed chain data as returned by the Solana node, before it is turned
//! into Rosetta blocks and operations.

use solana_sdk::{instruction::CompiledInstruction, pubkey::Pubkey};

/// A transaction included in a block, with lookup-table addresses already loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedTransaction {
    pub slot: u64,
    /// Base58 of the first signature.
    pub signature: String,
    /// Static keys followed by loaded writable and loaded read-only addresses.
    pub account_keys: Vec<Pubkey>,
    pub instructions: Vec<CompiledInstruction>,
    /// Whether execution failed; fees are charged either way.
    pub failed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedBlock {
    pub slot: u64,
    pub blockhash: String,
    pub parent_slot: u64,
    pub previous_blockhash: String,
    /// Seconds since the Unix epoch, when the node knows it.
    pub block_time: Option<i64>,
    pub transactions: Vec<ConfirmedTransaction>,
}

/// Native balance together with the slot it was read at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountBalance {
    pub slot: u64,
    pub lamports: u64,
}

/// Balance of one token account owned by a wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    pub mint: String,
    pub amount: u64,
    pub decimals: u32,
}
