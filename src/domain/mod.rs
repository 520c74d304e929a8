//! # Domain Module
//!
//! Translation between Rosetta operations and Solana transactions:
//!
//! * Per-program instruction codecs
//! * Operation matching, compilation and decompilation
//! * Transaction assembly and signature placement

pub mod construction;
pub use construction::*;

pub mod instructions;
pub use instructions::*;
