//! Instruction codec.
//!
//! Each program family owns a typed metadata struct that is built from an
//! [`OperationIntent`] (construction) or from a raw instruction (parsing).
//! [`InstructionMetadata`] is the closed union of those structs, with
//! [`UnknownInstruction`] as the fallback for programs or payloads that no
//! family recognizes.

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Serialize};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

use crate::{
    constants::NATIVE_SYMBOL,
    models::{
        from_object_map, to_object_map, ConstructionError, Currency, ObjectMap, SplAccounts,
    },
};

mod associated_token;
pub use associated_token::*;

mod operation_type;
pub use operation_type::*;

mod spl_token;
pub use spl_token::*;

mod stake;
pub use stake::*;

mod system;
pub use system::*;

/// One semantic action resolved from a matched operation pair or a single operation.
///
/// `source` comes from the debit leg (or the single operation's account),
/// `destination` from the credit leg and `amount` from the leg magnitude.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationIntent {
    pub index: i64,
    pub operation_type: OperationType,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub amount: Option<u64>,
    pub currency: Option<Currency>,
    pub metadata: ObjectMap,
}

impl OperationIntent {
    /// Fields the caller set explicitly in the operation metadata.
    pub fn explicit<T: DeserializeOwned>(&self) -> Result<T, ConstructionError> {
        from_object_map(&self.metadata)
    }

    /// The leg currency when it names a token mint rather than the native coin.
    pub fn token_currency(&self) -> Option<&Currency> {
        self.currency
            .as_ref()
            .filter(|currency| currency.symbol != NATIVE_SYMBOL)
    }
}

/// Data resolved outside the operation list that compilation may consult.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileContext<'a> {
    pub spl_accounts: Option<&'a BTreeMap<i64, SplAccounts>>,
}

impl<'a> CompileContext<'a> {
    pub fn with_spl_accounts(spl_accounts: &'a BTreeMap<i64, SplAccounts>) -> Self {
        Self {
            spl_accounts: Some(spl_accounts),
        }
    }

    pub fn spl_accounts_for(&self, index: i64) -> Option<&'a SplAccounts> {
        self.spl_accounts.and_then(|accounts| accounts.get(&index))
    }
}

/// Typed metadata of one program family.
///
/// Resolution order is fixed: defaults are derived from the operation legs
/// first, then every field the caller set explicitly replaces its default.
pub trait OperationMetadata: Serialize + DeserializeOwned + Default + Sized {
    /// Values derived from the operation legs alone.
    fn defaults(intent: &OperationIntent, ctx: &CompileContext) -> Self;

    /// Keeps every field of `self` that is set and fills the rest from `defaults`.
    fn overlay(self, defaults: Self) -> Self;

    fn set_meta(intent: &OperationIntent, ctx: &CompileContext) -> Result<Self, ConstructionError> {
        let explicit: Self = intent.explicit()?;
        Ok(explicit.overlay(Self::defaults(intent, ctx)))
    }

    fn to_instructions(&self, action: OperationType)
        -> Result<Vec<Instruction>, ConstructionError>;
}

/// Fills every listed `Option` field of `$explicit` that is `None` from `$defaults`.
macro_rules! overlay_fields {
    ($explicit:expr, $defaults:expr, [$($field:ident),* $(,)?]) => {{
        let mut merged = $explicit;
        let defaults = $defaults;
        $(
            if merged.$field.is_none() {
                merged.$field = defaults.$field;
            }
        )*
        merged
    }};
}
pub(crate) use overlay_fields;

/// Instruction whose program or payload no family recognizes.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UnknownInstruction {
    pub program_id: String,
    pub accounts: Vec<String>,
    /// Base58-encoded instruction data.
    pub data: String,
}

/// An instruction with its account indexes resolved against the message keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInstruction {
    pub program_id: Pubkey,
    pub accounts: Vec<Pubkey>,
    pub data: Vec<u8>,
}

impl RawInstruction {
    pub fn account(&self, position: usize) -> Option<String> {
        self.accounts.get(position).map(|key| key.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstructionMetadata {
    System(SystemOperationMetadata),
    SplToken(SplTokenOperationMetadata),
    SplAssociatedTokenAccount(SplAssociatedTokenAccountOperationMetadata),
    Stake(StakeOperationMetadata),
    Unknown(UnknownInstruction),
}

impl InstructionMetadata {
    /// Builds the family metadata an intent's type prefix selects.
    pub fn set_meta(
        intent: &OperationIntent,
        ctx: &CompileContext,
    ) -> Result<Self, ConstructionError> {
        let family = intent.operation_type.family().ok_or_else(|| {
            ConstructionError::UnableToParseIntermediateResult(format!(
                "operation type {} has no program family",
                intent.operation_type
            ))
        })?;
        Ok(match family {
            ProgramFamily::System => {
                InstructionMetadata::System(SystemOperationMetadata::set_meta(intent, ctx)?)
            }
            ProgramFamily::SplToken => {
                InstructionMetadata::SplToken(SplTokenOperationMetadata::set_meta(intent, ctx)?)
            }
            ProgramFamily::SplAssociatedTokenAccount => {
                InstructionMetadata::SplAssociatedTokenAccount(
                    SplAssociatedTokenAccountOperationMetadata::set_meta(intent, ctx)?,
                )
            }
            ProgramFamily::Stake => {
                InstructionMetadata::Stake(StakeOperationMetadata::set_meta(intent, ctx)?)
            }
        })
    }

    pub fn to_instructions(
        &self,
        action: OperationType,
    ) -> Result<Vec<Instruction>, ConstructionError> {
        match self {
            InstructionMetadata::System(meta) => meta.to_instructions(action),
            InstructionMetadata::SplToken(meta) => meta.to_instructions(action),
            InstructionMetadata::SplAssociatedTokenAccount(meta) => meta.to_instructions(action),
            InstructionMetadata::Stake(meta) => meta.to_instructions(action),
            InstructionMetadata::Unknown(raw) => {
                Err(ConstructionError::UnableToParseIntermediateResult(format!(
                    "cannot build an instruction for unknown program {}",
                    raw.program_id
                )))
            }
        }
    }

    /// The debit/credit view of a decoded balance-changing instruction.
    pub fn balance_change(&self) -> Option<BalanceChange> {
        match self {
            InstructionMetadata::System(meta) => meta.balance_change(),
            InstructionMetadata::SplToken(meta) => meta.balance_change(),
            InstructionMetadata::SplAssociatedTokenAccount(_) => None,
            InstructionMetadata::Stake(meta) => meta.balance_change(),
            InstructionMetadata::Unknown(_) => None,
        }
    }

    pub fn to_object_map(&self) -> Result<ObjectMap, ConstructionError> {
        match self {
            InstructionMetadata::System(meta) => to_object_map(meta),
            InstructionMetadata::SplToken(meta) => to_object_map(meta),
            InstructionMetadata::SplAssociatedTokenAccount(meta) => to_object_map(meta),
            InstructionMetadata::Stake(meta) => to_object_map(meta),
            InstructionMetadata::Unknown(raw) => to_object_map(raw),
        }
    }
}

/// Value moved by a decoded instruction, from `source` to `destination`.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceChange {
    pub source: String,
    pub destination: String,
    pub amount: u64,
    pub currency: Currency,
}

impl BalanceChange {
    pub fn native(
        source: &Option<String>,
        destination: &Option<String>,
        lamports: Option<u64>,
    ) -> Option<Self> {
        Some(Self {
            source: source.clone()?,
            destination: destination.clone()?,
            amount: lamports?,
            currency: Currency::native(),
        })
    }
}

/// Result of decoding one raw instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedInstruction {
    pub operation_type: OperationType,
    pub metadata: InstructionMetadata,
}

impl DecodedInstruction {
    pub fn unknown(raw: &RawInstruction) -> Self {
        Self {
            operation_type: OperationType::Unknown,
            metadata: InstructionMetadata::Unknown(UnknownInstruction {
                program_id: raw.program_id.to_string(),
                accounts: raw.accounts.iter().map(|key| key.to_string()).collect(),
                data: bs58::encode(&raw.data).into_string(),
            }),
        }
    }
}

/// Decodes a raw instruction, degrading to `Unknown` instead of failing.
pub fn decode_instruction(raw: &RawInstruction) -> DecodedInstruction {
    let decoded = if raw.program_id == solana_system_interface::program::id() {
        SystemOperationMetadata::decode(raw)
            .map(|(t, meta)| (t, InstructionMetadata::System(meta)))
    } else if raw.program_id == ::spl_token::id() {
        SplTokenOperationMetadata::decode(raw)
            .map(|(t, meta)| (t, InstructionMetadata::SplToken(meta)))
    } else if raw.program_id == spl_associated_token_account::id() {
        SplAssociatedTokenAccountOperationMetadata::decode(raw)
            .map(|(t, meta)| (t, InstructionMetadata::SplAssociatedTokenAccount(meta)))
    } else if raw.program_id == solana_stake_interface::program::id() {
        StakeOperationMetadata::decode(raw).map(|(t, meta)| (t, InstructionMetadata::Stake(meta)))
    } else {
        None
    };

    match decoded {
        Some((operation_type, metadata)) => DecodedInstruction {
            operation_type,
            metadata,
        },
        None => DecodedInstruction::unknown(raw),
    }
}

/// Parses a base58 address named `field` of an `action`, failing when absent.
pub(crate) fn required_pubkey(
    value: &Option<String>,
    field: &str,
    action: OperationType,
) -> Result<Pubkey, ConstructionError> {
    let value = value.as_deref().ok_or_else(|| {
        ConstructionError::UnableToParseIntermediateResult(format!(
            "{action} requires `{field}`"
        ))
    })?;
    parse_pubkey(value, field)
}

pub(crate) fn optional_pubkey(
    value: &Option<String>,
    field: &str,
) -> Result<Option<Pubkey>, ConstructionError> {
    value.as_deref().map(|v| parse_pubkey(v, field)).transpose()
}

pub(crate) fn parse_pubkey(value: &str, field: &str) -> Result<Pubkey, ConstructionError> {
    value.parse::<Pubkey>().map_err(|e| {
        ConstructionError::UnableToParseIntermediateResult(format!(
            "invalid `{field}` address {value}: {e}"
        ))
    })
}

pub(crate) fn required_value<T>(
    value: Option<T>,
    field: &str,
    action: OperationType,
) -> Result<T, ConstructionError> {
    value.ok_or_else(|| {
        ConstructionError::UnableToParseIntermediateResult(format!(
            "{action} requires `{field}`"
        ))
    })
}

pub(crate) fn unsupported_action(
    family: ProgramFamily,
    action: OperationType,
) -> ConstructionError {
    ConstructionError::UnableToParseIntermediateResult(format!(
        "{action} is not a {family} operation"
    ))
}
