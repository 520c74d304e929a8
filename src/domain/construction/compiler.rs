//! Turns matched intents into an ordered instruction list.

use std::collections::BTreeMap;

use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

use crate::{
    domain::instructions::{
        CompileContext, InstructionMetadata, OperationIntent, OperationMetadata, OperationType,
        SplTokenOperationMetadata,
    },
    models::{ConstructionError, SplTokenLookup},
};

/// Instructions of every intent, in intent order.
pub fn compile_intents(
    intents: &[OperationIntent],
    ctx: &CompileContext,
) -> Result<Vec<Instruction>, ConstructionError> {
    let mut instructions = Vec::new();
    for intent in intents {
        let metadata = InstructionMetadata::set_meta(intent, ctx)?;
        let compiled = metadata.to_instructions(intent.operation_type)?;
        log::debug!(
            "operation {} ({}) compiled to {} instruction(s)",
            intent.index,
            intent.operation_type,
            compiled.len()
        );
        instructions.extend(compiled);
    }
    Ok(instructions)
}

/// Accounts marked as signer anywhere in `instructions`, first-seen order, no duplicates.
pub fn unique_signers(instructions: &[Instruction]) -> Vec<Pubkey> {
    let mut signers: Vec<Pubkey> = Vec::new();
    for meta in instructions.iter().flat_map(|ix| ix.accounts.iter()) {
        if meta.is_signer && !signers.contains(&meta.pubkey) {
            signers.push(meta.pubkey);
        }
    }
    signers
}

/// Wallet pairs whose token accounts must be resolved before payloads are built.
pub fn token_account_lookups(
    intents: &[OperationIntent],
) -> Result<BTreeMap<i64, SplTokenLookup>, ConstructionError> {
    let mut lookups = BTreeMap::new();
    for intent in intents
        .iter()
        .filter(|i| i.operation_type == OperationType::SplTokenTransferWithSystem)
    {
        let meta = SplTokenOperationMetadata::set_meta(intent, &CompileContext::default())?;
        let action = intent.operation_type;
        let field = |value: Option<String>, name: &str| {
            value.ok_or_else(|| {
                ConstructionError::UnableToParseIntermediateResult(format!(
                    "{action} requires `{name}`"
                ))
            })
        };
        lookups.insert(
            intent.index,
            SplTokenLookup {
                source_owner: field(meta.source, "source")?,
                destination_owner: field(meta.destination, "destination")?,
                mint: field(meta.mint, "mint")?,
            },
        );
    }
    Ok(lookups)
}
