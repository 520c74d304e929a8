use serde::{Deserialize, Serialize};
use solana_sdk::instruction::Instruction;
use spl_associated_token_account::instruction::create_associated_token_account;

use super::{
    overlay_fields, required_pubkey, unsupported_action, CompileContext, OperationIntent,
    OperationMetadata, OperationType, ProgramFamily, RawInstruction,
};
use crate::models::ConstructionError;

/// Fields of associated token account creation.
///
/// `source` pays for the account; `account` is the derived address and is
/// only filled in when decoding.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SplAssociatedTokenAccountOperationMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl OperationMetadata for SplAssociatedTokenAccountOperationMetadata {
    fn defaults(intent: &OperationIntent, _ctx: &CompileContext) -> Self {
        Self {
            source: intent.source.clone(),
            mint: intent.token_currency().map(|c| c.symbol.clone()),
            ..Default::default()
        }
    }

    fn overlay(self, defaults: Self) -> Self {
        overlay_fields!(self, defaults, [source, wallet, mint, account])
    }

    fn to_instructions(
        &self,
        action: OperationType,
    ) -> Result<Vec<Instruction>, ConstructionError> {
        match action {
            OperationType::SplAssociatedTokenAccountCreate => {
                Ok(vec![create_associated_token_account(
                    &required_pubkey(&self.source, "source", action)?,
                    &required_pubkey(&self.wallet, "wallet", action)?,
                    &required_pubkey(&self.mint, "mint", action)?,
                    &spl_token::id(),
                )])
            }
            _ => Err(unsupported_action(
                ProgramFamily::SplAssociatedTokenAccount,
                action,
            )),
        }
    }
}

impl SplAssociatedTokenAccountOperationMetadata {
    /// Accepts both `Create` (empty or `0` data) and `CreateIdempotent` (`1`).
    pub fn decode(raw: &RawInstruction) -> Option<(OperationType, Self)> {
        if !matches!(raw.data.as_slice(), [] | [0] | [1]) {
            return None;
        }
        // [funder, associated account, wallet, mint, system program, token program]
        Some((
            OperationType::SplAssociatedTokenAccountCreate,
            Self {
                source: Some(raw.account(0)?),
                account: Some(raw.account(1)?),
                wallet: Some(raw.account(2)?),
                mint: Some(raw.account(3)?),
            },
        ))
    }
}
