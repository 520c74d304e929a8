use serde::{Deserialize, Serialize};
use solana_sdk::instruction::Instruction;
use solana_system_interface::instruction::{self as system_instruction, SystemInstruction};

use super::{
    optional_pubkey, overlay_fields, required_pubkey, required_value, unsupported_action,
    BalanceChange, CompileContext, OperationIntent, OperationMetadata, OperationType,
    ProgramFamily, RawInstruction,
};
use crate::models::ConstructionError;

/// Fields of System program actions.
///
/// Nonce actions name the nonce account `destination` and the signing
/// account `authority`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SystemOperationMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lamports: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_authority: Option<String>,
}

impl OperationMetadata for SystemOperationMetadata {
    fn defaults(intent: &OperationIntent, _ctx: &CompileContext) -> Self {
        Self {
            source: intent.source.clone(),
            destination: intent.destination.clone(),
            lamports: intent.amount,
            authority: intent.source.clone(),
            ..Default::default()
        }
    }

    fn overlay(self, defaults: Self) -> Self {
        overlay_fields!(
            self,
            defaults,
            [source, destination, lamports, space, owner, authority, new_authority]
        )
    }

    fn to_instructions(
        &self,
        action: OperationType,
    ) -> Result<Vec<Instruction>, ConstructionError> {
        let source = || required_pubkey(&self.source, "source", action);
        let destination = || required_pubkey(&self.destination, "destination", action);
        let authority = || required_pubkey(&self.authority, "authority", action);
        let lamports = || required_value(self.lamports, "lamports", action);
        let space = || required_value(self.space, "space", action);

        let instructions = match action {
            OperationType::SystemTransfer => {
                vec![system_instruction::transfer(&source()?, &destination()?, lamports()?)]
            }
            OperationType::SystemCreateAccount => {
                let owner = optional_pubkey(&self.owner, "owner")?
                    .unwrap_or_else(solana_system_interface::program::id);
                vec![system_instruction::create_account(
                    &source()?,
                    &destination()?,
                    lamports()?,
                    space()?,
                    &owner,
                )]
            }
            OperationType::SystemAssign => vec![system_instruction::assign(
                &source()?,
                &required_pubkey(&self.owner, "owner", action)?,
            )],
            OperationType::SystemAllocate => {
                vec![system_instruction::allocate(&source()?, space()?)]
            }
            OperationType::SystemCreateNonceAccount => system_instruction::create_nonce_account(
                &source()?,
                &destination()?,
                &authority()?,
                lamports()?,
            ),
            OperationType::SystemAdvanceNonce => vec![system_instruction::advance_nonce_account(
                &destination()?,
                &authority()?,
            )],
            OperationType::SystemWithdrawFromNonce => {
                vec![system_instruction::withdraw_nonce_account(
                    &source()?,
                    &authority()?,
                    &destination()?,
                    lamports()?,
                )]
            }
            OperationType::SystemAuthorizeNonce => {
                vec![system_instruction::authorize_nonce_account(
                    &destination()?,
                    &authority()?,
                    &required_pubkey(&self.new_authority, "new_authority", action)?,
                )]
            }
            _ => return Err(unsupported_action(ProgramFamily::System, action)),
        };
        Ok(instructions)
    }
}

impl SystemOperationMetadata {
    pub fn decode(raw: &RawInstruction) -> Option<(OperationType, Self)> {
        let instruction = bincode::deserialize::<SystemInstruction>(&raw.data).ok()?;
        let decoded = match instruction {
            SystemInstruction::Transfer { lamports } => (
                OperationType::SystemTransfer,
                Self {
                    source: Some(raw.account(0)?),
                    destination: Some(raw.account(1)?),
                    lamports: Some(lamports),
                    ..Default::default()
                },
            ),
            SystemInstruction::CreateAccount {
                lamports,
                space,
                owner,
            } => (
                OperationType::SystemCreateAccount,
                Self {
                    source: Some(raw.account(0)?),
                    destination: Some(raw.account(1)?),
                    lamports: Some(lamports),
                    space: Some(space),
                    owner: Some(owner.to_string()),
                    ..Default::default()
                },
            ),
            SystemInstruction::Assign { owner } => (
                OperationType::SystemAssign,
                Self {
                    source: Some(raw.account(0)?),
                    owner: Some(owner.to_string()),
                    ..Default::default()
                },
            ),
            SystemInstruction::Allocate { space } => (
                OperationType::SystemAllocate,
                Self {
                    source: Some(raw.account(0)?),
                    space: Some(space),
                    ..Default::default()
                },
            ),
            // [nonce, recent blockhashes sysvar, rent sysvar]
            SystemInstruction::InitializeNonceAccount(authority) => (
                OperationType::SystemInitializeNonce,
                Self {
                    source: Some(raw.account(0)?),
                    authority: Some(authority.to_string()),
                    ..Default::default()
                },
            ),
            // [nonce, recent blockhashes sysvar, authority]
            SystemInstruction::AdvanceNonceAccount => {
                let authority = raw.account(2)?;
                (
                    OperationType::SystemAdvanceNonce,
                    Self {
                        source: Some(authority.clone()),
                        destination: Some(raw.account(0)?),
                        authority: Some(authority),
                        ..Default::default()
                    },
                )
            }
            // [nonce, recipient, recent blockhashes sysvar, rent sysvar, authority]
            SystemInstruction::WithdrawNonceAccount(lamports) => (
                OperationType::SystemWithdrawFromNonce,
                Self {
                    source: Some(raw.account(0)?),
                    destination: Some(raw.account(1)?),
                    lamports: Some(lamports),
                    authority: Some(raw.account(4)?),
                    ..Default::default()
                },
            ),
            // [nonce, authority]
            SystemInstruction::AuthorizeNonceAccount(new_authority) => {
                let authority = raw.account(1)?;
                (
                    OperationType::SystemAuthorizeNonce,
                    Self {
                        source: Some(authority.clone()),
                        destination: Some(raw.account(0)?),
                        authority: Some(authority),
                        new_authority: Some(new_authority.to_string()),
                        ..Default::default()
                    },
                )
            }
            _ => return None,
        };
        Some(decoded)
    }

    pub fn balance_change(&self) -> Option<BalanceChange> {
        BalanceChange::native(&self.source, &self.destination, self.lamports)
    }
}
