use serde::{Deserialize, Serialize};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use solana_system_interface::instruction as system_instruction;
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account,
};
use spl_token::{
    instruction::{self as token_instruction, TokenInstruction},
    solana_program::{program_option::COption, program_pack::Pack},
    state::{Account as TokenAccount, Mint},
};

use super::{
    optional_pubkey, overlay_fields, required_pubkey, required_value, unsupported_action,
    BalanceChange, CompileContext, OperationIntent, OperationMetadata, OperationType,
    ProgramFamily, RawInstruction,
};
use crate::models::{ConstructionError, Currency};

/// Fields of SPL Token program actions.
///
/// `source_token` and `destination_token` carry token accounts resolved
/// during metadata for wallet-to-wallet transfers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SplTokenOperationMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeze_authority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_authority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authority_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_token: Option<String>,
}

impl OperationMetadata for SplTokenOperationMetadata {
    fn defaults(intent: &OperationIntent, ctx: &CompileContext) -> Self {
        let currency = intent.token_currency();
        let mint = match intent.operation_type {
            // The credit leg of a mint creation is the new mint itself.
            OperationType::SplTokenCreateToken => intent.destination.clone(),
            _ => currency.map(|c| c.symbol.clone()),
        };
        let resolved = ctx.spl_accounts_for(intent.index);

        Self {
            source: intent.source.clone(),
            destination: intent.destination.clone(),
            mint,
            authority: intent.source.clone(),
            amount: intent.amount,
            decimals: currency.and_then(|c| u8::try_from(c.decimals).ok()),
            source_token: resolved.and_then(|accounts| accounts.source.clone()),
            destination_token: resolved.and_then(|accounts| accounts.destination.clone()),
            ..Default::default()
        }
    }

    fn overlay(self, defaults: Self) -> Self {
        overlay_fields!(
            self,
            defaults,
            [
                source,
                destination,
                mint,
                authority,
                freeze_authority,
                new_authority,
                authority_type,
                amount,
                decimals,
                source_token,
                destination_token,
            ]
        )
    }

    fn to_instructions(
        &self,
        action: OperationType,
    ) -> Result<Vec<Instruction>, ConstructionError> {
        let program_id = spl_token::id();
        let source = || required_pubkey(&self.source, "source", action);
        let destination = || required_pubkey(&self.destination, "destination", action);
        let mint = || required_pubkey(&self.mint, "mint", action);
        let authority = || required_pubkey(&self.authority, "authority", action);
        let amount = || required_value(self.amount, "amount", action);
        let decimals = || required_value(self.decimals, "decimals", action);
        let freeze_authority = optional_pubkey(&self.freeze_authority, "freeze_authority")?;

        let instructions = match action {
            OperationType::SplTokenInitializeMint => vec![token_instruction::initialize_mint(
                &program_id,
                &mint()?,
                &authority()?,
                freeze_authority.as_ref(),
                decimals()?,
            )
            .map_err(ConstructionError::unparseable)?],
            OperationType::SplTokenInitializeAccount => {
                vec![token_instruction::initialize_account(
                    &program_id,
                    &destination()?,
                    &mint()?,
                    &authority()?,
                )
                .map_err(ConstructionError::unparseable)?]
            }
            OperationType::SplTokenCreateToken => {
                let mint = mint()?;
                vec![
                    system_instruction::create_account(
                        &source()?,
                        &mint,
                        amount()?,
                        Mint::LEN as u64,
                        &program_id,
                    ),
                    token_instruction::initialize_mint(
                        &program_id,
                        &mint,
                        &authority()?,
                        freeze_authority.as_ref(),
                        decimals()?,
                    )
                    .map_err(ConstructionError::unparseable)?,
                ]
            }
            OperationType::SplTokenCreateAccount => {
                let account = destination()?;
                vec![
                    system_instruction::create_account(
                        &source()?,
                        &account,
                        amount()?,
                        TokenAccount::LEN as u64,
                        &program_id,
                    ),
                    token_instruction::initialize_account(
                        &program_id,
                        &account,
                        &mint()?,
                        &authority()?,
                    )
                    .map_err(ConstructionError::unparseable)?,
                ]
            }
            OperationType::SplTokenApprove => vec![token_instruction::approve(
                &program_id,
                &source()?,
                &destination()?,
                &authority()?,
                &[],
                amount()?,
            )
            .map_err(ConstructionError::unparseable)?],
            OperationType::SplTokenRevoke => vec![token_instruction::revoke(
                &program_id,
                &source()?,
                &authority()?,
                &[],
            )
            .map_err(ConstructionError::unparseable)?],
            OperationType::SplTokenMintTo => vec![token_instruction::mint_to(
                &program_id,
                &mint()?,
                &destination()?,
                &authority()?,
                &[],
                amount()?,
            )
            .map_err(ConstructionError::unparseable)?],
            OperationType::SplTokenBurn => vec![token_instruction::burn(
                &program_id,
                &source()?,
                &mint()?,
                &authority()?,
                &[],
                amount()?,
            )
            .map_err(ConstructionError::unparseable)?],
            OperationType::SplTokenCloseAccount => vec![token_instruction::close_account(
                &program_id,
                &source()?,
                &destination()?,
                &authority()?,
                &[],
            )
            .map_err(ConstructionError::unparseable)?],
            OperationType::SplTokenFreezeAccount => vec![token_instruction::freeze_account(
                &program_id,
                &source()?,
                &mint()?,
                &authority()?,
                &[],
            )
            .map_err(ConstructionError::unparseable)?],
            OperationType::SplTokenThawAccount => vec![token_instruction::thaw_account(
                &program_id,
                &source()?,
                &mint()?,
                &authority()?,
                &[],
            )
            .map_err(ConstructionError::unparseable)?],
            OperationType::SplTokenTransfer => vec![token_instruction::transfer(
                &program_id,
                &source()?,
                &destination()?,
                &authority()?,
                &[],
                amount()?,
            )
            .map_err(ConstructionError::unparseable)?],
            OperationType::SplTokenTransferChecked => {
                vec![transfer_checked(
                    &source()?,
                    &mint()?,
                    &destination()?,
                    &authority()?,
                    amount()?,
                    decimals()?,
                )?]
            }
            OperationType::SplTokenTransferNew => {
                let (mint, authority) = (mint()?, authority()?);
                let mut instructions = Vec::with_capacity(2);
                let destination = ensure_token_account(
                    &mut instructions,
                    None,
                    &authority,
                    &destination()?,
                    &mint,
                );
                instructions.push(transfer_checked(
                    &source()?,
                    &mint,
                    &destination,
                    &authority,
                    amount()?,
                    decimals()?,
                )?);
                instructions
            }
            OperationType::SplTokenTransferWithSystem => {
                let (mint, authority) = (mint()?, authority()?);
                let mut instructions = Vec::with_capacity(3);
                let source_token = ensure_token_account(
                    &mut instructions,
                    optional_pubkey(&self.source_token, "source_token")?,
                    &authority,
                    &source()?,
                    &mint,
                );
                let destination_token = ensure_token_account(
                    &mut instructions,
                    optional_pubkey(&self.destination_token, "destination_token")?,
                    &authority,
                    &destination()?,
                    &mint,
                );
                instructions.push(transfer_checked(
                    &source_token,
                    &mint,
                    &destination_token,
                    &authority,
                    amount()?,
                    decimals()?,
                )?);
                instructions
            }
            _ => return Err(unsupported_action(ProgramFamily::SplToken, action)),
        };
        Ok(instructions)
    }
}

fn transfer_checked(
    source: &Pubkey,
    mint: &Pubkey,
    destination: &Pubkey,
    authority: &Pubkey,
    amount: u64,
    decimals: u8,
) -> Result<Instruction, ConstructionError> {
    token_instruction::transfer_checked(
        &spl_token::id(),
        source,
        mint,
        destination,
        authority,
        &[],
        amount,
        decimals,
    )
    .map_err(ConstructionError::unparseable)
}

/// Returns `known`, or the wallet's associated token account after queueing its creation.
fn ensure_token_account(
    instructions: &mut Vec<Instruction>,
    known: Option<Pubkey>,
    payer: &Pubkey,
    wallet: &Pubkey,
    mint: &Pubkey,
) -> Pubkey {
    match known {
        Some(account) => account,
        None => {
            instructions.push(create_associated_token_account(
                payer,
                wallet,
                mint,
                &spl_token::id(),
            ));
            get_associated_token_address(wallet, mint)
        }
    }
}

impl SplTokenOperationMetadata {
    pub fn decode(raw: &RawInstruction) -> Option<(OperationType, Self)> {
        let instruction = TokenInstruction::unpack(&raw.data).ok()?;
        let decoded = match instruction {
            // [mint, rent sysvar]
            TokenInstruction::InitializeMint {
                decimals,
                mint_authority,
                freeze_authority,
            } => (
                OperationType::SplTokenInitializeMint,
                Self {
                    source: Some(mint_authority.to_string()),
                    mint: Some(raw.account(0)?),
                    freeze_authority: match freeze_authority {
                        COption::Some(key) => Some(key.to_string()),
                        COption::None => None,
                    },
                    decimals: Some(decimals),
                    ..Default::default()
                },
            ),
            // [account, mint, owner, rent sysvar]
            TokenInstruction::InitializeAccount => (
                OperationType::SplTokenInitializeAccount,
                Self {
                    source: Some(raw.account(2)?),
                    destination: Some(raw.account(0)?),
                    mint: Some(raw.account(1)?),
                    ..Default::default()
                },
            ),
            TokenInstruction::Transfer { amount } => (
                OperationType::SplTokenTransfer,
                Self {
                    source: Some(raw.account(0)?),
                    destination: Some(raw.account(1)?),
                    authority: Some(raw.account(2)?),
                    amount: Some(amount),
                    ..Default::default()
                },
            ),
            TokenInstruction::Approve { amount } => (
                OperationType::SplTokenApprove,
                Self {
                    source: Some(raw.account(0)?),
                    destination: Some(raw.account(1)?),
                    authority: Some(raw.account(2)?),
                    amount: Some(amount),
                    ..Default::default()
                },
            ),
            TokenInstruction::Revoke => (
                OperationType::SplTokenRevoke,
                Self {
                    source: Some(raw.account(0)?),
                    authority: Some(raw.account(1)?),
                    ..Default::default()
                },
            ),
            TokenInstruction::SetAuthority {
                authority_type,
                new_authority,
            } => (
                OperationType::SplTokenSetAuthority,
                Self {
                    source: Some(raw.account(0)?),
                    authority: Some(raw.account(1)?),
                    authority_type: Some(format!("{authority_type:?}")),
                    new_authority: match new_authority {
                        COption::Some(key) => Some(key.to_string()),
                        COption::None => None,
                    },
                    ..Default::default()
                },
            ),
            // [mint, account, mint authority]
            TokenInstruction::MintTo { amount } => {
                let authority = raw.account(2)?;
                (
                    OperationType::SplTokenMintTo,
                    Self {
                        source: Some(authority.clone()),
                        destination: Some(raw.account(1)?),
                        mint: Some(raw.account(0)?),
                        authority: Some(authority),
                        amount: Some(amount),
                        ..Default::default()
                    },
                )
            }
            TokenInstruction::Burn { amount } => (
                OperationType::SplTokenBurn,
                Self {
                    source: Some(raw.account(0)?),
                    mint: Some(raw.account(1)?),
                    authority: Some(raw.account(2)?),
                    amount: Some(amount),
                    ..Default::default()
                },
            ),
            TokenInstruction::CloseAccount => (
                OperationType::SplTokenCloseAccount,
                Self {
                    source: Some(raw.account(0)?),
                    destination: Some(raw.account(1)?),
                    authority: Some(raw.account(2)?),
                    ..Default::default()
                },
            ),
            TokenInstruction::FreezeAccount => (
                OperationType::SplTokenFreezeAccount,
                Self::account_mint_authority(raw)?,
            ),
            TokenInstruction::ThawAccount => (
                OperationType::SplTokenThawAccount,
                Self::account_mint_authority(raw)?,
            ),
            // [source, mint, destination, authority]
            TokenInstruction::TransferChecked { amount, decimals } => (
                OperationType::SplTokenTransferChecked,
                Self {
                    source: Some(raw.account(0)?),
                    destination: Some(raw.account(2)?),
                    mint: Some(raw.account(1)?),
                    authority: Some(raw.account(3)?),
                    amount: Some(amount),
                    decimals: Some(decimals),
                    ..Default::default()
                },
            ),
            _ => return None,
        };
        Some(decoded)
    }

    fn account_mint_authority(raw: &RawInstruction) -> Option<Self> {
        Some(Self {
            source: Some(raw.account(0)?),
            mint: Some(raw.account(1)?),
            authority: Some(raw.account(2)?),
            ..Default::default()
        })
    }

    /// Unchecked transfers carry no mint and fall back to the native currency.
    pub fn balance_change(&self) -> Option<BalanceChange> {
        let currency = match (&self.mint, self.decimals) {
            (Some(mint), Some(decimals)) => Currency::new(mint.clone(), u32::from(decimals)),
            _ => Currency::native(),
        };
        Some(BalanceChange {
            source: self.source.clone()?,
            destination: self.destination.clone()?,
            amount: self.amount?,
            currency,
        })
    }
}
