use serde::{Deserialize, Serialize};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use solana_stake_interface::{
    instruction::{self as stake_instruction, StakeInstruction},
    state::{Authorized, Lockup, StakeAuthorize},
};

use super::{
    optional_pubkey, overlay_fields, required_pubkey, required_value, unsupported_action,
    BalanceChange, CompileContext, OperationIntent, OperationMetadata, OperationType,
    ProgramFamily, RawInstruction,
};
use crate::models::ConstructionError;

/// Fields of Stake program actions.
///
/// `stake_authorization_type` is `0` for the staker and `1` for the withdrawer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StakeOperationMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stake: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lamports: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lockup_unix_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lockup_epoch: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lockup_custodian: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_authority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stake_authorization_type: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custodian: Option<String>,
}

impl OperationMetadata for StakeOperationMetadata {
    fn defaults(intent: &OperationIntent, _ctx: &CompileContext) -> Self {
        let stake = match intent.operation_type {
            OperationType::StakeCreateStakeAccount | OperationType::StakeCreateStakeAndDelegate => {
                intent.destination.clone()
            }
            OperationType::StakeWithdraw | OperationType::StakeSplit => intent.source.clone(),
            _ => None,
        };
        Self {
            source: intent.source.clone(),
            destination: intent.destination.clone(),
            stake,
            lamports: intent.amount,
            staker: intent.source.clone(),
            withdrawer: intent.source.clone(),
            authority: intent.source.clone(),
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
                stake,
                lamports,
                staker,
                withdrawer,
                lockup_unix_timestamp,
                lockup_epoch,
                lockup_custodian,
                vote_account,
                merge_destination,
                authority,
                new_authority,
                stake_authorization_type,
                custodian,
            ]
        )
    }

    fn to_instructions(
        &self,
        action: OperationType,
    ) -> Result<Vec<Instruction>, ConstructionError> {
        let stake = || required_pubkey(&self.stake, "stake", action);
        let staker = || required_pubkey(&self.staker, "staker", action);
        let lamports = || required_value(self.lamports, "lamports", action);
        let vote_account = || required_pubkey(&self.vote_account, "vote_account", action);
        let custodian = optional_pubkey(&self.custodian, "custodian")?;

        let instructions = match action {
            OperationType::StakeCreateStakeAccount => self.create_stake_account(action)?,
            OperationType::StakeCreateStakeAndDelegate => {
                let mut instructions = self.create_stake_account(action)?;
                instructions.push(stake_instruction::delegate_stake(
                    &stake()?,
                    &staker()?,
                    &vote_account()?,
                ));
                instructions
            }
            OperationType::StakeDelegateStake => vec![stake_instruction::delegate_stake(
                &stake()?,
                &staker()?,
                &vote_account()?,
            )],
            OperationType::StakeDeactivate => {
                vec![stake_instruction::deactivate_stake(&stake()?, &staker()?)]
            }
            OperationType::StakeWithdraw => vec![stake_instruction::withdraw(
                &stake()?,
                &required_pubkey(&self.withdrawer, "withdrawer", action)?,
                &required_pubkey(&self.destination, "destination", action)?,
                lamports()?,
                custodian.as_ref(),
            )],
            // Allocates and assigns the destination before splitting into it.
            OperationType::StakeSplit => stake_instruction::split(
                &stake()?,
                &staker()?,
                lamports()?,
                &required_pubkey(&self.destination, "destination", action)?,
            ),
            OperationType::StakeMerge => stake_instruction::merge(
                &required_pubkey(&self.merge_destination, "merge_destination", action)?,
                &stake()?,
                &staker()?,
            ),
            OperationType::StakeAuthorize => vec![stake_instruction::authorize(
                &stake()?,
                &required_pubkey(&self.authority, "authority", action)?,
                &required_pubkey(&self.new_authority, "new_authority", action)?,
                stake_authorize_from_code(required_value(
                    self.stake_authorization_type,
                    "stake_authorization_type",
                    action,
                )?)?,
                custodian.as_ref(),
            )],
            _ => return Err(unsupported_action(ProgramFamily::Stake, action)),
        };
        Ok(instructions)
    }
}

fn stake_authorize_from_code(code: u32) -> Result<StakeAuthorize, ConstructionError> {
    match code {
        0 => Ok(StakeAuthorize::Staker),
        1 => Ok(StakeAuthorize::Withdrawer),
        other => Err(ConstructionError::UnableToParseIntermediateResult(format!(
            "unknown stake authorization type {other}"
        ))),
    }
}

fn stake_authorize_code(authorize: StakeAuthorize) -> u32 {
    match authorize {
        StakeAuthorize::Staker => 0,
        StakeAuthorize::Withdrawer => 1,
    }
}

impl StakeOperationMetadata {
    /// System account creation followed by stake initialization.
    fn create_stake_account(
        &self,
        action: OperationType,
    ) -> Result<Vec<Instruction>, ConstructionError> {
        let authorized = Authorized {
            staker: required_pubkey(&self.staker, "staker", action)?,
            withdrawer: required_pubkey(&self.withdrawer, "withdrawer", action)?,
        };
        let lockup = Lockup {
            unix_timestamp: self.lockup_unix_timestamp.unwrap_or_default(),
            epoch: self.lockup_epoch.unwrap_or_default(),
            custodian: optional_pubkey(&self.lockup_custodian, "lockup_custodian")?
                .unwrap_or_default(),
        };
        Ok(stake_instruction::create_account(
            &required_pubkey(&self.source, "source", action)?,
            &required_pubkey(&self.stake, "stake", action)?,
            &authorized,
            &lockup,
            required_value(self.lamports, "lamports", action)?,
        ))
    }

    pub fn decode(raw: &RawInstruction) -> Option<(OperationType, Self)> {
        let instruction = bincode::deserialize::<StakeInstruction>(&raw.data).ok()?;
        let decoded = match instruction {
            // [stake, rent sysvar]
            StakeInstruction::Initialize(authorized, lockup) => {
                let stake = raw.account(0)?;
                let mut meta = Self {
                    source: Some(stake.clone()),
                    stake: Some(stake),
                    staker: Some(authorized.staker.to_string()),
                    withdrawer: Some(authorized.withdrawer.to_string()),
                    ..Default::default()
                };
                if lockup != Lockup::default() {
                    meta.lockup_unix_timestamp = Some(lockup.unix_timestamp);
                    meta.lockup_epoch = Some(lockup.epoch);
                    if lockup.custodian != Pubkey::default() {
                        meta.lockup_custodian = Some(lockup.custodian.to_string());
                    }
                }
                (OperationType::StakeInitialize, meta)
            }
            // [stake, vote, clock, stake history, config, authority]
            StakeInstruction::DelegateStake => {
                let authority = raw.account(5)?;
                (
                    OperationType::StakeDelegateStake,
                    Self {
                        source: Some(authority.clone()),
                        stake: Some(raw.account(0)?),
                        staker: Some(authority),
                        vote_account: Some(raw.account(1)?),
                        ..Default::default()
                    },
                )
            }
            // [stake, clock, authority]
            StakeInstruction::Deactivate => {
                let authority = raw.account(2)?;
                (
                    OperationType::StakeDeactivate,
                    Self {
                        source: Some(authority.clone()),
                        stake: Some(raw.account(0)?),
                        staker: Some(authority),
                        ..Default::default()
                    },
                )
            }
            // [stake, recipient, clock, stake history, withdrawer, custodian?]
            StakeInstruction::Withdraw(lamports) => (
                OperationType::StakeWithdraw,
                Self {
                    source: Some(raw.account(0)?),
                    destination: Some(raw.account(1)?),
                    lamports: Some(lamports),
                    withdrawer: Some(raw.account(4)?),
                    custodian: raw.account(5),
                    ..Default::default()
                },
            ),
            // [stake, split destination, authority]
            StakeInstruction::Split(lamports) => (
                OperationType::StakeSplit,
                Self {
                    source: Some(raw.account(0)?),
                    destination: Some(raw.account(1)?),
                    lamports: Some(lamports),
                    staker: Some(raw.account(2)?),
                    ..Default::default()
                },
            ),
            // [destination stake, source stake, clock, stake history, authority]
            StakeInstruction::Merge => {
                let authority = raw.account(4)?;
                (
                    OperationType::StakeMerge,
                    Self {
                        source: Some(authority.clone()),
                        stake: Some(raw.account(1)?),
                        staker: Some(authority),
                        merge_destination: Some(raw.account(0)?),
                        ..Default::default()
                    },
                )
            }
            // [stake, clock, authority, custodian?]
            StakeInstruction::Authorize(new_authority, authorize) => {
                let authority = raw.account(2)?;
                (
                    OperationType::StakeAuthorize,
                    Self {
                        source: Some(authority.clone()),
                        stake: Some(raw.account(0)?),
                        authority: Some(authority),
                        new_authority: Some(new_authority.to_string()),
                        stake_authorization_type: Some(stake_authorize_code(authorize)),
                        custodian: raw.account(3),
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
