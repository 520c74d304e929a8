use std::str::FromStr;

use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::{constants::OPERATION_TYPE_SEPARATOR, models::ConstructionError};

/// Program family named by the prefix of an operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter, AsRefStr)]
pub enum ProgramFamily {
    System,
    SplToken,
    SplAssociatedTokenAccount,
    Stake,
}

/// Every operation type this service produces or accepts.
///
/// The string form is `<ProgramFamily>__<Action>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter, AsRefStr)]
pub enum OperationType {
    #[strum(serialize = "System__Transfer")]
    SystemTransfer,
    #[strum(serialize = "System__CreateAccount")]
    SystemCreateAccount,
    #[strum(serialize = "System__Assign")]
    SystemAssign,
    #[strum(serialize = "System__Allocate")]
    SystemAllocate,
    #[strum(serialize = "System__CreateNonceAccount")]
    SystemCreateNonceAccount,
    #[strum(serialize = "System__InitializeNonce")]
    SystemInitializeNonce,
    #[strum(serialize = "System__AdvanceNonce")]
    SystemAdvanceNonce,
    #[strum(serialize = "System__WithdrawFromNonce")]
    SystemWithdrawFromNonce,
    #[strum(serialize = "System__AuthorizeNonce")]
    SystemAuthorizeNonce,

    #[strum(serialize = "SplToken__InitializeMint")]
    SplTokenInitializeMint,
    #[strum(serialize = "SplToken__InitializeAccount")]
    SplTokenInitializeAccount,
    #[strum(serialize = "SplToken__CreateToken")]
    SplTokenCreateToken,
    #[strum(serialize = "SplToken__CreateAccount")]
    SplTokenCreateAccount,
    #[strum(serialize = "SplToken__Approve")]
    SplTokenApprove,
    #[strum(serialize = "SplToken__Revoke")]
    SplTokenRevoke,
    #[strum(serialize = "SplToken__SetAuthority")]
    SplTokenSetAuthority,
    #[strum(serialize = "SplToken__MintTo")]
    SplTokenMintTo,
    #[strum(serialize = "SplToken__Burn")]
    SplTokenBurn,
    #[strum(serialize = "SplToken__CloseAccount")]
    SplTokenCloseAccount,
    #[strum(serialize = "SplToken__FreezeAccount")]
    SplTokenFreezeAccount,
    #[strum(serialize = "SplToken__ThawAccount")]
    SplTokenThawAccount,
    #[strum(serialize = "SplToken__Transfer")]
    SplTokenTransfer,
    #[strum(serialize = "SplToken__TransferChecked")]
    SplTokenTransferChecked,
    #[strum(serialize = "SplToken__TransferNew")]
    SplTokenTransferNew,
    #[strum(serialize = "SplToken__TransferWithSystem")]
    SplTokenTransferWithSystem,

    #[strum(serialize = "SplAssociatedTokenAccount__Create")]
    SplAssociatedTokenAccountCreate,

    #[strum(serialize = "Stake__CreateStakeAccount")]
    StakeCreateStakeAccount,
    #[strum(serialize = "Stake__CreateStakeAndDelegate")]
    StakeCreateStakeAndDelegate,
    #[strum(serialize = "Stake__Initialize")]
    StakeInitialize,
    #[strum(serialize = "Stake__DelegateStake")]
    StakeDelegateStake,
    #[strum(serialize = "Stake__Deactivate")]
    StakeDeactivate,
    #[strum(serialize = "Stake__Withdraw")]
    StakeWithdraw,
    #[strum(serialize = "Stake__Split")]
    StakeSplit,
    #[strum(serialize = "Stake__Merge")]
    StakeMerge,
    #[strum(serialize = "Stake__Authorize")]
    StakeAuthorize,

    Unknown,
}

impl OperationType {
    /// Parses a construction request type, rejecting unknown families and actions.
    pub fn parse(operation_type: &str) -> Result<Self, ConstructionError> {
        let prefix = operation_type
            .split(OPERATION_TYPE_SEPARATOR)
            .next()
            .unwrap_or_default();
        ProgramFamily::from_str(prefix).map_err(|_| {
            ConstructionError::UnableToParseIntermediateResult(format!(
                "unsupported program family in operation type {operation_type}"
            ))
        })?;
        let parsed = OperationType::from_str(operation_type).map_err(|_| {
            ConstructionError::UnableToParseIntermediateResult(format!(
                "unsupported operation type {operation_type}"
            ))
        })?;
        if parsed.is_decode_only() {
            return Err(ConstructionError::UnableToParseIntermediateResult(format!(
                "operation type {operation_type} cannot be constructed"
            )));
        }
        Ok(parsed)
    }

    pub fn family(&self) -> Option<ProgramFamily> {
        let name: &str = self.as_ref();
        let (prefix, _) = name.split_once(OPERATION_TYPE_SEPARATOR)?;
        ProgramFamily::from_str(prefix).ok()
    }

    /// Types whose decoded form is a debit/credit pair.
    pub fn is_balance_changing(&self) -> bool {
        matches!(
            self,
            OperationType::SystemTransfer
                | OperationType::SystemCreateAccount
                | OperationType::SystemWithdrawFromNonce
                | OperationType::SplTokenTransfer
                | OperationType::SplTokenTransferChecked
                | OperationType::StakeSplit
                | OperationType::StakeWithdraw
        )
    }

    /// Types that only ever come out of the decoder.
    pub fn is_decode_only(&self) -> bool {
        matches!(
            self,
            OperationType::SystemInitializeNonce
                | OperationType::SplTokenSetAuthority
                | OperationType::StakeInitialize
                | OperationType::Unknown
        )
    }

    /// All type names, as listed by `/network/options`.
    pub fn names() -> Vec<String> {
        OperationType::iter().map(|t| t.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_type() {
        assert_eq!(
            OperationType::parse("System__Transfer").unwrap(),
            OperationType::SystemTransfer
        );
        assert_eq!(
            OperationType::parse("SplAssociatedTokenAccount__Create").unwrap(),
            OperationType::SplAssociatedTokenAccountCreate
        );
    }

    #[test]
    fn test_parse_unknown_prefix_fails() {
        let result = OperationType::parse("Vote__Withdraw");
        match result {
            Err(ConstructionError::UnableToParseIntermediateResult(msg)) => {
                assert!(msg.contains("program family"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_unknown_action_fails() {
        assert!(matches!(
            OperationType::parse("System__Teleport"),
            Err(ConstructionError::UnableToParseIntermediateResult(_))
        ));
    }

    #[test]
    fn test_decode_only_types_are_not_constructible() {
        assert!(OperationType::parse("Stake__Initialize").is_err());
        assert!(OperationType::parse("Unknown").is_err());
    }

    #[test]
    fn test_family_from_prefix() {
        assert_eq!(
            OperationType::SplTokenTransferNew.family(),
            Some(ProgramFamily::SplToken)
        );
        assert_eq!(OperationType::StakeMerge.family(), Some(ProgramFamily::Stake));
        assert_eq!(OperationType::Unknown.family(), None);
    }

    #[test]
    fn test_names_use_separator_form() {
        let names = OperationType::names();
        assert!(names.contains(&"SplToken__TransferChecked".to_string()));
        assert!(names.contains(&"Unknown".to_string()));
        assert!(names
            .iter()
            .filter(|n| n.as_str() != "Unknown")
            .all(|n| n.contains("__")));
    }
}
