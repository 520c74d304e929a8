//! The neutral operation model exchanged with Rosetta clients.

use serde::{Deserialize, Serialize};

use super::{AccountIdentifier, Amount, ObjectMap, OperationIdentifier};

/// A single balance-affecting or side-effect action.
///
/// A transfer is two operations of the same `type` whose amounts have opposite
/// signs and equal magnitude. Actions without an amount are single operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Operation {
    pub operation_identifier: OperationIdentifier,
    #[serde(rename = "type")]
    pub operation_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMap>,
}

impl Operation {
    pub fn index(&self) -> i64 {
        self.operation_identifier.index
    }

    pub fn address(&self) -> Option<&str> {
        self.account.as_ref().map(|a| a.address.as_str())
    }
}
