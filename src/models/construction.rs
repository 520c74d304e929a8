//! State carried between the steps of one construction flow.
//!
//! Nothing here is stored by the service: each value is serialized into the
//! `options` or `metadata` bag returned to the caller and handed back on the
//! next call.

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::models::{ConstructionError, ObjectMap};

/// Reference to a durable nonce account replacing a recent block hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WithNonce {
    pub account: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeeCalculator {
    pub lamports_per_signature: u64,
}

/// Token accounts resolved for a wallet-to-wallet token transfer.
///
/// `None` means no token account exists yet for that wallet and mint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SplAccounts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

/// A wallet pair whose token accounts must be looked up during metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SplTokenLookup {
    pub source_owner: String,
    pub destination_owner: String,
    pub mint: String,
}

/// Output of `/construction/preprocess`, input of `/construction/metadata`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConstructionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_nonce: Option<WithNonce>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signers: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub spl_token_lookups: BTreeMap<i64, SplTokenLookup>,
}

/// Output of `/construction/metadata`, input of `/construction/payloads`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConstructionMetadata {
    pub blockhash: String,
    pub fee_calculator: FeeCalculator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_nonce: Option<WithNonce>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub spl_token_accounts: BTreeMap<i64, SplAccounts>,
}

/// Decodes a typed value out of an open metadata bag.
pub fn from_object_map<T: DeserializeOwned>(map: &ObjectMap) -> Result<T, ConstructionError> {
    serde_json::from_value(serde_json::Value::Object(map.clone()))
        .map_err(ConstructionError::unparseable)
}

/// Encodes a typed value as an open metadata bag.
pub fn to_object_map<T: Serialize>(value: &T) -> Result<ObjectMap, ConstructionError> {
    match serde_json::to_value(value).map_err(ConstructionError::unparseable)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(ConstructionError::UnableToParseIntermediateResult(format!(
            "expected an object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_round_trips_through_object_map() {
        let mut spl_token_accounts = BTreeMap::new();
        spl_token_accounts.insert(
            2,
            SplAccounts {
                source: Some("95Dq3sXa3omVjiyxBSD6UMrzPYdmyu6CFCw5wS4rhqgV".to_string()),
                destination: None,
            },
        );
        let metadata = ConstructionMetadata {
            blockhash: "EtWTRABZaYq6iMfeYKouRu166VU2xqa1wcaWoxPkrZBG".to_string(),
            fee_calculator: FeeCalculator {
                lamports_per_signature: 5000,
            },
            with_nonce: None,
            spl_token_accounts,
        };

        let map = to_object_map(&metadata).unwrap();
        assert_eq!(map["spl_token_accounts"]["2"]["source"], json!("95Dq3sXa3omVjiyxBSD6UMrzPYdmyu6CFCw5wS4rhqgV"));
        assert!(map.get("with_nonce").is_none());

        let decoded: ConstructionMetadata = from_object_map(&map).unwrap();
        assert_eq!(decoded, metadata);
    }

    #[test]
    fn test_missing_blockhash_is_unparseable() {
        let map = json!({"fee_calculator": {"lamports_per_signature": 5000}});
        let result: Result<ConstructionMetadata, _> =
            from_object_map(map.as_object().unwrap());
        assert!(matches!(
            result,
            Err(ConstructionError::UnableToParseIntermediateResult(_))
        ));
    }

    #[test]
    fn test_options_default_when_bag_is_empty() {
        let options: ConstructionOptions = from_object_map(&ObjectMap::new()).unwrap();
        assert_eq!(options, ConstructionOptions::default());
    }
}
