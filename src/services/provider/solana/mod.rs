//! Solana Provider Module
//!
//! Thin abstraction over the non-blocking Solana `RpcClient` covering the
//! calls the endpoints need: block hash and fee lookups, account reads, token
//! account discovery, broadcasting, raw JSON-RPC, and the confirmed blocks,
//! transactions and balances behind the data endpoints.
//!
//! No call is retried here; errors are classified and handed to the caller.
use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Url;
use serde::Serialize;
use serde_json::{json, Value};
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_config::{RpcBlockConfig, RpcTransactionConfig},
    rpc_request::{RpcRequest, TokenAccountsFilter},
};
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    hash::Hash,
    message::Message,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};
use solana_transaction_status::{
    option_serializer::OptionSerializer, EncodedTransactionWithStatusMeta, TransactionDetails,
    UiTransactionEncoding,
};
use thiserror::Error;

use crate::models::{AccountBalance, ConfirmedBlock, ConfirmedTransaction, TokenBalance};

/// Utility function to match error patterns by normalizing both strings.
fn matches_error_pattern(error_msg: &str, pattern: &str) -> bool {
    let normalized_msg = error_msg.to_lowercase().replace(' ', "");
    let normalized_pattern = pattern.to_lowercase().replace(' ', "");
    normalized_msg.contains(&normalized_pattern)
}

/// Errors that can occur when interacting with the Solana node.
///
/// Use `is_transient()` to tell the caller whether the same request may succeed later.
#[derive(Error, Debug, Clone, Serialize, PartialEq)]
pub enum SolanaProviderError {
    /// Network/IO error (connection issues, timeouts)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// RPC protocol error (node lag, sync pending)
    #[error("RPC error: {0}")]
    RpcError(String),

    /// HTTP request error with status code
    #[error("Request error (HTTP {status_code}): {error}")]
    RequestError { error: String, status_code: u16 },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Network configuration error: {0}")]
    NetworkConfiguration(String),

    #[error("Insufficient funds for transaction: {0}")]
    InsufficientFunds(String),

    /// Blockhash not found or expired
    #[error("Blockhash not found or expired: {0}")]
    BlockhashNotFound(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Transaction already processed: {0}")]
    AlreadyProcessed(String),

    /// The node answered with data this client cannot interpret
    #[error("Unexpected node response: {0}")]
    UnexpectedResponse(String),
}

impl SolanaProviderError {
    /// Determines if this error is transient (worth retrying) or permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            SolanaProviderError::NetworkError(_)
            | SolanaProviderError::RpcError(_)
            | SolanaProviderError::BlockhashNotFound(_) => true,

            SolanaProviderError::RequestError { status_code, .. } => match *status_code {
                501 | 505 => false,
                500 | 502..=504 | 506..=599 => true,
                408 | 425 | 429 => true,
                _ => false,
            },

            SolanaProviderError::InsufficientFunds(_)
            | SolanaProviderError::InvalidTransaction(_)
            | SolanaProviderError::AlreadyProcessed(_)
            | SolanaProviderError::InvalidAddress(_)
            | SolanaProviderError::NetworkConfiguration(_)
            | SolanaProviderError::UnexpectedResponse(_) => false,
        }
    }

    /// Classifies a Solana RPC client error into the appropriate error variant.
    pub fn from_rpc_error(error: ClientError) -> Self {
        match error.kind() {
            ClientErrorKind::Io(_) => SolanaProviderError::NetworkError(error.to_string()),

            ClientErrorKind::Reqwest(reqwest_err) => match reqwest_err.status() {
                Some(status) => SolanaProviderError::RequestError {
                    error: error.to_string(),
                    status_code: status.as_u16(),
                },
                None => SolanaProviderError::NetworkError(error.to_string()),
            },

            ClientErrorKind::RpcError(rpc_err) => {
                Self::from_rpc_response_error(&rpc_err.to_string(), &error)
            }

            ClientErrorKind::TransactionError(tx_error) => {
                Self::from_transaction_error(tx_error, &error)
            }

            ClientErrorKind::Custom(msg) => Self::from_rpc_response_error(msg, &error),

            _ => SolanaProviderError::RpcError(error.to_string()),
        }
    }

    /// Classifies RPC response errors using JSON-RPC error codes and messages.
    ///
    /// Transient: `-32004`, `-32005`, `-32008`, `-32014`, `-32016`.
    /// Permanent: `-32002`, `-32003`, `-32007`, `-32009`, `-32010`, `-32013`,
    /// `-32015`, `-32602`.
    fn from_rpc_response_error(rpc_err: &str, full_error: &ClientError) -> Self {
        let message = full_error.to_string();
        let has_code = |code: &str| rpc_err.contains(code);

        if has_code("-32002") {
            if matches_error_pattern(rpc_err, "blockhash not found") {
                SolanaProviderError::BlockhashNotFound(message)
            } else if matches_error_pattern(rpc_err, "insufficient funds") {
                SolanaProviderError::InsufficientFunds(message)
            } else {
                SolanaProviderError::InvalidTransaction(message)
            }
        } else if has_code("-32003")
            || has_code("-32013")
            || has_code("-32015")
            || has_code("-32602")
        {
            SolanaProviderError::InvalidTransaction(message)
        } else if has_code("-32007") || has_code("-32010") {
            SolanaProviderError::NetworkConfiguration(message)
        } else if has_code("-32008") {
            SolanaProviderError::BlockhashNotFound(message)
        } else if has_code("-32009") {
            SolanaProviderError::AlreadyProcessed(message)
        } else if matches_error_pattern(rpc_err, "insufficient funds") {
            SolanaProviderError::InsufficientFunds(message)
        } else if matches_error_pattern(rpc_err, "blockhash not found") {
            SolanaProviderError::BlockhashNotFound(message)
        } else if matches_error_pattern(rpc_err, "already processed") {
            SolanaProviderError::AlreadyProcessed(message)
        } else {
            SolanaProviderError::RpcError(message)
        }
    }

    fn from_transaction_error(
        tx_error: &solana_sdk::transaction::TransactionError,
        full_error: &ClientError,
    ) -> Self {
        use solana_sdk::transaction::TransactionError as TxErr;

        let message = full_error.to_string();
        match tx_error {
            TxErr::InsufficientFundsForFee | TxErr::InsufficientFundsForRent { .. } => {
                SolanaProviderError::InsufficientFunds(message)
            }
            TxErr::BlockhashNotFound => SolanaProviderError::BlockhashNotFound(message),
            TxErr::AlreadyProcessed => SolanaProviderError::AlreadyProcessed(message),
            TxErr::AccountInUse | TxErr::AccountLoadedTwice | TxErr::ClusterMaintenance => {
                SolanaProviderError::RpcError(message)
            }
            _ => SolanaProviderError::InvalidTransaction(message),
        }
    }
}

/// Flattens a transaction returned by `getBlock` or `getTransaction`.
///
/// Addresses loaded from lookup tables are appended after the static keys,
/// writable first, which is the order compiled instructions index into.
pub fn confirmed_transaction(
    slot: u64,
    encoded: &EncodedTransactionWithStatusMeta,
) -> Result<ConfirmedTransaction, SolanaProviderError> {
    let transaction = encoded.transaction.decode().ok_or_else(|| {
        SolanaProviderError::UnexpectedResponse(format!("undecodable transaction in slot {slot}"))
    })?;
    let signature = transaction
        .signatures
        .first()
        .map(|signature| signature.to_string())
        .ok_or_else(|| {
            SolanaProviderError::UnexpectedResponse(format!(
                "unsigned transaction in slot {slot}"
            ))
        })?;

    let mut account_keys = transaction.message.static_account_keys().to_vec();
    let mut failed = false;
    if let Some(meta) = &encoded.meta {
        failed = meta.err.is_some();
        if let OptionSerializer::Some(loaded) = &meta.loaded_addresses {
            for address in loaded.writable.iter().chain(&loaded.readonly) {
                let key = Pubkey::from_str(address).map_err(|e| {
                    SolanaProviderError::UnexpectedResponse(format!(
                        "invalid loaded address {address}: {e}"
                    ))
                })?;
                account_keys.push(key);
            }
        }
    }

    Ok(ConfirmedTransaction {
        slot,
        signature,
        account_keys,
        instructions: transaction.message.instructions().to_vec(),
        failed,
    })
}

/// Reads mint, raw amount and decimals from a `jsonParsed` `getTokenAccountsByOwner` answer.
fn parse_token_balances(response: &Value) -> Result<Vec<TokenBalance>, SolanaProviderError> {
    let unexpected = |what: &str| SolanaProviderError::UnexpectedResponse(what.to_string());
    let accounts = response
        .get("value")
        .and_then(Value::as_array)
        .ok_or_else(|| unexpected("token accounts response has no `value` list"))?;

    accounts
        .iter()
        .map(|keyed| {
            let info = keyed
                .pointer("/account/data/parsed/info")
                .ok_or_else(|| unexpected("token account is not jsonParsed"))?;
            let mint = info
                .get("mint")
                .and_then(Value::as_str)
                .ok_or_else(|| unexpected("token account has no mint"))?;
            let amount = info
                .pointer("/tokenAmount/amount")
                .and_then(Value::as_str)
                .and_then(|amount| amount.parse::<u64>().ok())
                .ok_or_else(|| unexpected("token account has no integer amount"))?;
            let decimals = info
                .pointer("/tokenAmount/decimals")
                .and_then(Value::as_u64)
                .and_then(|decimals| u32::try_from(decimals).ok())
                .ok_or_else(|| unexpected("token account has no decimals"))?;
            Ok(TokenBalance {
                mint: mint.to_string(),
                amount,
                decimals,
            })
        })
        .collect()
}

/// Node calls used by the construction, call and data services.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait SolanaProviderTrait: Send + Sync {
    /// Retrieves the latest blockhash.
    async fn get_latest_blockhash(&self) -> Result<Hash, SolanaProviderError>;

    /// Fee the node would charge for `message`, in lamports.
    async fn get_fee_for_message(&self, message: &Message) -> Result<u64, SolanaProviderError>;

    /// Retrieve an account given its base58 address.
    async fn get_account_from_str(&self, account: &str) -> Result<Account, SolanaProviderError>;

    /// First token account `owner` holds for `mint`, if any.
    async fn get_token_account_by_owner_and_mint(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Option<Pubkey>, SolanaProviderError>;

    /// Sends a signed transaction to the node.
    async fn send_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<Signature, SolanaProviderError>;

    /// Send a raw JSON-RPC request to the Solana node.
    async fn raw_request(
        &self,
        method: &'static str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, SolanaProviderError>;

    /// Highest slot at the client's commitment.
    async fn get_slot(&self) -> Result<u64, SolanaProviderError>;

    /// Block produced in `slot`; transactions are only fetched when asked for.
    async fn get_block(
        &self,
        slot: u64,
        with_transactions: bool,
    ) -> Result<ConfirmedBlock, SolanaProviderError>;

    /// A confirmed transaction by signature.
    async fn get_transaction(
        &self,
        signature: &Signature,
    ) -> Result<ConfirmedTransaction, SolanaProviderError>;

    /// Lamports held by `address` and the slot they were read at.
    async fn get_balance(&self, address: &Pubkey) -> Result<AccountBalance, SolanaProviderError>;

    /// Token accounts of `owner` under the SPL Token program.
    async fn get_token_balances(
        &self,
        owner: &Pubkey,
    ) -> Result<Vec<TokenBalance>, SolanaProviderError>;

    /// Identities of the cluster's known nodes.
    async fn get_cluster_nodes(&self) -> Result<Vec<String>, SolanaProviderError>;
}

pub struct SolanaProvider {
    client: RpcClient,
    timeout: Duration,
}

impl std::fmt::Debug for SolanaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaProvider")
            .field("url", &self.client.url())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SolanaProvider {
    pub fn new(url: &str, timeout_seconds: u64) -> Result<Self, SolanaProviderError> {
        Self::new_with_commitment(url, timeout_seconds, CommitmentConfig::confirmed())
    }

    pub fn new_with_commitment(
        url: &str,
        timeout_seconds: u64,
        commitment: CommitmentConfig,
    ) -> Result<Self, SolanaProviderError> {
        let rpc_url: Url = url.parse().map_err(|e| {
            SolanaProviderError::NetworkConfiguration(format!("Invalid URL format: {e}"))
        })?;
        let timeout = Duration::from_secs(timeout_seconds);
        let client =
            RpcClient::new_with_timeout_and_commitment(rpc_url.to_string(), timeout, commitment);

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl SolanaProviderTrait for SolanaProvider {
    async fn get_latest_blockhash(&self) -> Result<Hash, SolanaProviderError> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(SolanaProviderError::from_rpc_error)
    }

    async fn get_fee_for_message(&self, message: &Message) -> Result<u64, SolanaProviderError> {
        self.client
            .get_fee_for_message(message)
            .await
            .map_err(SolanaProviderError::from_rpc_error)
    }

    async fn get_account_from_str(&self, account: &str) -> Result<Account, SolanaProviderError> {
        let address = Pubkey::from_str(account).map_err(|e| {
            SolanaProviderError::InvalidAddress(format!("Invalid pubkey {account}: {e}"))
        })?;
        self.client
            .get_account(&address)
            .await
            .map_err(SolanaProviderError::from_rpc_error)
    }

    async fn get_token_account_by_owner_and_mint(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Option<Pubkey>, SolanaProviderError> {
        let accounts = self
            .client
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::Mint(*mint))
            .await
            .map_err(SolanaProviderError::from_rpc_error)?;

        accounts
            .first()
            .map(|keyed| {
                Pubkey::from_str(&keyed.pubkey).map_err(|e| {
                    SolanaProviderError::InvalidAddress(format!(
                        "Invalid token account {}: {e}",
                        keyed.pubkey
                    ))
                })
            })
            .transpose()
    }

    async fn send_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<Signature, SolanaProviderError> {
        self.client
            .send_transaction(transaction)
            .await
            .map_err(SolanaProviderError::from_rpc_error)
    }

    async fn raw_request(
        &self,
        method: &'static str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, SolanaProviderError> {
        self.client
            .send(RpcRequest::Custom { method }, params)
            .await
            .map_err(SolanaProviderError::from_rpc_error)
    }

    async fn get_slot(&self) -> Result<u64, SolanaProviderError> {
        self.client
            .get_slot()
            .await
            .map_err(SolanaProviderError::from_rpc_error)
    }

    async fn get_block(
        &self,
        slot: u64,
        with_transactions: bool,
    ) -> Result<ConfirmedBlock, SolanaProviderError> {
        let details = if with_transactions {
            TransactionDetails::Full
        } else {
            TransactionDetails::None
        };
        let config = RpcBlockConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            transaction_details: Some(details),
            rewards: Some(false),
            commitment: Some(self.client.commitment()),
            max_supported_transaction_version: Some(0),
        };
        let block = self
            .client
            .get_block_with_config(slot, config)
            .await
            .map_err(SolanaProviderError::from_rpc_error)?;

        let transactions = block
            .transactions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|encoded| confirmed_transaction(slot, encoded))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ConfirmedBlock {
            slot,
            blockhash: block.blockhash,
            parent_slot: block.parent_slot,
            previous_blockhash: block.previous_blockhash,
            block_time: block.block_time,
            transactions,
        })
    }

    async fn get_transaction(
        &self,
        signature: &Signature,
    ) -> Result<ConfirmedTransaction, SolanaProviderError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(self.client.commitment()),
            max_supported_transaction_version: Some(0),
        };
        let confirmed = self
            .client
            .get_transaction_with_config(signature, config)
            .await
            .map_err(SolanaProviderError::from_rpc_error)?;
        confirmed_transaction(confirmed.slot, &confirmed.transaction)
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<AccountBalance, SolanaProviderError> {
        let response = self
            .client
            .get_balance_with_commitment(address, self.client.commitment())
            .await
            .map_err(SolanaProviderError::from_rpc_error)?;
        Ok(AccountBalance {
            slot: response.context.slot,
            lamports: response.value,
        })
    }

    async fn get_token_balances(
        &self,
        owner: &Pubkey,
    ) -> Result<Vec<TokenBalance>, SolanaProviderError> {
        let params = json!([
            owner.to_string(),
            {"programId": spl_token::id().to_string()},
            {"encoding": "jsonParsed", "commitment": self.client.commitment().commitment},
        ]);
        let response: Value = self
            .client
            .send(RpcRequest::GetTokenAccountsByOwner, params)
            .await
            .map_err(SolanaProviderError::from_rpc_error)?;
        parse_token_balances(&response)
    }

    async fn get_cluster_nodes(&self) -> Result<Vec<String>, SolanaProviderError> {
        let nodes = self
            .client
            .get_cluster_nodes()
            .await
            .map_err(SolanaProviderError::from_rpc_error)?;
        Ok(nodes.into_iter().map(|node| node.pubkey).collect())
    }
}
