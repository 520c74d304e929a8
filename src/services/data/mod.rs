//! The `/network/status`, `/block`, `/block/transaction` and `/account/balance`
//! endpoints.
//!
//! All of them read confirmed chain state from the node and fail offline
//! before any call is made. Transactions are rendered with the same decoder
//! as `/construction/parse`, so operation types line up across both flows.

use std::{collections::BTreeMap, str::FromStr, sync::Arc};

use solana_sdk::{pubkey::Pubkey, signature::Signature};

use crate::{
    constants::{FAILURE_STATUS, SUCCESS_STATUS},
    domain::{decompile, resolve_compiled},
    models::{
        AccountBalanceRequest, AccountBalanceResponse, Amount, Block, BlockIdentifier,
        BlockRequest, BlockResponse, BlockTransactionRequest, BlockTransactionResponse,
        ConfirmedBlock, ConfirmedTransaction, ConstructionError, Currency, NetworkRequest,
        NetworkStatusResponse, Peer, TokenBalance, Transaction, TransactionIdentifier,
    },
    services::{network::NetworkService, provider::SolanaProviderTrait},
};

fn block_index(slot: u64) -> Result<i64, ConstructionError> {
    i64::try_from(slot).map_err(|_| {
        ConstructionError::UnableToParseIntermediateResult(format!("slot {slot} out of range"))
    })
}

fn requested_slot(index: i64) -> Result<u64, ConstructionError> {
    u64::try_from(index)
        .map_err(|_| ConstructionError::InvalidBlockIdentifier(format!("negative index {index}")))
}

/// Block time in milliseconds; zero when the node has none recorded.
fn timestamp_millis(block_time: Option<i64>) -> i64 {
    block_time.map_or(0, |seconds| seconds.saturating_mul(1000))
}

fn block_identifier(block: &ConfirmedBlock) -> Result<BlockIdentifier, ConstructionError> {
    Ok(BlockIdentifier {
        index: block_index(block.slot)?,
        hash: block.blockhash.clone(),
    })
}

/// A confirmed transaction as operations carrying its execution status.
pub fn rosetta_transaction(
    transaction: &ConfirmedTransaction,
) -> Result<Transaction, ConstructionError> {
    let instructions = resolve_compiled(&transaction.account_keys, &transaction.instructions)?;
    let status = if transaction.failed {
        FAILURE_STATUS
    } else {
        SUCCESS_STATUS
    };
    Ok(Transaction {
        transaction_identifier: TransactionIdentifier {
            hash: transaction.signature.clone(),
        },
        operations: decompile(&instructions, Some(status))?,
        metadata: None,
    })
}

/// One amount per mint, summed over every token account holding it.
fn token_amounts(balances: Vec<TokenBalance>) -> Vec<Amount> {
    let mut per_mint: BTreeMap<String, (u128, u32)> = BTreeMap::new();
    for balance in balances {
        let entry = per_mint.entry(balance.mint).or_insert((0, balance.decimals));
        entry.0 += u128::from(balance.amount);
    }
    per_mint
        .into_iter()
        .map(|(mint, (amount, decimals))| {
            Amount::new(amount.to_string(), Currency::new(mint, decimals))
        })
        .collect()
}

fn same_currency(a: &Currency, b: &Currency) -> bool {
    a.symbol == b.symbol && a.decimals == b.decimals
}

pub struct DataService<P> {
    network: NetworkService,
    provider: Arc<P>,
}

impl<P: SolanaProviderTrait> DataService<P> {
    pub fn new(network: NetworkService, provider: Arc<P>) -> Self {
        Self { network, provider }
    }

    pub async fn network_status(
        &self,
        request: NetworkRequest,
    ) -> Result<NetworkStatusResponse, ConstructionError> {
        self.network.validate(&request.network_identifier)?;
        self.network.require_online()?;

        let slot = self.current_slot().await?;
        let block = self.fetch_block(slot, false).await?;

        // Best effort.
        let peers = match self.provider.get_cluster_nodes().await {
            Ok(nodes) => nodes.into_iter().map(|peer_id| Peer { peer_id }).collect(),
            Err(e) => {
                log::warn!("cluster node lookup failed: {e}");
                Vec::new()
            }
        };

        Ok(NetworkStatusResponse {
            current_block_identifier: block_identifier(&block)?,
            current_block_timestamp: timestamp_millis(block.block_time),
            genesis_block_identifier: self.network.genesis_block(),
            peers,
        })
    }

    /// A block by index, or the latest one when no identifier is given.
    pub async fn block(&self, request: BlockRequest) -> Result<BlockResponse, ConstructionError> {
        self.network.validate(&request.network_identifier)?;
        self.network.require_online()?;

        let selector = &request.block_identifier;
        let slot = match (selector.index, &selector.hash) {
            (Some(index), _) => requested_slot(index)?,
            (None, Some(hash)) => {
                return Err(ConstructionError::InvalidBlockIdentifier(format!(
                    "lookup by hash {hash} is not supported, give an index"
                )))
            }
            (None, None) => self.current_slot().await?,
        };

        let block = self.fetch_block(slot, true).await?;
        if let Some(hash) = &selector.hash {
            if *hash != block.blockhash {
                return Err(ConstructionError::InvalidBlockIdentifier(format!(
                    "block {slot} has hash {}, not {hash}",
                    block.blockhash
                )));
            }
        }
        log::debug!(
            "rendering block {slot} with {} transaction(s)",
            block.transactions.len()
        );

        let transactions = block
            .transactions
            .iter()
            .map(rosetta_transaction)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BlockResponse {
            block: Block {
                block_identifier: block_identifier(&block)?,
                parent_block_identifier: BlockIdentifier {
                    index: block_index(block.parent_slot)?,
                    hash: block.previous_blockhash.clone(),
                },
                timestamp: timestamp_millis(block.block_time),
                transactions,
            },
        })
    }

    pub async fn block_transaction(
        &self,
        request: BlockTransactionRequest,
    ) -> Result<BlockTransactionResponse, ConstructionError> {
        self.network.validate(&request.network_identifier)?;
        self.network.require_online()?;

        let hash = &request.transaction_identifier.hash;
        let signature = Signature::from_str(hash).map_err(|e| {
            ConstructionError::UnableToParseIntermediateResult(format!(
                "invalid transaction hash {hash}: {e}"
            ))
        })?;
        let transaction = self
            .provider
            .get_transaction(&signature)
            .await
            .map_err(|e| {
                log::warn!("transaction {hash} lookup failed: {e}");
                ConstructionError::upstream(e)
            })?;

        if block_index(transaction.slot)? != request.block_identifier.index {
            return Err(ConstructionError::InvalidBlockIdentifier(format!(
                "transaction {hash} is in block {}, not {}",
                transaction.slot, request.block_identifier.index
            )));
        }
        Ok(BlockTransactionResponse {
            transaction: rosetta_transaction(&transaction)?,
        })
    }

    /// Native and SPL Token balances of an address at the latest slot.
    pub async fn account_balance(
        &self,
        request: AccountBalanceRequest,
    ) -> Result<AccountBalanceResponse, ConstructionError> {
        self.network.validate(&request.network_identifier)?;
        self.network.require_online()?;

        if request
            .block_identifier
            .as_ref()
            .is_some_and(|block| block.index.is_some() || block.hash.is_some())
        {
            return Err(ConstructionError::InvalidBlockIdentifier(
                "historical balance lookups are not supported".to_string(),
            ));
        }

        let address = &request.account_identifier.address;
        let owner = Pubkey::from_str(address).map_err(|e| {
            ConstructionError::UnableToParseIntermediateResult(format!(
                "invalid address {address}: {e}"
            ))
        })?;

        let native = self.provider.get_balance(&owner).await.map_err(|e| {
            log::warn!("balance lookup for {address} failed: {e}");
            ConstructionError::upstream(e)
        })?;
        let mut balances = vec![Amount::new(native.lamports.to_string(), Currency::native())];
        match self.provider.get_token_balances(&owner).await {
            Ok(tokens) => balances.extend(token_amounts(tokens)),
            Err(e) => log::warn!("token balance lookup for {address} failed: {e}"),
        }

        if let Some(currencies) = &request.currencies {
            balances.retain(|amount| {
                currencies
                    .iter()
                    .any(|currency| same_currency(currency, &amount.currency))
            });
            // Requested currencies the account holds none of report zero.
            for currency in currencies {
                if !balances
                    .iter()
                    .any(|amount| same_currency(currency, &amount.currency))
                {
                    balances.push(Amount::new("0", currency.clone()));
                }
            }
        }

        let block = self.fetch_block(native.slot, false).await?;
        Ok(AccountBalanceResponse {
            block_identifier: block_identifier(&block)?,
            balances,
        })
    }

    async fn current_slot(&self) -> Result<u64, ConstructionError> {
        self.provider.get_slot().await.map_err(|e| {
            log::warn!("slot lookup failed: {e}");
            ConstructionError::upstream(e)
        })
    }

    async fn fetch_block(
        &self,
        slot: u64,
        with_transactions: bool,
    ) -> Result<ConfirmedBlock, ConstructionError> {
        self.provider
            .get_block(slot, with_transactions)
            .await
            .map_err(|e| {
                log::warn!("block {slot} lookup failed: {e}");
                ConstructionError::upstream(e)
            })
    }
}
