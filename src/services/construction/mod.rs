//! The `/construction/*` flow.
//!
//! `derive`, `preprocess`, `payloads`, `combine`, `hash` and `parse` are pure
//! transformations. `metadata` and `submit` need the node and fail offline
//! before any call is made.

use std::{collections::BTreeMap, str::FromStr, sync::Arc};

use solana_sdk::{
    account::Account,
    hash::Hash,
    message::Message,
    nonce::state::{State as NonceAccountState, Versions as NonceVersions},
    pubkey::Pubkey,
    signature::Signature,
};

use crate::{
    constants::WITH_NONCE_KEY,
    domain::{
        apply_signature, assemble, compile_intents, decode_transaction, decompile,
        encode_transaction, match_operations, required_signers, resolve_instructions,
        signing_payloads, token_account_lookups, transaction_hash, unique_signers,
        BlockReference, CompileContext,
    },
    models::{
        from_object_map, to_object_map, AccountIdentifier, Amount, ConstructionCombineRequest,
        ConstructionCombineResponse, ConstructionDeriveRequest, ConstructionDeriveResponse,
        ConstructionError, ConstructionHashRequest, ConstructionMetadata,
        ConstructionMetadataRequest, ConstructionMetadataResponse, ConstructionOptions,
        ConstructionParseRequest, ConstructionParseResponse, ConstructionPayloadsRequest,
        ConstructionPayloadsResponse, ConstructionPreprocessRequest,
        ConstructionPreprocessResponse, ConstructionSubmitRequest, Currency, FeeCalculator,
        ObjectMap, PublicKey, SplAccounts, TransactionIdentifierResponse, WithNonce,
    },
    services::{network::NetworkService, provider::SolanaProviderTrait},
};

/// What a durable nonce account currently stores.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NonceState {
    hash: Hash,
    authority: Pubkey,
    lamports_per_signature: u64,
}

fn decode_nonce_account(address: &str, account: &Account) -> Result<NonceState, ConstructionError> {
    if account.owner != solana_system_interface::program::id() {
        return Err(ConstructionError::UnableToParseIntermediateResult(format!(
            "{address} is not owned by the system program"
        )));
    }
    let versions: NonceVersions = bincode::deserialize(&account.data).map_err(|e| {
        ConstructionError::UnableToParseIntermediateResult(format!(
            "{address} is not a nonce account: {e}"
        ))
    })?;
    match versions.state() {
        NonceAccountState::Initialized(data) => Ok(NonceState {
            hash: data.blockhash(),
            authority: data.authority,
            lamports_per_signature: data.fee_calculator.lamports_per_signature,
        }),
        NonceAccountState::Uninitialized => Err(ConstructionError::UnableToParseIntermediateResult(
            format!("nonce account {address} is not initialized"),
        )),
    }
}

fn parse_address(value: &str, field: &str) -> Result<Pubkey, ConstructionError> {
    Pubkey::from_str(value).map_err(|e| {
        ConstructionError::UnableToParseIntermediateResult(format!(
            "invalid `{field}` address {value}: {e}"
        ))
    })
}

fn public_key_address(public_key: &PublicKey) -> Result<Pubkey, ConstructionError> {
    let bytes = hex::decode(&public_key.hex_bytes).map_err(|e| {
        ConstructionError::UnableToParseIntermediateResult(format!("invalid public key hex: {e}"))
    })?;
    Pubkey::try_from(bytes.as_slice()).map_err(|_| {
        ConstructionError::UnableToParseIntermediateResult(format!(
            "public key is {} bytes, expected 32",
            bytes.len()
        ))
    })
}

/// Reads `with_nonce` from request metadata; absent means a recent block hash is used.
fn requested_nonce(metadata: Option<&ObjectMap>) -> Result<Option<WithNonce>, ConstructionError> {
    let Some(value) = metadata.and_then(|m| m.get(WITH_NONCE_KEY)) else {
        return Ok(None);
    };
    let with_nonce: WithNonce =
        serde_json::from_value(value.clone()).map_err(ConstructionError::unparseable)?;
    parse_address(&with_nonce.account, "with_nonce.account")?;
    if let Some(authority) = &with_nonce.authority {
        parse_address(authority, "with_nonce.authority")?;
    }
    Ok(Some(with_nonce))
}

fn block_reference(metadata: &ConstructionMetadata) -> Result<BlockReference, ConstructionError> {
    let hash = Hash::from_str(&metadata.blockhash).map_err(|e| {
        ConstructionError::UnableToParseIntermediateResult(format!(
            "invalid blockhash {}: {e}",
            metadata.blockhash
        ))
    })?;
    let Some(with_nonce) = &metadata.with_nonce else {
        return Ok(BlockReference::Blockhash(hash));
    };
    let authority = with_nonce.authority.as_deref().ok_or_else(|| {
        ConstructionError::UnableToParseIntermediateResult(
            "with_nonce requires `authority`".to_string(),
        )
    })?;
    Ok(BlockReference::Nonce {
        account: parse_address(&with_nonce.account, "with_nonce.account")?,
        authority: parse_address(authority, "with_nonce.authority")?,
        hash,
    })
}

pub struct ConstructionService<P> {
    network: NetworkService,
    provider: Arc<P>,
}

impl<P: SolanaProviderTrait> ConstructionService<P> {
    pub fn new(network: NetworkService, provider: Arc<P>) -> Self {
        Self { network, provider }
    }

    /// Address of a public key: its base58 encoding, no lookup involved.
    pub fn derive(
        &self,
        request: ConstructionDeriveRequest,
    ) -> Result<ConstructionDeriveResponse, ConstructionError> {
        self.network.validate(&request.network_identifier)?;
        let address = public_key_address(&request.public_key)?;
        Ok(ConstructionDeriveResponse {
            account_identifier: AccountIdentifier::new(address.to_string()),
            metadata: None,
        })
    }

    pub fn preprocess(
        &self,
        request: ConstructionPreprocessRequest,
    ) -> Result<ConstructionPreprocessResponse, ConstructionError> {
        self.network.validate(&request.network_identifier)?;
        log::debug!("preprocessing {} operation(s)", request.operations.len());

        let intents = match_operations(&request.operations)?;
        let instructions = compile_intents(&intents, &CompileContext::default())?;
        let with_nonce = requested_nonce(request.metadata.as_ref())?;

        let mut signers: Vec<String> = unique_signers(&instructions)
            .iter()
            .map(Pubkey::to_string)
            .collect();
        if let Some(authority) = with_nonce.as_ref().and_then(|n| n.authority.as_ref()) {
            if !signers.contains(authority) {
                signers.push(authority.clone());
            }
        }

        let options = ConstructionOptions {
            with_nonce,
            signers: signers.clone(),
            spl_token_lookups: token_account_lookups(&intents)?,
        };
        Ok(ConstructionPreprocessResponse {
            options: to_object_map(&options)?,
            required_public_keys: Some(signers.into_iter().map(AccountIdentifier::new).collect()),
        })
    }

    pub async fn metadata(
        &self,
        request: ConstructionMetadataRequest,
    ) -> Result<ConstructionMetadataResponse, ConstructionError> {
        self.network.validate(&request.network_identifier)?;
        self.network.require_online()?;

        let options: ConstructionOptions = from_object_map(&request.options)?;
        let (blockhash, lamports_per_signature, with_nonce) = match &options.with_nonce {
            Some(with_nonce) => {
                let state = self.fetch_nonce(&with_nonce.account).await?;
                let with_nonce = WithNonce {
                    account: with_nonce.account.clone(),
                    authority: Some(state.authority.to_string()),
                };
                (state.hash, state.lamports_per_signature, Some(with_nonce))
            }
            None => {
                let hash = self.provider.get_latest_blockhash().await.map_err(|e| {
                    log::warn!("latest blockhash lookup failed: {e}");
                    ConstructionError::upstream(e)
                })?;
                (hash, self.fetch_lamports_per_signature(&hash).await?, None)
            }
        };

        let mut spl_token_accounts = BTreeMap::new();
        for (index, lookup) in &options.spl_token_lookups {
            let mint = parse_address(&lookup.mint, "mint")?;
            let accounts = SplAccounts {
                source: self.find_token_account(&lookup.source_owner, &mint).await?,
                destination: self.find_token_account(&lookup.destination_owner, &mint).await?,
            };
            spl_token_accounts.insert(*index, accounts);
        }

        let mut signatures = options.signers.len();
        if let Some(authority) = with_nonce.as_ref().and_then(|n| n.authority.as_ref()) {
            if !options.signers.contains(authority) {
                signatures += 1;
            }
        }
        let suggested_fee = lamports_per_signature.saturating_mul(signatures.max(1) as u64);

        let metadata = ConstructionMetadata {
            blockhash: blockhash.to_string(),
            fee_calculator: FeeCalculator {
                lamports_per_signature,
            },
            with_nonce,
            spl_token_accounts,
        };
        Ok(ConstructionMetadataResponse {
            metadata: to_object_map(&metadata)?,
            suggested_fee: vec![Amount::new(suggested_fee.to_string(), Currency::native())],
        })
    }

    pub fn payloads(
        &self,
        request: ConstructionPayloadsRequest,
    ) -> Result<ConstructionPayloadsResponse, ConstructionError> {
        self.network.validate(&request.network_identifier)?;

        let metadata: ConstructionMetadata =
            from_object_map(&request.metadata.unwrap_or_default())?;
        let intents = match_operations(&request.operations)?;
        let ctx = CompileContext::with_spl_accounts(&metadata.spl_token_accounts);
        let instructions = compile_intents(&intents, &ctx)?;

        let transaction = assemble(instructions, &block_reference(&metadata)?)?;
        let payloads = signing_payloads(&transaction);
        log::debug!(
            "built unsigned transaction with {} instruction(s) and {} signer(s)",
            transaction.message.instructions.len(),
            payloads.len()
        );
        Ok(ConstructionPayloadsResponse {
            unsigned_transaction: encode_transaction(&transaction)?,
            payloads,
        })
    }

    pub fn combine(
        &self,
        request: ConstructionCombineRequest,
    ) -> Result<ConstructionCombineResponse, ConstructionError> {
        self.network.validate(&request.network_identifier)?;

        let mut transaction = decode_transaction(&request.unsigned_transaction)?;
        for signature in &request.signatures {
            let signer = public_key_address(&signature.public_key)?;
            let bytes = hex::decode(&signature.hex_bytes).map_err(|e| {
                ConstructionError::SignatureInvalid(format!("invalid signature hex: {e}"))
            })?;
            apply_signature(&mut transaction, &signer, &bytes)?;
        }

        let missing: Vec<String> = required_signers(&transaction.message)
            .iter()
            .zip(&transaction.signatures)
            .filter(|(_, signature)| **signature == Signature::default())
            .map(|(signer, _)| signer.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConstructionError::SignatureInvalid(format!(
                "missing signature for {}",
                missing.join(", ")
            )));
        }

        Ok(ConstructionCombineResponse {
            signed_transaction: encode_transaction(&transaction)?,
        })
    }

    pub fn hash(
        &self,
        request: ConstructionHashRequest,
    ) -> Result<TransactionIdentifierResponse, ConstructionError> {
        self.network.validate(&request.network_identifier)?;
        let transaction = decode_transaction(&request.signed_transaction)?;
        if !transaction.is_signed() {
            return Err(ConstructionError::UnableToParseIntermediateResult(
                "transaction is not fully signed".to_string(),
            ));
        }
        Ok(TransactionIdentifierResponse::new(transaction_hash(
            &transaction,
        )?))
    }

    pub fn parse(
        &self,
        request: ConstructionParseRequest,
    ) -> Result<ConstructionParseResponse, ConstructionError> {
        self.network.validate(&request.network_identifier)?;

        let transaction = decode_transaction(&request.transaction)?;
        let instructions = resolve_instructions(&transaction.message)?;
        let operations = decompile(&instructions, None)?;
        let account_identifier_signers = if request.signed {
            required_signers(&transaction.message)
                .iter()
                .map(|signer| AccountIdentifier::new(signer.to_string()))
                .collect()
        } else {
            Vec::new()
        };

        Ok(ConstructionParseResponse {
            operations,
            account_identifier_signers,
            metadata: None,
        })
    }

    pub async fn submit(
        &self,
        request: ConstructionSubmitRequest,
    ) -> Result<TransactionIdentifierResponse, ConstructionError> {
        self.network.validate(&request.network_identifier)?;
        self.network.require_online()?;

        let transaction = decode_transaction(&request.signed_transaction)?;
        let signature = self
            .provider
            .send_transaction(&transaction)
            .await
            .map_err(|e| {
                log::error!("broadcast rejected: {e}");
                ConstructionError::broadcast(e)
            })?;
        log::info!("submitted transaction {signature}");
        Ok(TransactionIdentifierResponse::new(signature.to_string()))
    }

    async fn fetch_nonce(&self, address: &str) -> Result<NonceState, ConstructionError> {
        let account = self
            .provider
            .get_account_from_str(address)
            .await
            .map_err(|e| {
                log::warn!("nonce account {address} lookup failed: {e}");
                ConstructionError::upstream(e)
            })?;
        decode_nonce_account(address, &account)
    }

    /// Fee the node charges for a single signature at `blockhash`.
    async fn fetch_lamports_per_signature(
        &self,
        blockhash: &Hash,
    ) -> Result<u64, ConstructionError> {
        let message = Message::new_with_blockhash(&[], Some(&Pubkey::default()), blockhash);
        self.provider
            .get_fee_for_message(&message)
            .await
            .map_err(|e| {
                log::warn!("fee lookup failed: {e}");
                ConstructionError::upstream(e)
            })
    }

    /// Best effort: a failed lookup is reported as "no account".
    async fn find_token_account(
        &self,
        owner: &str,
        mint: &Pubkey,
    ) -> Result<Option<String>, ConstructionError> {
        let owner_key = parse_address(owner, "owner")?;
        match self
            .provider
            .get_token_account_by_owner_and_mint(&owner_key, mint)
            .await
        {
            Ok(account) => Ok(account.map(|a| a.to_string())),
            Err(e) => {
                log::warn!("token account lookup for {owner} and {mint} failed: {e}");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::NetworkKind,
        models::{
            CurveType, NetworkIdentifier, Operation, OperationIdentifier,
            Signature as RosettaSignature, SignatureType, SigningPayload, SplTokenLookup,
        },
        services::provider::{MockSolanaProviderTrait, SolanaProviderError},
    };
    use serde_json::json;
    use solana_sdk::{
        nonce::state::{Data as NonceData, DurableNonce},
        signature::{Keypair, Signer},
    };

    fn network() -> NetworkIdentifier {
        NetworkIdentifier {
            blockchain: "solana".to_string(),
            network: "devnet".to_string(),
        }
    }

    fn service(
        provider: MockSolanaProviderTrait,
        offline: bool,
    ) -> ConstructionService<MockSolanaProviderTrait> {
        ConstructionService::new(
            NetworkService::new(NetworkKind::Devnet, offline),
            Arc::new(provider),
        )
    }

    fn transfer(index: i64, kind: &str, address: &str, value: &str, currency: Currency) -> Operation {
        Operation {
            operation_identifier: OperationIdentifier::new(index),
            operation_type: kind.to_string(),
            status: None,
            account: Some(AccountIdentifier::new(address)),
            amount: Some(Amount::new(value, currency)),
            metadata: None,
        }
    }

    fn public_key(keypair: &Keypair) -> PublicKey {
        PublicKey {
            hex_bytes: hex::encode(keypair.pubkey().to_bytes()),
            curve_type: CurveType::Edwards25519,
        }
    }

    fn sign(keypair: &Keypair, payload_hex: &str) -> RosettaSignature {
        let message = hex::decode(payload_hex).unwrap();
        let signature = keypair.sign_message(&message);
        RosettaSignature {
            signing_payload: SigningPayload {
                address: Some(keypair.pubkey().to_string()),
                account_identifier: None,
                hex_bytes: payload_hex.to_string(),
                signature_type: Some(SignatureType::Ed25519),
            },
            public_key: public_key(keypair),
            signature_type: SignatureType::Ed25519,
            hex_bytes: hex::encode(signature.as_ref()),
        }
    }

    fn nonce_account(authority: &Pubkey, blockhash: &Hash) -> (Account, Hash) {
        let data = NonceData::new(*authority, DurableNonce::from_blockhash(blockhash), 5000);
        let stored = data.blockhash();
        let versions = NonceVersions::new(NonceAccountState::Initialized(data));
        let account = Account {
            lamports: 1_447_680,
            data: bincode::serialize(&versions).unwrap(),
            owner: solana_system_interface::program::id(),
            executable: false,
            rent_epoch: 0,
        };
        (account, stored)
    }

    #[test]
    fn test_derive_encodes_public_key() {
        let keypair = Keypair::new();
        let response = service(MockSolanaProviderTrait::new(), true)
            .derive(ConstructionDeriveRequest {
                network_identifier: network(),
                public_key: public_key(&keypair),
                metadata: None,
            })
            .unwrap();
        assert_eq!(
            response.account_identifier.address,
            keypair.pubkey().to_string()
        );
    }

    #[test]
    fn test_derive_rejects_short_key() {
        let result = service(MockSolanaProviderTrait::new(), true).derive(
            ConstructionDeriveRequest {
                network_identifier: network(),
                public_key: PublicKey {
                    hex_bytes: "abcd".to_string(),
                    curve_type: CurveType::Edwards25519,
                },
                metadata: None,
            },
        );
        assert!(matches!(
            result,
            Err(ConstructionError::UnableToParseIntermediateResult(_))
        ));
    }

    #[test]
    fn test_wrong_network_is_rejected() {
        let mut identifier = network();
        identifier.network = "mainnet".to_string();
        let result = service(MockSolanaProviderTrait::new(), true).preprocess(
            ConstructionPreprocessRequest {
                network_identifier: identifier,
                operations: vec![],
                metadata: None,
            },
        );
        assert!(matches!(result, Err(ConstructionError::InvalidNetwork(_))));
    }

    #[tokio::test]
    async fn test_offline_gating_makes_no_calls() {
        // No expectations: any provider call would panic the mock.
        let service = service(MockSolanaProviderTrait::new(), true);

        let metadata = service
            .metadata(ConstructionMetadataRequest {
                network_identifier: network(),
                options: ObjectMap::new(),
                public_keys: None,
            })
            .await;
        assert_eq!(metadata, Err(ConstructionError::UnavailableOffline));

        let submit = service
            .submit(ConstructionSubmitRequest {
                network_identifier: network(),
                signed_transaction: "not even base58 0OIl".to_string(),
            })
            .await;
        assert_eq!(submit, Err(ConstructionError::UnavailableOffline));
    }

    #[tokio::test]
    async fn test_native_transfer_round_trip() {
        let (sender, recipient) = (Keypair::new(), Keypair::new());
        let (a, b) = (sender.pubkey().to_string(), recipient.pubkey().to_string());
        let operations = vec![
            transfer(0, "System__Transfer", &a, "-1", Currency::native()),
            transfer(1, "System__Transfer", &b, "1", Currency::native()),
        ];
        let blockhash = Hash::new_unique();

        let mut provider = MockSolanaProviderTrait::new();
        provider
            .expect_get_latest_blockhash()
            .times(1)
            .returning(move || Box::pin(async move { Ok(blockhash) }));
        provider
            .expect_get_fee_for_message()
            .times(1)
            .returning(|_| Box::pin(async { Ok(5000) }));
        let signature_slot = std::sync::Arc::new(std::sync::Mutex::new(None));
        let submitted = signature_slot.clone();
        provider
            .expect_send_transaction()
            .times(1)
            .returning(move |tx| {
                let signature = tx.signatures[0];
                *submitted.lock().unwrap() = Some(signature);
                Box::pin(async move { Ok(signature) })
            });
        let service = service(provider, false);

        let preprocess = service
            .preprocess(ConstructionPreprocessRequest {
                network_identifier: network(),
                operations: operations.clone(),
                metadata: None,
            })
            .unwrap();
        assert_eq!(preprocess.options["signers"], json!([a.clone()]));
        assert!(preprocess.options.get("with_nonce").is_none());

        let metadata = service
            .metadata(ConstructionMetadataRequest {
                network_identifier: network(),
                options: preprocess.options,
                public_keys: None,
            })
            .await
            .unwrap();
        assert_eq!(metadata.suggested_fee[0].value, "5000");
        assert_eq!(metadata.metadata["blockhash"], json!(blockhash.to_string()));

        let payloads = service
            .payloads(ConstructionPayloadsRequest {
                network_identifier: network(),
                operations: operations.clone(),
                metadata: Some(metadata.metadata),
                public_keys: None,
            })
            .unwrap();
        assert_eq!(payloads.payloads.len(), 1);
        assert_eq!(payloads.payloads[0].address.as_deref(), Some(a.as_str()));

        let parsed = service
            .parse(ConstructionParseRequest {
                network_identifier: network(),
                signed: false,
                transaction: payloads.unsigned_transaction.clone(),
            })
            .unwrap();
        assert_eq!(parsed.operations, operations);
        assert!(parsed.account_identifier_signers.is_empty());

        let signature = sign(&sender, &payloads.payloads[0].hex_bytes);
        let combined = service
            .combine(ConstructionCombineRequest {
                network_identifier: network(),
                unsigned_transaction: payloads.unsigned_transaction,
                signatures: vec![signature.clone()],
            })
            .unwrap();

        let expected_hash = sender
            .sign_message(&hex::decode(&payloads.payloads[0].hex_bytes).unwrap())
            .to_string();
        let hash = service
            .hash(ConstructionHashRequest {
                network_identifier: network(),
                signed_transaction: combined.signed_transaction.clone(),
            })
            .unwrap();
        assert_eq!(hash.transaction_identifier.hash, expected_hash);

        let parsed_signed = service
            .parse(ConstructionParseRequest {
                network_identifier: network(),
                signed: true,
                transaction: combined.signed_transaction.clone(),
            })
            .unwrap();
        assert_eq!(
            parsed_signed.account_identifier_signers,
            vec![AccountIdentifier::new(a)]
        );

        let submitted = service
            .submit(ConstructionSubmitRequest {
                network_identifier: network(),
                signed_transaction: combined.signed_transaction,
            })
            .await
            .unwrap();
        assert_eq!(submitted.transaction_identifier.hash, expected_hash);
        assert!(signature_slot.lock().unwrap().is_some());
    }

    #[test]
    fn test_combine_in_any_order() {
        let (first, second) = (Keypair::new(), Keypair::new());
        let sink = Pubkey::new_unique().to_string();
        let (a, b) = (first.pubkey().to_string(), second.pubkey().to_string());
        let operations = vec![
            transfer(0, "System__Transfer", &a, "-1", Currency::native()),
            transfer(1, "System__Transfer", &sink, "1", Currency::native()),
            transfer(2, "System__Transfer", &b, "-2", Currency::native()),
            transfer(3, "System__Transfer", &sink, "2", Currency::native()),
        ];
        let metadata = to_object_map(&ConstructionMetadata {
            blockhash: Hash::new_unique().to_string(),
            ..Default::default()
        })
        .unwrap();
        let service = service(MockSolanaProviderTrait::new(), true);

        let payloads = service
            .payloads(ConstructionPayloadsRequest {
                network_identifier: network(),
                operations,
                metadata: Some(metadata),
                public_keys: None,
            })
            .unwrap();
        assert_eq!(payloads.payloads.len(), 2);
        assert_eq!(payloads.payloads[0].hex_bytes, payloads.payloads[1].hex_bytes);

        let message = &payloads.payloads[0].hex_bytes;
        let combined = service
            .combine(ConstructionCombineRequest {
                network_identifier: network(),
                unsigned_transaction: payloads.unsigned_transaction,
                signatures: vec![sign(&second, message), sign(&first, message)],
            })
            .unwrap();

        let transaction = decode_transaction(&combined.signed_transaction).unwrap();
        let message_bytes = hex::decode(message).unwrap();
        assert_eq!(transaction.signatures[0], first.sign_message(&message_bytes));
        assert_eq!(transaction.signatures[1], second.sign_message(&message_bytes));
    }

    #[test]
    fn test_combine_rejects_missing_and_foreign_signatures() {
        let (payer, stranger) = (Keypair::new(), Keypair::new());
        let a = payer.pubkey().to_string();
        let operations = vec![
            transfer(0, "System__Transfer", &a, "-1", Currency::native()),
            transfer(1, "System__Transfer", &Pubkey::new_unique().to_string(), "1", Currency::native()),
        ];
        let metadata = to_object_map(&ConstructionMetadata {
            blockhash: Hash::new_unique().to_string(),
            ..Default::default()
        })
        .unwrap();
        let service = service(MockSolanaProviderTrait::new(), true);
        let payloads = service
            .payloads(ConstructionPayloadsRequest {
                network_identifier: network(),
                operations,
                metadata: Some(metadata),
                public_keys: None,
            })
            .unwrap();

        let missing = service.combine(ConstructionCombineRequest {
            network_identifier: network(),
            unsigned_transaction: payloads.unsigned_transaction.clone(),
            signatures: vec![],
        });
        assert!(matches!(missing, Err(ConstructionError::SignatureInvalid(_))));

        let foreign = service.combine(ConstructionCombineRequest {
            network_identifier: network(),
            unsigned_transaction: payloads.unsigned_transaction,
            signatures: vec![sign(&stranger, &payloads.payloads[0].hex_bytes)],
        });
        assert!(matches!(
            foreign,
            Err(ConstructionError::UnableToParseIntermediateResult(_))
        ));
    }

    #[test]
    fn test_hash_requires_signature() {
        let a = Pubkey::new_unique().to_string();
        let operations = vec![
            transfer(0, "System__Transfer", &a, "-1", Currency::native()),
            transfer(1, "System__Transfer", &Pubkey::new_unique().to_string(), "1", Currency::native()),
        ];
        let metadata = to_object_map(&ConstructionMetadata {
            blockhash: Hash::new_unique().to_string(),
            ..Default::default()
        })
        .unwrap();
        let service = service(MockSolanaProviderTrait::new(), true);
        let payloads = service
            .payloads(ConstructionPayloadsRequest {
                network_identifier: network(),
                operations,
                metadata: Some(metadata),
                public_keys: None,
            })
            .unwrap();

        let result = service.hash(ConstructionHashRequest {
            network_identifier: network(),
            signed_transaction: payloads.unsigned_transaction,
        });
        assert!(matches!(
            result,
            Err(ConstructionError::UnableToParseIntermediateResult(_))
        ));
    }

    #[test]
    fn test_payloads_without_metadata_is_unparseable() {
        let a = Pubkey::new_unique().to_string();
        let result = service(MockSolanaProviderTrait::new(), true).payloads(
            ConstructionPayloadsRequest {
                network_identifier: network(),
                operations: vec![
                    transfer(0, "System__Transfer", &a, "-1", Currency::native()),
                    transfer(1, "System__Transfer", &a, "1", Currency::native()),
                ],
                metadata: None,
                public_keys: None,
            },
        );
        assert!(matches!(
            result,
            Err(ConstructionError::UnableToParseIntermediateResult(_))
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let result = service(MockSolanaProviderTrait::new(), true).parse(ConstructionParseRequest {
            network_identifier: network(),
            signed: false,
            transaction: bs58::encode([1u8, 2, 3]).into_string(),
        });
        assert!(matches!(
            result,
            Err(ConstructionError::UnableToParseIntermediateResult(_))
        ));
    }

    #[tokio::test]
    async fn test_durable_nonce_flow() {
        let payer = Keypair::new();
        let (a, b) = (payer.pubkey().to_string(), Pubkey::new_unique().to_string());
        let nonce = Pubkey::new_unique();
        let (account, stored_hash) = nonce_account(&payer.pubkey(), &Hash::new_unique());
        let operations = vec![
            transfer(0, "System__Transfer", &a, "-10", Currency::native()),
            transfer(1, "System__Transfer", &b, "10", Currency::native()),
        ];

        let mut provider = MockSolanaProviderTrait::new();
        let expected_nonce = nonce.to_string();
        provider
            .expect_get_account_from_str()
            .withf(move |address| address.to_string() == expected_nonce)
            .times(1)
            .returning(move |_| {
                let account = account.clone();
                Box::pin(async move { Ok(account) })
            });
        provider.expect_get_latest_blockhash().never();
        let service = service(provider, false);

        let request_metadata = json!({"with_nonce": {"account": nonce.to_string()}});
        let preprocess = service
            .preprocess(ConstructionPreprocessRequest {
                network_identifier: network(),
                operations: operations.clone(),
                metadata: request_metadata.as_object().cloned(),
            })
            .unwrap();
        assert_eq!(
            preprocess.options["with_nonce"]["account"],
            json!(nonce.to_string())
        );

        let metadata = service
            .metadata(ConstructionMetadataRequest {
                network_identifier: network(),
                options: preprocess.options,
                public_keys: None,
            })
            .await
            .unwrap();
        assert_eq!(metadata.metadata["blockhash"], json!(stored_hash.to_string()));
        assert_eq!(metadata.metadata["with_nonce"]["authority"], json!(a.clone()));
        assert_eq!(metadata.suggested_fee[0].value, "5000");

        let payloads = service
            .payloads(ConstructionPayloadsRequest {
                network_identifier: network(),
                operations,
                metadata: Some(metadata.metadata),
                public_keys: None,
            })
            .unwrap();
        let transaction = decode_transaction(&payloads.unsigned_transaction).unwrap();
        assert_eq!(transaction.message.recent_blockhash, stored_hash);

        let parsed = service
            .parse(ConstructionParseRequest {
                network_identifier: network(),
                signed: false,
                transaction: payloads.unsigned_transaction,
            })
            .unwrap();
        let types: Vec<&str> = parsed
            .operations
            .iter()
            .map(|op| op.operation_type.as_str())
            .collect();
        assert_eq!(
            types,
            vec!["System__AdvanceNonce", "System__Transfer", "System__Transfer"]
        );
        assert_eq!(parsed.operations[1].address(), Some(a.as_str()));
    }

    #[tokio::test]
    async fn test_uninitialized_nonce_is_unparseable() {
        let account = Account {
            lamports: 1,
            data: bincode::serialize(&NonceVersions::new(NonceAccountState::Uninitialized))
                .unwrap(),
            owner: solana_system_interface::program::id(),
            executable: false,
            rent_epoch: 0,
        };
        let mut provider = MockSolanaProviderTrait::new();
        provider.expect_get_account_from_str().returning(move |_| {
            let account = account.clone();
            Box::pin(async move { Ok(account) })
        });

        let options = to_object_map(&ConstructionOptions {
            with_nonce: Some(WithNonce {
                account: Pubkey::new_unique().to_string(),
                authority: None,
            }),
            ..Default::default()
        })
        .unwrap();
        let result = service(provider, false)
            .metadata(ConstructionMetadataRequest {
                network_identifier: network(),
                options,
                public_keys: None,
            })
            .await;
        assert!(matches!(
            result,
            Err(ConstructionError::UnableToParseIntermediateResult(_))
        ));
    }

    #[tokio::test]
    async fn test_metadata_upstream_failure() {
        let mut provider = MockSolanaProviderTrait::new();
        provider.expect_get_latest_blockhash().returning(|| {
            Box::pin(async { Err(SolanaProviderError::NetworkError("timeout".to_string())) })
        });

        let result = service(provider, false)
            .metadata(ConstructionMetadataRequest {
                network_identifier: network(),
                options: ObjectMap::new(),
                public_keys: None,
            })
            .await;
        match result {
            Err(error @ ConstructionError::UpstreamRpc { .. }) => assert!(error.is_retriable()),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_rejection_is_broadcast_failure() {
        let payer = Keypair::new();
        let a = payer.pubkey().to_string();
        let operations = vec![
            transfer(0, "System__Transfer", &a, "-1", Currency::native()),
            transfer(1, "System__Transfer", &Pubkey::new_unique().to_string(), "1", Currency::native()),
        ];
        let metadata = to_object_map(&ConstructionMetadata {
            blockhash: Hash::new_unique().to_string(),
            ..Default::default()
        })
        .unwrap();

        let mut provider = MockSolanaProviderTrait::new();
        provider.expect_send_transaction().returning(|_| {
            Box::pin(async {
                Err(SolanaProviderError::BlockhashNotFound("expired".to_string()))
            })
        });
        let service = service(provider, false);

        let payloads = service
            .payloads(ConstructionPayloadsRequest {
                network_identifier: network(),
                operations,
                metadata: Some(metadata),
                public_keys: None,
            })
            .unwrap();
        let combined = service
            .combine(ConstructionCombineRequest {
                network_identifier: network(),
                unsigned_transaction: payloads.unsigned_transaction,
                signatures: vec![sign(&payer, &payloads.payloads[0].hex_bytes)],
            })
            .unwrap();

        let result = service
            .submit(ConstructionSubmitRequest {
                network_identifier: network(),
                signed_transaction: combined.signed_transaction,
            })
            .await;
        assert!(matches!(
            result,
            Err(ConstructionError::BroadcastFailed {
                retriable: true,
                ..
            })
        ));
    }

    /// Builds the unsigned transaction for `operations` and parses it back.
    fn payloads_then_parse(operations: Vec<Operation>) -> Vec<Operation> {
        let service = service(MockSolanaProviderTrait::new(), true);
        let metadata = to_object_map(&ConstructionMetadata {
            blockhash: Hash::new_unique().to_string(),
            ..Default::default()
        })
        .unwrap();
        let payloads = service
            .payloads(ConstructionPayloadsRequest {
                network_identifier: network(),
                operations,
                metadata: Some(metadata),
                public_keys: None,
            })
            .unwrap();
        service
            .parse(ConstructionParseRequest {
                network_identifier: network(),
                signed: false,
                transaction: payloads.unsigned_transaction,
            })
            .unwrap()
            .operations
    }

    fn assert_same_legs(expected: &[Operation], parsed: &[Operation]) {
        assert_eq!(parsed.len(), expected.len());
        for (want, got) in expected.iter().zip(parsed) {
            assert_eq!(got.operation_type, want.operation_type);
            assert_eq!(got.index(), want.index());
            assert_eq!(got.address(), want.address());
            assert_eq!(got.amount, want.amount);
        }
    }

    #[test]
    fn test_transfer_checked_round_trip() {
        let owner = Pubkey::new_unique();
        let (source, destination, mint) =
            (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let currency = Currency::new(mint.to_string(), 6);
        let mut debit = transfer(
            0,
            "SplToken__TransferChecked",
            &source.to_string(),
            "-75",
            currency.clone(),
        );
        debit.metadata = json!({"authority": owner.to_string()}).as_object().cloned();
        let operations = vec![
            debit,
            transfer(
                1,
                "SplToken__TransferChecked",
                &destination.to_string(),
                "75",
                currency,
            ),
        ];

        let parsed = payloads_then_parse(operations.clone());
        assert_same_legs(&operations, &parsed);
        let metadata = parsed[0].metadata.as_ref().unwrap();
        assert_eq!(metadata["authority"], json!(owner.to_string()));
        assert_eq!(metadata["mint"], json!(mint.to_string()));
        assert_eq!(metadata["decimals"], json!(6));
    }

    #[test]
    fn test_associated_account_creation_round_trip() {
        let (payer, wallet, mint) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let operations = vec![Operation {
            operation_identifier: OperationIdentifier::new(0),
            operation_type: "SplAssociatedTokenAccount__Create".to_string(),
            status: None,
            account: Some(AccountIdentifier::new(payer.to_string())),
            amount: None,
            metadata: json!({"wallet": wallet.to_string(), "mint": mint.to_string()})
                .as_object()
                .cloned(),
        }];

        let parsed = payloads_then_parse(operations.clone());
        assert_same_legs(&operations, &parsed);
        let metadata = parsed[0].metadata.as_ref().unwrap();
        assert_eq!(metadata["wallet"], json!(wallet.to_string()));
        assert_eq!(metadata["mint"], json!(mint.to_string()));
        assert_eq!(
            metadata["account"],
            json!(
                spl_associated_token_account::get_associated_token_address(&wallet, &mint)
                    .to_string()
            )
        );
    }

    #[test]
    fn test_credit_first_parses_in_canonical_order() {
        let (a, b) = (Pubkey::new_unique().to_string(), Pubkey::new_unique().to_string());
        let credit_first = vec![
            transfer(0, "System__Transfer", &b, "3", Currency::native()),
            transfer(1, "System__Transfer", &a, "-3", Currency::native()),
        ];

        let parsed = payloads_then_parse(credit_first);
        let canonical = vec![
            transfer(0, "System__Transfer", &a, "-3", Currency::native()),
            transfer(1, "System__Transfer", &b, "3", Currency::native()),
        ];
        assert_eq!(parsed, canonical);
    }

    #[tokio::test]
    async fn test_token_transfer_with_system_accounts() {
        let (owner, recipient, mint) = (Keypair::new(), Pubkey::new_unique(), Pubkey::new_unique());
        let owner_key = owner.pubkey();
        let source_token = Pubkey::new_unique();
        let currency = Currency::new(mint.to_string(), 6);
        let operations = vec![
            transfer(
                0,
                "SplToken__TransferWithSystem",
                &owner_key.to_string(),
                "-250",
                currency.clone(),
            ),
            transfer(
                1,
                "SplToken__TransferWithSystem",
                &recipient.to_string(),
                "250",
                currency,
            ),
        ];

        let mut provider = MockSolanaProviderTrait::new();
        provider
            .expect_get_latest_blockhash()
            .returning(|| Box::pin(async { Ok(Hash::new_unique()) }));
        provider
            .expect_get_fee_for_message()
            .returning(|_| Box::pin(async { Ok(5000) }));
        provider
            .expect_get_token_account_by_owner_and_mint()
            .withf(move |wallet, _| *wallet == owner_key)
            .returning(move |_, _| Box::pin(async move { Ok(Some(source_token)) }));
        provider
            .expect_get_token_account_by_owner_and_mint()
            .withf(move |wallet, _| *wallet == recipient)
            .returning(|_, _| {
                Box::pin(async {
                    Err(SolanaProviderError::RpcError("account index missing".to_string()))
                })
            });
        let service = service(provider, false);

        let preprocess = service
            .preprocess(ConstructionPreprocessRequest {
                network_identifier: network(),
                operations: operations.clone(),
                metadata: None,
            })
            .unwrap();
        let lookups: BTreeMap<i64, SplTokenLookup> =
            serde_json::from_value(preprocess.options["spl_token_lookups"].clone()).unwrap();
        assert_eq!(lookups[&0].destination_owner, recipient.to_string());

        let metadata = service
            .metadata(ConstructionMetadataRequest {
                network_identifier: network(),
                options: preprocess.options,
                public_keys: None,
            })
            .await
            .unwrap();
        assert_eq!(
            metadata.metadata["spl_token_accounts"]["0"]["source"],
            json!(source_token.to_string())
        );
        assert!(metadata.metadata["spl_token_accounts"]["0"]
            .get("destination")
            .is_none());

        let payloads = service
            .payloads(ConstructionPayloadsRequest {
                network_identifier: network(),
                operations,
                metadata: Some(metadata.metadata),
                public_keys: None,
            })
            .unwrap();
        assert_eq!(payloads.payloads.len(), 1);

        let parsed = service
            .parse(ConstructionParseRequest {
                network_identifier: network(),
                signed: false,
                transaction: payloads.unsigned_transaction,
            })
            .unwrap();
        let types: Vec<&str> = parsed
            .operations
            .iter()
            .map(|op| op.operation_type.as_str())
            .collect();
        assert_eq!(
            types,
            vec![
                "SplAssociatedTokenAccount__Create",
                "SplToken__TransferChecked",
                "SplToken__TransferChecked"
            ]
        );
        let create = &parsed.operations[0];
        assert_eq!(create.index(), 0);
        assert_eq!(create.address(), Some(owner_key.to_string().as_str()));
        assert_eq!(
            create.metadata.as_ref().unwrap()["wallet"],
            json!(recipient.to_string())
        );

        let debit = &parsed.operations[1];
        assert_eq!(debit.index(), 1);
        assert_eq!(debit.address(), Some(source_token.to_string().as_str()));
        assert_eq!(
            debit.amount,
            Some(Amount::new("-250", Currency::new(mint.to_string(), 6)))
        );
        assert_eq!(
            debit.metadata.as_ref().unwrap()["authority"],
            json!(owner_key.to_string())
        );

        let credit = &parsed.operations[2];
        assert_eq!(credit.index(), 2);
        assert_eq!(credit.amount.as_ref().unwrap().value, "250");
        assert_eq!(credit.amount.as_ref().unwrap().currency.symbol, mint.to_string());
        assert_eq!(
            credit.address(),
            Some(
                spl_associated_token_account::get_associated_token_address(&recipient, &mint)
                    .to_string()
                    .as_str()
            )
        );
    }
}
