//! Message assembly, wire encoding and signature placement.

use bincode::Options;
use solana_sdk::{
    hash::Hash,
    instruction::{CompiledInstruction, Instruction},
    message::Message,
    pubkey::Pubkey,
    sanitize::Sanitize,
    signature::Signature,
    transaction::Transaction,
};

use super::unique_signers;
use crate::{
    constants::SIGNATURE_LENGTH,
    domain::instructions::RawInstruction,
    models::{AccountIdentifier, ConstructionError, SignatureType, SigningPayload},
};

/// What the message uses as its recent block hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReference {
    Blockhash(Hash),
    /// A durable nonce: the stored hash is used and the nonce is advanced first.
    Nonce {
        account: Pubkey,
        authority: Pubkey,
        hash: Hash,
    },
}

/// Builds an unsigned transaction paying fees from the first signer of `instructions`.
pub fn assemble(
    instructions: Vec<Instruction>,
    reference: &BlockReference,
) -> Result<Transaction, ConstructionError> {
    let fee_payer = unique_signers(&instructions).first().copied().ok_or_else(|| {
        ConstructionError::UnableToParseIntermediateResult(
            "operations require no signer to pay fees".to_string(),
        )
    })?;

    let message = match reference {
        BlockReference::Blockhash(hash) => {
            Message::new_with_blockhash(&instructions, Some(&fee_payer), hash)
        }
        BlockReference::Nonce {
            account,
            authority,
            hash,
        } => {
            let mut message =
                Message::new_with_nonce(instructions, Some(&fee_payer), account, authority);
            message.recent_blockhash = *hash;
            message
        }
    };
    Ok(Transaction::new_unsigned(message))
}

/// One payload per required signer; every payload carries the same message bytes.
pub fn signing_payloads(transaction: &Transaction) -> Vec<SigningPayload> {
    let message_bytes = hex::encode(transaction.message_data());
    required_signers(&transaction.message)
        .iter()
        .map(|signer| {
            let address = signer.to_string();
            SigningPayload {
                address: Some(address.clone()),
                account_identifier: Some(AccountIdentifier::new(address)),
                hex_bytes: message_bytes.clone(),
                signature_type: Some(SignatureType::Ed25519),
            }
        })
        .collect()
}

pub fn required_signers(message: &Message) -> &[Pubkey] {
    let required = usize::from(message.header.num_required_signatures);
    &message.account_keys[..required.min(message.account_keys.len())]
}

/// Slot of `signer` among the message's required signers.
pub fn signer_position(message: &Message, signer: &Pubkey) -> Result<usize, ConstructionError> {
    let required = usize::from(message.header.num_required_signatures);
    if message.account_keys.len() < required {
        return Err(ConstructionError::UnableToParseIntermediateResult(format!(
            "message lists {} accounts but requires {required} signatures",
            message.account_keys.len()
        )));
    }
    message.account_keys[..required]
        .iter()
        .position(|key| key == signer)
        .ok_or_else(|| {
            ConstructionError::UnableToParseIntermediateResult(format!(
                "{signer} is not a required signer"
            ))
        })
}

/// Places a signature in the slot of `signer` after checking it against the message.
/// Keys outside the required signers are rejected before the signature is looked at.
pub fn apply_signature(
    transaction: &mut Transaction,
    signer: &Pubkey,
    signature_bytes: &[u8],
) -> Result<(), ConstructionError> {
    let position = signer_position(&transaction.message, signer)?;
    if signature_bytes.len() != SIGNATURE_LENGTH {
        return Err(ConstructionError::SignatureInvalid(format!(
            "signature of {signer} is {} bytes, expected {SIGNATURE_LENGTH}",
            signature_bytes.len()
        )));
    }
    let signature = Signature::try_from(signature_bytes)
        .map_err(|e| ConstructionError::SignatureInvalid(e.to_string()))?;
    if !signature.verify(signer.as_ref(), &transaction.message_data()) {
        return Err(ConstructionError::SignatureInvalid(format!(
            "signature does not verify for {signer}"
        )));
    }

    let required = usize::from(transaction.message.header.num_required_signatures);
    if transaction.signatures.len() != required {
        transaction.signatures.resize(required, Signature::default());
    }
    transaction.signatures[position] = signature;
    Ok(())
}

/// Base58 of the bincode wire format.
pub fn encode_transaction(transaction: &Transaction) -> Result<String, ConstructionError> {
    let bytes = bincode::serialize(transaction)
        .map_err(|e| ConstructionError::SignatureInvalid(format!("serialize: {e}")))?;
    Ok(bs58::encode(bytes).into_string())
}

pub fn decode_transaction(encoded: &str) -> Result<Transaction, ConstructionError> {
    let bytes = bs58::decode(encoded).into_vec().map_err(|e| {
        ConstructionError::UnableToParseIntermediateResult(format!("invalid base58: {e}"))
    })?;
    // Same layout as `bincode::serialize`, but the whole input must be consumed.
    let transaction: Transaction = bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
        .deserialize(&bytes)
        .map_err(|e| {
            ConstructionError::UnableToParseIntermediateResult(format!("invalid transaction: {e}"))
        })?;
    Sanitize::sanitize(&transaction).map_err(|e| {
        ConstructionError::UnableToParseIntermediateResult(format!("malformed transaction: {e}"))
    })?;
    Ok(transaction)
}

/// Identifier of a transaction: base58 of its first signature.
pub fn transaction_hash(transaction: &Transaction) -> Result<String, ConstructionError> {
    transaction
        .signatures
        .first()
        .map(|signature| signature.to_string())
        .ok_or_else(|| {
            ConstructionError::UnableToParseIntermediateResult(
                "transaction carries no signature".to_string(),
            )
        })
}

/// Instructions with account indexes resolved to keys.
pub fn resolve_instructions(message: &Message) -> Result<Vec<RawInstruction>, ConstructionError> {
    resolve_compiled(&message.account_keys, &message.instructions)
}

/// Resolves compiled instructions against a full account key list.
pub fn resolve_compiled(
    account_keys: &[Pubkey],
    instructions: &[CompiledInstruction],
) -> Result<Vec<RawInstruction>, ConstructionError> {
    let key = |index: u8| {
        account_keys
            .get(usize::from(index))
            .copied()
            .ok_or_else(|| {
                ConstructionError::UnableToParseIntermediateResult(format!(
                    "account index {index} out of range"
                ))
            })
    };
    instructions
        .iter()
        .map(|compiled| {
            Ok(RawInstruction {
                program_id: key(compiled.program_id_index)?,
                accounts: compiled
                    .accounts
                    .iter()
                    .map(|index| key(*index))
                    .collect::<Result<_, _>>()?,
                data: compiled.data.clone(),
            })
        })
        .collect()
}
