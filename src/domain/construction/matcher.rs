//! Pairs debit and credit operations into single intents.

use std::collections::HashSet;

use crate::{
    domain::instructions::{OperationIntent, OperationType},
    models::{Amount, ConstructionError, Operation},
};

/// Splits a signed decimal amount into its sign and base-unit magnitude.
///
/// Returns `(true, n)` for a debit (`-n`) and `(false, n)` otherwise.
pub fn parse_amount(value: &str) -> Result<(bool, u64), ConstructionError> {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    // `u64::from_str` would also take a leading `+`.
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConstructionError::UnableToParseIntermediateResult(format!(
            "invalid amount {value}: expected an optional `-` followed by digits"
        )));
    }
    let magnitude = digits.parse::<u64>().map_err(|e| {
        ConstructionError::UnableToParseIntermediateResult(format!(
            "invalid amount {value}: {e}"
        ))
    })?;
    Ok((negative, magnitude))
}

/// Renders a base-unit magnitude as a signed decimal amount.
pub fn format_amount(negative: bool, magnitude: u64) -> String {
    if negative {
        format!("-{magnitude}")
    } else {
        magnitude.to_string()
    }
}

struct Leg<'a> {
    operation: &'a Operation,
    amount: &'a Amount,
    negative: bool,
    magnitude: u64,
}

impl<'a> Leg<'a> {
    fn of(operation: &'a Operation) -> Result<Option<Self>, ConstructionError> {
        let Some(amount) = operation.amount.as_ref() else {
            return Ok(None);
        };
        let (negative, magnitude) = parse_amount(&amount.value)?;
        Ok(Some(Self {
            operation,
            amount,
            negative,
            magnitude,
        }))
    }

    fn pairs_with(&self, other: &Leg) -> bool {
        self.operation.operation_type == other.operation.operation_type
            && self.amount.currency.symbol == other.amount.currency.symbol
            && self.magnitude == other.magnitude
            && self.negative != other.negative
    }

    fn address(&self) -> Result<String, ConstructionError> {
        self.operation.address().map(str::to_string).ok_or_else(|| {
            ConstructionError::UnclearIntent(format!(
                "operation {} has an amount but no account",
                self.operation.index()
            ))
        })
    }
}

/// Resolves the operation list into intents, in list order.
///
/// An operation carrying an amount is paired with the first unclaimed
/// operation of the same type and currency whose amount has the same
/// magnitude and the opposite sign. The intent takes the debit leg's index,
/// so a credit listed before its debit decodes back debit first.
/// Operations without an amount become single-leg intents.
pub fn match_operations(
    operations: &[Operation],
) -> Result<Vec<OperationIntent>, ConstructionError> {
    let legs = operations
        .iter()
        .map(Leg::of)
        .collect::<Result<Vec<_>, _>>()?;
    let mut claimed = HashSet::new();
    let mut intents = Vec::new();

    for (position, operation) in operations.iter().enumerate() {
        if !claimed.insert(position) {
            continue;
        }
        let operation_type = OperationType::parse(&operation.operation_type)?;
        let metadata = operation.metadata.clone().unwrap_or_default();

        let Some(leg) = &legs[position] else {
            intents.push(OperationIntent {
                index: operation.index(),
                operation_type,
                source: operation.address().map(str::to_string),
                destination: None,
                amount: None,
                currency: None,
                metadata,
            });
            continue;
        };

        let counterpart = legs.iter().enumerate().find_map(|(other, candidate)| {
            candidate
                .as_ref()
                .filter(|c| !claimed.contains(&other) && leg.pairs_with(c))
                .map(|c| (other, c))
        });
        let Some((other, counterpart)) = counterpart else {
            return Err(ConstructionError::UnclearIntent(format!(
                "no counterpart for operation {} ({} {})",
                operation.index(),
                operation.operation_type,
                leg.amount.value
            )));
        };
        claimed.insert(other);

        let (debit, credit) = if leg.negative {
            (leg, counterpart)
        } else {
            (counterpart, leg)
        };
        let mut metadata = metadata;
        if let Some(extra) = &counterpart.operation.metadata {
            for (key, value) in extra {
                metadata.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        intents.push(OperationIntent {
            index: debit.operation.index(),
            operation_type,
            source: Some(debit.address()?),
            destination: Some(credit.address()?),
            amount: Some(debit.magnitude),
            currency: Some(debit.amount.currency.clone()),
            metadata,
        });
    }

    Ok(intents)
}
