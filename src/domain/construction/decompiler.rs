//! Turns decoded instructions back into operations.

use super::format_amount;
use crate::{
    domain::instructions::{decode_instruction, RawInstruction},
    models::{
        AccountIdentifier, Amount, ConstructionError, ObjectMap, Operation, OperationIdentifier,
    },
};

/// Keys already carried by an operation's account and amount.
const LEG_FIELDS: [&str; 4] = ["source", "destination", "amount", "lamports"];

/// Operations for `instructions`, indexed from zero in instruction order.
///
/// Balance-changing instructions become a debit followed by a credit; all
/// others become one operation whose account is the decoded `source`.
pub fn decompile(
    instructions: &[RawInstruction],
    status: Option<&str>,
) -> Result<Vec<Operation>, ConstructionError> {
    let mut operations = Vec::with_capacity(instructions.len());
    let mut next_index = 0i64;
    let mut push = |operations: &mut Vec<Operation>,
                    operation_type: String,
                    account: Option<String>,
                    amount: Option<Amount>,
                    metadata: ObjectMap| {
        operations.push(Operation {
            operation_identifier: OperationIdentifier::new(next_index),
            operation_type,
            status: status.map(str::to_string),
            account: account.map(AccountIdentifier::new),
            amount,
            metadata: (!metadata.is_empty()).then_some(metadata),
        });
        next_index += 1;
    };

    for raw in instructions {
        let decoded = decode_instruction(raw);
        let operation_type = decoded.operation_type.to_string();
        let mut metadata = decoded.metadata.to_object_map()?;

        let change = decoded
            .operation_type
            .is_balance_changing()
            .then(|| decoded.metadata.balance_change())
            .flatten();

        match change {
            Some(change) => {
                for field in LEG_FIELDS {
                    metadata.remove(field);
                }
                push(
                    &mut operations,
                    operation_type.clone(),
                    Some(change.source),
                    Some(Amount::new(
                        format_amount(true, change.amount),
                        change.currency.clone(),
                    )),
                    metadata.clone(),
                );
                push(
                    &mut operations,
                    operation_type,
                    Some(change.destination),
                    Some(Amount::new(format_amount(false, change.amount), change.currency)),
                    metadata,
                );
            }
            None => {
                let account = match metadata.remove("source") {
                    Some(serde_json::Value::String(source)) => Some(source),
                    _ => None,
                };
                push(&mut operations, operation_type, account, None, metadata);
            }
        }
    }

    Ok(operations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Currency;
    use serde_json::json;
    use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
    use solana_system_interface::instruction as system_instruction;

    fn raw_of(instruction: &Instruction) -> RawInstruction {
        RawInstruction {
            program_id: instruction.program_id,
            accounts: instruction.accounts.iter().map(|a| a.pubkey).collect(),
            data: instruction.data.clone(),
        }
    }

    #[test]
    fn test_transfer_becomes_debit_then_credit() {
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let operations =
            decompile(&[raw_of(&system_instruction::transfer(&a, &b, 1))], None).unwrap();

        assert_eq!(operations.len(), 2);
        assert_eq!(operations[0].index(), 0);
        assert_eq!(operations[0].operation_type, "System__Transfer");
        assert_eq!(operations[0].address(), Some(a.to_string().as_str()));
        assert_eq!(operations[0].amount.as_ref().unwrap().value, "-1");
        assert_eq!(operations[1].index(), 1);
        assert_eq!(operations[1].address(), Some(b.to_string().as_str()));
        assert_eq!(operations[1].amount.as_ref().unwrap().value, "1");
        assert_eq!(operations[1].amount.as_ref().unwrap().currency, Currency::native());
        assert!(operations[0].metadata.is_none());
    }

    #[test]
    fn test_side_effect_instruction_is_single() {
        let account = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let operations = decompile(
            &[raw_of(&system_instruction::assign(&account, &owner))],
            Some("SUCCESS"),
        )
        .unwrap();

        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].address(), Some(account.to_string().as_str()));
        assert!(operations[0].amount.is_none());
        assert_eq!(operations[0].status.as_deref(), Some("SUCCESS"));
        assert_eq!(
            operations[0].metadata.as_ref().unwrap()["owner"],
            json!(owner.to_string())
        );
    }

    #[test]
    fn test_indices_run_across_instructions() {
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let unknown = RawInstruction {
            program_id: Pubkey::new_unique(),
            accounts: vec![a],
            data: vec![9, 9],
        };
        let operations = decompile(
            &[
                raw_of(&system_instruction::allocate(&a, 8)),
                raw_of(&system_instruction::transfer(&a, &b, 3)),
                unknown,
            ],
            None,
        )
        .unwrap();

        let indices: Vec<i64> = operations.iter().map(Operation::index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(operations[3].operation_type, "Unknown");
        assert!(operations[3].account.is_none());
        assert_eq!(
            operations[3].metadata.as_ref().unwrap()["data"],
            json!(bs58::encode([9u8, 9]).into_string())
        );
    }
}
