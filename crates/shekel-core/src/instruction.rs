//! Instruction assembly.
//!
//! Instruction data is the 8-byte operation discriminator followed by the
//! arguments in declaration order, each `u64` little-endian (Borsh layout).
//! The account list follows the operation's declared order exactly; the
//! program reads accounts by position, so any drift is a hard failure here
//! rather than a misdirected transfer on the ledger.

use crate::address::Address;
use crate::binder::AccountBinding;
use crate::error::{Result, ShekelError};
use crate::operation::{ArgKind, OperationSpec};

/// A typed instruction argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgValue {
    U64(u64),
}

impl ArgValue {
    pub fn kind(&self) -> ArgKind {
        match self {
            ArgValue::U64(_) => ArgKind::U64,
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            ArgValue::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
}

impl From<u64> for ArgValue {
    fn from(v: u64) -> Self {
        ArgValue::U64(v)
    }
}

/// A single account reference in an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    pub address: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: false,
        }
    }
}

/// An instruction ready to be placed in a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Address,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// Build an instruction for `spec` from its arguments and bound accounts.
pub fn assemble(spec: &OperationSpec, args: &[ArgValue], binding: &AccountBinding) -> Result<Instruction> {
    let operation = spec.name;

    if binding.operation() != spec.operation {
        return Err(ShekelError::ArgumentMismatch {
            operation,
            detail: format!("accounts were bound for `{}`", binding.operation()),
        });
    }

    if args.len() != spec.args.len() {
        return Err(ShekelError::ArgumentMismatch {
            operation,
            detail: format!("expected {} arguments, got {}", spec.args.len(), args.len()),
        });
    }
    for (field, value) in spec.args.iter().zip(args) {
        if field.kind != value.kind() {
            return Err(ShekelError::ArgumentMismatch {
                operation,
                detail: format!(
                    "argument `{}` expects {:?}, got {:?}",
                    field.name,
                    field.kind,
                    value.kind()
                ),
            });
        }
    }

    let mut accounts = Vec::with_capacity(spec.accounts.len());
    for (position, slot) in spec.accounts.iter().enumerate() {
        let bound = match binding.get_at(position) {
            Some(bound) if bound.slot.role == slot.role => bound,
            Some(other) => {
                return Err(ShekelError::MissingAccount {
                    operation,
                    role: slot.role.as_str(),
                    detail: format!("expected at position {position}, found `{}`", other.slot.role),
                })
            }
            None => {
                return Err(ShekelError::MissingAccount {
                    operation,
                    role: slot.role.as_str(),
                    detail: format!("binding ends before position {position}"),
                })
            }
        };
        accounts.push(AccountMeta {
            address: bound.address,
            is_signer: slot.is_signer,
            is_writable: slot.is_writable,
        });
    }
    if binding.len() != spec.accounts.len() {
        return Err(ShekelError::ArgumentMismatch {
            operation,
            detail: format!(
                "binding has {} accounts, operation declares {}",
                binding.len(),
                spec.accounts.len()
            ),
        });
    }

    let mut data = Vec::with_capacity(8 + 8 * args.len());
    data.extend_from_slice(&spec.discriminator());
    for arg in args {
        arg.encode_into(&mut data);
    }

    Ok(Instruction {
        program_id: binding.program_id(),
        accounts,
        data,
    })
}
