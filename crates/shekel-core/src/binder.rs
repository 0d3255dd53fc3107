//! Resolve every account slot of an operation to an address.

use std::collections::BTreeMap;

use tracing::debug;

use crate::address::Address;
use crate::config::DeploymentConfig;
use crate::error::{Result, ShekelError};
use crate::operation::{AccountSlot, AccountSource, Operation, Role};
use crate::pda::Deriver;

/// Caller-supplied addresses, keyed by role.
///
/// Roles an operation does not declare are ignored, so one map can be
/// reused across several operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalAccounts(BTreeMap<Role, Address>);

impl ExternalAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: Role, address: Address) -> Self {
        self.0.insert(role, address);
        self
    }

    pub fn insert(&mut self, role: Role, address: Address) -> Option<Address> {
        self.0.insert(role, address)
    }

    pub fn get(&self, role: Role) -> Option<Address> {
        self.0.get(&role).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Role, Address)> for ExternalAccounts {
    fn from_iter<I: IntoIterator<Item = (Role, Address)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One resolved slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundAccount {
    pub slot: AccountSlot,
    pub address: Address,
}

/// The resolved accounts of one operation, in declaration order, each
/// role exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBinding {
    operation: Operation,
    program_id: Address,
    accounts: Vec<BoundAccount>,
}

impl AccountBinding {
    /// Assemble a binding by hand. [`Binder::bind`] is the normal way in;
    /// the assembler re-checks whatever is passed here.
    pub fn from_parts(operation: Operation, program_id: Address, accounts: Vec<BoundAccount>) -> Self {
        Self {
            operation,
            program_id,
            accounts,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn program_id(&self) -> Address {
        self.program_id
    }

    pub fn get(&self, role: Role) -> Option<Address> {
        self.accounts
            .iter()
            .find(|bound| bound.slot.role == role)
            .map(|bound| bound.address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundAccount> {
        self.accounts.iter()
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.accounts.iter().map(|bound| bound.slot.role)
    }

    pub fn get_at(&self, index: usize) -> Option<&BoundAccount> {
        self.accounts.get(index)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Binds operations to accounts for one deployment.
#[derive(Debug, Clone, Default)]
pub struct Binder {
    deriver: Deriver,
}

impl Binder {
    pub fn new(config: DeploymentConfig) -> Self {
        Self {
            deriver: Deriver::new(config),
        }
    }

    pub fn from_deriver(deriver: Deriver) -> Self {
        Self { deriver }
    }

    pub fn deriver(&self) -> &Deriver {
        &self.deriver
    }

    pub fn bind(&self, operation: Operation, external: &ExternalAccounts) -> Result<AccountBinding> {
        let spec = operation.spec();
        let mut accounts = Vec::with_capacity(spec.accounts.len());

        for slot in spec.accounts {
            let address = self.resolve(operation, slot, external)?;
            accounts.push(BoundAccount {
                slot: *slot,
                address,
            });
        }

        debug!(%operation, accounts = accounts.len(), "bound operation accounts");
        Ok(AccountBinding {
            operation,
            program_id: self.deriver.program_id(),
            accounts,
        })
    }

    fn resolve(
        &self,
        operation: Operation,
        slot: &AccountSlot,
        external: &ExternalAccounts,
    ) -> Result<Address> {
        match slot.source {
            AccountSource::Derived(family) => {
                self.deriver
                    .derive(family)
                    .map(|(address, _bump)| address)
                    .map_err(|e| ShekelError::Derivation {
                        operation: operation.name(),
                        role: slot.role.as_str(),
                        seed: self.deriver.config().seeds.seed(family).to_string(),
                        source: Box::new(e),
                    })
            }
            AccountSource::External => {
                external
                    .get(slot.role)
                    .ok_or_else(|| ShekelError::MissingAccount {
                        operation: operation.name(),
                        role: slot.role.as_str(),
                        detail: "not supplied by caller".into(),
                    })
            }
            AccountSource::WellKnown(program) => Ok(self.deriver.config().well_known(program)),
        }
    }
}
