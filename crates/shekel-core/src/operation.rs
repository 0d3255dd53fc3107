//! Static description of every protocol instruction.
//!
//! Each [`OperationSpec`] lists the accounts an instruction takes, in the
//! exact order the on-ledger program declares them, together with where
//! each address comes from and the layout of the instruction arguments.
//! All call sites go through this one table; when the program's account
//! structs change, this is the only place to update.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::config::{SeedFamily, WellKnown};
use crate::error::ShekelError;

/// A named account slot of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    NetworkConfig,
    Stats,
    Treasury,
    Pool,
    Authority,
    Payer,
    Owner,
    Signer,
    Source,
    SourceTokenAccount,
    Destination,
    DestinationTokenAccount,
    ShekelTokenMint,
    UsdcMint,
    SystemProgram,
    TokenProgram,
    Rent,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::NetworkConfig => "network_config",
            Role::Stats => "stats",
            Role::Treasury => "treasury",
            Role::Pool => "pool",
            Role::Authority => "authority",
            Role::Payer => "payer",
            Role::Owner => "owner",
            Role::Signer => "signer",
            Role::Source => "source",
            Role::SourceTokenAccount => "source_token_account",
            Role::Destination => "destination",
            Role::DestinationTokenAccount => "destination_token_account",
            Role::ShekelTokenMint => "shekel_token_mint",
            Role::UsdcMint => "usdc_mint",
            Role::SystemProgram => "system_program",
            Role::TokenProgram => "token_program",
            Role::Rent => "rent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the address of a slot comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountSource {
    /// PDA of the program under the given seed family.
    Derived(SeedFamily),
    /// Supplied by the caller (wallets, mints, token accounts).
    External,
    /// Fixed program or sysvar taken from the deployment configuration.
    WellKnown(WellKnown),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountSlot {
    pub role: Role,
    pub source: AccountSource,
    pub is_signer: bool,
    pub is_writable: bool,
}

const fn derived(role: Role, family: SeedFamily, is_writable: bool) -> AccountSlot {
    AccountSlot {
        role,
        source: AccountSource::Derived(family),
        is_signer: false,
        is_writable,
    }
}

const fn external(role: Role, is_signer: bool, is_writable: bool) -> AccountSlot {
    AccountSlot {
        role,
        source: AccountSource::External,
        is_signer,
        is_writable,
    }
}

const fn well_known(role: Role, program: WellKnown) -> AccountSlot {
    AccountSlot {
        role,
        source: AccountSource::WellKnown(program),
        is_signer: false,
        is_writable: false,
    }
}

/// Binary type of an instruction argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Unsigned 64-bit, little-endian.
    U64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgField {
    pub name: &'static str,
    pub kind: ArgKind,
}

const fn u64_arg(name: &'static str) -> ArgField {
    ArgField {
        name,
        kind: ArgKind::U64,
    }
}

/// Instructions of the protocol program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Init,
    InitPoolV2,
    SetNewField,
    SetNetworkConfig,
    Transact,
    TransferPool,
    TransferTreasury,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::Init,
        Operation::InitPoolV2,
        Operation::SetNewField,
        Operation::SetNetworkConfig,
        Operation::Transact,
        Operation::TransferPool,
        Operation::TransferTreasury,
    ];

    pub fn spec(self) -> &'static OperationSpec {
        match self {
            Operation::Init => &INIT,
            Operation::InitPoolV2 => &INIT_POOL_V2,
            Operation::SetNewField => &SET_NEW_FIELD,
            Operation::SetNetworkConfig => &SET_NETWORK_CONFIG,
            Operation::Transact => &TRANSACT,
            Operation::TransferPool => &TRANSFER_POOL,
            Operation::TransferTreasury => &TRANSFER_TREASURY,
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = ShekelError;

    /// Accepts the instruction name (`init_pool_v2`) or its camelCase form
    /// (`initPoolV2`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s || camel_case(op.name()) == s)
            .ok_or_else(|| ShekelError::UnknownOperation(s.to_string()))
    }
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Static descriptor of one instruction.
#[derive(Debug)]
pub struct OperationSpec {
    pub operation: Operation,
    /// Instruction name as declared by the program; feeds the discriminator.
    pub name: &'static str,
    pub accounts: &'static [AccountSlot],
    pub args: &'static [ArgField],
}

impl OperationSpec {
    /// First 8 bytes of `SHA-256("global:<name>")`.
    pub fn discriminator(&self) -> [u8; 8] {
        let hash = Sha256::digest(format!("global:{}", self.name).as_bytes());
        let mut disc = [0u8; 8];
        disc.copy_from_slice(&hash[..8]);
        disc
    }

    pub fn slot(&self, role: Role) -> Option<&AccountSlot> {
        self.accounts.iter().find(|slot| slot.role == role)
    }

    /// Roles the caller has to supply.
    pub fn external_roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.accounts
            .iter()
            .filter(|slot| slot.source == AccountSource::External)
            .map(|slot| slot.role)
    }
}

// ---------------------------------------------------------------------------
// The table
// ---------------------------------------------------------------------------

static INIT: OperationSpec = OperationSpec {
    operation: Operation::Init,
    name: "init",
    accounts: &[
        derived(Role::NetworkConfig, SeedFamily::Config, true),
        well_known(Role::SystemProgram, WellKnown::SystemProgram),
        external(Role::Payer, true, true),
        derived(Role::Stats, SeedFamily::Stats, true),
        external(Role::ShekelTokenMint, false, false),
        external(Role::UsdcMint, false, false),
        derived(Role::Authority, SeedFamily::Authority, true),
        derived(Role::Pool, SeedFamily::Pool, true),
        derived(Role::Treasury, SeedFamily::Treasury, true),
        well_known(Role::TokenProgram, WellKnown::TokenProgram),
        well_known(Role::Rent, WellKnown::RentSysvar),
    ],
    args: &[u64_arg("merchant_tx_fee_basis_points"), u64_arg("purchase_protection_fee_basis_points")],
};

static INIT_POOL_V2: OperationSpec = OperationSpec {
    operation: Operation::InitPoolV2,
    name: "init_pool_v2",
    accounts: &[
        external(Role::Payer, true, true),
        well_known(Role::SystemProgram, WellKnown::SystemProgram),
        external(Role::UsdcMint, false, false),
        well_known(Role::TokenProgram, WellKnown::TokenProgram),
        well_known(Role::Rent, WellKnown::RentSysvar),
        derived(Role::Pool, SeedFamily::Pool, true),
    ],
    args: &[],
};

// Still bound to the legacy "config" namespace, as deployed.
static SET_NEW_FIELD: OperationSpec = OperationSpec {
    operation: Operation::SetNewField,
    name: "set_new_field",
    accounts: &[derived(Role::NetworkConfig, SeedFamily::ConfigLegacy, true)],
    args: &[u64_arg("value")],
};

static SET_NETWORK_CONFIG: OperationSpec = OperationSpec {
    operation: Operation::SetNetworkConfig,
    name: "set_network_config",
    accounts: &[
        derived(Role::NetworkConfig, SeedFamily::Config, true),
        external(Role::ShekelTokenMint, false, false),
        external(Role::UsdcMint, false, false),
        external(Role::Signer, true, false),
    ],
    args: &[u64_arg("merchant_tx_fee_basis_points"), u64_arg("purchase_protection_fee_basis_points")],
};

static TRANSACT: OperationSpec = OperationSpec {
    operation: Operation::Transact,
    name: "transact",
    accounts: &[
        external(Role::Owner, true, false),
        external(Role::Source, false, true),
        external(Role::SourceTokenAccount, false, true),
        external(Role::Destination, false, true),
        external(Role::DestinationTokenAccount, false, true),
        well_known(Role::TokenProgram, WellKnown::TokenProgram),
        derived(Role::NetworkConfig, SeedFamily::Config, false),
        derived(Role::Pool, SeedFamily::Pool, true),
        derived(Role::Stats, SeedFamily::Stats, true),
        derived(Role::Treasury, SeedFamily::Treasury, true),
        derived(Role::Authority, SeedFamily::Authority, true),
    ],
    args: &[u64_arg("amount")],
};

static TRANSFER_POOL: OperationSpec = OperationSpec {
    operation: Operation::TransferPool,
    name: "transfer_pool",
    accounts: &[
        derived(Role::Pool, SeedFamily::Pool, true),
        external(Role::Destination, false, true),
        derived(Role::NetworkConfig, SeedFamily::Config, false),
        well_known(Role::TokenProgram, WellKnown::TokenProgram),
        external(Role::Signer, true, false),
        derived(Role::Authority, SeedFamily::Authority, true),
    ],
    args: &[u64_arg("amount")],
};

static TRANSFER_TREASURY: OperationSpec = OperationSpec {
    operation: Operation::TransferTreasury,
    name: "transfer_treasury",
    accounts: &[
        derived(Role::Treasury, SeedFamily::Treasury, true),
        external(Role::Destination, false, true),
        derived(Role::NetworkConfig, SeedFamily::Config, false),
        well_known(Role::TokenProgram, WellKnown::TokenProgram),
        external(Role::Signer, true, false),
        derived(Role::Authority, SeedFamily::Authority, true),
    ],
    args: &[u64_arg("amount")],
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_table_entry_points_back_at_its_operation() {
        for op in Operation::ALL {
            assert_eq!(op.spec().operation, op);
        }
    }

    #[test]
    fn no_role_appears_twice_in_an_operation() {
        for op in Operation::ALL {
            let spec = op.spec();
            let unique: HashSet<Role> = spec.accounts.iter().map(|s| s.role).collect();
            assert_eq!(unique.len(), spec.accounts.len(), "duplicate role in {op}");
        }
    }

    #[test]
    fn discriminators_match_program_idl() {
        assert_eq!(INIT.discriminator(), [220, 59, 207, 236, 108, 250, 47, 100]);
        assert_eq!(INIT_POOL_V2.discriminator(), [109, 243, 71, 182, 30, 157, 78, 186]);
        assert_eq!(SET_NEW_FIELD.discriminator(), [159, 114, 73, 181, 82, 196, 58, 82]);
        assert_eq!(SET_NETWORK_CONFIG.discriminator(), [182, 178, 39, 123, 3, 57, 3, 151]);
        assert_eq!(TRANSACT.discriminator(), [217, 149, 130, 143, 221, 52, 252, 119]);
        assert_eq!(TRANSFER_POOL.discriminator(), [24, 141, 158, 204, 75, 171, 90, 135]);
        assert_eq!(TRANSFER_TREASURY.discriminator(), [4, 53, 120, 34, 46, 186, 160, 26]);
    }

    #[test]
    fn transact_external_roles() {
        let roles: Vec<Role> = TRANSACT.external_roles().collect();
        assert_eq!(
            roles,
            vec![
                Role::Owner,
                Role::Source,
                Role::SourceTokenAccount,
                Role::Destination,
                Role::DestinationTokenAccount,
            ]
        );
    }

    #[test]
    fn set_new_field_uses_legacy_config_namespace() {
        let slot = SET_NEW_FIELD.slot(Role::NetworkConfig).unwrap();
        assert_eq!(slot.source, AccountSource::Derived(SeedFamily::ConfigLegacy));
    }

    #[test]
    fn parse_operation_names() {
        assert_eq!("transact".parse::<Operation>().unwrap(), Operation::Transact);
        assert_eq!("init_pool_v2".parse::<Operation>().unwrap(), Operation::InitPoolV2);
        assert_eq!("initPoolV2".parse::<Operation>().unwrap(), Operation::InitPoolV2);
        assert_eq!("setNewField".parse::<Operation>().unwrap(), Operation::SetNewField);
        assert!(matches!(
            "withdraw".parse::<Operation>(),
            Err(ShekelError::UnknownOperation(_))
        ));
    }

    #[test]
    fn every_operation_has_a_signer_or_is_config_only() {
        for op in Operation::ALL {
            let spec = op.spec();
            let signers = spec.accounts.iter().filter(|s| s.is_signer).count();
            if op == Operation::SetNewField {
                assert_eq!(signers, 0);
            } else {
                assert_eq!(signers, 1, "{op} should declare exactly one signer");
            }
        }
    }
}
