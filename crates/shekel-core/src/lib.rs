//! Core of the shekel pool client.
//!
//! Derives the protocol's program-derived addresses, binds each operation's
//! accounts, assembles instructions and signs them into the ledger's legacy
//! transaction wire format. Everything here is synchronous and free of I/O;
//! the `shekel-client` crate adds the RPC transport.
//!
//! As with the wallet chain crates this grew out of, no `solana-sdk`: the
//! address math uses `sha2` and `curve25519-dalek`, signing uses
//! `ed25519-dalek`, and the wire format is written by hand.

pub mod address;
pub mod associated;
pub mod binder;
pub mod config;
pub mod error;
pub mod instruction;
pub mod keypair;
pub mod operation;
pub mod pda;
pub mod state;
pub mod transaction;

// Re-export key public types for ergonomic imports.
pub use address::{
    Address, ASSOCIATED_TOKEN_PROGRAM_ID, RENT_SYSVAR_ID, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID,
};
pub use associated::derive_associated_token_address;
pub use binder::{AccountBinding, Binder, BoundAccount, ExternalAccounts};
pub use config::{DeploymentConfig, SeedFamily, SeedTable, WellKnown, DEVNET_PROGRAM_ID};
pub use error::{Result, ShekelError};
pub use instruction::{assemble, AccountMeta, ArgValue, Instruction};
pub use keypair::Keypair;
pub use operation::{AccountSlot, AccountSource, ArgKind, Operation, OperationSpec, Role};
pub use pda::{create_program_address, find_program_address, Deriver};
pub use state::{decode_treasury, NetworkConfig, Stats, TokenAccount, TreasuryState};
pub use transaction::{
    build_signed_transaction, compile_message, serialize_message, sign_transaction, Message,
    SignedTransaction,
};
