//! Associated token account (ATA) derivation.
//!
//! The ATA of a wallet for a mint is the PDA with seeds
//! `[wallet, token_program_id, mint]` under the associated token account
//! program. The seed order is fixed by that program; swapping wallet and
//! mint, or moving the token program id, yields a different address.

use crate::address::Address;
use crate::error::Result;
use crate::pda::{find_program_address, Deriver};

/// Derive the associated token account address for a wallet + mint pair.
pub fn derive_associated_token_address(
    wallet: &Address,
    mint: &Address,
    token_program_id: &Address,
    associated_token_program_id: &Address,
) -> Result<Address> {
    find_program_address(
        &[wallet.as_ref(), token_program_id.as_ref(), mint.as_ref()],
        associated_token_program_id,
    )
    .map(|(address, _bump)| address)
}

impl Deriver {
    /// ATA of `wallet` for `mint`, using the configured token and associated
    /// token account programs.
    pub fn associated(&self, wallet: &Address, mint: &Address) -> Result<Address> {
        let config = self.config();
        derive_associated_token_address(
            wallet,
            mint,
            &config.token_program_id,
            &config.associated_token_program_id,
        )
    }
}
