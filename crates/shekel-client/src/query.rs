//! Read-only access to protocol accounts.

use std::sync::Arc;

use shekel_core::state::{decode_treasury, NetworkConfig, Stats, TreasuryState};
use shekel_core::{Address, Deriver, SeedFamily, ShekelError};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::transport::{AccountState, Transport};

#[derive(Debug)]
pub struct QueryClient<T> {
    transport: Arc<T>,
    deriver: Deriver,
}

impl<T> Clone for QueryClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            deriver: self.deriver.clone(),
        }
    }
}

impl<T: Transport> QueryClient<T> {
    pub fn new(transport: Arc<T>, deriver: Deriver) -> Self {
        Self { transport, deriver }
    }

    pub fn deriver(&self) -> &Deriver {
        &self.deriver
    }

    /// Fetch raw account state; a missing account is an error.
    pub async fn fetch_account(&self, address: &Address) -> Result<AccountState> {
        let state = self
            .transport
            .get_account(address)
            .await?
            .ok_or(ClientError::AccountNotFound { address: *address })?;
        debug!(%address, lamports = state.lamports, bytes = state.data.len(), "fetched account");
        Ok(state)
    }

    /// Decode a token account fetched from the treasury address.
    pub fn decode_treasury(&self, state: &AccountState) -> Result<TreasuryState> {
        self.expect_owner("treasury", state, self.deriver.config().token_program_id)?;
        Ok(decode_treasury(&state.data)?)
    }

    pub async fn fetch_treasury(&self) -> Result<TreasuryState> {
        let state = self.fetch_derived(SeedFamily::Treasury).await?;
        self.decode_treasury(&state)
    }

    pub async fn fetch_network_config(&self) -> Result<NetworkConfig> {
        let state = self.fetch_derived(SeedFamily::Config).await?;
        self.expect_owner("network_config", &state, self.deriver.program_id())?;
        Ok(NetworkConfig::decode(&state.data)?)
    }

    pub async fn fetch_stats(&self) -> Result<Stats> {
        let state = self.fetch_derived(SeedFamily::Stats).await?;
        self.expect_owner("stats", &state, self.deriver.program_id())?;
        Ok(Stats::decode(&state.data)?)
    }

    async fn fetch_derived(&self, family: SeedFamily) -> Result<AccountState> {
        let (address, _bump) = self.deriver.derive(family)?;
        self.fetch_account(&address).await
    }

    fn expect_owner(&self, account: &'static str, state: &AccountState, owner: Address) -> Result<()> {
        if state.owner != owner {
            return Err(ShekelError::DecodeError {
                account,
                detail: format!("owned by {}, expected {owner}", state.owner),
            }
            .into());
        }
        Ok(())
    }
}
