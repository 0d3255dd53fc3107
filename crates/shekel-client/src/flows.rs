//! Typed entry points for each protocol operation.
//!
//! Every method binds the operation's accounts, assembles the instruction
//! and submits it; derived accounts never need to be passed in.

use std::sync::Arc;

use shekel_core::{
    assemble, Address, ArgValue, Binder, DeploymentConfig, ExternalAccounts, Keypair, Operation,
    Role, SeedFamily,
};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::query::QueryClient;
use crate::submit::SubmissionClient;
use crate::transport::{RpcTransport, Transport};

/// The caller-side accounts of a `transact` transfer. All four are token
/// accounts, not wallets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactAccounts {
    /// Sender's USDC account, owned by the signing `owner`.
    pub source: Address,
    /// Sender's shekel-token account.
    pub source_token_account: Address,
    /// Merchant's USDC account receiving the payment.
    pub destination: Address,
    /// Merchant's shekel-token account.
    pub destination_token_account: Address,
}

/// A derived protocol account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolAddress {
    pub family: SeedFamily,
    pub address: Address,
    pub bump: u8,
}

#[derive(Debug)]
pub struct ProtocolClient<T> {
    binder: Binder,
    submitter: SubmissionClient<T>,
    query: QueryClient<T>,
}

impl ProtocolClient<RpcTransport> {
    /// Client for the deployment and endpoint in `config`.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let transport = RpcTransport::new(config)?;
        Ok(Self::new(transport, config.deployment.clone()))
    }
}

impl<T: Transport> ProtocolClient<T> {
    pub fn new(transport: T, deployment: DeploymentConfig) -> Self {
        let transport = Arc::new(transport);
        let binder = Binder::new(deployment);
        Self {
            submitter: SubmissionClient::new(Arc::clone(&transport)),
            query: QueryClient::new(transport, binder.deriver().clone()),
            binder,
        }
    }

    pub fn query(&self) -> &QueryClient<T> {
        &self.query
    }

    pub fn submitter(&self) -> &SubmissionClient<T> {
        &self.submitter
    }

    pub fn deployment(&self) -> &DeploymentConfig {
        self.binder.deriver().config()
    }

    /// The five current protocol accounts (config, stats, treasury, pool,
    /// authority) with their bumps. The legacy config account is left out.
    pub fn protocol_addresses(&self) -> Result<Vec<ProtocolAddress>> {
        Ok(self
            .binder
            .deriver()
            .derive_all()?
            .into_iter()
            .filter(|(family, _, _)| *family != SeedFamily::ConfigLegacy)
            .map(|(family, address, bump)| ProtocolAddress {
                family,
                address,
                bump,
            })
            .collect())
    }

    pub fn associated_token_address(&self, wallet: &Address, mint: &Address) -> Result<Address> {
        Ok(self.binder.deriver().associated(wallet, mint)?)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Create the network config, stats, authority, pool and treasury
    /// accounts.
    pub async fn init(
        &self,
        payer: &Keypair,
        shekel_token_mint: Address,
        usdc_mint: Address,
        merchant_fee_bps: u64,
        protection_fee_bps: u64,
    ) -> Result<String> {
        let external = ExternalAccounts::new()
            .with(Role::Payer, payer.address())
            .with(Role::ShekelTokenMint, shekel_token_mint)
            .with(Role::UsdcMint, usdc_mint);
        self.execute(
            Operation::Init,
            &external,
            &[merchant_fee_bps.into(), protection_fee_bps.into()],
            &[payer],
        )
        .await
    }

    pub async fn init_pool_v2(&self, payer: &Keypair, usdc_mint: Address) -> Result<String> {
        let external = ExternalAccounts::new()
            .with(Role::Payer, payer.address())
            .with(Role::UsdcMint, usdc_mint);
        self.execute(Operation::InitPoolV2, &external, &[], &[payer]).await
    }

    /// Write `value` into the legacy config account. `payer` only pays fees.
    pub async fn set_new_field(&self, payer: &Keypair, value: u64) -> Result<String> {
        self.execute(
            Operation::SetNewField,
            &ExternalAccounts::new(),
            &[value.into()],
            &[payer],
        )
        .await
    }

    pub async fn set_network_config(
        &self,
        signer: &Keypair,
        shekel_token_mint: Address,
        usdc_mint: Address,
        merchant_fee_bps: u64,
        protection_fee_bps: u64,
    ) -> Result<String> {
        let external = ExternalAccounts::new()
            .with(Role::Signer, signer.address())
            .with(Role::ShekelTokenMint, shekel_token_mint)
            .with(Role::UsdcMint, usdc_mint);
        self.execute(
            Operation::SetNetworkConfig,
            &external,
            &[merchant_fee_bps.into(), protection_fee_bps.into()],
            &[signer],
        )
        .await
    }

    /// Move `amount` USDC from `accounts.source` to `accounts.destination`,
    /// routing the protocol fee through the pool.
    pub async fn transact(&self, owner: &Keypair, accounts: TransactAccounts, amount: u64) -> Result<String> {
        let external = ExternalAccounts::new()
            .with(Role::Owner, owner.address())
            .with(Role::Source, accounts.source)
            .with(Role::SourceTokenAccount, accounts.source_token_account)
            .with(Role::Destination, accounts.destination)
            .with(Role::DestinationTokenAccount, accounts.destination_token_account);
        self.execute(Operation::Transact, &external, &[amount.into()], &[owner])
            .await
    }

    /// Pay `amount` out of the pool into `destination` (a token account).
    pub async fn transfer_pool(&self, signer: &Keypair, destination: Address, amount: u64) -> Result<String> {
        let external = ExternalAccounts::new()
            .with(Role::Signer, signer.address())
            .with(Role::Destination, destination);
        self.execute(Operation::TransferPool, &external, &[amount.into()], &[signer])
            .await
    }

    /// Pay `amount` reward tokens out of the treasury into `destination`.
    pub async fn transfer_treasury(
        &self,
        signer: &Keypair,
        destination: Address,
        amount: u64,
    ) -> Result<String> {
        let external = ExternalAccounts::new()
            .with(Role::Signer, signer.address())
            .with(Role::Destination, destination);
        self.execute(Operation::TransferTreasury, &external, &[amount.into()], &[signer])
            .await
    }

    async fn execute(
        &self,
        operation: Operation,
        external: &ExternalAccounts,
        args: &[ArgValue],
        signers: &[&Keypair],
    ) -> Result<String> {
        let binding = self.binder.bind(operation, external)?;
        let instruction = assemble(operation.spec(), args, &binding)?;
        debug!(%operation, accounts = instruction.accounts.len(), "assembled instruction");
        self.submitter.submit(operation, instruction, signers).await
    }
}
