//! End-to-end client flows against an in-memory ledger:
//! bind -> assemble -> sign -> submit, plus account queries.

use std::collections::HashMap;
use std::sync::Mutex;

use ed25519_dalek::{Signature, VerifyingKey};
use shekel_client::*;
use shekel_core::state::account_discriminator;
use shekel_core::transaction::decode_compact_u16;
use shekel_core::{
    assemble, Address, Binder, DeploymentConfig, ExternalAccounts, Keypair, Operation, Role,
    SeedFamily, ShekelError, DEVNET_PROGRAM_ID, TOKEN_PROGRAM_ID,
};

const BLOCKHASH: [u8; 32] = [0xB1; 32];

enum SendOutcome {
    Accept,
    Reject(i64, &'static str),
    Drop,
}

struct MockTransport {
    accounts: HashMap<Address, AccountState>,
    outcome: SendOutcome,
    blockhash_failure: Option<RpcError>,
    account_failure: Option<RpcError>,
    sent: Mutex<Vec<Vec<u8>>>,
}

impl MockTransport {
    fn new() -> Self {
        Self {
            accounts: HashMap::new(),
            outcome: SendOutcome::Accept,
            blockhash_failure: None,
            account_failure: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    fn with_outcome(outcome: SendOutcome) -> Self {
        Self {
            outcome,
            ..Self::new()
        }
    }

    fn failing_blockhash(mut self, err: RpcError) -> Self {
        self.blockhash_failure = Some(err);
        self
    }

    fn failing_reads(mut self, err: RpcError) -> Self {
        self.account_failure = Some(err);
        self
    }

    fn with_account(mut self, address: Address, state: AccountState) -> Self {
        self.accounts.insert(address, state);
        self
    }
}

impl Transport for MockTransport {
    async fn latest_blockhash(&self) -> std::result::Result<[u8; 32], RpcError> {
        match &self.blockhash_failure {
            Some(err) => Err(err.clone()),
            None => Ok(BLOCKHASH),
        }
    }

    async fn send_transaction(&self, wire: &[u8]) -> std::result::Result<String, RpcError> {
        self.sent.lock().unwrap().push(wire.to_vec());
        match self.outcome {
            SendOutcome::Accept => Ok(bs58::encode(&wire[1..65]).into_string()),
            SendOutcome::Reject(code, message) => Err(RpcError::Rejected {
                code,
                message: message.into(),
            }),
            SendOutcome::Drop => Err(RpcError::Network("connection reset by peer".into())),
        }
    }

    async fn get_account(&self, address: &Address) -> std::result::Result<Option<AccountState>, RpcError> {
        match &self.account_failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.accounts.get(address).cloned()),
        }
    }
}

fn addr(text: &str) -> Address {
    text.parse().unwrap()
}

fn client(transport: MockTransport) -> ProtocolClient<MockTransport> {
    ProtocolClient::new(transport, DeploymentConfig::default())
}

/// USDC and shekel-token accounts of a sender and a merchant.
fn transact_accounts() -> TransactAccounts {
    TransactAccounts {
        source: addr("7XH2YDxfmnpBMQcp1nHH9v9gcJQNBHd8N3rNmJYeB6i6"),
        source_token_account: addr("98zabcFKTiD9DwdgtQumQPk4PWMkeVVhKrHVJUz5J3fH"),
        destination: addr("PB8zR3iZ3SyQpi1juRrVhKXPNoRgT3H1QFGTSpPjJmE"),
        destination_token_account: addr("HJsWAkNjcHSgGPX1Rx2XwCAow9EFYfL25RECow8V6SVP"),
    }
}

/// Split a single-signer wire transaction into (signature, message).
fn split_wire(wire: &[u8]) -> ([u8; 64], &[u8]) {
    let (count, used) = decode_compact_u16(wire).unwrap();
    assert_eq!(count, 1);
    let mut sig = [0u8; 64];
    sig.copy_from_slice(&wire[used..used + 64]);
    (sig, &wire[used + 64..])
}

fn account_keys(message: &[u8]) -> Vec<Address> {
    let (n, used) = decode_compact_u16(&message[3..]).unwrap();
    let start = 3 + used;
    (0..n as usize)
        .map(|i| Address::try_from_slice(&message[start + 32 * i..start + 32 * (i + 1)]).unwrap())
        .collect()
}

fn token_account(mint: Address, owner: Address, amount: u64) -> AccountState {
    let mut data = Vec::with_capacity(165);
    data.extend_from_slice(mint.as_bytes());
    data.extend_from_slice(owner.as_bytes());
    data.extend_from_slice(&amount.to_le_bytes());
    data.extend_from_slice(&[0u8; 36]);
    data.push(1); // initialized
    data.resize(165, 0);
    AccountState {
        lamports: 2_039_280,
        owner: TOKEN_PROGRAM_ID,
        data,
        executable: false,
    }
}

// ─── Submission ────────────────────────────────────────────────────

#[tokio::test]
async fn transact_is_signed_and_submitted() {
    let owner = Keypair::from_seed(&[0x31u8; 32]);
    let client = client(MockTransport::new());

    let signature = client
        .transact(&owner, transact_accounts(), 1_000_000)
        .await
        .unwrap();

    let sent = client.submitter().transport().sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    let (sig, message) = split_wire(&sent[0]);
    assert_eq!(signature, bs58::encode(sig).into_string());

    let vk = VerifyingKey::from_bytes(owner.address().as_bytes()).unwrap();
    assert!(vk.verify_strict(message, &Signature::from_bytes(&sig)).is_ok());

    let keys = account_keys(message);
    assert_eq!(keys[0], owner.address());
    assert!(keys.contains(&DEVNET_PROGRAM_ID));
    assert!(keys.contains(&addr("BwcGnJzxdVpzivNwyubfABJ8BfkCCj9UQM5WPizSvVfG")));
    // 11 instruction accounts + the program id, all distinct.
    assert_eq!(keys.len(), 12);

    let (_, used) = decode_compact_u16(&message[3..]).unwrap();
    let blockhash_at = 3 + used + 32 * keys.len();
    assert_eq!(&message[blockhash_at..blockhash_at + 32], &BLOCKHASH);
}

#[tokio::test]
async fn init_and_set_new_field_submit() {
    let payer = Keypair::from_seed(&[0x32u8; 32]);
    let client = client(MockTransport::new());

    client
        .init(
            &payer,
            addr("AUPVPPeVQPdFyYQdtzxPYGcmjPxEWgy92wYEkAeJuh8o"),
            addr("BM82b8KV4pdgEo2we57myt7Du9zFaNPt5UC4F9oYsjpy"),
            25,
            50,
        )
        .await
        .unwrap();
    client.set_new_field(&payer, 60).await.unwrap();
    client
        .init_pool_v2(&payer, addr("BM82b8KV4pdgEo2we57myt7Du9zFaNPt5UC4F9oYsjpy"))
        .await
        .unwrap();

    let sent = client.submitter().transport().sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 3);

    // set_new_field: payer, legacy config account, program.
    let (_, message) = split_wire(&sent[1]);
    let keys = account_keys(message);
    assert_eq!(
        keys,
        vec![
            payer.address(),
            addr("CbHavFby1uFC2Ach3mkZn1rdpT8kZk5QFG4dXZPLbLh"),
            DEVNET_PROGRAM_ID,
        ]
    );
}

#[tokio::test]
async fn admin_operations_submit() {
    let admin = Keypair::from_seed(&[0x33u8; 32]);
    let client = client(MockTransport::new());
    let destination = addr("EB8o8yNgxs6UqUoz53GAHXEgGn3JCBkZS31XJbHG3rFi");

    client.transfer_pool(&admin, destination, 10).await.unwrap();
    client.transfer_treasury(&admin, destination, 20).await.unwrap();
    client
        .set_network_config(
            &admin,
            addr("AUPVPPeVQPdFyYQdtzxPYGcmjPxEWgy92wYEkAeJuh8o"),
            addr("BM82b8KV4pdgEo2we57myt7Du9zFaNPt5UC4F9oYsjpy"),
            30,
            40,
        )
        .await
        .unwrap();

    assert_eq!(client.submitter().transport().sent.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn rejection_names_the_operation() {
    let owner = Keypair::from_seed(&[0x34u8; 32]);
    let client = client(MockTransport::with_outcome(SendOutcome::Reject(
        -32002,
        "Transaction simulation failed: custom program error: 0x1770",
    )));

    let err = client
        .transact(&owner, transact_accounts(), 0)
        .await
        .unwrap_err();
    match err {
        ClientError::SubmissionRejected { operation, reason } => {
            assert_eq!(operation, "transact");
            assert!(reason.contains("0x1770"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn network_failure_is_transport_error() {
    let payer = Keypair::from_seed(&[0x35u8; 32]);
    let client = client(MockTransport::with_outcome(SendOutcome::Drop));

    let err = client.set_new_field(&payer, 1).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test]
async fn blockhash_failure_is_not_a_rejection() {
    let payer = Keypair::from_seed(&[0x38u8; 32]);
    let client = client(MockTransport::new().failing_blockhash(RpcError::Rejected {
        code: -32005,
        message: "node is behind".into(),
    }));

    let err = client.set_new_field(&payer, 1).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Rpc(RpcError::Rejected { code: -32005, .. })
    ));
    assert!(client.submitter().transport().sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_node_before_signing_is_transport_error() {
    let payer = Keypair::from_seed(&[0x39u8; 32]);
    let client = client(
        MockTransport::new().failing_blockhash(RpcError::Network("connection refused".into())),
    );

    let err = client.set_new_field(&payer, 1).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(ref d) if d == "connection refused"));
    assert!(client.submitter().transport().sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_signer_list_is_rejected_before_io() {
    let client = client(MockTransport::new());
    let binding = Binder::default()
        .bind(Operation::SetNewField, &ExternalAccounts::new())
        .unwrap();
    let ix = assemble(Operation::SetNewField.spec(), &[7u64.into()], &binding).unwrap();

    let err = client
        .submitter()
        .submit(Operation::SetNewField, ix, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NoSigners));
    assert!(client.submitter().transport().sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_required_signer_is_a_signing_error() {
    let payer = Keypair::from_seed(&[0x36u8; 32]);
    let owner = Keypair::from_seed(&[0x37u8; 32]);
    let client = client(MockTransport::new());

    let external = ExternalAccounts::new()
        .with(Role::Owner, owner.address())
        .with(Role::Source, transact_accounts().source)
        .with(Role::SourceTokenAccount, transact_accounts().source_token_account)
        .with(Role::Destination, transact_accounts().destination)
        .with(Role::DestinationTokenAccount, transact_accounts().destination_token_account);
    let binding = Binder::default().bind(Operation::Transact, &external).unwrap();
    let ix = assemble(Operation::Transact.spec(), &[5u64.into()], &binding).unwrap();

    let err = client
        .submitter()
        .submit(Operation::Transact, ix, &[&payer])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Core(ShekelError::Signing(_))));
}

// ─── Queries ───────────────────────────────────────────────────────

#[tokio::test]
async fn missing_treasury_is_account_not_found() {
    let client = client(MockTransport::new());
    let err = client.query().fetch_treasury().await.unwrap_err();
    match err {
        ClientError::AccountNotFound { address } => {
            assert_eq!(address, addr("HLToo4R38FHZGRQyzzR4mrnACnjBC8BCFoHNm6uaDwRp"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn query_network_failure_is_transport_error() {
    let client = client(MockTransport::new().failing_reads(RpcError::Network("connection refused".into())));

    let err = client.query().fetch_treasury().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(ref d) if d == "connection refused"));

    let err = client.query().fetch_stats().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test]
async fn query_malformed_response_stays_rpc_error() {
    let client = client(MockTransport::new().failing_reads(RpcError::Malformed("account data: bad".into())));

    let err = client.query().fetch_network_config().await.unwrap_err();
    assert!(matches!(err, ClientError::Rpc(RpcError::Malformed(_))));
}

#[tokio::test]
async fn treasury_mint_reference_is_decoded() {
    let treasury = addr("HLToo4R38FHZGRQyzzR4mrnACnjBC8BCFoHNm6uaDwRp");
    let authority = addr("3YNupXRLes2RKpamjJpteGrn7vi3cBmJ8qmjfQtbTUGU");
    let mint = addr("AUPVPPeVQPdFyYQdtzxPYGcmjPxEWgy92wYEkAeJuh8o");
    let client = client(MockTransport::new().with_account(treasury, token_account(mint, authority, 900)));

    let state = client.query().fetch_treasury().await.unwrap();
    assert_eq!(state.mint_reference, mint);
    assert_eq!(state.amount, 900);
}

#[tokio::test]
async fn treasury_owned_by_wrong_program_is_rejected() {
    let treasury = addr("HLToo4R38FHZGRQyzzR4mrnACnjBC8BCFoHNm6uaDwRp");
    let mut state = token_account(Address::new([1u8; 32]), Address::new([2u8; 32]), 0);
    state.owner = DEVNET_PROGRAM_ID;
    let client = client(MockTransport::new().with_account(treasury, state));

    let err = client.query().fetch_treasury().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Core(ShekelError::DecodeError { account: "treasury", .. })
    ));
}

#[tokio::test]
async fn network_config_and_stats_are_decoded() {
    let config_address = addr("HH7tdm7DYTndiGgWfQQEaSrDAQbQ3mj1WsWp2LZR2o6z");
    let stats_address = addr("CxmJ2ydvCRxUoc9fdLvraUYpBSmRUwJWX5HeCJ9tf8V1");

    let mut config_data = account_discriminator("NetworkConfig").to_vec();
    config_data.extend_from_slice(&25u64.to_le_bytes());
    config_data.extend_from_slice(&50u64.to_le_bytes());
    config_data.extend_from_slice(&[4u8; 32]);
    config_data.extend_from_slice(&[5u8; 32]);

    let mut stats_data = account_discriminator("Stats").to_vec();
    for v in [5_000_000u64, 3, 1] {
        stats_data.extend_from_slice(&v.to_le_bytes());
    }

    let program_account = |data: Vec<u8>| AccountState {
        lamports: 1_000_000,
        owner: DEVNET_PROGRAM_ID,
        data,
        executable: false,
    };
    let client = client(
        MockTransport::new()
            .with_account(config_address, program_account(config_data))
            .with_account(stats_address, program_account(stats_data)),
    );

    let config = client.query().fetch_network_config().await.unwrap();
    assert_eq!(config.merchant_tx_fee_bps, 25);
    assert_eq!(config.purchase_protection_fee_bps, 50);
    assert_eq!(config.shekel_token_mint, Address::new([5u8; 32]));

    let stats = client.query().fetch_stats().await.unwrap();
    assert_eq!(stats.amount_moved, 5_000_000);
    assert_eq!(stats.amount_rewarded_recipient, 1);
}

// ─── Addresses ─────────────────────────────────────────────────────

#[test]
fn protocol_addresses_exclude_legacy_config() {
    let client = client(MockTransport::new());
    let addresses = client.protocol_addresses().unwrap();

    let families: Vec<SeedFamily> = addresses.iter().map(|a| a.family).collect();
    assert_eq!(
        families,
        vec![
            SeedFamily::Config,
            SeedFamily::Stats,
            SeedFamily::Treasury,
            SeedFamily::Pool,
            SeedFamily::Authority,
        ]
    );
    assert_eq!(addresses[1].bump, 254);
    assert_eq!(addresses[3].address, addr("BwcGnJzxdVpzivNwyubfABJ8BfkCCj9UQM5WPizSvVfG"));

    let derived = client.query().deriver().derive_all().unwrap();
    for (listed, (family, address, bump)) in addresses.iter().zip(derived.iter().skip(1)) {
        assert_eq!((listed.family, listed.address, listed.bump), (*family, *address, *bump));
    }
}

#[test]
fn associated_token_address_matches_deployment() {
    let client = client(MockTransport::new());
    let ata = client
        .associated_token_address(
            &addr("8FXRKgS2nDJ1axRRTvdgkQudUsBZZ5gKnp4zF1kK6vMw"),
            &addr("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
        )
        .unwrap();
    assert_eq!(ata, addr("8SWZRVTsJgFtNKFjZ4BHrsjYyFaokz4eyj2pT9faKLQb"));
}

#[test]
fn connect_validates_configuration() {
    let mut config = ClientConfig::default();
    config.rpc_url = "not a url".into();
    assert!(matches!(
        ProtocolClient::connect(&config),
        Err(ClientError::Config(_))
    ));
    assert!(ProtocolClient::connect(&ClientConfig::default()).is_ok());
}
