//! Ledger transport.
//!
//! [`Transport`] is the seam between the clients and the network; tests
//! plug in an in-memory implementation. [`RpcTransport`] speaks JSON-RPC 2.0
//! over HTTP with base64 payloads.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use shekel_core::Address;
use tracing::debug;
use url::Url;

use crate::config::{ClientConfig, Commitment};
use crate::error::{ClientError, RpcError};

/// Raw state of one ledger account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub lamports: u64,
    pub owner: Address,
    pub data: Vec<u8>,
    pub executable: bool,
}

/// The three ledger calls the clients need.
pub trait Transport: Send + Sync {
    /// Recent blockhash to anchor a new transaction.
    fn latest_blockhash(&self) -> impl Future<Output = Result<[u8; 32], RpcError>> + Send;

    /// Submit a signed wire transaction; returns the node's signature string.
    fn send_transaction(&self, wire: &[u8]) -> impl Future<Output = Result<String, RpcError>> + Send;

    /// `None` when no account lives at `address`.
    fn get_account(
        &self,
        address: &Address,
    ) -> impl Future<Output = Result<Option<AccountState>, RpcError>> + Send;
}

// ---------------------------------------------------------------------------
// JSON-RPC envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Results wrapped with the slot they were read at.
#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
struct AccountValue {
    lamports: u64,
    owner: String,
    /// `[payload, encoding]`
    data: (String, String),
    executable: bool,
}

impl AccountValue {
    fn into_state(self) -> Result<AccountState, RpcError> {
        let (payload, encoding) = self.data;
        if encoding != "base64" {
            return Err(RpcError::Malformed(format!("unexpected account encoding `{encoding}`")));
        }
        let data = BASE64
            .decode(payload)
            .map_err(|e| RpcError::Malformed(format!("account data: {e}")))?;
        let owner = self
            .owner
            .parse()
            .map_err(|e| RpcError::Malformed(format!("account owner: {e}")))?;
        Ok(AccountState {
            lamports: self.lamports,
            owner,
            data,
            executable: self.executable,
        })
    }
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// JSON-RPC over HTTP against a single node.
#[derive(Debug)]
pub struct RpcTransport {
    http: reqwest::Client,
    endpoint: Url,
    commitment: Commitment,
    next_id: AtomicU64,
}

impl RpcTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let endpoint = config.endpoint()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("http client: {e}")))?;
        Ok(Self {
            http,
            endpoint,
            commitment: config.commitment,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(&self, method: &'static str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "rpc request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Network(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RpcError::Network(e.to_string()))?;

        let parsed: RpcResponse<T> = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(RpcError::Network(format!("http status {status}")));
            }
            Err(e) => return Err(RpcError::Malformed(format!("{method}: {e}"))),
        };

        if let Some(err) = parsed.error {
            return Err(RpcError::Rejected {
                code: err.code,
                message: err.message,
            });
        }
        parsed
            .result
            .ok_or_else(|| RpcError::Malformed(format!("{method}: response has neither result nor error")))
    }
}

impl Transport for RpcTransport {
    async fn latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        let response: WithContext<BlockhashValue> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.commitment.as_str() }]),
            )
            .await?;
        decode_blockhash(&response.value.blockhash)
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError> {
        let encoded = BASE64.encode(wire);
        self.call(
            "sendTransaction",
            json!([
                encoded,
                {
                    "encoding": "base64",
                    "preflightCommitment": self.commitment.as_str(),
                }
            ]),
        )
        .await
    }

    async fn get_account(&self, address: &Address) -> Result<Option<AccountState>, RpcError> {
        let response: WithContext<Option<AccountValue>> = self
            .call(
                "getAccountInfo",
                json!([
                    address.to_string(),
                    {
                        "encoding": "base64",
                        "commitment": self.commitment.as_str(),
                    }
                ]),
            )
            .await?;
        response.value.map(AccountValue::into_state).transpose()
    }
}

pub(crate) fn decode_blockhash(text: &str) -> Result<[u8; 32], RpcError> {
    let bytes = bs58::decode(text)
        .into_vec()
        .map_err(|e| RpcError::Malformed(format!("blockhash `{text}`: {e}")))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| RpcError::Malformed(format!("blockhash is {} bytes, expected 32", b.len())))
}
