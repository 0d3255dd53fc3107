//! Client configuration: RPC endpoint, commitment, timeout and the
//! deployment being targeted.
//!
//! Sources, lowest precedence first: built-in defaults, an optional JSON
//! file, then `SHEKEL_*` environment variables.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shekel_core::{Address, DeploymentConfig};
use url::Url;

use crate::error::{ClientError, Result};

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_RPC_URL: &str = "SHEKEL_RPC_URL";
pub const ENV_COMMITMENT: &str = "SHEKEL_COMMITMENT";
pub const ENV_PROGRAM_ID: &str = "SHEKEL_PROGRAM_ID";

/// How settled ledger state must be before the node reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commitment {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(ClientError::Config(format!("unknown commitment level `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub rpc_url: String,
    pub commitment: Commitment,
    pub timeout_secs: u64,
    pub deployment: DeploymentConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            commitment: Commitment::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            deployment: DeploymentConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_rpc_url(mut self, rpc_url: &str) -> Result<Self> {
        parse_rpc_url(rpc_url)?;
        self.rpc_url = rpc_url.to_string();
        Ok(self)
    }

    /// The validated RPC endpoint.
    pub fn endpoint(&self) -> Result<Url> {
        parse_rpc_url(&self.rpc_url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ClientError::Config(format!("client config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        Self::default().apply_env(|key| std::env::var(key).ok())
    }

    /// Apply `SHEKEL_*` overrides looked up through `lookup`.
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup(ENV_RPC_URL) {
            self.rpc_url = url;
        }
        if let Some(level) = lookup(ENV_COMMITMENT) {
            self.commitment = level.parse()?;
        }
        if let Some(program) = lookup(ENV_PROGRAM_ID) {
            self.deployment.program_id = program
                .parse::<Address>()
                .map_err(|e| ClientError::Config(format!("{ENV_PROGRAM_ID}: {e}")))?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        parse_rpc_url(&self.rpc_url)?;
        if self.timeout_secs == 0 {
            return Err(ClientError::Config("timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

fn parse_rpc_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| ClientError::Config(format!("rpc url `{raw}`: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ClientError::Config(format!(
            "rpc url must be http or https, got `{other}`"
        ))),
    }
}
