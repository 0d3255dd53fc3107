//! Deployment configuration.
//!
//! Program ids and seed strings are fixed for the lifetime of a deployment,
//! so they live in one immutable struct that is handed to the [`Deriver`]
//! and [`Binder`] at construction instead of being read from globals.
//!
//! [`Deriver`]: crate::pda::Deriver
//! [`Binder`]: crate::binder::Binder

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::address::{
    Address, ASSOCIATED_TOKEN_PROGRAM_ID, RENT_SYSVAR_ID, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID,
};
use crate::error::ShekelError;

/// The devnet deployment: `EcDwM6SLq81xpKS1ykf7UGjjyE84KJvjmAzWmLwy9tJx`.
pub const DEVNET_PROGRAM_ID: Address = Address::new([
    0xca, 0x2d, 0xe2, 0xe3, 0x56, 0x60, 0xa6, 0xa7, 0x78, 0x35, 0x25, 0xc1, 0x20, 0xef, 0x74,
    0x1d, 0x4b, 0x7c, 0x9a, 0x48, 0xb7, 0x40, 0x13, 0x64, 0xb6, 0x43, 0x18, 0x35, 0x30, 0x15,
    0xce, 0x7d,
]);

/// A seed namespace of the protocol.
///
/// Each family is its own immutable namespace. `ConfigLegacy` and `Config`
/// resolve to different addresses and are not interchangeable; nothing
/// here guards against picking the wrong one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SeedFamily {
    ConfigLegacy,
    Config,
    Stats,
    Treasury,
    Pool,
    Authority,
}

impl SeedFamily {
    pub const ALL: [SeedFamily; 6] = [
        SeedFamily::ConfigLegacy,
        SeedFamily::Config,
        SeedFamily::Stats,
        SeedFamily::Treasury,
        SeedFamily::Pool,
        SeedFamily::Authority,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SeedFamily::ConfigLegacy => "config_legacy",
            SeedFamily::Config => "config",
            SeedFamily::Stats => "stats",
            SeedFamily::Treasury => "treasury",
            SeedFamily::Pool => "pool",
            SeedFamily::Authority => "authority",
        }
    }
}

impl fmt::Display for SeedFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Seed string per family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedTable {
    pub config_legacy: String,
    pub config: String,
    pub stats: String,
    pub treasury: String,
    pub pool: String,
    pub authority: String,
}

impl Default for SeedTable {
    fn default() -> Self {
        Self {
            config_legacy: "config".into(),
            config: "config_v4".into(),
            stats: "stats_v4".into(),
            treasury: "treasury_v4".into(),
            pool: "pool_v4".into(),
            authority: "authority_v4".into(),
        }
    }
}

impl SeedTable {
    pub fn seed(&self, family: SeedFamily) -> &str {
        match family {
            SeedFamily::ConfigLegacy => &self.config_legacy,
            SeedFamily::Config => &self.config,
            SeedFamily::Stats => &self.stats,
            SeedFamily::Treasury => &self.treasury,
            SeedFamily::Pool => &self.pool,
            SeedFamily::Authority => &self.authority,
        }
    }
}

/// Programs and sysvars an operation may reference without the caller
/// supplying them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnown {
    SystemProgram,
    TokenProgram,
    RentSysvar,
}

/// Everything that identifies one deployment of the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    pub program_id: Address,
    pub token_program_id: Address,
    pub associated_token_program_id: Address,
    pub system_program_id: Address,
    pub rent_sysvar_id: Address,
    pub seeds: SeedTable,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            program_id: DEVNET_PROGRAM_ID,
            token_program_id: TOKEN_PROGRAM_ID,
            associated_token_program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
            system_program_id: SYSTEM_PROGRAM_ID,
            rent_sysvar_id: RENT_SYSVAR_ID,
            seeds: SeedTable::default(),
        }
    }
}

impl DeploymentConfig {
    /// Same defaults, different program id. Useful for testing against a
    /// local validator deployment.
    pub fn for_program(program_id: Address) -> Self {
        Self {
            program_id,
            ..Self::default()
        }
    }

    /// Parse a JSON document; omitted fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ShekelError> {
        serde_json::from_str(json)
            .map_err(|e| ShekelError::Config(format!("deployment config: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ShekelError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ShekelError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn well_known(&self, program: WellKnown) -> Address {
        match program {
            WellKnown::SystemProgram => self.system_program_id,
            WellKnown::TokenProgram => self.token_program_id,
            WellKnown::RentSysvar => self.rent_sysvar_id,
        }
    }
}
