//! Program derived address (PDA) search.
//!
//! A PDA is `SHA-256(seed_0 || .. || seed_n || bump || program_id ||
//! "ProgramDerivedAddress")` for the highest bump in `255..=0` whose digest
//! does NOT decompress to an Ed25519 point. Being off the curve means no
//! private key exists for it, so only the owning program can sign for it.
//!
//! The bump order is part of the protocol: every client and the on-ledger
//! program must walk it the same way to agree on the address.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::address::Address;
use crate::config::{DeploymentConfig, SeedFamily};
use crate::error::{describe_seeds, Result, ShekelError};

/// Maximum number of seeds, counting the bump.
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single seed in bytes.
pub const MAX_SEED_LEN: usize = 32;

/// The string appended to PDA derivation: "ProgramDerivedAddress".
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Find the canonical PDA and its bump for `seeds` under `program_id`.
///
/// Iterates bump seeds from 255 down to 0 and returns the first candidate
/// that is off the Ed25519 curve.
pub fn find_program_address(seeds: &[&[u8]], program_id: &Address) -> Result<(Address, u8)> {
    search(seeds, program_id, |candidate| !is_on_curve(candidate))
}

/// Attempt to create a PDA from seeds + bump + program_id.
///
/// Returns `None` if the hash falls on the curve (try the next bump).
pub fn create_program_address(seeds: &[&[u8]], bump: u8, program_id: &Address) -> Option<Address> {
    let hash = hash_candidate(seeds, bump, program_id);
    if is_on_curve(&hash) {
        return None;
    }
    Some(Address::new(hash))
}

/// Check if 32 bytes represent a valid Ed25519 curve point.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}

fn search(
    seeds: &[&[u8]],
    program_id: &Address,
    accept: impl Fn(&[u8; 32]) -> bool,
) -> Result<(Address, u8)> {
    validate_seeds(seeds)?;

    for bump in (0u8..=255).rev() {
        let hash = hash_candidate(seeds, bump, program_id);
        if accept(&hash) {
            return Ok((Address::new(hash), bump));
        }
    }

    Err(ShekelError::DerivationExhausted {
        seeds: describe_seeds(seeds),
    })
}

fn hash_candidate(seeds: &[&[u8]], bump: u8, program_id: &Address) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update([bump]);
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);
    hasher.finalize().into()
}

fn validate_seeds(seeds: &[&[u8]]) -> Result<()> {
    // One slot is reserved for the bump.
    if seeds.len() >= MAX_SEEDS {
        return Err(ShekelError::InvalidSeeds {
            seeds: describe_seeds(seeds),
            detail: format!("{} seeds given, at most {} allowed", seeds.len(), MAX_SEEDS - 1),
        });
    }
    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(ShekelError::InvalidSeeds {
            seeds: describe_seeds(seeds),
            detail: format!("seed of {} bytes exceeds {MAX_SEED_LEN}", seed.len()),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Deriver
// ---------------------------------------------------------------------------

/// Derives protocol addresses for one deployment.
///
/// Stateless apart from the configuration it was built with; nothing is
/// cached, so concurrent callers can share it freely.
#[derive(Debug, Clone, Default)]
pub struct Deriver {
    config: DeploymentConfig,
}

impl Deriver {
    pub fn new(config: DeploymentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    pub fn program_id(&self) -> Address {
        self.config.program_id
    }

    /// Derive the single-seed account of a protocol namespace.
    pub fn derive(&self, family: SeedFamily) -> Result<(Address, u8)> {
        let seed = self.config.seeds.seed(family);
        let (address, bump) = self.derive_seeds(&[seed.as_bytes()])?;
        debug!(%family, seed, %address, bump, "derived protocol address");
        Ok((address, bump))
    }

    /// Derive arbitrary seeds under the configured program id.
    pub fn derive_seeds(&self, seeds: &[&[u8]]) -> Result<(Address, u8)> {
        find_program_address(seeds, &self.config.program_id)
    }

    /// Every protocol namespace with its address and bump, in
    /// [`SeedFamily::ALL`] order.
    pub fn derive_all(&self) -> Result<Vec<(SeedFamily, Address, u8)>> {
        SeedFamily::ALL
            .iter()
            .map(|&family| {
                let (address, bump) = self.derive(family)?;
                Ok((family, address, bump))
            })
            .collect()
    }
}
