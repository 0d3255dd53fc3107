//! Signing keys.
//!
//! A key is consumed, never created or stored here. Ledger CLI key files are
//! a JSON array of 64 bytes (`secret seed || public key`); raw 32-byte seeds
//! are accepted too.

use std::fmt;
use std::path::Path;

use ed25519_dalek::Signer;
use zeroize::{Zeroize, Zeroizing};

use crate::address::Address;
use crate::error::{Result, ShekelError};

/// An Ed25519 signing key. The secret is wiped on drop by `ed25519-dalek`.
pub struct Keypair {
    signing_key: ed25519_dalek::SigningKey,
}

impl Keypair {
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Accepts a 32-byte seed or a 64-byte `seed || public key` pair. For the
    /// 64-byte form the public half must match the seed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 && bytes.len() != 64 {
            return Err(ShekelError::InvalidKey(format!(
                "expected 32 or 64 bytes, got {}",
                bytes.len()
            )));
        }

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes[..32]);
        let keypair = Self::from_seed(&seed);
        seed.zeroize();

        if bytes.len() == 64 && keypair.address().as_bytes()[..] != bytes[32..] {
            return Err(ShekelError::InvalidKey(
                "public key does not match secret seed".into(),
            ));
        }
        Ok(keypair)
    }

    /// Parse the JSON byte-array key file format.
    pub fn from_json(json: &str) -> Result<Self> {
        let bytes: Zeroizing<Vec<u8>> = Zeroizing::new(
            serde_json::from_str(json)
                .map_err(|e| ShekelError::InvalidKey(format!("key file is not a byte array: {e}")))?,
        );
        Self::from_bytes(&bytes)
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = Zeroizing::new(
            std::fs::read_to_string(path)
                .map_err(|e| ShekelError::InvalidKey(format!("reading {}: {e}", path.display())))?,
        );
        Self::from_json(&text)
    }

    pub fn address(&self) -> Address {
        Address::new(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
