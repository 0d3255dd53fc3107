//! Decoders for the on-ledger accounts this client reads.
//!
//! Token accounts use the fixed 165-byte SPL layout. Program-owned accounts
//! carry an 8-byte type discriminator followed by Borsh fields; allocations
//! may be larger than the fields, so trailing bytes are ignored.

use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::error::{Result, ShekelError};

pub const TOKEN_ACCOUNT_LEN: usize = 165;

const DISCRIMINATOR_LEN: usize = 8;

/// First 8 bytes of `SHA-256("account:<name>")`.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("account:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

// ---------------------------------------------------------------------------
// Field reader
// ---------------------------------------------------------------------------

struct Reader<'a> {
    account: &'static str,
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(account: &'static str, data: &'a [u8]) -> Self {
        Self {
            account,
            data,
            offset: 0,
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.offset + len;
        let bytes = self.data.get(self.offset..end).ok_or_else(|| ShekelError::DecodeError {
            account: self.account,
            detail: format!("need {end} bytes, got {}", self.data.len()),
        })?;
        self.offset = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn address(&mut self) -> Result<Address> {
        Address::try_from_slice(self.take(32)?)
    }

    /// SPL `COption<Pubkey>`: a u32 tag followed by 32 bytes either way.
    fn optional_address(&mut self) -> Result<Option<Address>> {
        let tag = self.u32()?;
        let address = self.address()?;
        match tag {
            0 => Ok(None),
            1 => Ok(Some(address)),
            other => Err(self.invalid(format!("bad option tag {other}"))),
        }
    }

    fn discriminator(&mut self, expected: [u8; 8]) -> Result<()> {
        let found = self.take(DISCRIMINATOR_LEN)?;
        if found != expected {
            return Err(self.invalid(format!(
                "discriminator mismatch: expected {}, found {}",
                hex::encode(expected),
                hex::encode(found)
            )));
        }
        Ok(())
    }

    fn invalid(&self, detail: String) -> ShekelError {
        ShekelError::DecodeError {
            account: self.account,
            detail,
        }
    }
}

// ---------------------------------------------------------------------------
// SPL token accounts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAccountState {
    Uninitialized,
    Initialized,
    Frozen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccount {
    pub mint: Address,
    pub owner: Address,
    pub amount: u64,
    pub delegate: Option<Address>,
    pub state: TokenAccountState,
}

impl TokenAccount {
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_as("token", data)
    }

    fn decode_as(account: &'static str, data: &[u8]) -> Result<Self> {
        if data.len() != TOKEN_ACCOUNT_LEN {
            return Err(ShekelError::DecodeError {
                account,
                detail: format!("expected {TOKEN_ACCOUNT_LEN} bytes, got {}", data.len()),
            });
        }

        let mut r = Reader::new(account, data);
        let mint = r.address()?;
        let owner = r.address()?;
        let amount = r.u64()?;
        let delegate = r.optional_address()?;
        let state = match r.u8()? {
            0 => TokenAccountState::Uninitialized,
            1 => TokenAccountState::Initialized,
            2 => TokenAccountState::Frozen,
            other => return Err(r.invalid(format!("unknown account state {other}"))),
        };

        Ok(Self {
            mint,
            owner,
            amount,
            delegate,
            state,
        })
    }
}

/// The fields of the treasury token account the protocol cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreasuryState {
    /// Mint of the token the treasury holds.
    pub mint_reference: Address,
    pub amount: u64,
}

pub fn decode_treasury(data: &[u8]) -> Result<TreasuryState> {
    let account = TokenAccount::decode_as("treasury", data)?;
    if account.state == TokenAccountState::Uninitialized {
        return Err(ShekelError::DecodeError {
            account: "treasury",
            detail: "token account is not initialized".into(),
        });
    }
    Ok(TreasuryState {
        mint_reference: account.mint,
        amount: account.amount,
    })
}

// ---------------------------------------------------------------------------
// Program accounts
// ---------------------------------------------------------------------------

/// Fee configuration stored under the `config_v4` address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    pub merchant_tx_fee_bps: u64,
    pub purchase_protection_fee_bps: u64,
    pub usdc_mint: Address,
    pub shekel_token_mint: Address,
}

impl NetworkConfig {
    pub const LEN: usize = DISCRIMINATOR_LEN + 8 + 8 + 32 + 32;

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new("network_config", data);
        r.discriminator(account_discriminator("NetworkConfig"))?;
        Ok(Self {
            merchant_tx_fee_bps: r.u64()?,
            purchase_protection_fee_bps: r.u64()?,
            usdc_mint: r.address()?,
            shekel_token_mint: r.address()?,
        })
    }
}

/// Running totals stored under the `stats_v4` address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub amount_moved: u64,
    pub amount_rewarded_sender: u64,
    pub amount_rewarded_recipient: u64,
}

impl Stats {
    pub const LEN: usize = DISCRIMINATOR_LEN + 8 * 3;

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new("stats", data);
        r.discriminator(account_discriminator("Stats"))?;
        Ok(Self {
            amount_moved: r.u64()?,
            amount_rewarded_sender: r.u64()?,
            amount_rewarded_recipient: r.u64()?,
        })
    }
}
