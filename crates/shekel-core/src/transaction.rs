//! Legacy transaction wire format and signing.
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```

use crate::address::Address;
use crate::error::{Result, ShekelError};
use crate::instruction::Instruction;
use crate::keypair::Keypair;

/// Account keys are addressed by a u8 index.
const MAX_ACCOUNT_KEYS: usize = 256;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in the ledger's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 value, returning `(value, bytes_consumed)`.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize)> {
    let mut value: u32 = 0;
    let mut consumed = 0usize;

    loop {
        let byte = *data.get(consumed).ok_or_else(|| {
            ShekelError::TransactionBuild("unexpected end of data while decoding compact-u16".into())
        })?;
        value |= ((byte & 0x7f) as u32) << (7 * consumed);
        consumed += 1;

        if byte & 0x80 == 0 || consumed >= 3 {
            break;
        }
    }

    let value = u16::try_from(value)
        .map_err(|_| ShekelError::TransactionBuild("compact-u16 value overflow".into()))?;
    Ok((value, consumed))
}

fn compact_len(len: usize, what: &str) -> Result<Vec<u8>> {
    let len = u16::try_from(len)
        .map_err(|_| ShekelError::TransactionBuild(format!("too many {what}: {len}")))?;
    Ok(encode_compact_u16(len))
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A compiled, unsigned transaction message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// All account keys referenced by this transaction, in canonical order:
    ///   1. writable signers (fee payer first)
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<Address>,
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
    pub recent_blockhash: [u8; 32],
    pub instructions: Vec<CompiledInstruction>,
}

/// An instruction whose accounts are indices into `account_keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// A signed transaction in wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub signatures: Vec<[u8; 64]>,
    pub wire: Vec<u8>,
}

impl SignedTransaction {
    /// The transaction id: Base58 of the first (fee payer) signature.
    pub fn id(&self) -> String {
        self.signatures
            .first()
            .map(|sig| bs58::encode(sig).into_string())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Compile instructions into a message paid for by `fee_payer`.
pub fn compile_message(
    instructions: &[Instruction],
    fee_payer: &Address,
    recent_blockhash: &[u8; 32],
) -> Result<Message> {
    struct AccountEntry {
        address: Address,
        is_signer: bool,
        is_writable: bool,
    }

    let mut entries: Vec<AccountEntry> = Vec::new();
    let mut upsert = |address: Address, signer: bool, writable: bool| {
        if let Some(entry) = entries.iter_mut().find(|e| e.address == address) {
            entry.is_signer |= signer;
            entry.is_writable |= writable;
        } else {
            entries.push(AccountEntry {
                address,
                is_signer: signer,
                is_writable: writable,
            });
        }
    };

    // Fee payer is always signer + writable.
    upsert(*fee_payer, true, true);
    for ix in instructions {
        for meta in &ix.accounts {
            upsert(meta.address, meta.is_signer, meta.is_writable);
        }
        upsert(ix.program_id, false, false);
    }

    // Stable sort keeps insertion order within a category, so the fee
    // payer stays first.
    entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
        (true, true) => 0u8,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    });

    if entries.len() > MAX_ACCOUNT_KEYS {
        return Err(ShekelError::TransactionBuild(format!(
            "{} account keys exceed the limit of {MAX_ACCOUNT_KEYS}",
            entries.len()
        )));
    }

    let count = |what: &str, pred: &dyn Fn(&AccountEntry) -> bool| -> Result<u8> {
        let n = entries.iter().filter(|e| pred(e)).count();
        u8::try_from(n).map_err(|_| {
            ShekelError::TransactionBuild(format!("{n} {what} accounts do not fit the message header"))
        })
    };
    let num_required_signatures = count("signer", &|e| e.is_signer)?;
    let num_readonly_signed = count("read-only signer", &|e| e.is_signer && !e.is_writable)?;
    let num_readonly_unsigned = count("read-only", &|e| !e.is_signer && !e.is_writable)?;

    let account_keys: Vec<Address> = entries.iter().map(|e| e.address).collect();
    let index_of = |address: &Address| -> Result<u8> {
        account_keys
            .iter()
            .position(|k| k == address)
            .map(|i| i as u8)
            .ok_or_else(|| ShekelError::TransactionBuild(format!("{address} not in account keys")))
    };

    let mut compiled = Vec::with_capacity(instructions.len());
    for ix in instructions {
        let account_indices = ix
            .accounts
            .iter()
            .map(|meta| index_of(&meta.address))
            .collect::<Result<Vec<u8>>>()?;
        compiled.push(CompiledInstruction {
            program_id_index: index_of(&ix.program_id)?,
            account_indices,
            data: ix.data.clone(),
        });
    }

    Ok(Message {
        account_keys,
        num_required_signatures,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash: *recent_blockhash,
        instructions: compiled,
    })
}

/// Serialize the message (the bytes that get signed).
pub fn serialize_message(message: &Message) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(256);

    buf.push(message.num_required_signatures);
    buf.push(message.num_readonly_signed);
    buf.push(message.num_readonly_unsigned);

    buf.extend_from_slice(&compact_len(message.account_keys.len(), "account keys")?);
    for key in &message.account_keys {
        buf.extend_from_slice(key.as_bytes());
    }

    buf.extend_from_slice(&message.recent_blockhash);

    buf.extend_from_slice(&compact_len(message.instructions.len(), "instructions")?);
    for ix in &message.instructions {
        buf.push(ix.program_id_index);
        buf.extend_from_slice(&compact_len(ix.account_indices.len(), "instruction accounts")?);
        buf.extend_from_slice(&ix.account_indices);
        buf.extend_from_slice(&compact_len(ix.data.len(), "instruction data bytes")?);
        buf.extend_from_slice(&ix.data);
    }

    Ok(buf)
}

/// Sign a message with every required signer and produce the wire bytes.
///
/// Each of the first `num_required_signatures` account keys must have a
/// matching keypair in `signers`; extra keypairs are ignored.
pub fn sign_transaction(message: &Message, signers: &[&Keypair]) -> Result<SignedTransaction> {
    let message_bytes = serialize_message(message)?;
    let required = message.num_required_signatures as usize;

    let signer_keys = message.account_keys.get(..required).ok_or_else(|| {
        ShekelError::TransactionBuild(format!(
            "header requires {required} signers but only {} keys are present",
            message.account_keys.len()
        ))
    })?;

    let mut signatures = Vec::with_capacity(required);
    for key in signer_keys {
        let signer = signers
            .iter()
            .find(|kp| kp.address() == *key)
            .ok_or_else(|| ShekelError::Signing(format!("no keypair for required signer {key}")))?;
        signatures.push(signer.sign(&message_bytes));
    }

    let mut wire = Vec::with_capacity(3 + 64 * required + message_bytes.len());
    wire.extend_from_slice(&compact_len(required, "signatures")?);
    for sig in &signatures {
        wire.extend_from_slice(sig);
    }
    wire.extend_from_slice(&message_bytes);

    Ok(SignedTransaction { signatures, wire })
}

/// Compile and sign in one step; the first signer pays fees.
pub fn build_signed_transaction(
    instructions: &[Instruction],
    signers: &[&Keypair],
    recent_blockhash: &[u8; 32],
) -> Result<SignedTransaction> {
    let fee_payer = signers
        .first()
        .ok_or_else(|| ShekelError::Signing("at least one signer is required".into()))?
        .address();
    let message = compile_message(instructions, &fee_payer, recent_blockhash)?;
    sign_transaction(&message, signers)
}
