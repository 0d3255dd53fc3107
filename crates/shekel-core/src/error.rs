use thiserror::Error;

/// Errors raised while deriving, binding, assembling or signing.
///
/// None of these are retryable: each one points at a programming or
/// configuration mistake in the calling flow.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShekelError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid seeds {seeds}: {detail}")]
    InvalidSeeds { seeds: String, detail: String },

    #[error("no off-curve bump found for seeds {seeds}")]
    DerivationExhausted { seeds: String },

    #[error("{operation}: deriving `{role}` from seed \"{seed}\" failed: {source}")]
    Derivation {
        operation: &'static str,
        role: &'static str,
        seed: String,
        #[source]
        source: Box<ShekelError>,
    },

    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    #[error("{operation}: account `{role}` could not be resolved ({detail})")]
    MissingAccount {
        operation: &'static str,
        role: &'static str,
        detail: String,
    },

    #[error("{operation}: argument mismatch: {detail}")]
    ArgumentMismatch {
        operation: &'static str,
        detail: String,
    },

    #[error("failed to decode {account} account: {detail}")]
    DecodeError {
        account: &'static str,
        detail: String,
    },

    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("transaction build error: {0}")]
    TransactionBuild(String),

    #[error("signing error: {0}")]
    Signing(String),
}

pub type Result<T> = std::result::Result<T, ShekelError>;

/// Render a seed list for error messages: UTF-8 seeds are quoted, binary
/// seeds (addresses, bumps) are printed as hex.
pub(crate) fn describe_seeds(seeds: &[&[u8]]) -> String {
    let parts: Vec<String> = seeds
        .iter()
        .map(|seed| match std::str::from_utf8(seed) {
            Ok(text) if !text.is_empty() && text.chars().all(|c| c.is_ascii_graphic()) => {
                format!("\"{text}\"")
            }
            _ => format!("0x{}", hex::encode(seed)),
        })
        .collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_account_names_operation_and_role() {
        let err = ShekelError::MissingAccount {
            operation: "transact",
            role: "destination",
            detail: "not supplied".into(),
        };
        assert_eq!(
            err.to_string(),
            "transact: account `destination` could not be resolved (not supplied)"
        );
    }

    #[test]
    fn display_derivation_exhausted() {
        let err = ShekelError::DerivationExhausted {
            seeds: "[\"config_v4\"]".into(),
        };
        assert_eq!(
            err.to_string(),
            "no off-curve bump found for seeds [\"config_v4\"]"
        );
    }

    #[test]
    fn display_argument_mismatch() {
        let err = ShekelError::ArgumentMismatch {
            operation: "init",
            detail: "expected 2 arguments, got 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "init: argument mismatch: expected 2 arguments, got 1"
        );
    }

    #[test]
    fn display_decode_error() {
        let err = ShekelError::DecodeError {
            account: "treasury",
            detail: "expected 165 bytes, got 12".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to decode treasury account: expected 165 bytes, got 12"
        );
    }

    #[test]
    fn describe_seeds_quotes_text_and_hexes_binary() {
        let rendered = describe_seeds(&[b"pool_v4", &[0xff, 0x00]]);
        assert_eq!(rendered, "[\"pool_v4\", 0xff00]");
    }

    #[test]
    fn error_trait_is_implemented() {
        let err: Box<dyn std::error::Error> = Box::new(ShekelError::Signing("test".into()));
        assert!(err.to_string().contains("test"));
    }
}
