//! Asynchronous client for the shekel pool program.
//!
//! Wraps `shekel-core` with a ledger [`Transport`], a submission client,
//! read-only queries and one typed method per protocol operation.
//!
//! ```no_run
//! # async fn run() -> shekel_client::Result<()> {
//! use shekel_client::{ClientConfig, ProtocolClient};
//!
//! let client = ProtocolClient::connect(&ClientConfig::from_env()?)?;
//! let config = client.query().fetch_network_config().await?;
//! println!("merchant fee: {} bps", config.merchant_tx_fee_bps);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod flows;
pub mod query;
pub mod submit;
pub mod transport;

pub use config::{ClientConfig, Commitment};
pub use error::{ClientError, Result, RpcError};
pub use flows::{ProtocolAddress, ProtocolClient, TransactAccounts};
pub use query::QueryClient;
pub use submit::SubmissionClient;
pub use transport::{AccountState, RpcTransport, Transport};
