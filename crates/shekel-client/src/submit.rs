//! Sign and submit assembled instructions.

use std::sync::Arc;

use shekel_core::{build_signed_transaction, Instruction, Keypair, Operation};
use tracing::{info, warn};

use crate::error::{ClientError, RpcError, Result};
use crate::transport::Transport;

/// Signs instructions against a fresh blockhash and hands them to the
/// transport. One attempt per call; nothing is retried or confirmed.
#[derive(Debug)]
pub struct SubmissionClient<T> {
    transport: Arc<T>,
}

impl<T> Clone for SubmissionClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> SubmissionClient<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submit one instruction. The first signer pays fees; every account
    /// the instruction marks as signer must be among `signers`.
    ///
    /// Returns the transaction signature reported by the node.
    pub async fn submit(
        &self,
        operation: Operation,
        instruction: Instruction,
        signers: &[&Keypair],
    ) -> Result<String> {
        let name = operation.name();
        let fee_payer = signers.first().ok_or(ClientError::NoSigners)?.address();

        // Nothing has been sent yet, so a failure here is not a rejection.
        let blockhash = self.transport.latest_blockhash().await?;
        let signed = build_signed_transaction(&[instruction], signers, &blockhash)?;

        info!(
            operation = name,
            %fee_payer,
            signature = %signed.id(),
            bytes = signed.wire.len(),
            "submitting transaction"
        );

        match self.transport.send_transaction(&signed.wire).await {
            Ok(signature) => {
                if signature != signed.id() {
                    warn!(operation = name, local = %signed.id(), node = %signature, "node reported a different signature");
                }
                info!(operation = name, %signature, "transaction accepted");
                Ok(signature)
            }
            Err(err) => {
                if let RpcError::Rejected { code, message } = &err {
                    warn!(operation = name, code, %message, "transaction rejected");
                } else {
                    warn!(operation = name, error = %err, "transaction not delivered");
                }
                Err(ClientError::from_submission(name, err))
            }
        }
    }
}
