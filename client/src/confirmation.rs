use std::time::Instant;

use log::{debug, trace};
use tokio::time::sleep;

use wtez_common::api::node::{Confirmation, NodeApi, OperationStatus};
use wtez_common::crypto::OperationHash;
use wtez_common::error::TokenError;

use crate::config::ConfirmationConfig;

/// Poll `hash` until it is included at the requested depth.
///
/// A timeout is not a verdict. The operation may still land after the
/// deadline, so the caller must re-query chain state before acting again;
/// resubmitting on timeout risks a double spend.
pub async fn confirm_operation<A: NodeApi + ?Sized>(
    api: &A,
    hash: &OperationHash,
    config: &ConfirmationConfig,
) -> Result<Confirmation, TokenError> {
    let started = Instant::now();
    loop {
        match api.operation_status(hash).await? {
            OperationStatus::Applied { level } => {
                let head = api.head_level().await?;
                let depth = head.saturating_sub(level) + 1;
                if depth >= config.confirmations {
                    debug!("{} confirmed at level {}, depth {}", hash, level, depth);
                    return Ok(Confirmation {
                        hash: hash.clone(),
                        level,
                        confirmations: depth,
                    });
                }
                trace!("{} included, depth {}/{}", hash, depth, config.confirmations);
            }
            OperationStatus::Failed { reason } => {
                debug!("{} refused: {}", hash, reason);
                return Err(reason);
            }
            // A freshly propagated operation can briefly look unknown, so
            // both states just mean "keep polling".
            OperationStatus::Pending | OperationStatus::Unknown => {
                trace!("{} not included yet", hash);
            }
        }
        if started.elapsed() >= config.timeout {
            return Err(TokenError::ConfirmationTimeout {
                hash: hash.clone(),
                waited: started.elapsed(),
            });
        }
        sleep(config.sync_interval).await;
    }
}
