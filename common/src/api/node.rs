use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::crypto::{Address, OperationHash};
use crate::error::TokenError;
use crate::token::TokenStorage;

use super::{BalanceRequest, BalanceResponse, EntrypointCall};

/// Status of a submitted operation as the node reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OperationStatus {
    /// Accepted but not included yet.
    Pending,
    /// Included at `level` and applied.
    Applied { level: u64 },
    /// Included and refused; `reason` is what the contract failed with.
    Failed { reason: TokenError },
    /// Not known to the node. A freshly propagated operation can look like
    /// this for a moment, so pollers treat it like `Pending`.
    Unknown,
}

/// Proof that an operation reached the requested inclusion depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub hash: OperationHash,
    /// Level the operation was included at.
    pub level: u64,
    /// Depth observed when the confirmation resolved.
    pub confirmations: u64,
}

/// The node boundary: everything the client needs from the chain. Reading
/// a contract's storage, running the balance view, submitting calls and
/// following them. Signing and transport are the implementor's business.
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Current confirmed storage of a deployed token contract.
    async fn get_storage(&self, contract: &Address) -> Result<TokenStorage, TokenError>;

    /// Read-only balance view; response order mirrors request order.
    async fn run_balance_view(
        &self,
        contract: &Address,
        requests: &[BalanceRequest],
    ) -> Result<Vec<BalanceResponse>, TokenError>;

    /// Submit a call from `source` with `amount` native units attached,
    /// returning the operation handle to poll.
    async fn inject(
        &self,
        source: &Address,
        contract: &Address,
        call: EntrypointCall,
        amount: u64,
    ) -> Result<OperationHash, TokenError>;

    /// What the node currently knows about a submitted operation.
    async fn operation_status(&self, hash: &OperationHash) -> Result<OperationStatus, TokenError>;

    /// Level of the current head block.
    async fn head_level(&self) -> Result<u64, TokenError>;
}
