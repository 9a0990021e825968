use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{CryptoError, OperationHash};

/// Every way a token operation can fail, local or remote.
///
/// The `Display` form of the remote-enforced variants is the contract's
/// failwith code, so a rejection reads the same on both sides of the node
/// boundary. Batched operations are all-or-nothing: the first failing leg
/// rejects the whole submission with its error and nothing is applied.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TokenError {
    /// A raw string did not validate as an account address. Raised locally,
    /// before anything is submitted.
    #[error("invalid address: {0}")]
    InvalidAddress(CryptoError),

    /// A raw string did not validate as a delegate key hash. Local as well.
    #[error("invalid key hash: {0}")]
    InvalidKeyHash(CryptoError),

    /// Admin-gated entrypoint called by someone else. Also covers admin
    /// approval by anyone but the staged candidate.
    #[error("FA2_NOT_ADMIN")]
    NotAdmin,

    /// Operator updates may only touch the sender's own account.
    #[error("FA2_NOT_OWNER")]
    NotOwner,

    /// Transfer or burn initiated without an operator grant.
    #[error("FA2_NOT_OPERATOR")]
    NotOperator,

    /// Debit larger than the owner's balance.
    #[error("FA2_INSUFFICIENT_BALANCE")]
    InsufficientBalance { need: u64, have: u64 },

    /// Token id at or beyond the contract's token count.
    #[error("FA2_TOKEN_UNDEFINED")]
    TokenUndefined,

    /// Native payout larger than the contract holds.
    #[error("FA2_LOW_CONTRACT_BALANCE")]
    InsufficientValue,

    /// The node gave up waiting for inclusion at the requested depth. The
    /// operation's outcome is unknown: it may still land. Re-query state
    /// before acting again; never treat this as a failure.
    #[error("operation {hash} unconfirmed after {waited:?}, outcome unknown")]
    ConfirmationTimeout {
        hash: OperationHash,
        waited: Duration,
    },

    /// Any other rejection, reason passed through verbatim.
    #[error("operation rejected: {0}")]
    Rejected(String),
}

impl TokenError {
    /// Shorthand used by the ledger gates.
    pub fn insufficient(need: u64, have: u64) -> Self {
        TokenError::InsufficientBalance { need, have }
    }
}
