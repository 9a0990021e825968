use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a base58check string was refused.
///
/// One kind per validation stage. The stages run in a fixed order (tag,
/// checksum, length) and the first failing one wins, so the same input
/// always reports the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CryptoError {
    /// The leading tag is not in the expected prefix set.
    #[error("no prefix matched")]
    NoPrefixMatched,
    /// The string is not base58, or its checksum does not verify.
    #[error("invalid checksum")]
    InvalidChecksum,
    /// Tag and checksum are fine but the payload is not the length the
    /// prefix commits to.
    #[error("invalid length")]
    InvalidLength,
}
