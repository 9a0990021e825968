use sha2::{Digest, Sha256};

use super::error::CryptoError;

const CHECKSUM_LEN: usize = 4;

/// A base58check prefix: the tag the encoded string starts with, the bytes
/// prepended to the payload before checksumming, and the exact payload
/// length the tag commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prefix {
    pub tag: &'static str,
    pub bytes: &'static [u8],
    pub payload_len: usize,
}

/// ed25519 public key hash.
pub const B58_TZ1: Prefix = Prefix {
    tag: "tz1",
    bytes: &[6, 161, 159],
    payload_len: 20,
};

/// secp256k1 public key hash.
pub const B58_TZ2: Prefix = Prefix {
    tag: "tz2",
    bytes: &[6, 161, 161],
    payload_len: 20,
};

/// p256 public key hash.
pub const B58_TZ3: Prefix = Prefix {
    tag: "tz3",
    bytes: &[6, 161, 164],
    payload_len: 20,
};

/// Originated contract address.
pub const B58_KT1: Prefix = Prefix {
    tag: "KT1",
    bytes: &[2, 90, 121],
    payload_len: 20,
};

/// Operation hash.
pub const B58_OP: Prefix = Prefix {
    tag: "o",
    bytes: &[5, 116],
    payload_len: 32,
};

/// First four bytes of sha256(sha256(data)).
fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&second[..CHECKSUM_LEN]);
    out
}

/// Select the prefix whose tag `raw` starts with.
pub fn match_prefix(
    raw: &str,
    expected: &[&'static Prefix],
) -> Result<&'static Prefix, CryptoError> {
    expected
        .iter()
        .find(|prefix| raw.starts_with(prefix.tag))
        .copied()
        .ok_or(CryptoError::NoPrefixMatched)
}

/// Base58check encoding of `payload` under `prefix`.
pub fn encode(prefix: &Prefix, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(prefix.bytes.len() + payload.len() + CHECKSUM_LEN);
    data.extend_from_slice(prefix.bytes);
    data.extend_from_slice(payload);
    let check = checksum(&data);
    data.extend_from_slice(&check);
    bs58::encode(data).into_string()
}

/// Decode `raw` against a prefix the caller already tag-matched, returning
/// the bare payload. Checksum is verified before the prefix bytes are
/// stripped and the payload length checked.
pub fn decode(prefix: &Prefix, raw: &str) -> Result<Vec<u8>, CryptoError> {
    let data = bs58::decode(raw)
        .into_vec()
        .map_err(|_| CryptoError::InvalidChecksum)?;
    if data.len() < prefix.bytes.len() + CHECKSUM_LEN {
        return Err(CryptoError::InvalidChecksum);
    }
    let (body, check) = data.split_at(data.len() - CHECKSUM_LEN);
    if *check != checksum(body) {
        return Err(CryptoError::InvalidChecksum);
    }
    let payload = match body.strip_prefix(prefix.bytes) {
        Some(payload) => payload,
        None => return Err(CryptoError::InvalidLength),
    };
    if payload.len() != prefix.payload_len {
        return Err(CryptoError::InvalidLength);
    }
    Ok(payload.to_vec())
}
