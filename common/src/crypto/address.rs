use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::base58::{self, Prefix, B58_KT1, B58_OP, B58_TZ1, B58_TZ2, B58_TZ3};
use super::error::CryptoError;

/// Key-hash prefixes, one per supported curve.
const KEY_HASH_PREFIXES: [&Prefix; 3] = [&B58_TZ1, &B58_TZ2, &B58_TZ3];

/// Everything an account can be addressed by.
const ADDRESS_PREFIXES: [&Prefix; 4] = [&B58_TZ1, &B58_TZ2, &B58_TZ3, &B58_KT1];

/// Signature scheme a key hash belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Curve {
    Ed25519,
    Secp256k1,
    P256,
}

impl Curve {
    pub fn prefix(&self) -> &'static Prefix {
        match self {
            Curve::Ed25519 => &B58_TZ1,
            Curve::Secp256k1 => &B58_TZ2,
            Curve::P256 => &B58_TZ3,
        }
    }
}

macro_rules! string_form {
    ($type:ident) => {
        impl TryFrom<String> for $type {
            type Error = CryptoError;

            fn try_from(raw: String) -> Result<Self, CryptoError> {
                Self::from_base58(&raw)
            }
        }

        impl FromStr for $type {
            type Err = CryptoError;

            fn from_str(raw: &str) -> Result<Self, CryptoError> {
                Self::from_base58(raw)
            }
        }

        impl From<$type> for String {
            fn from(value: $type) -> String {
                value.0
            }
        }

        impl AsRef<str> for $type {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $type {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

/// Hash of a public key under one of the curve prefixes. Only obtainable
/// through validation, so holding one proves the string checked out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyHash(String);

impl KeyHash {
    /// Validate `raw` as a key hash of any supported curve.
    pub fn from_base58(raw: &str) -> Result<Self, CryptoError> {
        let prefix = base58::match_prefix(raw, &KEY_HASH_PREFIXES)?;
        base58::decode(prefix, raw)?;
        Ok(Self(raw.to_owned()))
    }

    /// Encode a raw 20-byte hash under the given curve's prefix.
    pub fn from_payload(curve: Curve, payload: &[u8; 20]) -> Self {
        Self(base58::encode(curve.prefix(), payload))
    }

    pub fn curve(&self) -> Curve {
        if self.0.starts_with(B58_TZ2.tag) {
            Curve::Secp256k1
        } else if self.0.starts_with(B58_TZ3.tag) {
            Curve::P256
        } else {
            Curve::Ed25519
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

string_form!(KeyHash);

/// Account address: an implicit account (key hash form) or an originated
/// contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn from_base58(raw: &str) -> Result<Self, CryptoError> {
        let prefix = base58::match_prefix(raw, &ADDRESS_PREFIXES)?;
        base58::decode(prefix, raw)?;
        Ok(Self(raw.to_owned()))
    }

    /// Encode a raw 20-byte hash as an originated contract address.
    pub fn originated(payload: &[u8; 20]) -> Self {
        Self(base58::encode(&B58_KT1, payload))
    }

    pub fn is_implicit(&self) -> bool {
        !self.0.starts_with(B58_KT1.tag)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

string_form!(Address);

impl From<KeyHash> for Address {
    fn from(key_hash: KeyHash) -> Self {
        Self(key_hash.0)
    }
}

impl From<&KeyHash> for Address {
    fn from(key_hash: &KeyHash) -> Self {
        Self(key_hash.0.clone())
    }
}

impl TryFrom<&Address> for KeyHash {
    type Error = CryptoError;

    fn try_from(address: &Address) -> Result<Self, CryptoError> {
        // Originated addresses have no key-hash form.
        if address.is_implicit() {
            Ok(KeyHash(address.0.clone()))
        } else {
            Err(CryptoError::NoPrefixMatched)
        }
    }
}

/// Hash handle of a submitted operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperationHash(String);

impl OperationHash {
    pub fn from_base58(raw: &str) -> Result<Self, CryptoError> {
        let prefix = base58::match_prefix(raw, &[&B58_OP])?;
        base58::decode(prefix, raw)?;
        Ok(Self(raw.to_owned()))
    }

    pub fn from_payload(payload: &[u8; 32]) -> Self {
        Self(base58::encode(&B58_OP, payload))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

string_form!(OperationHash);
