use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::TokenId;

/// Byte string, hex-encoded on the wire the way the contract stores
/// metadata values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bytes(#[serde(with = "hex")] pub Vec<u8>);

impl Bytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// The UTF-8 reading of the bytes, if there is one.
    pub fn as_utf8(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl From<&str> for Bytes {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl From<String> for Bytes {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// Attribute map attached to a token id. Insertion order is part of the
/// stored shape, hence the ordered map.
pub type TokenInfo = IndexMap<String, Bytes>;

/// Per-token metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub token_id: TokenId,
    pub token_info: TokenInfo,
}

/// Attributes of the wrapped-tez token, the asset this contract family
/// ships with.
pub fn wrapped_tez_token_info() -> TokenInfo {
    let mut info = TokenInfo::new();
    info.insert("symbol".into(), Bytes::from("wTEZ"));
    info.insert("name".into(), Bytes::from("Wrapped Tezos FA2 token"));
    info.insert("decimals".into(), Bytes::from("6"));
    info.insert("is_transferable".into(), Bytes::from("true"));
    info.insert("is_boolean_amount".into(), Bytes::from("false"));
    info.insert("should_prefer_symbol".into(), Bytes::from("false"));
    info.insert(
        "thumbnailUri".into(),
        Bytes::from("ipfs://QmUWhCYXtC8r8aXgjrwsLrZmopiGMHdLWoQzEueAktJbHB"),
    );
    info
}

/// Contract-level metadata pointing at the published manifest.
pub fn wrapped_tez_metadata() -> IndexMap<String, Bytes> {
    let mut metadata = IndexMap::new();
    metadata.insert(
        String::new(),
        Bytes::from("ipfs://Qmej4GUjbvo6aa4qvRFrBF7TCYKZLL4SDPQGod6hXBPu1x"),
    );
    metadata
}
