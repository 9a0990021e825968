mod address;
mod base58;
mod error;

pub use address::{Address, Curve, KeyHash, OperationHash};
pub use base58::{Prefix, B58_KT1, B58_OP, B58_TZ1, B58_TZ2, B58_TZ3};
pub use error::CryptoError;
