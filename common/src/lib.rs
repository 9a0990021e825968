pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod token;

pub use error::TokenError;
