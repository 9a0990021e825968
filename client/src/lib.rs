//! Client-side model of a wrapped-tez FA2 token contract.
//!
//! [`TokenClient`](token::TokenClient) mirrors one contract's confirmed
//! storage and turns typed calls into injected operations, following each
//! one to confirmation. It is generic over the node boundary, so tests run
//! it against an in-memory chain and production points it at a real node.

pub mod config;
pub mod confirmation;
pub mod token;

pub use token::TokenClient;
