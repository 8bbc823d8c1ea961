//! Cryptographic primitives for token signing and freshness.

pub mod freshness;
pub mod nonce;
pub mod signing;
pub mod verify;
