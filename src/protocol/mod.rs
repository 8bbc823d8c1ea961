//! Token model and transport encoding.

pub mod codec;
pub mod models;
