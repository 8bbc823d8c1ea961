//! In-process caches.

pub mod replay;
