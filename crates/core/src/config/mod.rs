//! Configuration loading.
//!
//! This module reads `rpipe.toml` into the protocol models and checks the
//! pipeline section against the key and chain invariants before it is used.

pub mod error;
pub mod loader;
