//! # rpipe-core
//!
//! State-bucket pipeline engine for rpipe.
//!
//! This crate provides:
//! - Bucket key encoding and parsing for a pipeline configuration
//! - The ordered state chain with the collector state first
//! - Message shape validation behind an injectable predicate
//! - The set store contract, with Redis and in-memory adapters
//! - The engine that registers messages and moves or merges buckets
//!
//! ## Modules
//!
//! - [`config`]: `rpipe.toml` loading
//! - [`keys`]: Key layout and codec
//! - [`chain`]: State chain
//! - [`validator`]: Message validation
//! - [`store`]: Store trait, batches and adapters
//! - [`engine`]: Pipeline engine
//! - [`error`]: Engine error type

pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod keys;
pub mod store;
pub mod validator;

pub use engine::{Advance, PipeEngine};
pub use error::{PipeError, PipeResult};
