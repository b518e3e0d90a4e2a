//! # rpipe-protocol
//!
//! Plain data models shared by every rpipe crate.
//!
//! This crate defines:
//! - The message shape producers submit for aggregation
//! - The pipeline configuration (key shape and state chain options)
//! - The store connection settings read from `rpipe.toml`
//!
//! ## Modules
//!
//! - [`message_models`]: `Receiver`, `Action` and `Message`
//! - [`config_models`]: `PipelineConfig`, `RedisSettings` and the file root `RpipeConfig`
//!
//! ## Design Principles
//!
//! - No behaviour beyond constructors and display helpers
//! - TypeScript generation: message types derive `TS` so JS producers share the shapes
//! - Independent compilation: no dependencies on other rpipe crates

pub mod config_models;
pub mod message_models;

// Re-export all public types for convenience
pub use config_models::*;
pub use message_models::*;
