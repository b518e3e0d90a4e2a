//! Common test utilities and helpers for engine tests.
//!
//! This module provides shared functionality across integration tests:
//! - Test fixtures (configs, engines over an in-memory store, messages)
//! - Custom assertions on bucket contents

pub mod assertions;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
pub use fixtures::*;
