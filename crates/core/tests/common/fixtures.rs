//! Test fixtures for creating configurations, engines and messages.

use rpipe_core::store::MemoryStore;
use rpipe_core::PipeEngine;
use rpipe_protocol::config_models::PipelineConfig;
use rpipe_protocol::message_models::Message;
use serde_json::json;
use std::sync::Arc;

/// The states used by most tests, after the collector.
pub const TEST_STATES: [&str; 3] = ["processing", "done", "failed"];

/// Create a pipeline config with a prefix and a postfix.
pub fn create_test_config(name: &str) -> PipelineConfig {
    PipelineConfig::new(name)
        .with_prefix("p")
        .with_postfix("q")
        .with_states(TEST_STATES)
}

/// Create an engine over a fresh in-memory store.
///
/// The store is returned too so tests can inspect keys and inject faults.
pub fn create_test_engine(config: PipelineConfig) -> (PipeEngine, MemoryStore) {
    let store = MemoryStore::new();
    let engine = PipeEngine::new(Arc::new(store.clone()), config)
        .unwrap_or_else(|e| panic!("test config must be valid: {e}"));
    (engine, store)
}

/// Create a valid message for receiver `id`.
pub fn create_test_message(id: &str, kind: &str) -> Message {
    Message::new("test", id, kind, json!({ "data": kind }))
}
