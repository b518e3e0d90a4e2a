//! State-bucket pipeline engine.
//!
//! The PipeEngine groups message actions per receiver identifier into
//! buckets (one store set per `(id, state)`), and relocates or fans in those
//! buckets along the configured state chain.
//!
//! Every state argument is checked against the chain before any store call.
//! Each public operation issues at most one transaction, so concurrent
//! callers can share one engine without locking.

use crate::chain::StateChain;
use crate::error::{PipeError, PipeResult};
use crate::keys::{KeyCodec, ParsedKey};
use crate::store::{Batch, Reply, SetStore, StoreError};
use crate::validator::{check_shape, MessageValidator, ShapeValidator};
use rpipe_protocol::config_models::PipelineConfig;
use rpipe_protocol::message_models::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Outcome of [`PipeEngine::next`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The bucket was moved to the following state.
    Moved { from: String, to: String },

    /// The source state is the last one of the chain; nothing was done.
    Terminal,
}

/// The main pipeline engine.
///
/// Holds only immutable configuration and shared handles; cloning the
/// `Arc`s inside is all it takes to use it from several tasks.
pub struct PipeEngine {
    config: PipelineConfig,
    codec: KeyCodec,
    store: Arc<dyn SetStore>,
    validator: Arc<dyn MessageValidator>,
}

impl PipeEngine {
    /// Create a new PipeEngine bound to one store and one configuration.
    ///
    /// Messages are checked with [`ShapeValidator`] unless another validator
    /// is installed with [`PipeEngine::with_validator`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration breaks a chain or key invariant.
    pub fn new(store: Arc<dyn SetStore>, config: PipelineConfig) -> PipeResult<Self> {
        let codec = KeyCodec::new(&config)?;
        Ok(Self {
            config,
            codec,
            store,
            validator: Arc::new(ShapeValidator),
        })
    }

    /// Replace the message validator.
    pub fn with_validator(mut self, validator: impl MessageValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    pub fn chain(&self) -> &StateChain {
        self.codec.chain()
    }

    /// The effective chain, collector first.
    pub fn states(&self) -> &[String] {
        self.chain().states()
    }

    pub fn collector_name(&self) -> &str {
        self.chain().collector()
    }

    /// The state following `state`, or `None` for the terminal state.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSourceState` if `state` is not in the chain.
    pub fn next_state_name(&self, state: &str) -> PipeResult<Option<&str>> {
        self.chain().next_state(state)
    }

    /// Build the bucket key for `(id, state)`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateName` for a state outside the chain and
    /// `InvalidIdentifier` for an empty id or one containing the separator.
    pub fn get_key(&self, id: &str, state: &str) -> PipeResult<String> {
        self.codec.checked_format(id, state)
    }

    /// Split a bucket key built under this configuration.
    pub fn parse_key(&self, key: &str) -> PipeResult<ParsedKey> {
        self.codec.parse(key)
    }

    /// Validate `messages` and add each serialized action to its receiver's
    /// collector bucket in a single transaction.
    ///
    /// Validation of the whole slice happens before anything is queued, so an
    /// invalid entry leaves every bucket untouched.
    ///
    /// # Returns
    ///
    /// The number of members that were not already present.
    ///
    /// # Errors
    ///
    /// - `InvalidMessage` for the first entry failing validation
    /// - `InvalidIdentifier` if a receiver id cannot be used in a key
    /// - `Store` if the transaction fails
    pub async fn register_messages<M: Serialize>(&self, messages: &[M]) -> PipeResult<u64> {
        let collector = self.collector_name();
        let mut batch = Batch::new();

        for (index, message) in messages.iter().enumerate() {
            let (message, value) = self.validate_message(index, message)?;
            let id = message.receiver.id.to_string();
            self.codec.check_id(&id)?;
            // The member is the action exactly as submitted, unknown fields and key order included.
            let member = serde_json::to_string(&value["action"])?;
            batch = batch.set_add(self.codec.format(&id, collector), member);
        }

        if batch.is_empty() {
            return Ok(0);
        }

        let queued = batch.len();
        let replies = self.store.exec(batch).await.map_err(|e| {
            tracing::warn!(error = %e, "failed to register messages");
            PipeError::Store(e)
        })?;
        tracing::debug!(pipeline = %self.config.name, queued, "registered messages");

        Ok(replies.iter().map(count_of).sum())
    }

    fn validate_message<M: Serialize>(
        &self,
        index: usize,
        message: &M,
    ) -> PipeResult<(Message, Value)> {
        let invalid = |reason: String| PipeError::InvalidMessage { index, reason };

        let value = serde_json::to_value(message).map_err(|e| invalid(e.to_string()))?;
        if !self.validator.is_valid(&value) {
            let reason = check_shape(&value)
                .err()
                .unwrap_or_else(|| "rejected by validator".to_string());
            return Err(invalid(reason));
        }

        let message = Message::deserialize(&value).map_err(|e| invalid(e.to_string()))?;
        Ok((message, value))
    }

    /// Add a single member to the bucket at `(id, state)`.
    ///
    /// Returns `true` if the member was not already present.
    pub async fn add(&self, id: &str, state: &str, value: &str) -> PipeResult<bool> {
        let key = self.get_key(id, state)?;
        let replies = self.store.exec(Batch::new().set_add(&key, value)).await?;
        tracing::debug!(key = %key, "added member");
        Ok(replies.first().map(count_of).unwrap_or(0) > 0)
    }

    /// Read the members of the bucket at `(id, state)`. A missing bucket reads as empty.
    pub async fn get_members(&self, id: &str, state: &str) -> PipeResult<Vec<String>> {
        let key = self.get_key(id, state)?;
        Ok(self.store.set_members(&key).await?)
    }

    /// Read the members of the collector bucket for `id`.
    pub async fn get_collected(&self, id: &str) -> PipeResult<Vec<String>> {
        self.get_members(id, self.collector_name()).await
    }

    /// Union `from_key` into `to_key` and delete `from_key`, in one transaction.
    ///
    /// Keys are used verbatim. A missing source leaves the destination unchanged.
    ///
    /// # Errors
    ///
    /// Returns `MoveFailed` wrapping the store error. The transaction has no
    /// rollback: if the store rejects the union, the delete still applies and
    /// the source members are lost.
    pub async fn move_keys(&self, from_key: &str, to_key: &str) -> PipeResult<()> {
        let batch = Batch::new()
            .set_union_store(to_key, [to_key, from_key])
            .delete(from_key);

        self.store.exec(batch).await.map_err(|e| {
            tracing::warn!(from = from_key, to = to_key, error = %e, "move failed");
            PipeError::MoveFailed(e)
        })?;

        tracing::info!(from = from_key, to = to_key, "moved bucket");
        Ok(())
    }

    /// Move the bucket of `id` from `from_state` to `to_state`.
    ///
    /// Both states are validated before any store call.
    pub async fn move_id(&self, id: &str, from_state: &str, to_state: &str) -> PipeResult<()> {
        let from_key = self.get_key(id, from_state)?;
        let to_key = self.get_key(id, to_state)?;
        self.move_keys(&from_key, &to_key).await
    }

    /// Move the bucket of `id` from `from_state` to the following state.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSourceState` if `from_state` is not in the chain.
    pub async fn next(&self, id: &str, from_state: &str) -> PipeResult<Advance> {
        let Some(to_state) = self.chain().next_state(from_state)? else {
            tracing::debug!(id, state = from_state, "no further state");
            return Ok(Advance::Terminal);
        };

        self.move_id(id, from_state, to_state).await?;
        Ok(Advance::Moved {
            from: from_state.to_string(),
            to: to_state.to_string(),
        })
    }

    /// Replace the bucket at `to_state` with the union of the buckets of
    /// `from_states` and return the resulting members.
    ///
    /// Earlier members of the destination are discarded unless a source holds
    /// them, and the sources are left untouched. The destination is validated
    /// first, then each source in order.
    ///
    /// # Errors
    ///
    /// - `InvalidStateName` for the first state outside the chain
    /// - `NoMergeSources` if `from_states` is empty
    /// - `Store` if the transaction fails
    pub async fn merge<S: AsRef<str>>(
        &self,
        id: &str,
        to_state: &str,
        from_states: &[S],
    ) -> PipeResult<Vec<String>> {
        self.check_state(to_state)?;
        for state in from_states {
            self.check_state(state.as_ref())?;
        }
        if from_states.is_empty() {
            return Err(PipeError::NoMergeSources);
        }
        self.codec.check_id(id)?;

        let to_key = self.codec.format(id, to_state);
        let sources: Vec<String> = from_states
            .iter()
            .map(|state| self.codec.format(id, state.as_ref()))
            .collect();

        let batch = Batch::new()
            .set_union_store(&to_key, sources)
            .set_members(&to_key);
        let replies = self.store.exec(batch).await?;
        tracing::info!(key = %to_key, sources = from_states.len(), "merged buckets");

        match replies.into_iter().nth(1) {
            Some(Reply::Members(members)) => Ok(members),
            other => Err(PipeError::Store(StoreError::UnexpectedReply(format!(
                "expected members for {to_key}, got {other:?}"
            )))),
        }
    }

    /// Delete the bucket at `(id, state)`, returning the number of keys removed.
    pub async fn clear(&self, id: &str, state: &str) -> PipeResult<u64> {
        let key = self.get_key(id, state)?;
        let removed = self.store.delete(&key).await?;
        tracing::info!(key = %key, removed, "cleared bucket");
        Ok(removed)
    }

    fn check_state(&self, state: &str) -> PipeResult<()> {
        if self.codec.is_valid_state(state) {
            Ok(())
        } else {
            Err(PipeError::InvalidStateName(state.to_string()))
        }
    }
}

fn count_of(reply: &Reply) -> u64 {
    match reply {
        Reply::Count(count) => *count,
        Reply::Members(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn create_test_engine() -> (PipeEngine, MemoryStore) {
        let store = MemoryStore::new();
        let config = PipelineConfig::new("testAggregator")
            .with_prefix("rpipe")
            .with_postfix("testAggregator")
            .with_states(["processing", "done", "failed"]);
        let engine = PipeEngine::new(Arc::new(store.clone()), config).unwrap();
        (engine, store)
    }

    #[test]
    fn test_pipe_engine_new() {
        let (engine, _store) = create_test_engine();
        assert_eq!(engine.collector_name(), "collector");
        assert_eq!(engine.states().len(), 4);
    }

    #[test]
    fn test_pipe_engine_rejects_bad_config() {
        let config = PipelineConfig::new("g").with_states(["collector"]);
        let result = PipeEngine::new(Arc::new(MemoryStore::new()), config);
        assert!(matches!(result, Err(PipeError::InvalidConfig(_))));
    }

    #[test]
    fn test_get_key() {
        let (engine, _store) = create_test_engine();
        assert_eq!(
            engine.get_key("123", "processing").unwrap(),
            "rpipe:testAggregator:123:state:processing:testAggregator"
        );
        assert!(matches!(
            engine.get_key("123", "invalidState"),
            Err(PipeError::InvalidStateName(_))
        ));
        assert!(matches!(
            engine.get_key("1:2", "done"),
            Err(PipeError::InvalidIdentifier(_))
        ));
    }

    #[tokio::test]
    async fn test_register_messages() {
        let (engine, _store) = create_test_engine();
        let messages = vec![json!({
            "receiver": { "id": "123", "name": "test" },
            "action": { "type": "testAction", "payload": {} }
        })];

        let added = engine.register_messages(&messages).await.unwrap();
        assert_eq!(added, 1);

        let members = engine.get_collected("123").await.unwrap();
        assert_eq!(members, vec![r#"{"type":"testAction","payload":{}}"#.to_string()]);
    }

    #[tokio::test]
    async fn test_register_messages_empty_is_noop() {
        let (engine, store) = create_test_engine();
        let messages: Vec<Message> = Vec::new();
        assert_eq!(engine.register_messages(&messages).await.unwrap(), 0);
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_custom_validator_is_used() {
        let (engine, store) = create_test_engine();
        let engine = engine.with_validator(|_: &serde_json::Value| false);
        let message = Message::new("test", "1", "ping", json!({}));

        let result = engine.register_messages(&[message]).await;
        assert!(matches!(
            result,
            Err(PipeError::InvalidMessage { index: 0, .. })
        ));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_next_from_terminal_does_no_io() {
        let (engine, store) = create_test_engine();
        let advance = engine.next("123", "failed").await.unwrap();
        assert_eq!(advance, Advance::Terminal);
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_next_moves_to_following_state() {
        let (engine, _store) = create_test_engine();
        engine.add("123", "processing", "value3").await.unwrap();

        let advance = engine.next("123", "processing").await.unwrap();
        assert_eq!(
            advance,
            Advance::Moved {
                from: "processing".to_string(),
                to: "done".to_string()
            }
        );
        assert_eq!(engine.get_members("123", "done").await.unwrap(), vec!["value3"]);
    }

    #[tokio::test]
    async fn test_merge_replaces_destination_members() {
        let (engine, _store) = create_test_engine();
        engine.add("123", "collector", "value4").await.unwrap();
        engine.add("123", "processing", "value5").await.unwrap();
        engine.add("123", "done", "value6").await.unwrap();

        let merged = engine
            .merge("123", "collector", &["processing", "done"])
            .await
            .unwrap();
        assert_eq!(merged, vec!["value5", "value6"]);
    }

    #[tokio::test]
    async fn test_merge_without_sources_does_no_io() {
        let (engine, store) = create_test_engine();
        let sources: [&str; 0] = [];

        let result = engine.merge("123", "done", &sources).await;
        assert!(matches!(result, Err(PipeError::NoMergeSources)));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_clear() {
        let (engine, _store) = create_test_engine();
        engine.add("123", "failed", "value3").await.unwrap();

        assert_eq!(engine.clear("123", "failed").await.unwrap(), 1);
        assert!(engine.get_members("123", "failed").await.unwrap().is_empty());
        assert_eq!(engine.clear("123", "failed").await.unwrap(), 0);
    }
}
