//! Backing store capability contract.
//!
//! The engine only needs set membership, set union, key deletion and an
//! atomic multi-command transaction. Commands are collected into a [`Batch`]
//! and handed to [`SetStore::exec`] exactly once per engine call.
//!
//! The transaction primitive is MULTI/EXEC-like: queued commands become
//! visible together, but there is no conditional check and no rollback. A
//! command rejected at execution time does not stop the other commands of
//! the same batch from applying.
//!
//! Adapters:
//! - [`redis_store::RedisStore`]: Redis over a multiplexed tokio connection
//! - [`memory::MemoryStore`]: in-process sets, with fault injection for tests

pub mod memory;
pub mod redis_store;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// A single queued store command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Add `member` to the set at `key`.
    SetAdd { key: String, member: String },

    /// Replace `destination` with the union of `sources`.
    ///
    /// An empty union deletes `destination`, like Redis `SUNIONSTORE`.
    SetUnionStore {
        destination: String,
        sources: Vec<String>,
    },

    /// Delete `key`.
    Delete { key: String },

    /// Read all members of the set at `key`.
    SetMembers { key: String },
}

impl Command {
    /// Keys touched by this command.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Command::SetAdd { key, .. } | Command::Delete { key } | Command::SetMembers { key } => {
                vec![key.as_str()]
            }
            Command::SetUnionStore {
                destination,
                sources,
            } => std::iter::once(destination.as_str())
                .chain(sources.iter().map(String::as_str))
                .collect(),
        }
    }
}

/// Result of one executed command, in queued order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Count returned by `SetAdd`, `SetUnionStore` and `Delete`.
    Count(u64),

    /// Members returned by `SetMembers`.
    Members(Vec<String>),
}

/// An ordered list of commands executed as one transaction.
///
/// Built fluently and consumed by [`SetStore::exec`], so a batch cannot be
/// reused across calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    commands: Vec<Command>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_add(mut self, key: impl Into<String>, member: impl Into<String>) -> Self {
        self.commands.push(Command::SetAdd {
            key: key.into(),
            member: member.into(),
        });
        self
    }

    pub fn set_union_store<I, S>(mut self, destination: impl Into<String>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands.push(Command::SetUnionStore {
            destination: destination.into(),
            sources: sources.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn delete(mut self, key: impl Into<String>) -> Self {
        self.commands.push(Command::Delete { key: key.into() });
        self
    }

    pub fn set_members(mut self, key: impl Into<String>) -> Self {
        self.commands.push(Command::SetMembers { key: key.into() });
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}

/// Errors raised by a store adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error reported by the Redis client.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A queued command was rejected at execution time. Other commands of
    /// the same batch may have been applied.
    #[error("Command {index} rejected: {reason}")]
    CommandRejected { index: usize, reason: String },

    /// The store answered with a reply of an unexpected shape.
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),
}

/// Type alias for Result with StoreError.
pub type StoreResult<T> = Result<T, StoreError>;

/// Set-oriented key/value store used by the engine.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn SetStore>`.
#[async_trait]
pub trait SetStore: Send + Sync {
    /// Execute every command of `batch` atomically.
    ///
    /// Returns one reply per command in queued order.
    async fn exec(&self, batch: Batch) -> StoreResult<Vec<Reply>>;

    /// Read the members of the set at `key`. A missing key reads as empty.
    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>>;

    /// Delete `key`, returning the number of keys removed.
    async fn delete(&self, key: &str) -> StoreResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_is_object_safe() {
        fn _assert_object_safe(_: &dyn SetStore) {}
    }

    #[test]
    fn test_batch_builder_keeps_order() {
        let batch = Batch::new()
            .set_union_store("to", ["to", "from"])
            .delete("from");

        assert_eq!(batch.len(), 2);
        assert_eq!(
            batch.commands()[0],
            Command::SetUnionStore {
                destination: "to".to_string(),
                sources: vec!["to".to_string(), "from".to_string()],
            }
        );
        assert_eq!(
            batch.commands()[1],
            Command::Delete {
                key: "from".to_string()
            }
        );
    }

    #[test]
    fn test_command_keys() {
        let union = Command::SetUnionStore {
            destination: "c".to_string(),
            sources: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(union.keys(), vec!["c", "a", "b"]);
        assert_eq!(Command::Delete { key: "k".to_string() }.keys(), vec!["k"]);
    }

    #[test]
    fn test_rejected_display() {
        let err = StoreError::CommandRejected {
            index: 1,
            reason: "WRONGTYPE".to_string(),
        };
        assert_eq!(err.to_string(), "Command 1 rejected: WRONGTYPE");
    }
}
