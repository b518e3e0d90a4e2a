//! Redis adapter for [`SetStore`].
//!
//! Batches are sent as `MULTI ... EXEC` pipelines over a multiplexed
//! connection, which is cheap to clone and safe to share between tasks.
//! Connection and command timeouts are those of the redis client.

use crate::config::loader::redact_url;
use crate::store::{Batch, Command, Reply, SetStore, StoreError, StoreResult};
use async_trait::async_trait;
use redis::aio::{ConnectionLike, MultiplexedConnection};
use redis::AsyncCommands;

/// A [`SetStore`] backed by a Redis server.
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
}

impl RedisStore {
    /// Open a connection to the server at `url` (e.g. `redis://127.0.0.1:6379/0`).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Redis` if the URL is invalid or the server cannot be reached.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        tracing::debug!(url = %redact_url(url), "connected to redis");
        Ok(Self { connection })
    }

    /// Wrap an already established connection.
    pub fn from_connection(connection: MultiplexedConnection) -> Self {
        Self { connection }
    }
}

/// Translate a batch into an atomic redis pipeline.
fn build_pipeline(commands: &[Command]) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic();
    for command in commands {
        match command {
            Command::SetAdd { key, member } => {
                pipe.cmd("SADD").arg(key).arg(member);
            }
            Command::SetUnionStore {
                destination,
                sources,
            } => {
                pipe.cmd("SUNIONSTORE").arg(destination).arg(sources);
            }
            Command::Delete { key } => {
                pipe.cmd("DEL").arg(key);
            }
            Command::SetMembers { key } => {
                pipe.cmd("SMEMBERS").arg(key);
            }
        }
    }
    pipe
}

fn convert_reply(index: usize, command: &Command, value: &redis::Value) -> StoreResult<Reply> {
    if let redis::Value::ServerError(err) = value {
        return Err(StoreError::CommandRejected {
            index,
            reason: format!("{err:?}"),
        });
    }

    let reply = match command {
        Command::SetMembers { .. } => redis::from_redis_value::<Vec<String>>(value).map(Reply::Members),
        _ => redis::from_redis_value::<u64>(value).map(Reply::Count),
    };
    reply.map_err(|e| StoreError::UnexpectedReply(format!("command {index}: {e}")))
}

/// Map the raw `EXEC` reply to per-command replies.
///
/// Every command runs even when an earlier one fails, so the first rejected
/// command is reported only after the whole array has been inspected.
fn convert_exec_reply(commands: &[Command], exec_reply: redis::Value) -> StoreResult<Vec<Reply>> {
    let values = match exec_reply {
        redis::Value::Array(values) => values,
        redis::Value::Nil => {
            return Err(StoreError::UnexpectedReply(
                "transaction was aborted".to_string(),
            ))
        }
        other => {
            return Err(StoreError::UnexpectedReply(format!(
                "expected an EXEC array, got {other:?}"
            )))
        }
    };

    if values.len() != commands.len() {
        return Err(StoreError::UnexpectedReply(format!(
            "expected {} replies, got {}",
            commands.len(),
            values.len()
        )));
    }

    let mut replies = Vec::with_capacity(values.len());
    let mut first_rejection = None;
    for (index, (command, value)) in commands.iter().zip(values.iter()).enumerate() {
        match convert_reply(index, command, value) {
            Ok(reply) => replies.push(reply),
            Err(err @ StoreError::CommandRejected { .. }) => {
                first_rejection.get_or_insert(err);
            }
            Err(err) => return Err(err),
        }
    }

    match first_rejection {
        Some(err) => Err(err),
        None => Ok(replies),
    }
}

#[async_trait]
impl SetStore for RedisStore {
    async fn exec(&self, batch: Batch) -> StoreResult<Vec<Reply>> {
        let commands = batch.into_commands();
        if commands.is_empty() {
            return Ok(Vec::new());
        }

        let pipe = build_pipeline(&commands);
        let mut connection = self.connection.clone();
        // Skip the MULTI and QUEUED replies and keep only the EXEC array, whose
        // per-command errors `query_async` would collapse into one error.
        let mut raw = connection
            .req_packed_commands(&pipe, commands.len() + 1, 1)
            .await?;
        let exec_reply = raw
            .pop()
            .ok_or_else(|| StoreError::UnexpectedReply("missing EXEC reply".to_string()))?;
        tracing::debug!(commands = commands.len(), "executed transaction");

        convert_exec_reply(&commands, exec_reply)
    }

    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut connection = self.connection.clone();
        let members: Vec<String> = connection.smembers(key).await?;
        Ok(members)
    }

    async fn delete(&self, key: &str) -> StoreResult<u64> {
        let mut connection = self.connection.clone();
        let removed: u64 = connection.del(key).await?;
        Ok(removed)
    }
}
