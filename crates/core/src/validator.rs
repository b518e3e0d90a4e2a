//! Message shape validation.
//!
//! The engine accepts any serializable input and asks a [`MessageValidator`]
//! whether it has the shape of a [`Message`](rpipe_protocol::Message) before
//! anything is queued. The default [`ShapeValidator`] requires:
//! - `receiver.name`: string
//! - `receiver.id`: string or number
//! - `action.type`: string
//! - `action.payload`: object

use serde_json::Value;

/// A pure predicate over an unvalidated message.
///
/// Implementations must not panic; returning `false` rejects the message.
pub trait MessageValidator: Send + Sync {
    fn is_valid(&self, message: &Value) -> bool;
}

impl<F> MessageValidator for F
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn is_valid(&self, message: &Value) -> bool {
        self(message)
    }
}

/// Structural validator matching the message model.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeValidator;

impl MessageValidator for ShapeValidator {
    fn is_valid(&self, message: &Value) -> bool {
        check_shape(message).is_ok()
    }
}

/// Check the message shape and describe the first problem found.
pub fn check_shape(message: &Value) -> Result<(), String> {
    let receiver = field(message, "receiver")?;
    if !receiver.is_object() {
        return Err("receiver must be an object".to_string());
    }
    if !field(receiver, "name")?.is_string() {
        return Err("receiver.name must be a string".to_string());
    }
    let id = field(receiver, "id")?;
    if !(id.is_string() || id.is_number()) {
        return Err("receiver.id must be a string or a number".to_string());
    }

    let action = field(message, "action")?;
    if !action.is_object() {
        return Err("action must be an object".to_string());
    }
    if !field(action, "type")?.is_string() {
        return Err("action.type must be a string".to_string());
    }
    if !field(action, "payload")?.is_object() {
        return Err("action.payload must be an object".to_string());
    }

    Ok(())
}

fn field<'a>(value: &'a Value, name: &str) -> Result<&'a Value, String> {
    value
        .get(name)
        .ok_or_else(|| format!("missing required field '{name}'"))
}
