//! Message models submitted for aggregation.
//!
//! A message names a receiver (whose `id` selects the bucket) and carries an
//! action. Only the action is persisted; the receiver is consumed while the
//! bucket key is built.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Largest magnitude below which every integral `f64` is exactly representable.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Identifier of a receiver.
///
/// Producers send either a string or a JSON number; both are rendered to the
/// same textual form when they become part of a bucket key. Integral floats
/// such as `2.0` render as `2`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ReceiverId {
    /// A textual identifier, used as is.
    Text(String),

    /// A numeric identifier, rendered with its JSON representation.
    Number(serde_json::Number),
}

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiverId::Text(text) => f.write_str(text),
            ReceiverId::Number(number) => match number.as_f64() {
                // Integral floats print without a fraction, so `2.0` and `2` address the same bucket.
                Some(value)
                    if !number.is_i64()
                        && !number.is_u64()
                        && value.fract() == 0.0
                        && value.abs() < MAX_EXACT_INTEGER =>
                {
                    write!(f, "{}", value as i64)
                }
                _ => write!(f, "{number}"),
            },
        }
    }
}

impl From<&str> for ReceiverId {
    fn from(value: &str) -> Self {
        ReceiverId::Text(value.to_string())
    }
}

impl From<String> for ReceiverId {
    fn from(value: String) -> Self {
        ReceiverId::Text(value)
    }
}

impl From<u64> for ReceiverId {
    fn from(value: u64) -> Self {
        ReceiverId::Number(value.into())
    }
}

/// The addressee of a message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct Receiver {
    /// Informational receiver name. Not part of the bucket key.
    pub name: String,

    /// Identifier used to address the receiver's buckets.
    #[ts(type = "string | number")]
    pub id: ReceiverId,
}

/// The unit of work stored in a bucket.
///
/// The serialized form of this struct (`{"type":..,"payload":..}`) is the
/// member value written to the collector bucket.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct Action {
    /// Action discriminator chosen by the producer.
    #[serde(rename = "type")]
    pub kind: String,

    /// Arbitrary JSON object carried with the action.
    pub payload: serde_json::Value,
}

/// A message addressed to a receiver.
///
/// # Example
///
/// ```json
/// {
///   "receiver": { "name": "billing", "id": 42 },
///   "action": { "type": "invoice.created", "payload": { "amount": 10 } }
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct Message {
    pub receiver: Receiver,
    pub action: Action,
}

impl Message {
    /// Build a message from its parts.
    pub fn new(
        name: impl Into<String>,
        id: impl Into<ReceiverId>,
        kind: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            receiver: Receiver {
                name: name.into(),
                id: id.into(),
            },
            action: Action {
                kind: kind.into(),
                payload,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_receiver_id_display() {
        assert_eq!(ReceiverId::from("abc").to_string(), "abc");
        assert_eq!(ReceiverId::from(2_u64).to_string(), "2");
    }

    #[test]
    fn test_receiver_id_accepts_string_or_number() {
        let text: ReceiverId = serde_json::from_value(json!("123")).unwrap();
        assert_eq!(text, ReceiverId::Text("123".to_string()));

        let number: ReceiverId = serde_json::from_value(json!(123)).unwrap();
        assert_eq!(number.to_string(), "123");
    }

    #[test]
    fn test_receiver_id_integral_float_drops_fraction() {
        let whole: ReceiverId = serde_json::from_value(json!(2.0)).unwrap();
        assert_eq!(whole.to_string(), "2");

        let negative: ReceiverId = serde_json::from_value(json!(-7.0)).unwrap();
        assert_eq!(negative.to_string(), "-7");

        let fractional: ReceiverId = serde_json::from_value(json!(2.5)).unwrap();
        assert_eq!(fractional.to_string(), "2.5");
    }

    #[test]
    fn test_action_serializes_type_field() {
        let action = Action {
            kind: "testAction".to_string(),
            payload: json!({}),
        };
        let encoded = serde_json::to_string(&action).unwrap();
        assert_eq!(encoded, r#"{"type":"testAction","payload":{}}"#);
    }

    #[test]
    fn test_message_new() {
        let message = Message::new("test", 3_u64, "ping", json!({"count": 1}));
        assert_eq!(message.receiver.name, "test");
        assert_eq!(message.receiver.id.to_string(), "3");
        assert_eq!(message.action.kind, "ping");
    }
}
