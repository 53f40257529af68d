//! # Published events and their identifying labels.
//!
//! [`Domain`] names a logical subscriber/service; [`Topic`] names an event
//! category. Both are opaque labels: the broker imposes no registry of valid
//! values, so embedding applications can extend the set freely.
//!
//! [`Event`] is one published occurrence. It is immutable once created:
//! `event_id` is minted at publish time, `parent_id` is supplied by the
//! publisher and links the event to the request or event that caused it
//! (self-referential for root events), and `content` is an arbitrary JSON
//! payload.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque label identifying a logical subscriber/service.
///
/// A given domain may register at most one subscriber per process lifetime
/// and may subscribe to many topics.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    /// Returns the label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Domain {
    fn from(s: &str) -> Self {
        Domain(s.to_owned())
    }
}

impl From<String> for Domain {
    fn from(s: String) -> Self {
        Domain(s)
    }
}

/// Opaque label identifying an event category.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Returns the label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        Topic(s.to_owned())
    }
}

impl From<String> for Topic {
    fn from(s: String) -> Self {
        Topic(s)
    }
}

/// One published occurrence with durable identity and payload.
///
/// Immutable once created. The `event_id` appears at most once across all
/// time within a topic's log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier minted at publish time.
    pub event_id: String,
    /// Id of the event or request that caused this one (self for roots).
    pub parent_id: String,
    /// Category this event was published under.
    pub topic: Topic,
    /// Arbitrary JSON payload.
    pub content: Value,
}

impl Event {
    /// Creates an event with a freshly minted unique id.
    pub fn mint(parent_id: impl Into<String>, topic: Topic, content: Value) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            parent_id: parent_id.into(),
            topic,
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_labels_roundtrip_transparently() {
        let topic = Topic::from("ORDER_CREATED");
        let encoded = serde_json::to_string(&topic).unwrap();
        assert_eq!(encoded, "\"ORDER_CREATED\"");
        let decoded: Topic = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, topic);
    }

    #[test]
    fn test_mint_generates_unique_ids() {
        let a = Event::mint("root", Topic::from("T"), json!({"x": 1}));
        let b = Event::mint("root", Topic::from("T"), json!({"x": 1}));
        assert_ne!(a.event_id, b.event_id);
        assert_eq!(a.parent_id, "root");
    }
}
