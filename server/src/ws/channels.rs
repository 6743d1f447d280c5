//! Channel naming for notification streams.
//!
//! Every session streams exactly one backend channel, named `{kind}:{id}`
//! after the object it is scoped to. The same topic value is used for
//! subscribe and unsubscribe, so the two can never diverge.

use crate::model::ObjectKind;

/// Typed name of a notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamTopic {
    kind: ObjectKind,
    id: String,
}

impl StreamTopic {
    /// Creates a topic for the object `id` of the given kind.
    #[must_use]
    pub fn new(kind: ObjectKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Returns the object kind.
    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Returns the object id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parses a channel string of the form `{kind}:{id}`.
    #[must_use]
    pub fn parse(channel: &str) -> Option<Self> {
        let (kind, id) = channel.split_once(':')?;
        if id.is_empty() {
            return None;
        }
        Some(Self {
            kind: ObjectKind::parse(kind)?,
            id: id.to_string(),
        })
    }
}

impl std::fmt::Display for StreamTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_display() {
        let topic = StreamTopic::new(ObjectKind::Wallet, "w1");
        assert_eq!(topic.to_string(), "wallet:w1");

        let topic = StreamTopic::new(ObjectKind::Invoice, "abc123");
        assert_eq!(topic.to_string(), "invoice:abc123");
    }

    #[test]
    fn test_topic_parse_round_trip() {
        let topic = StreamTopic::new(ObjectKind::Invoice, "abc123");
        let parsed = StreamTopic::parse(&topic.to_string());
        assert_eq!(parsed, Some(topic));
    }

    #[test]
    fn test_topic_parse_preserves_colons_in_id() {
        let parsed = StreamTopic::parse("wallet:a:b").expect("topic");
        assert_eq!(parsed.kind(), ObjectKind::Wallet);
        assert_eq!(parsed.id(), "a:b");
    }

    #[test]
    fn test_topic_parse_invalid() {
        assert_eq!(StreamTopic::parse("wallet"), None);
        assert_eq!(StreamTopic::parse("wallet:"), None);
        assert_eq!(StreamTopic::parse("order:o1"), None);
        assert_eq!(StreamTopic::parse(""), None);
    }
}
