//! Per-connection session state.

use crate::model::{BoundObject, Principal};

use super::channels::StreamTopic;

/// State of one admitted notification connection.
///
/// Built only by the gatekeeper after every gate has passed, and immutable
/// afterwards: the object snapshot is never re-fetched, and the topic fixes
/// the one channel this session may stream.
#[derive(Debug, Clone)]
pub struct NotifySession {
    topic: StreamTopic,
    principal: Option<Principal>,
    object: BoundObject,
}

impl NotifySession {
    /// Creates a session binding.
    #[must_use]
    pub fn new(topic: StreamTopic, principal: Option<Principal>, object: BoundObject) -> Self {
        Self {
            topic,
            principal,
            object,
        }
    }

    /// Returns the channel this session streams.
    #[must_use]
    pub const fn topic(&self) -> &StreamTopic {
        &self.topic
    }

    /// Returns the authenticated principal, when the endpoint required one.
    #[must_use]
    pub const fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Returns the bound object snapshot.
    #[must_use]
    pub const fn object(&self) -> &BoundObject {
        &self.object
    }
}
