//! Pub/Sub channel definitions.
//!
//! Every broadcast scope maps to one Redis channel under [`CHANNEL_NAMESPACE`],
//! so a gateway can `PSUBSCRIBE` to [`CHANNEL_PATTERN`] once and route by name.

use rolechat_core::events::BroadcastScope;

/// Prefix shared by every rolechat channel
pub const CHANNEL_NAMESPACE: &str = "rolechat:";
/// Pattern matching every rolechat channel
pub const CHANNEL_PATTERN: &str = "rolechat:*";

/// Redis channel carrying the events of one scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PubSubChannel(BroadcastScope);

impl PubSubChannel {
    #[must_use]
    pub fn new(scope: BroadcastScope) -> Self {
        Self(scope)
    }

    #[must_use]
    pub fn scope(&self) -> BroadcastScope {
        self.0
    }

    /// Get the Redis channel name, e.g. `rolechat:conversation:42`
    #[must_use]
    pub fn name(&self) -> String {
        format!("{CHANNEL_NAMESPACE}{}", self.0.room())
    }

    /// Parse a channel name back to a `PubSubChannel`
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        name.strip_prefix(CHANNEL_NAMESPACE)
            .and_then(BroadcastScope::parse)
            .map(Self)
    }
}

impl From<BroadcastScope> for PubSubChannel {
    fn from(scope: BroadcastScope) -> Self {
        Self(scope)
    }
}

impl std::fmt::Display for PubSubChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolechat_core::Snowflake;

    #[test]
    fn test_channel_names() {
        let id = Snowflake::from(12345i64);

        assert_eq!(
            PubSubChannel::new(BroadcastScope::Conversation(id)).name(),
            "rolechat:conversation:12345"
        );
        assert_eq!(PubSubChannel::new(BroadcastScope::Group(id)).name(), "rolechat:group:12345");
        assert_eq!(PubSubChannel::new(BroadcastScope::User(id)).name(), "rolechat:user:12345");
        assert_eq!(PubSubChannel::new(BroadcastScope::All).name(), "rolechat:broadcast");
    }

    #[test]
    fn test_channel_parse() {
        let parsed = PubSubChannel::parse("rolechat:group:67890").unwrap();
        assert_eq!(parsed.scope(), BroadcastScope::Group(Snowflake::from(67890i64)));

        assert_eq!(
            PubSubChannel::parse("rolechat:broadcast").map(|c| c.scope()),
            Some(BroadcastScope::All)
        );
        assert!(PubSubChannel::parse("room:123").is_none());
        assert!(PubSubChannel::parse("rolechat:unknown:123").is_none());
    }
}
