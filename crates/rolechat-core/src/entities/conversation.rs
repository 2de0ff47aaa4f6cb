//! Conversation entity - a direct chat between exactly two users

use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Unordered pair of distinct participants, stored low id first.
///
/// Two pairs built from the same users compare equal regardless of argument
/// order, which is what the `(participant_1, participant_2)` unique index keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticipantPair {
    low: Snowflake,
    high: Snowflake,
}

impl ParticipantPair {
    pub fn new(a: Snowflake, b: Snowflake) -> Result<Self, DomainError> {
        if a == b {
            return Err(DomainError::SelfConversation);
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { low, high })
    }

    #[inline]
    pub fn low(&self) -> Snowflake {
        self.low
    }

    #[inline]
    pub fn high(&self) -> Snowflake {
        self.high
    }

    pub fn contains(&self, user_id: Snowflake) -> bool {
        self.low == user_id || self.high == user_id
    }

    /// The participant that is not `user_id`
    pub fn other(&self, user_id: Snowflake) -> Option<Snowflake> {
        if user_id == self.low {
            Some(self.high)
        } else if user_id == self.high {
            Some(self.low)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: Snowflake,
    pub participants: ParticipantPair,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: Snowflake, participants: ParticipantPair, now: DateTime<Utc>) -> Self {
        Self {
            id,
            participants,
            last_message_at: now,
            created_at: now,
        }
    }

    #[inline]
    pub fn has_participant(&self, user_id: Snowflake) -> bool {
        self.participants.contains(user_id)
    }

    #[inline]
    pub fn other_participant(&self, user_id: Snowflake) -> Option<Snowflake> {
        self.participants.other(user_id)
    }

    pub fn participant_ids(&self) -> [Snowflake; 2] {
        [self.participants.low(), self.participants.high()]
    }

    /// Advance `last_message_at`; older timestamps are ignored
    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.last_message_at {
            self.last_message_at = at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_pair_is_unordered() {
        let a = Snowflake::new(7);
        let b = Snowflake::new(3);
        let ab = ParticipantPair::new(a, b).unwrap();
        let ba = ParticipantPair::new(b, a).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.low(), b);
        assert_eq!(ab.high(), a);
    }

    #[test]
    fn test_pair_rejects_self() {
        let err = ParticipantPair::new(Snowflake::new(1), Snowflake::new(1)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_other_participant() {
        let pair = ParticipantPair::new(Snowflake::new(1), Snowflake::new(2)).unwrap();
        assert_eq!(pair.other(Snowflake::new(1)), Some(Snowflake::new(2)));
        assert_eq!(pair.other(Snowflake::new(2)), Some(Snowflake::new(1)));
        assert_eq!(pair.other(Snowflake::new(3)), None);
    }

    #[test]
    fn test_touch_is_monotonic() {
        let t0 = Utc.with_ymd_and_hms(2026, 6, 10, 12, 0, 0).unwrap();
        let pair = ParticipantPair::new(Snowflake::new(1), Snowflake::new(2)).unwrap();
        let mut conv = Conversation::new(Snowflake::new(10), pair, t0);

        conv.touch(t0 + Duration::minutes(5));
        assert_eq!(conv.last_message_at, t0 + Duration::minutes(5));

        conv.touch(t0 + Duration::minutes(1));
        assert_eq!(conv.last_message_at, t0 + Duration::minutes(5));
    }
}
