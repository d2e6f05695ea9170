use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::message::{ListingSummary, Message, UserProfile};

const SEPARATOR: char = '_';

/// Derive the conversation id shared by two participants about one listing.
///
/// The two participant ids are sorted lexicographically before joining, so
/// `derive_conversation_id(a, b, l) == derive_conversation_id(b, a, l)`.
pub fn derive_conversation_id(participant_a: Uuid, participant_b: Uuid, listing_id: Uuid) -> String {
    ConversationKey::new(participant_a, participant_b, listing_id).to_string()
}

/// Parsed form of a conversation id: `{lower}_{higher}_{listing}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    first: Uuid,
    second: Uuid,
    listing_id: Uuid,
}

impl ConversationKey {
    pub fn new(participant_a: Uuid, participant_b: Uuid, listing_id: Uuid) -> Self {
        let (a, b) = (participant_a.to_string(), participant_b.to_string());
        let (first, second) = if a <= b {
            (participant_a, participant_b)
        } else {
            (participant_b, participant_a)
        };
        Self {
            first,
            second,
            listing_id,
        }
    }

    /// Parse a conversation id. Only the canonical spelling is accepted:
    /// exactly three hyphenated UUIDs with the participants already sorted.
    pub fn parse(conversation_id: &str) -> Option<Self> {
        let mut parts = conversation_id.split(SEPARATOR);
        let first = parse_canonical_uuid(parts.next()?)?;
        let second = parse_canonical_uuid(parts.next()?)?;
        let listing_id = parse_canonical_uuid(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }

        let key = Self::new(first, second, listing_id);
        (key.first == first && key.second == second).then_some(key)
    }

    pub fn participants(&self) -> (Uuid, Uuid) {
        (self.first, self.second)
    }

    pub fn listing_id(&self) -> Uuid {
        self.listing_id
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.first == user_id || self.second == user_id
    }

    /// The participant that is not `user_id`, or `None` if `user_id` is not
    /// part of this conversation.
    pub fn other_participant(&self, user_id: Uuid) -> Option<Uuid> {
        if self.first == user_id {
            Some(self.second)
        } else if self.second == user_id {
            Some(self.first)
        } else {
            None
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            self.first, self.second, self.listing_id
        )
    }
}

fn parse_canonical_uuid(part: &str) -> Option<Uuid> {
    let id = Uuid::parse_str(part).ok()?;
    // Rejects simple/braced/uppercase spellings of the same id.
    (id.to_string() == part).then_some(id)
}

/// One row of a user's inbox: a conversation collapsed to its latest message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub other_user_id: Uuid,
    pub other_user: Option<UserProfile>,
    pub listing_id: Uuid,
    pub listing: Option<ListingSummary>,
    pub last_message: Message,
    pub unread_count: i64,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_commutative() {
        for _ in 0..64 {
            let (a, b, l) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
            assert_eq!(derive_conversation_id(a, b, l), derive_conversation_id(b, a, l));
        }
    }

    #[test]
    fn test_derived_id_sorts_participants() {
        let a = Uuid::parse_str("aaaaaaaa-0000-4000-8000-000000000000").unwrap();
        let b = Uuid::parse_str("bbbbbbbb-0000-4000-8000-000000000000").unwrap();
        let l = Uuid::parse_str("11111111-0000-4000-8000-000000000000").unwrap();

        assert_eq!(
            derive_conversation_id(b, a, l),
            format!("{a}_{b}_{l}")
        );
    }

    #[test]
    fn test_different_listing_gives_different_conversation() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_ne!(
            derive_conversation_id(a, b, Uuid::new_v4()),
            derive_conversation_id(a, b, Uuid::new_v4())
        );
    }

    #[test]
    fn test_parse_roundtrips_derived_id() {
        let (a, b, l) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let id = derive_conversation_id(a, b, l);
        let key = ConversationKey::parse(&id).expect("derived id parses");

        assert_eq!(key.to_string(), id);
        assert_eq!(key.listing_id(), l);
        assert!(key.involves(a));
        assert!(key.involves(b));
        assert_eq!(key.other_participant(a), Some(b));
        assert_eq!(key.other_participant(b), Some(a));
        assert_eq!(key.other_participant(Uuid::new_v4()), None);
    }

    #[test]
    fn test_parse_rejects_non_canonical_ids() {
        let (a, b, l) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let key = ConversationKey::new(a, b, l);
        let (first, second) = key.participants();

        // swapped participants
        assert!(ConversationKey::parse(&format!("{second}_{first}_{l}")).is_none());
        // uppercase spelling
        assert!(ConversationKey::parse(&key.to_string().to_uppercase()).is_none());
        // wrong arity
        assert!(ConversationKey::parse(&format!("{first}_{second}")).is_none());
        assert!(ConversationKey::parse(&format!("{first}_{second}_{l}_{l}")).is_none());
        // garbage
        assert!(ConversationKey::parse("").is_none());
        assert!(ConversationKey::parse("room-1").is_none());
    }

    #[test]
    fn test_same_participant_twice_is_still_well_formed() {
        let (a, l) = (Uuid::new_v4(), Uuid::new_v4());
        let key = ConversationKey::parse(&derive_conversation_id(a, a, l)).unwrap();
        assert_eq!(key.other_participant(a), Some(a));
    }
}
