use serde::{Deserialize, Serialize};
use std::fmt;

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self(new_id())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identifies one chat (an ongoing conversation or a one-shot task chat).
    ChatId
);
entity_id!(
    /// Identifies one message within a chat.
    MessageId
);
entity_id!(
    /// Identifies one downloaded model artifact.
    ModelId
);
entity_id!(
    /// Identifies one task preset.
    TaskId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_id_is_valid_uuid() {
        let id = new_id();
        let parsed = uuid::Uuid::parse_str(&id);
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap().get_version_num(), 4);
    }

    #[test]
    fn new_id_is_unique() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
    }

    #[test]
    fn chat_id_display_matches_as_str() {
        let id = ChatId::new();
        assert_eq!(id.to_string(), id.as_str());
    }

    #[test]
    fn chat_id_equality() {
        let id = ChatId::new();
        let cloned = id.clone();
        assert_eq!(id, cloned);

        let other = ChatId::new();
        assert_ne!(id, other);
    }

    #[test]
    fn chat_id_serialization() {
        let id = ChatId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: ChatId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn ids_hash_by_value() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        let a = MessageId::new();
        let b = a.clone();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 1);
    }
}
