use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::UserSummary;

/// Two-party thread. Which member is `sender` and which is `receiver` is fixed at
/// creation and carries no meaning afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    #[serde(default)]
    pub sender: Option<UserSummary>,
    #[serde(default)]
    pub receiver: Option<UserSummary>,
    #[serde(default)]
    pub last_message_id: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn includes(&self, user_id: &str) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }

    /// The other participant's id, or `None` when `me` is not part of the thread.
    pub fn partner_id(&self, me: &str) -> Option<&str> {
        if self.sender_id == me {
            Some(self.receiver_id.as_str())
        } else if self.receiver_id == me {
            Some(self.sender_id.as_str())
        } else {
            None
        }
    }

    pub fn partner(&self, me: &str) -> Option<&UserSummary> {
        if self.sender_id == me {
            self.receiver.as_ref()
        } else if self.receiver_id == me {
            self.sender.as_ref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> Conversation {
        let raw = r#"{
            "id": "c1",
            "senderId": "u1",
            "receiverId": "u2",
            "sender": {"id": "u1", "firstName": "Ana"},
            "receiver": {"id": "u2", "firstName": "Ben"},
            "lastMessageId": "m9",
            "lastMessage": "see you",
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-02T10:00:00Z"
        }"#;
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn partner_is_role_independent() {
        let conv = conversation();
        assert_eq!(conv.partner_id("u1"), Some("u2"));
        assert_eq!(conv.partner_id("u2"), Some("u1"));
        assert_eq!(conv.partner_id("u3"), None);
        assert_eq!(conv.partner("u2").map(|u| u.display_name()), Some("Ana".into()));
        assert!(conv.includes("u1"));
    }
}
