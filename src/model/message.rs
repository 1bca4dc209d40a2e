use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Messages can only be edited by their sender within this many seconds of creation.
pub const EDIT_WINDOW_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Es,
    Fr,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Fr => "fr",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Language::En),
            "es" => Some(Language::Es),
            "fr" => Some(Language::Fr),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    pub original_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub es: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fr: Option<String>,
}

impl MessageBody {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            original_text: text.into(),
            en: None,
            es: None,
            fr: None,
        }
    }

    pub fn translation(&self, lang: Language) -> Option<&str> {
        let value = match lang {
            Language::En => self.en.as_deref(),
            Language::Es => self.es.as_deref(),
            Language::Fr => self.fr.as_deref(),
        };
        value.filter(|t| !t.trim().is_empty())
    }

    /// Text to render: the requested translation when available, else the original.
    pub fn text_for(&self, lang: Option<Language>) -> &str {
        lang.and_then(|l| self.translation(l))
            .unwrap_or(self.original_text.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default, alias = "originalFilename")]
    pub original_name: Option<String>,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.mime_type
            .as_deref()
            .map(|m| m.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false)
    }

    /// Name shown to the user; falls back to the last URL segment.
    pub fn display_name(&self) -> &str {
        if let Some(name) = self.original_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name;
        }
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        path.rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(self.id.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Sent,
    Delivered,
    Read,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub body: Option<MessageBody>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub replied_to_message_id: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    pub fn is_attachment_only(&self) -> bool {
        self.body.is_none() && !self.attachments.is_empty()
    }

    /// Only the sender may edit, only while the message is live and inside the edit window.
    pub fn is_editable_by(&self, user_id: &str, now: DateTime<Utc>) -> bool {
        if self.is_deleted || self.sender_id != user_id || self.body.is_none() {
            return false;
        }
        let age = now.signed_duration_since(self.created_at);
        age >= Duration::zero() && age <= Duration::seconds(EDIT_WINDOW_SECS)
    }

    /// Rendered text; deleted messages never expose their body.
    pub fn display_text(&self, lang: Option<Language>) -> Option<&str> {
        if self.is_deleted {
            return None;
        }
        self.body.as_ref().map(|b| b.text_for(lang))
    }

    /// Shallow merge: every field present in the patch overwrites the stored one.
    pub fn merge(&mut self, patch: MessagePatch) {
        let MessagePatch {
            id: _,
            conversation_id,
            sender_id,
            receiver_id,
            body,
            attachments,
            replied_to_message_id,
            is_deleted,
            status,
            created_at,
            updated_at,
        } = patch;

        if let Some(v) = conversation_id {
            self.conversation_id = v;
        }
        if let Some(v) = sender_id {
            self.sender_id = v;
        }
        if let Some(v) = receiver_id {
            self.receiver_id = v;
        }
        if let Some(v) = body {
            self.body = v;
        }
        if let Some(v) = attachments {
            self.attachments = v;
        }
        if let Some(v) = replied_to_message_id {
            self.replied_to_message_id = v;
        }
        if let Some(v) = is_deleted {
            self.is_deleted = v;
        }
        if let Some(v) = status {
            self.status = v;
        }
        if let Some(v) = created_at {
            self.created_at = v;
        }
        if let Some(v) = updated_at {
            self.updated_at = v;
        }
    }
}

/// Partial message as carried by `messageDeletionToggled`.
///
/// Nullable fields use a double `Option` so an explicit `null` (e.g. `"body": null`)
/// is distinguishable from an absent key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub body: Option<Option<MessageBody>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub replied_to_message_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MessagePatch {
    pub fn deletion(id: impl Into<String>, is_deleted: bool) -> Self {
        Self {
            id: id.into(),
            is_deleted: Some(is_deleted),
            ..Default::default()
        }
    }
}

impl From<Message> for MessagePatch {
    fn from(msg: Message) -> Self {
        Self {
            id: msg.id,
            conversation_id: Some(msg.conversation_id),
            sender_id: Some(msg.sender_id),
            receiver_id: Some(msg.receiver_id),
            body: Some(msg.body),
            attachments: Some(msg.attachments),
            replied_to_message_id: Some(msg.replied_to_message_id),
            is_deleted: Some(msg.is_deleted),
            status: Some(msg.status),
            created_at: Some(msg.created_at),
            updated_at: Some(msg.updated_at),
        }
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
