use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::conversation::presence::UserStatus;
use crate::model::message::{Message, MessagePatch};

/// Events pushed by the socket service.
///
/// On the wire each event is one JSON text frame: `{"event": "<name>", "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum InboundEvent {
    NewMessage(Message),
    /// Usually the full message; payloads carrying only some fields are accepted too.
    MessageEdited(MessagePatch),
    MessageDeletionToggled(MessagePatch),
    UserStatusChanged(UserStatus),
}

impl InboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::NewMessage(_) => "newMessage",
            InboundEvent::MessageEdited(_) => "messageEdited",
            InboundEvent::MessageDeletionToggled(_) => "messageDeletionToggled",
            InboundEvent::UserStatusChanged(_) => "userStatusChanged",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub sender_id: String,
    pub receiver_id: String,
    pub conversation_id: String,
    pub message: String,
    pub reply_to_message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleDeletionPayload {
    pub message_id: String,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAttachmentPayload {
    pub attachment_id: String,
    pub message_id: String,
}

/// Requests sent to the socket service. Fire-and-forget: there is no acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum OutboundEvent {
    SendMessage(SendMessagePayload),
    ToggleMessageDeletion(ToggleDeletionPayload),
    DeleteAttachment(DeleteAttachmentPayload),
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::SendMessage(_) => "sendMessage",
            OutboundEvent::ToggleMessageDeletion(_) => "toggleMessageDeletion",
            OutboundEvent::DeleteAttachment(_) => "deleteAttachment",
        }
    }
}

pub fn decode_frame(raw: &str) -> Result<InboundEvent> {
    serde_json::from_str(raw).context("malformed socket frame")
}

pub fn encode_frame(event: &OutboundEvent) -> Result<String> {
    serde_json::to_string(event).with_context(|| format!("failed to encode {}", event.name()))
}
