pub mod grouping;
pub mod list;
pub mod menu;
pub mod presence;
pub mod store;
pub mod window;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, trace, warn};

use crate::model::message::{Language, Message, MessagePatch};
use crate::model::pagination::Page;
use crate::ws::events::{
    DeleteAttachmentPayload, InboundEvent, OutboundEvent, SendMessagePayload,
    ToggleDeletionPayload,
};
use crate::ws::transport::SocketTransport;

use grouping::group_starts;
use menu::MessageMenu;
use presence::PresenceTracker;
use store::MessageStore;
use window::{PaginationWindowController, QueryState, ScrollSentinel};

/// Result of a user action that goes out over the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    Sent,
    /// Not emitted: socket down, nothing to send, or the transport refused it.
    Dropped,
}

impl EmitOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, EmitOutcome::Sent)
    }
}

/// One rendered line of the visible window.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow<'a> {
    pub message: &'a Message,
    /// Only group starts render the sender's avatar.
    pub starts_group: bool,
    /// The replied-to message, when it is known locally.
    pub reply_to: Option<&'a Message>,
}

/// Client-side state of one open conversation: messages, window, presence and
/// the per-message menu. Discarded when the user navigates away.
pub struct ConversationView {
    me: String,
    conversation_id: String,
    partner_id: Option<String>,
    language: Option<Language>,
    store: MessageStore,
    window: PaginationWindowController,
    presence: PresenceTracker,
    menu: MessageMenu,
    sentinel: ScrollSentinel,
    transport: Arc<dyn SocketTransport>,
}

impl ConversationView {
    pub fn new(
        me: impl Into<String>,
        conversation_id: impl Into<String>,
        transport: Arc<dyn SocketTransport>,
    ) -> Self {
        Self {
            me: me.into(),
            conversation_id: conversation_id.into(),
            partner_id: None,
            language: None,
            store: MessageStore::new(),
            window: PaginationWindowController::for_messages(),
            presence: PresenceTracker::new(),
            menu: MessageMenu::default(),
            sentinel: ScrollSentinel::default(),
            transport,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn window(&self) -> &PaginationWindowController {
        &self.window
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn menu(&self) -> &MessageMenu {
        &self.menu
    }

    pub fn menu_mut(&mut self) -> &mut MessageMenu {
        &mut self.menu
    }

    pub fn language(&self) -> Option<Language> {
        self.language
    }

    /// Preferred translation for rendered bodies; `None` shows the original text.
    pub fn set_language(&mut self, language: Option<Language>) {
        self.language = language;
    }

    /// Seed from the REST page and size the window from its pagination info.
    pub fn load(&mut self, page: Page<Message>, location: &mut impl QueryState) {
        let Page { items, info } = page;
        let loaded = items.len();
        self.store.seed(items);
        self.window.initialize(&info, loaded, location);
        self.menu.close();
        debug!(
            conversation_id = self.conversation_id.as_str(),
            messages = self.store.len(),
            window = self.window.window_size(),
            "conversation loaded"
        );
    }

    /// The window reaches past the loaded history while the server holds more.
    pub fn needs_history(&self) -> bool {
        let loaded = self.store.len();
        self.window.window_size() > loaded && loaded < self.window.total_items()
    }

    /// Merge a larger history page fetched after the window grew. The window
    /// itself is left alone.
    pub fn merge_history(&mut self, page: Page<Message>) -> usize {
        let items: Vec<Message> = page
            .items
            .into_iter()
            .filter(|m| self.belongs_here(m))
            .collect();
        self.store.extend_history(items)
    }

    /// Switch the partner whose presence is shown. Presence restarts as unknown.
    pub fn set_partner(&mut self, partner_id: &str) {
        if self.partner_id.as_deref() == Some(partner_id) {
            return;
        }
        self.presence.reset();
        self.partner_id = Some(partner_id.to_string());
    }

    pub fn partner_id(&self) -> Option<&str> {
        self.partner_id.as_deref()
    }

    pub fn is_partner_online(&self) -> bool {
        self.partner_id
            .as_deref()
            .map(|id| self.presence.is_online(id))
            .unwrap_or(false)
    }

    /// Merge one socket event. Returns whether anything observable changed.
    pub fn handle_event(&mut self, event: InboundEvent) -> bool {
        trace!(event = event.name(), "applying socket event");
        match event {
            InboundEvent::NewMessage(msg) => {
                if !self.belongs_here(&msg) {
                    return false;
                }
                self.store.apply_new_message(msg)
            }
            InboundEvent::MessageEdited(patch) => {
                if !self.patch_belongs_here(&patch) {
                    return false;
                }
                self.store.apply_edited_message(patch)
            }
            InboundEvent::MessageDeletionToggled(patch) => {
                if !self.patch_belongs_here(&patch) {
                    return false;
                }
                self.store.apply_deletion_toggled(patch)
            }
            InboundEvent::UserStatusChanged(status) => {
                let concerns_partner = self.partner_id.as_deref() == Some(status.user_id.as_str());
                let changed = self.presence.apply(status);
                concerns_partner && changed
            }
        }
    }

    /// Feed the sentinel's intersection state; grows the window when it comes into view.
    pub fn on_sentinel(
        &mut self,
        intersecting: bool,
        location: &mut impl QueryState,
    ) -> Option<usize> {
        if self.sentinel.observe(intersecting) {
            self.window.on_near_boundary(location)
        } else {
            None
        }
    }

    pub fn visible(&self) -> Vec<MessageRow<'_>> {
        let slice = self.window.visible_slice(self.store.sorted_view());
        group_starts(slice)
            .into_iter()
            .zip(slice)
            .map(|(starts_group, message)| MessageRow {
                message,
                starts_group,
                reply_to: message
                    .replied_to_message_id
                    .as_deref()
                    .and_then(|id| self.store.get(id)),
            })
            .collect()
    }

    /// Rendered body of a message in the preferred language.
    pub fn text_of<'a>(&self, message: &'a Message) -> Option<&'a str> {
        message.display_text(self.language)
    }

    pub fn can_edit(&self, message_id: &str, now: DateTime<Utc>) -> bool {
        self.store
            .get(message_id)
            .map(|m| m.is_editable_by(&self.me, now))
            .unwrap_or(false)
    }

    pub fn send_message(&self, text: &str, reply_to: Option<&str>) -> EmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return EmitOutcome::Dropped;
        }
        let Some(receiver_id) = self.partner_id.clone() else {
            warn!(
                conversation_id = self.conversation_id.as_str(),
                "no partner set; message not sent"
            );
            return EmitOutcome::Dropped;
        };

        self.emit(OutboundEvent::SendMessage(SendMessagePayload {
            sender_id: self.me.clone(),
            receiver_id,
            conversation_id: self.conversation_id.clone(),
            message: text.to_string(),
            reply_to_message_id: reply_to.map(str::to_string),
        }))
    }

    pub fn toggle_deletion(&self, message_id: &str, is_deleted: bool) -> EmitOutcome {
        self.emit(OutboundEvent::ToggleMessageDeletion(ToggleDeletionPayload {
            message_id: message_id.to_string(),
            is_deleted,
        }))
    }

    pub fn delete_attachment(&self, attachment_id: &str, message_id: &str) -> EmitOutcome {
        self.emit(OutboundEvent::DeleteAttachment(DeleteAttachmentPayload {
            attachment_id: attachment_id.to_string(),
            message_id: message_id.to_string(),
        }))
    }

    fn emit(&self, event: OutboundEvent) -> EmitOutcome {
        if !self.transport.is_connected() {
            debug!(event = event.name(), "socket disconnected; event dropped");
            return EmitOutcome::Dropped;
        }
        let name = event.name();
        match self.transport.emit(event) {
            Ok(()) => EmitOutcome::Sent,
            Err(err) => {
                warn!(event = name, error = %err, "socket emit failed; event dropped");
                EmitOutcome::Dropped
            }
        }
    }

    fn belongs_here(&self, msg: &Message) -> bool {
        if msg.conversation_id == self.conversation_id {
            return true;
        }
        trace!(
            message_id = msg.id.as_str(),
            conversation_id = msg.conversation_id.as_str(),
            "event for another conversation ignored"
        );
        false
    }

    /// Patches without a `conversationId` are applied by id.
    fn patch_belongs_here(&self, patch: &MessagePatch) -> bool {
        match patch.conversation_id.as_deref() {
            Some(id) if id != self.conversation_id => {
                trace!(
                    message_id = patch.id.as_str(),
                    conversation_id = id,
                    "event for another conversation ignored"
                );
                false
            }
            _ => true,
        }
    }
}
