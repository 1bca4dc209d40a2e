use std::cmp::Reverse;

use tracing::debug;

use crate::model::conversation::Conversation;
use crate::model::message::Message;
use crate::model::pagination::Page;

use super::window::{PaginationWindowController, QueryState, ScrollSentinel};

/// The member's conversations, most recently active first, revealed through a
/// top-anchored window persisted under `page`/`pageSize`.
#[derive(Debug, Clone)]
pub struct ConversationList {
    me: String,
    conversations: Vec<Conversation>,
    window: PaginationWindowController,
    sentinel: ScrollSentinel,
}

impl ConversationList {
    pub fn new(me: impl Into<String>) -> Self {
        Self {
            me: me.into(),
            conversations: Vec::new(),
            window: PaginationWindowController::for_conversations(),
            sentinel: ScrollSentinel::default(),
        }
    }

    pub fn load(&mut self, page: Page<Conversation>, location: &mut impl QueryState) {
        let Page { items, info } = page;
        let loaded = items.len();
        self.conversations = items.into_iter().filter(|c| c.includes(&self.me)).collect();
        self.resort();
        self.window.initialize(&info, loaded, location);
        debug!(
            conversations = self.conversations.len(),
            "conversation list loaded"
        );
    }

    pub fn me(&self) -> &str {
        &self.me
    }

    pub fn window(&self) -> &PaginationWindowController {
        &self.window
    }

    pub fn visible(&self) -> &[Conversation] {
        self.window.visible_slice(&self.conversations)
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

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

    /// Refresh the preview of the thread a live message belongs to and move it to the top.
    pub fn note_message(&mut self, msg: &Message) -> bool {
        let Some(conv) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == msg.conversation_id)
        else {
            return false;
        };
        conv.last_message_id = Some(msg.id.clone());
        if let Some(body) = msg.body.as_ref() {
            conv.last_message = Some(body.original_text.clone());
        }
        if msg.updated_at > conv.updated_at {
            conv.updated_at = msg.updated_at;
        }
        self.resort();
        true
    }

    fn resort(&mut self) {
        self.conversations.sort_by_key(|c| Reverse(c.updated_at));
    }
}
