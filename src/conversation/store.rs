use tracing::{debug, trace};

use crate::model::message::{Message, MessagePatch};

/// In-memory projection of the open conversation's messages.
///
/// Kept sorted by ascending `created_at`; ties keep insertion order. Every merge
/// re-sorts because socket events can arrive out of order relative to the REST
/// history. None of the operations fail: events for unknown ids are dropped.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with a freshly fetched page.
    pub fn seed(&mut self, initial: Vec<Message>) {
        self.messages.clear();
        for msg in initial {
            if self.position(&msg.id).is_none() {
                self.messages.push(msg);
            }
        }
        self.resort();
        debug!(messages = self.messages.len(), "message store seeded");
    }

    /// Add a re-fetched history page; ids already held keep their local state.
    /// Returns how many messages were new.
    pub fn extend_history(&mut self, page: Vec<Message>) -> usize {
        let before = self.messages.len();
        for msg in page {
            if self.position(&msg.id).is_none() {
                self.messages.push(msg);
            }
        }
        let added = self.messages.len() - before;
        if added > 0 {
            self.resort();
        }
        debug!(added, messages = self.messages.len(), "history extended");
        added
    }

    /// Append unless a message with the same id is already known.
    pub fn apply_new_message(&mut self, msg: Message) -> bool {
        if self.position(&msg.id).is_some() {
            trace!(message_id = msg.id.as_str(), "duplicate newMessage ignored");
            return false;
        }
        self.messages.push(msg);
        self.resort();
        true
    }

    /// Apply an edit to the stored message with the same id; unknown ids are dropped.
    ///
    /// A full message replaces every field. A partial edit only touches the keys it carries.
    pub fn apply_edited_message(&mut self, edit: impl Into<MessagePatch>) -> bool {
        let edit = edit.into();
        let Some(idx) = self.position(&edit.id) else {
            debug!(message_id = edit.id.as_str(), "edit for unknown message dropped");
            return false;
        };
        self.messages[idx].merge(edit);
        self.resort();
        true
    }

    /// Shallow-merge the patch into the stored message; unknown ids are dropped.
    pub fn apply_deletion_toggled(&mut self, patch: MessagePatch) -> bool {
        let Some(idx) = self.position(&patch.id) else {
            debug!(
                message_id = patch.id.as_str(),
                "deletion toggle for unknown message dropped"
            );
            return false;
        };
        self.messages[idx].merge(patch);
        self.resort();
        true
    }

    pub fn sorted_view(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }

    fn resort(&mut self) {
        // sort_by_key is stable
        self.messages.sort_by_key(|m| m.created_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::{MessageBody, MessageStatus};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn msg(id: &str, t: i64) -> Message {
        Message {
            id: id.into(),
            conversation_id: "c1".into(),
            sender_id: "a".into(),
            receiver_id: "b".into(),
            body: Some(MessageBody::new(format!("text {id}"))),
            attachments: Vec::new(),
            replied_to_message_id: None,
            is_deleted: false,
            status: MessageStatus::Sent,
            created_at: at(t),
            updated_at: at(t),
        }
    }

    fn ids(store: &MessageStore) -> Vec<&str> {
        store.sorted_view().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn new_message_is_idempotent_by_id() {
        let mut store = MessageStore::new();
        assert!(store.apply_new_message(msg("m1", 1)));
        assert!(!store.apply_new_message(msg("m1", 1)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn out_of_order_arrival_is_sorted() {
        let mut store = MessageStore::new();
        store.seed(vec![msg("m3", 3), msg("m1", 1)]);
        store.apply_new_message(msg("m2", 2));
        assert_eq!(ids(&store), vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let mut store = MessageStore::new();
        store.seed(vec![msg("x", 5), msg("early", 1)]);
        store.apply_new_message(msg("y", 5));
        store.apply_new_message(msg("z", 5));
        store.apply_new_message(msg("w", 4));
        assert_eq!(ids(&store), vec!["early", "w", "x", "y", "z"]);

        // edits re-sort without disturbing equal-timestamp neighbours
        let mut edited = msg("y", 5);
        edited.body = Some(MessageBody::new("changed"));
        store.apply_edited_message(edited);
        assert_eq!(ids(&store), vec!["early", "w", "x", "y", "z"]);
    }

    #[test]
    fn extending_history_keeps_live_state() {
        let mut store = MessageStore::new();
        store.seed(vec![msg("m3", 3), msg("m4", 4)]);
        store.apply_deletion_toggled(MessagePatch::deletion("m4", true));

        let added = store.extend_history(vec![msg("m1", 1), msg("m2", 2), msg("m3", 3), msg("m4", 4)]);
        assert_eq!(added, 2);
        assert_eq!(ids(&store), vec!["m1", "m2", "m3", "m4"]);
        assert!(store.get("m4").unwrap().is_deleted);
    }

    #[test]
    fn edit_of_unknown_message_is_dropped() {
        let mut store = MessageStore::new();
        store.seed(vec![msg("m1", 1)]);
        let before = store.sorted_view().to_vec();
        assert!(!store.apply_edited_message(msg("ghost", 2)));
        assert_eq!(store.sorted_view(), before.as_slice());
    }

    #[test]
    fn deletion_toggle_merges_flag_only() {
        let mut store = MessageStore::new();
        store.seed(vec![msg("m1", 1)]);
        assert!(store.apply_deletion_toggled(MessagePatch::deletion("m1", true)));
        let stored = store.get("m1").unwrap();
        assert!(stored.is_deleted);
        assert_eq!(stored.body, Some(MessageBody::new("text m1")));

        assert!(!store.apply_deletion_toggled(MessagePatch::deletion("ghost", true)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn seed_replaces_previous_contents() {
        let mut store = MessageStore::new();
        store.seed(vec![msg("m1", 1), msg("m2", 2)]);
        store.seed(vec![msg("m9", 9)]);
        assert_eq!(ids(&store), vec!["m9"]);
    }
}
