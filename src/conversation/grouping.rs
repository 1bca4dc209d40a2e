use crate::model::message::Message;

/// `true` for every message that starts a run of consecutive messages from the
/// same sender. Deleted messages still count as their sender's.
pub fn group_starts(messages: &[Message]) -> Vec<bool> {
    group_starts_by(messages, |m| m.sender_id.as_str())
}

pub fn group_starts_by<'a, T, K, F>(items: &'a [T], key: F) -> Vec<bool>
where
    K: PartialEq,
    F: Fn(&'a T) -> K,
{
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| idx == 0 || key(&items[idx - 1]) != key(item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::MessageStatus;
    use chrono::{TimeZone, Utc};

    fn from(sender: &str, deleted: bool) -> Message {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Message {
            id: format!("{sender}-{deleted}"),
            conversation_id: "c1".into(),
            sender_id: sender.into(),
            receiver_id: "x".into(),
            body: None,
            attachments: Vec::new(),
            replied_to_message_id: None,
            is_deleted: deleted,
            status: MessageStatus::Read,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn sender_changes_start_groups() {
        let msgs = vec![
            from("A", false),
            from("A", false),
            from("B", false),
            from("A", false),
        ];
        assert_eq!(group_starts(&msgs), vec![true, false, true, true]);
    }

    #[test]
    fn deleted_message_does_not_break_group() {
        let msgs = vec![from("A", false), from("A", true), from("A", false)];
        assert_eq!(group_starts(&msgs), vec![true, false, false]);
    }

    #[test]
    fn empty_input() {
        assert!(group_starts(&[]).is_empty());
    }
}
