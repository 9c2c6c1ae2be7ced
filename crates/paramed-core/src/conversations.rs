//! Inbox view over a user's messages.

use std::collections::HashMap;

use paramed_store::types::{StoredMessage, UserId};
use serde::Serialize;

/// All messages exchanged between a user and one other participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    pub counterpart: UserId,
    pub last_message: StoredMessage,
    pub message_count: usize,
    /// Messages addressed to the user that carry no read timestamp.
    pub unread_count: usize,
}

/// Group `messages` by the participant on the other side from `user`.
///
/// Messages not involving `user` are ignored. Conversations are ordered by
/// the time of their last message, newest first.
#[must_use]
pub fn group_conversations(user: UserId, messages: &[StoredMessage]) -> Vec<Conversation> {
    let mut by_counterpart: HashMap<UserId, Conversation> = HashMap::new();

    for message in messages
        .iter()
        .filter(|m| m.sender == user || m.recipient == user)
    {
        let counterpart = message.counterpart(user);
        let unread = usize::from(message.is_unread_by(user));
        by_counterpart
            .entry(counterpart)
            .and_modify(|c| {
                c.message_count += 1;
                c.unread_count += unread;
                if (&message.created_at, message.id)
                    >= (&c.last_message.created_at, c.last_message.id)
                {
                    c.last_message = message.clone();
                }
            })
            .or_insert_with(|| Conversation {
                counterpart,
                last_message: message.clone(),
                message_count: 1,
                unread_count: unread,
            });
    }

    let mut conversations: Vec<Conversation> = by_counterpart.into_values().collect();
    conversations.sort_by(|a, b| {
        (&b.last_message.created_at, b.last_message.id)
            .cmp(&(&a.last_message.created_at, a.last_message.id))
    });
    conversations
}

#[cfg(test)]
mod tests {
    use paramed_store::types::NewMessage;
    use paramed_store::{InMemoryMessageStore, MessageStore};

    use super::*;

    const STUDENT: UserId = UserId(1);
    const INSTRUCTOR: UserId = UserId(2);
    const ADMIN: UserId = UserId(3);

    fn message(id: i64, sender: UserId, recipient: UserId, at: &str, read: bool) -> StoredMessage {
        StoredMessage {
            id: paramed_store::types::MessageId(id),
            sender,
            recipient,
            subject: format!("subject {id}"),
            body: format!("body {id}"),
            created_at: at.to_owned(),
            read_at: read.then(|| at.to_owned()),
        }
    }

    #[test]
    fn empty_inbox() {
        assert!(group_conversations(STUDENT, &[]).is_empty());
    }

    #[test]
    fn groups_by_counterpart_newest_first() {
        let messages = vec![
            message(1, INSTRUCTOR, STUDENT, "2026-01-01 09:00:00.000", true),
            message(2, STUDENT, ADMIN, "2026-01-02 09:00:00.000", false),
            message(3, STUDENT, INSTRUCTOR, "2026-01-03 09:00:00.000", false),
            message(4, INSTRUCTOR, STUDENT, "2026-01-04 09:00:00.000", false),
        ];
        let conversations = group_conversations(STUDENT, &messages);

        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].counterpart, INSTRUCTOR);
        assert_eq!(conversations[0].message_count, 3);
        assert_eq!(conversations[0].unread_count, 1);
        assert_eq!(conversations[0].last_message.id.0, 4);
        assert_eq!(conversations[1].counterpart, ADMIN);
        assert_eq!(conversations[1].unread_count, 0);
    }

    #[test]
    fn own_unread_outgoing_messages_do_not_count() {
        let messages = vec![message(1, STUDENT, INSTRUCTOR, "2026-01-01 09:00:00.000", false)];
        let conversations = group_conversations(STUDENT, &messages);
        assert_eq!(conversations[0].unread_count, 0);

        let conversations = group_conversations(INSTRUCTOR, &messages);
        assert_eq!(conversations[0].counterpart, STUDENT);
        assert_eq!(conversations[0].unread_count, 1);
    }

    #[test]
    fn unrelated_messages_are_ignored() {
        let messages = vec![message(1, INSTRUCTOR, ADMIN, "2026-01-01 09:00:00.000", false)];
        assert!(group_conversations(STUDENT, &messages).is_empty());
    }

    #[test]
    fn last_message_uses_id_when_timestamps_tie() {
        let at = "2026-01-01 09:00:00.000";
        let messages = vec![
            message(7, INSTRUCTOR, STUDENT, at, false),
            message(5, STUDENT, INSTRUCTOR, at, false),
        ];
        let conversations = group_conversations(STUDENT, &messages);
        assert_eq!(conversations[0].last_message.id.0, 7);
    }

    #[tokio::test]
    async fn works_over_message_store() {
        let store = InMemoryMessageStore::default();
        for (sender, recipient) in [(INSTRUCTOR, STUDENT), (ADMIN, STUDENT), (STUDENT, INSTRUCTOR)] {
            store
                .send(NewMessage {
                    sender,
                    recipient,
                    subject: "Splinting".into(),
                    body: "See feedback".into(),
                })
                .await
                .unwrap();
        }

        let inbox = store.messages_for(STUDENT).await.unwrap();
        let conversations = group_conversations(STUDENT, &inbox);
        let total_unread: usize = conversations.iter().map(|c| c.unread_count).sum();
        assert_eq!(total_unread, 2);

        store.mark_conversation_read(STUDENT, INSTRUCTOR).await.unwrap();
        let inbox = store.messages_for(STUDENT).await.unwrap();
        let conversations = group_conversations(STUDENT, &inbox);
        let instructor = conversations
            .iter()
            .find(|c| c.counterpart == INSTRUCTOR)
            .unwrap();
        assert_eq!(instructor.unread_count, 0);
        assert_eq!(instructor.message_count, 2);
    }
}
