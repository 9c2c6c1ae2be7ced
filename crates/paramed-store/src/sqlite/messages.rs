use super::SqliteStore;
use crate::error::StoreError;
use crate::messages::{MessageStore, now_timestamp};
use crate::types::{MessageId, NewMessage, StoredMessage, UserId};

type MessageTuple = (MessageId, UserId, UserId, String, String, String, Option<String>);

fn message_from_tuple(t: MessageTuple) -> StoredMessage {
    StoredMessage {
        id: t.0,
        sender: t.1,
        recipient: t.2,
        subject: t.3,
        body: t.4,
        created_at: t.5,
        read_at: t.6,
    }
}

impl MessageStore for SqliteStore {
    async fn send(&self, message: NewMessage) -> Result<MessageId, StoreError> {
        let row: (MessageId,) = sqlx::query_as(
            "INSERT INTO messages (sender_id, recipient_id, subject, body, created_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(message.sender)
        .bind(message.recipient)
        .bind(&message.subject)
        .bind(&message.body)
        .bind(now_timestamp())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    async fn messages_for(&self, user: UserId) -> Result<Vec<StoredMessage>, StoreError> {
        let rows: Vec<MessageTuple> = sqlx::query_as(
            "SELECT id, sender_id, recipient_id, subject, body, created_at, read_at \
             FROM messages WHERE sender_id = ? OR recipient_id = ? \
             ORDER BY created_at, id",
        )
        .bind(user)
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(message_from_tuple).collect())
    }

    async fn mark_conversation_read(&self, user: UserId, other: UserId) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE messages SET read_at = ? \
             WHERE recipient_id = ? AND sender_id = ? AND read_at IS NULL",
        )
        .bind(now_timestamp())
        .bind(user)
        .bind(other)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(from: i64, to: i64, body: &str) -> NewMessage {
        NewMessage {
            sender: UserId(from),
            recipient: UserId(to),
            subject: "Skill check".into(),
            body: body.into(),
        }
    }

    #[tokio::test]
    async fn send_and_list() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        store.send(msg(1, 2, "hello")).await.unwrap();
        store.send(msg(2, 1, "hi back")).await.unwrap();
        store.send(msg(4, 5, "elsewhere")).await.unwrap();

        let mine = store.messages_for(UserId(1)).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].body, "hello");
        assert_eq!(mine[1].sender, UserId(2));
        assert!(mine.iter().all(|m| m.read_at.is_none()));
    }

    #[tokio::test]
    async fn mark_read_updates_only_incoming() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        store.send(msg(2, 1, "a")).await.unwrap();
        store.send(msg(1, 2, "b")).await.unwrap();

        assert_eq!(
            store
                .mark_conversation_read(UserId(1), UserId(2))
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .mark_conversation_read(UserId(1), UserId(2))
                .await
                .unwrap(),
            0
        );
        let mine = store.messages_for(UserId(1)).await.unwrap();
        assert!(mine.iter().all(|m| !m.is_unread_by(UserId(1))));
        assert!(mine.iter().any(|m| m.is_unread_by(UserId(2))));
    }
}
