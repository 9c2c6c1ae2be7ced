//! Student/instructor messaging storage.

use std::future::Future;
use std::sync::RwLock;

use crate::error::StoreError;
use crate::types::{MessageId, NewMessage, StoredMessage, UserId};

pub trait MessageStore: Send + Sync {
    /// Persist a new unread message and return its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn send(&self, message: NewMessage)
    -> impl Future<Output = Result<MessageId, StoreError>> + Send;

    /// Every message `user` sent or received, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn messages_for(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Vec<StoredMessage>, StoreError>> + Send;

    /// Mark all unread messages from `other` to `user` as read; returns how many changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn mark_conversation_read(
        &self,
        user: UserId,
        other: UserId,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%d %H:%M:%S%.3f")
        .to_string()
}

/// Process-local message store, used as a test double and for dry runs.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: RwLock<Vec<StoredMessage>>,
}

impl InMemoryMessageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<StoredMessage>>, StoreError> {
        self.messages
            .write()
            .map_err(|_| StoreError::Poisoned)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<StoredMessage>>, StoreError> {
        self.messages
            .read()
            .map_err(|_| StoreError::Poisoned)
    }
}

impl MessageStore for InMemoryMessageStore {
    async fn send(&self, message: NewMessage) -> Result<MessageId, StoreError> {
        let mut messages = self.write()?;
        let id = MessageId(i64::try_from(messages.len())? + 1);
        messages.push(StoredMessage {
            id,
            sender: message.sender,
            recipient: message.recipient,
            subject: message.subject,
            body: message.body,
            created_at: now_timestamp(),
            read_at: None,
        });
        Ok(id)
    }

    async fn messages_for(&self, user: UserId) -> Result<Vec<StoredMessage>, StoreError> {
        let messages = self.read()?;
        Ok(messages
            .iter()
            .filter(|m| m.sender == user || m.recipient == user)
            .cloned()
            .collect())
    }

    async fn mark_conversation_read(&self, user: UserId, other: UserId) -> Result<u64, StoreError> {
        let mut messages = self.write()?;
        let now = now_timestamp();
        let mut changed = 0;
        for msg in messages
            .iter_mut()
            .filter(|m| m.recipient == user && m.sender == other && m.read_at.is_none())
        {
            msg.read_at = Some(now.clone());
            changed += 1;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(from: i64, to: i64, body: &str) -> NewMessage {
        NewMessage {
            sender: UserId(from),
            recipient: UserId(to),
            subject: String::new(),
            body: body.into(),
        }
    }

    #[tokio::test]
    async fn send_assigns_increasing_ids() {
        let store = InMemoryMessageStore::new();
        let a = store.send(msg(1, 2, "a")).await.unwrap();
        let b = store.send(msg(2, 1, "b")).await.unwrap();
        assert!(a < b);
    }

    #[tokio::test]
    async fn messages_for_filters_by_participant() {
        let store = InMemoryMessageStore::new();
        store.send(msg(1, 2, "to two")).await.unwrap();
        store.send(msg(3, 1, "from three")).await.unwrap();
        store.send(msg(2, 3, "unrelated")).await.unwrap();

        let mine = store.messages_for(UserId(1)).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].body, "to two");
    }

    #[tokio::test]
    async fn mark_read_only_touches_incoming_from_other() {
        let store = InMemoryMessageStore::new();
        store.send(msg(2, 1, "one")).await.unwrap();
        store.send(msg(2, 1, "two")).await.unwrap();
        store.send(msg(1, 2, "reply")).await.unwrap();
        store.send(msg(3, 1, "other")).await.unwrap();

        let changed = store
            .mark_conversation_read(UserId(1), UserId(2))
            .await
            .unwrap();
        assert_eq!(changed, 2);

        let mine = store.messages_for(UserId(1)).await.unwrap();
        let unread: Vec<_> = mine.iter().filter(|m| m.is_unread_by(UserId(1))).collect();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].body, "other");
    }

    #[test]
    fn timestamp_shape() {
        let ts = now_timestamp();
        assert_eq!(ts.len(), "2026-01-01 00:00:00.000".len());
    }
}
