use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use crate::application::ports::{ConversationStore, RepositoryError, UserDirectory};
use crate::domain::{Conversation, ConversationId, ParticipantKey, Username};

/// Process-local store with the same uniqueness and versioning rules as the
/// Postgres adapter.
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<ParticipantKey, Conversation>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn find_by_participants(
        &self,
        user_a: &Username,
        user_b: &Username,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let key = ParticipantKey::new(user_a, user_b);
        Ok(self.conversations.read().await.get(&key).cloned())
    }

    async fn insert(&self, conversation: &Conversation) -> Result<ConversationId, RepositoryError> {
        let key = conversation.participant_key().clone();
        let mut conversations = self.conversations.write().await;

        if conversations.contains_key(&key) {
            return Err(RepositoryError::DuplicateKey(key.to_string()));
        }

        let id = ConversationId::new();
        let mut stored = conversation.clone();
        stored.mark_persisted(id, 1);
        conversations.insert(key, stored);

        Ok(id)
    }

    async fn update(&self, conversation: &Conversation) -> Result<i64, RepositoryError> {
        let id = conversation.id().ok_or_else(|| {
            RepositoryError::NotFound(format!(
                "conversation {} has not been inserted",
                conversation.participant_key()
            ))
        })?;
        let conflict = || RepositoryError::VersionConflict {
            id: id.to_string(),
            expected: conversation.version(),
        };

        let mut conversations = self.conversations.write().await;
        let current = conversations
            .get_mut(conversation.participant_key())
            .ok_or_else(conflict)?;

        if current.id() != Some(id) || current.version() != conversation.version() {
            return Err(conflict());
        }

        let new_version = conversation.version() + 1;
        let mut stored = conversation.clone();
        stored.mark_persisted(id, new_version);
        *current = stored;

        Ok(new_version)
    }

    async fn remove(
        &self,
        id: ConversationId,
        expected_version: i64,
    ) -> Result<(), RepositoryError> {
        let mut conversations = self.conversations.write().await;

        let key = conversations
            .iter()
            .find(|(_, c)| c.id() == Some(id) && c.version() == expected_version)
            .map(|(key, _)| key.clone())
            .ok_or_else(|| RepositoryError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
            })?;

        conversations.remove(&key);
        Ok(())
    }

    async fn list_for_user(&self, user: &Username) -> Result<Vec<Conversation>, RepositoryError> {
        let mut visible: Vec<Conversation> = self
            .conversations
            .read()
            .await
            .values()
            .filter(|c| c.has_participant(user) && !c.is_deleted_by(user))
            .cloned()
            .collect();

        visible.sort_by(|a, b| b.last_updated().cmp(&a.last_updated()));

        Ok(visible
            .into_iter()
            .map(Conversation::with_latest_message_only)
            .collect())
    }

    async fn total_unread_for_user(&self, user: &Username) -> Result<u64, RepositoryError> {
        Ok(self
            .conversations
            .read()
            .await
            .values()
            .filter(|c| c.has_participant(user) && !c.is_deleted_by(user))
            .map(|c| u64::from(c.unread_count_for(user)))
            .sum())
    }
}

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashSet<Username>>,
}

impl InMemoryUserDirectory {
    pub fn with_users(users: impl IntoIterator<Item = Username>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().collect()),
        }
    }

    pub async fn add(&self, username: Username) {
        self.users.write().await.insert(username);
    }
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn exists(&self, username: &Username) -> Result<bool, RepositoryError> {
        Ok(self.users.read().await.contains(username))
    }
}
