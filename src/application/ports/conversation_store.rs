use crate::domain::{Conversation, ConversationId, Username};
use async_trait::async_trait;

use super::RepositoryError;

/// Persistent collection of conversations, keyed by participant pair.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Looks up by canonical participant key; argument order is irrelevant.
    async fn find_by_participants(
        &self,
        user_a: &Username,
        user_b: &Username,
    ) -> Result<Option<Conversation>, RepositoryError>;

    /// Fails with [`RepositoryError::DuplicateKey`] if the pair already has a conversation.
    async fn insert(&self, conversation: &Conversation) -> Result<ConversationId, RepositoryError>;

    /// Replaces the stored document if its version still matches and returns
    /// the new version. A stale copy fails with [`RepositoryError::VersionConflict`].
    async fn update(&self, conversation: &Conversation) -> Result<i64, RepositoryError>;

    /// Physically deletes the document only if it is still at
    /// `expected_version`. A missing or newer document fails with
    /// [`RepositoryError::VersionConflict`].
    async fn remove(
        &self,
        id: ConversationId,
        expected_version: i64,
    ) -> Result<(), RepositoryError>;

    /// Most-recent-first, excluding conversations `user` deleted, each
    /// carrying only its latest message.
    async fn list_for_user(&self, user: &Username) -> Result<Vec<Conversation>, RepositoryError>;

    async fn total_unread_for_user(&self, user: &Username) -> Result<u64, RepositoryError>;
}
