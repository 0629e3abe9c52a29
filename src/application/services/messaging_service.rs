use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::application::ports::{ConversationStore, RepositoryError, UserDirectory};
use crate::domain::{Conversation, ConversationError, Username};

/// Direct-messaging use cases on top of a [`ConversationStore`].
///
/// Every mutating use case is a read-modify-write against the store. Lost
/// write races (a concurrent first insert, or a stale version on update) are
/// re-driven from the fetch up to `max_write_attempts` times.
pub struct MessagingService {
    conversation_store: Arc<dyn ConversationStore>,
    user_directory: Arc<dyn UserDirectory>,
    store_timeout: Duration,
    max_write_attempts: u32,
}

impl MessagingService {
    pub fn new(
        conversation_store: Arc<dyn ConversationStore>,
        user_directory: Arc<dyn UserDirectory>,
        store_timeout: Duration,
        max_write_attempts: u32,
    ) -> Self {
        Self {
            conversation_store,
            user_directory,
            store_timeout,
            max_write_attempts: max_write_attempts.max(1),
        }
    }

    /// Returns the conversation between `me` and `target`, or a transient,
    /// unpersisted one if they have never exchanged messages.
    #[instrument(skip(self), fields(me = %me, target = %target))]
    pub async fn get_conversation(
        &self,
        me: &Username,
        target: &Username,
    ) -> Result<Conversation, MessagingError> {
        ensure_not_self(me, target)?;

        let found = self
            .bounded(
                "find_by_participants",
                self.conversation_store.find_by_participants(me, target),
            )
            .await?;

        match found {
            Some(conversation) if conversation.is_deleted_by(me) => Err(MessagingError::Gone),
            Some(conversation) => Ok(conversation),
            None => {
                debug!("No conversation yet, returning empty thread");
                Ok(Conversation::create(me, target)?)
            }
        }
    }

    #[instrument(skip(self, content), fields(me = %me, target = %target, content_chars = content.chars().count()))]
    pub async fn send_message(
        &self,
        me: &Username,
        target: &Username,
        content: String,
    ) -> Result<Conversation, MessagingError> {
        ensure_not_self(me, target)?;
        self.ensure_user_exists(target).await?;

        let content = content.as_str();
        let conversation = self
            .with_write_retries("send_message", move || {
                self.try_send_message(me, target, content)
            })
            .await?;

        info!(
            participant_key = %conversation.participant_key(),
            message_count = conversation.messages().len(),
            "Message sent"
        );
        Ok(conversation)
    }

    #[instrument(skip(self), fields(me = %me, target = %target))]
    pub async fn delete_conversation(
        &self,
        me: &Username,
        target: &Username,
    ) -> Result<(), MessagingError> {
        ensure_not_self(me, target)?;

        self.with_write_retries("delete_conversation", move || {
            self.try_delete_conversation(me, target)
        })
        .await
    }

    /// Succeeds as a no-op when the two users have no conversation yet.
    #[instrument(skip(self), fields(me = %me, target = %target))]
    pub async fn mark_read(&self, me: &Username, target: &Username) -> Result<(), MessagingError> {
        ensure_not_self(me, target)?;
        self.ensure_user_exists(target).await?;

        self.with_write_retries("mark_read", move || self.try_mark_read(me, target))
            .await
    }

    #[instrument(skip(self), fields(me = %me))]
    pub async fn list_conversations(
        &self,
        me: &Username,
    ) -> Result<Vec<Conversation>, MessagingError> {
        let conversations = self
            .bounded("list_for_user", self.conversation_store.list_for_user(me))
            .await?;

        debug!(count = conversations.len(), "Listed conversations");
        Ok(conversations)
    }

    #[instrument(skip(self), fields(me = %me))]
    pub async fn total_unread(&self, me: &Username) -> Result<u64, MessagingError> {
        self.bounded(
            "total_unread_for_user",
            self.conversation_store.total_unread_for_user(me),
        )
        .await
    }

    async fn try_send_message(
        &self,
        me: &Username,
        target: &Username,
        content: &str,
    ) -> Result<Conversation, MessagingError> {
        let found = self
            .bounded(
                "find_by_participants",
                self.conversation_store.find_by_participants(me, target),
            )
            .await?;

        let mut conversation = match found {
            Some(conversation) => conversation,
            None => Conversation::create(me, target)?,
        };

        if conversation.reactivate_for(me) {
            debug!("Sender had deleted the conversation, reactivating");
        }

        conversation.add_message(me, content.to_string())?;
        self.persist(&mut conversation).await?;

        Ok(conversation)
    }

    async fn try_delete_conversation(
        &self,
        me: &Username,
        target: &Username,
    ) -> Result<(), MessagingError> {
        let mut conversation = self
            .bounded(
                "find_by_participants",
                self.conversation_store.find_by_participants(me, target),
            )
            .await?
            .ok_or(MessagingError::NotFound)?;

        if conversation.is_deleted_by(me) {
            return Err(MessagingError::AlreadyDeleted);
        }

        conversation.mark_deleted_by(me)?;

        // The last participant to leave removes the document in one
        // version-checked write; a concurrent send turns this into a retry.
        match (conversation.is_deleted_by_both(), conversation.id()) {
            (true, Some(id)) => {
                self.bounded(
                    "remove",
                    self.conversation_store.remove(id, conversation.version()),
                )
                .await?;
                info!(conversation_id = %id, "Conversation deleted by both participants, removed");
            }
            _ => self.persist(&mut conversation).await?,
        }

        Ok(())
    }

    async fn try_mark_read(&self, me: &Username, target: &Username) -> Result<(), MessagingError> {
        let found = self
            .bounded(
                "find_by_participants",
                self.conversation_store.find_by_participants(me, target),
            )
            .await?;

        let Some(mut conversation) = found else {
            debug!("No conversation to mark as read");
            return Ok(());
        };

        if conversation.is_deleted_by(me) {
            return Err(MessagingError::Gone);
        }

        conversation.mark_read_for(me)?;
        self.persist(&mut conversation).await?;

        Ok(())
    }

    async fn persist(&self, conversation: &mut Conversation) -> Result<(), MessagingError> {
        match conversation.id() {
            Some(id) => {
                let version = self
                    .bounded("update", self.conversation_store.update(conversation))
                    .await?;
                conversation.mark_persisted(id, version);
            }
            None => {
                let id = self
                    .bounded("insert", self.conversation_store.insert(conversation))
                    .await?;
                conversation.mark_persisted(id, 1);
            }
        }
        Ok(())
    }

    async fn ensure_user_exists(&self, user: &Username) -> Result<(), MessagingError> {
        let exists = self
            .bounded("user_exists", self.user_directory.exists(user))
            .await?;

        if exists {
            Ok(())
        } else {
            Err(MessagingError::TargetNotFound(user.to_string()))
        }
    }

    async fn with_write_retries<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt_fn: F,
    ) -> Result<T, MessagingError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MessagingError>>,
    {
        let mut attempt = 1;
        loop {
            match attempt_fn().await {
                Err(MessagingError::Store(e))
                    if e.is_write_conflict() && attempt < self.max_write_attempts =>
                {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_write_attempts,
                        error = %e,
                        "Write conflict, retrying from a fresh read"
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn bounded<T, Fut>(&self, operation: &'static str, fut: Fut) -> Result<T, MessagingError>
    where
        Fut: Future<Output = Result<T, RepositoryError>>,
    {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(result) => result.map_err(MessagingError::Store),
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    "Store call timed out"
                );
                Err(MessagingError::Timeout(operation))
            }
        }
    }
}

fn ensure_not_self(me: &Username, target: &Username) -> Result<(), MessagingError> {
    if me == target {
        Err(MessagingError::SelfMessage)
    } else {
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("invalid username: {0}")]
    InvalidUsername(String),
    #[error("you cannot message yourself")]
    SelfMessage,
    #[error("user not found: {0}")]
    TargetNotFound(String),
    #[error("message content is empty")]
    EmptyContent,
    #[error("message content exceeds maximum length of {max} characters")]
    ContentTooLong { max: usize },
    #[error("{0} is not a participant in this conversation")]
    NotAParticipant(String),
    #[error("conversation not found")]
    NotFound,
    #[error("conversation has been deleted")]
    Gone,
    #[error("conversation already deleted")]
    AlreadyDeleted,
    #[error("store operation timed out: {0}")]
    Timeout(&'static str),
    #[error("store: {0}")]
    Store(#[from] RepositoryError),
}

impl From<ConversationError> for MessagingError {
    fn from(e: ConversationError) -> Self {
        match e {
            ConversationError::SelfConversation => MessagingError::SelfMessage,
            ConversationError::EmptyContent => MessagingError::EmptyContent,
            ConversationError::ContentTooLong { max } => MessagingError::ContentTooLong { max },
            ConversationError::NotAParticipant(user) => MessagingError::NotAParticipant(user),
            ConversationError::InvalidState(reason) => {
                MessagingError::Store(RepositoryError::CorruptRecord(reason))
            }
        }
    }
}
