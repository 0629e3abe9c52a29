use std::collections::{BTreeMap, BTreeSet};

use super::{ConversationId, Message, ParticipantKey, Username};
use chrono::{DateTime, Utc};

pub const MAX_MESSAGES_PER_CONVERSATION: usize = 100;
pub const MAX_MESSAGE_LENGTH: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    #[error("cannot start a conversation with yourself")]
    SelfConversation,
    #[error("message content is empty")]
    EmptyContent,
    #[error("message content exceeds maximum length of {max} characters")]
    ContentTooLong { max: usize },
    #[error("{0} is not a participant in this conversation")]
    NotAParticipant(String),
    #[error("invalid conversation state: {0}")]
    InvalidState(String),
}

/// Raw conversation fields as read back from storage.
#[derive(Debug, Clone)]
pub struct StoredConversation {
    pub id: ConversationId,
    pub participants: Vec<Username>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub messages: Vec<Message>,
    pub unread_counts: BTreeMap<Username, u32>,
    pub deleted_by: Vec<Username>,
    pub version: i64,
}

/// Two-party conversation aggregate.
///
/// Participants are kept in canonical order, `unread_counts` always holds
/// exactly the two participants, and at most
/// [`MAX_MESSAGES_PER_CONVERSATION`] messages are retained.
#[derive(Debug, Clone)]
pub struct Conversation {
    id: Option<ConversationId>,
    participants: [Username; 2],
    participant_key: ParticipantKey,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    messages: Vec<Message>,
    unread_counts: BTreeMap<Username, u32>,
    deleted_by: BTreeSet<Username>,
    version: i64,
}

impl Conversation {
    pub fn create(user_a: &Username, user_b: &Username) -> Result<Self, ConversationError> {
        if user_a == user_b {
            return Err(ConversationError::SelfConversation);
        }

        let now = Utc::now();
        let participants = ParticipantKey::canonical_pair(user_a, user_b);
        let unread_counts = participants.iter().map(|p| (p.clone(), 0)).collect();

        Ok(Self {
            id: None,
            participant_key: ParticipantKey::new(user_a, user_b),
            participants,
            created_at: now,
            last_updated: now,
            messages: Vec::new(),
            unread_counts,
            deleted_by: BTreeSet::new(),
            version: 0,
        })
    }

    /// Rebuilds a persisted conversation, re-checking every invariant.
    pub fn restore(stored: StoredConversation) -> Result<Self, ConversationError> {
        let [user_a, user_b]: [Username; 2] = stored.participants.try_into().map_err(
            |p: Vec<Username>| {
                ConversationError::InvalidState(format!(
                    "expected 2 participants, found {}",
                    p.len()
                ))
            },
        )?;

        let mut conversation = Self::create(&user_a, &user_b)
            .map_err(|_| ConversationError::InvalidState("duplicate participant".to_string()))?;

        for (user, count) in stored.unread_counts {
            match conversation.unread_counts.get_mut(&user) {
                Some(slot) => *slot = count,
                None => {
                    return Err(ConversationError::InvalidState(format!(
                        "unread count for non-participant {}",
                        user
                    )));
                }
            }
        }

        for user in stored.deleted_by {
            if !conversation.has_participant(&user) {
                return Err(ConversationError::InvalidState(format!(
                    "deleted by non-participant {}",
                    user
                )));
            }
            conversation.deleted_by.insert(user);
        }

        for message in &stored.messages {
            if !conversation.has_participant(&message.sender) {
                return Err(ConversationError::InvalidState(format!(
                    "message from non-participant {}",
                    message.sender
                )));
            }
            validate_content(&message.content)
                .map_err(|e| ConversationError::InvalidState(format!("stored message: {}", e)))?;
        }

        conversation.id = Some(stored.id);
        conversation.created_at = stored.created_at;
        conversation.last_updated = stored.last_updated;
        conversation.messages = stored.messages;
        conversation.version = stored.version;
        conversation.enforce_retention();

        Ok(conversation)
    }

    pub fn id(&self) -> Option<ConversationId> {
        self.id
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn participants(&self) -> &[Username; 2] {
        &self.participants
    }

    pub fn participant_key(&self) -> &ParticipantKey {
        &self.participant_key
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn latest_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn unread_counts(&self) -> &BTreeMap<Username, u32> {
        &self.unread_counts
    }

    pub fn unread_count_for(&self, user: &Username) -> u32 {
        self.unread_counts.get(user).copied().unwrap_or(0)
    }

    pub fn deleted_by(&self) -> &BTreeSet<Username> {
        &self.deleted_by
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn has_participant(&self, user: &Username) -> bool {
        self.participants.contains(user)
    }

    pub fn other_participant(&self, user: &Username) -> Result<&Username, ConversationError> {
        if *user == self.participants[0] {
            Ok(&self.participants[1])
        } else if *user == self.participants[1] {
            Ok(&self.participants[0])
        } else {
            Err(ConversationError::NotAParticipant(user.to_string()))
        }
    }

    pub fn add_message(&mut self, sender: &Username, content: String) -> Result<(), ConversationError> {
        validate_content(&content)?;

        let receiver = self.other_participant(sender)?.clone();

        let message = Message::new(sender.clone(), content);
        self.last_updated = message.created_at;
        self.messages.push(message);

        let unread = self.unread_counts.entry(receiver).or_insert(0);
        *unread = unread.saturating_add(1);

        self.enforce_retention();
        Ok(())
    }

    pub fn mark_read_for(&mut self, user: &Username) -> Result<(), ConversationError> {
        if !self.has_participant(user) {
            return Err(ConversationError::NotAParticipant(user.to_string()));
        }

        self.unread_counts.insert(user.clone(), 0);
        Ok(())
    }

    pub fn is_deleted_by(&self, user: &Username) -> bool {
        self.deleted_by.contains(user)
    }

    pub fn is_deleted_by_both(&self) -> bool {
        self.participants.iter().all(|p| self.deleted_by.contains(p))
    }

    pub fn mark_deleted_by(&mut self, user: &Username) -> Result<(), ConversationError> {
        if !self.has_participant(user) {
            return Err(ConversationError::NotAParticipant(user.to_string()));
        }

        self.deleted_by.insert(user.clone());
        Ok(())
    }

    /// Returns `true` if `user` had deleted the conversation.
    pub fn reactivate_for(&mut self, user: &Username) -> bool {
        self.deleted_by.remove(user)
    }

    pub fn mark_persisted(&mut self, id: ConversationId, version: i64) {
        self.id = Some(id);
        self.version = version;
    }

    /// List projection: keeps only the most recent message.
    pub fn with_latest_message_only(mut self) -> Self {
        let keep_from = self.messages.len().saturating_sub(1);
        self.messages.drain(..keep_from);
        self
    }

    fn enforce_retention(&mut self) {
        if self.messages.len() > MAX_MESSAGES_PER_CONVERSATION {
            let excess = self.messages.len() - MAX_MESSAGES_PER_CONVERSATION;
            self.messages.drain(..excess);
        }
    }
}

fn validate_content(content: &str) -> Result<(), ConversationError> {
    if content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ConversationError::ContentTooLong {
            max: MAX_MESSAGE_LENGTH,
        });
    }

    if content.trim().is_empty() {
        return Err(ConversationError::EmptyContent);
    }

    Ok(())
}
