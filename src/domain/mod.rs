mod conversation;
mod conversation_id;
mod message;
mod participant_key;
mod username;

pub use conversation::{
    Conversation, ConversationError, MAX_MESSAGE_LENGTH, MAX_MESSAGES_PER_CONVERSATION,
    StoredConversation,
};
pub use conversation_id::ConversationId;
pub use message::Message;
pub use participant_key::{PARTICIPANT_KEY_SEPARATOR, ParticipantKey};
pub use username::{MAX_USERNAME_LENGTH, MIN_USERNAME_LENGTH, Username};
