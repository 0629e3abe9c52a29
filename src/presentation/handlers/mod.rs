mod auth;
mod error;
mod health;
mod messages;

pub use auth::{AUTHENTICATED_USER_HEADER, AuthenticatedUser};
pub use error::{ApiError, ErrorResponse};
pub use health::health_handler;
pub use messages::{
    ConversationResponse, MessageResponse, SendMessageRequest, UnreadCountResponse,
    delete_conversation_handler, get_conversation_handler, list_conversations_handler,
    mark_read_handler, send_message_handler, unread_count_handler,
};
