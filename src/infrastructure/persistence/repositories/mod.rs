mod in_memory_store;
mod pg_conversation_store;
mod pg_user_directory;

pub use in_memory_store::{InMemoryConversationStore, InMemoryUserDirectory};
pub use pg_conversation_store::PgConversationStore;
pub use pg_user_directory::PgUserDirectory;
