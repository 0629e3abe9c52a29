mod conversation_store;
mod repository_error;
mod user_directory;

pub use conversation_store::ConversationStore;
pub use repository_error::RepositoryError;
pub use user_directory::UserDirectory;
