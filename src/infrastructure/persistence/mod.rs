mod pg_pool;
mod repositories;

pub use repositories::InMemoryConversationStore;
pub use repositories::InMemoryUserDirectory;
pub use repositories::PgConversationStore;
pub use repositories::PgUserDirectory;

pub use pg_pool::{create_pool, run_migrations};
