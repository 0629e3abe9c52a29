#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("query failed: {0}")]
    QueryFailed(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    #[error("version conflict on {id}: expected version {expected}")]
    VersionConflict { id: String, expected: i64 },
    #[error("corrupt record: {0}")]
    CorruptRecord(String),
}

impl RepositoryError {
    /// Lost a write race; re-running the whole read-modify-write may succeed.
    pub fn is_write_conflict(&self) -> bool {
        matches!(
            self,
            RepositoryError::DuplicateKey(_) | RepositoryError::VersionConflict { .. }
        )
    }
}
