use super::Username;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub sender: Username,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: Username, content: String) -> Self {
        Self {
            sender,
            content,
            created_at: Utc::now(),
        }
    }
}
