use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::application::ports::{ConversationStore, RepositoryError};
use crate::domain::{
    Conversation, ConversationId, Message, ParticipantKey, StoredConversation, Username,
};

pub struct PgConversationStore {
    pool: PgPool,
}

impl PgConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRecord {
    sender: String,
    content: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ConversationRow {
    id: Uuid,
    participants: Vec<String>,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    messages: Json<Vec<MessageRecord>>,
    unread_counts: Json<BTreeMap<String, i64>>,
    deleted_by: Vec<String>,
    version: i64,
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = RepositoryError;

    fn try_from(row: ConversationRow) -> Result<Self, Self::Error> {
        let participants = row
            .participants
            .iter()
            .map(|p| parse_username(p))
            .collect::<Result<Vec<_>, _>>()?;

        let messages = row
            .messages
            .0
            .into_iter()
            .map(|m| {
                Ok(Message {
                    sender: parse_username(&m.sender)?,
                    content: m.content,
                    created_at: m.created_at,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        let unread_counts = row
            .unread_counts
            .0
            .into_iter()
            .map(|(user, count)| {
                let count = u32::try_from(count).map_err(|_| {
                    RepositoryError::CorruptRecord(format!("unread count out of range: {}", count))
                })?;
                Ok((parse_username(&user)?, count))
            })
            .collect::<Result<BTreeMap<_, _>, RepositoryError>>()?;

        let deleted_by = row
            .deleted_by
            .iter()
            .map(|u| parse_username(u))
            .collect::<Result<Vec<_>, _>>()?;

        Conversation::restore(StoredConversation {
            id: ConversationId::from_uuid(row.id),
            participants,
            created_at: row.created_at,
            last_updated: row.last_updated,
            messages,
            unread_counts,
            deleted_by,
            version: row.version,
        })
        .map_err(|e| RepositoryError::CorruptRecord(e.to_string()))
    }
}

fn parse_username(raw: &str) -> Result<Username, RepositoryError> {
    Username::parse(raw).map_err(RepositoryError::CorruptRecord)
}

fn message_records(conversation: &Conversation) -> Vec<MessageRecord> {
    conversation
        .messages()
        .iter()
        .map(|m| MessageRecord {
            sender: m.sender.to_string(),
            content: m.content.clone(),
            created_at: m.created_at,
        })
        .collect()
}

fn unread_records(conversation: &Conversation) -> BTreeMap<String, i64> {
    conversation
        .unread_counts()
        .iter()
        .map(|(user, count)| (user.to_string(), i64::from(*count)))
        .collect()
}

fn username_strings<'a>(users: impl IntoIterator<Item = &'a Username>) -> Vec<String> {
    users.into_iter().map(|u| u.to_string()).collect()
}

fn map_write_error(e: sqlx::Error, key: &ParticipantKey) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::DuplicateKey(key.to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::ConnectionFailed(e.to_string())
        }
        _ => RepositoryError::QueryFailed(e.to_string()),
    }
}

fn map_read_error(e: sqlx::Error) -> RepositoryError {
    match &e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::ConnectionFailed(e.to_string())
        }
        _ => RepositoryError::QueryFailed(e.to_string()),
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    #[instrument(skip(self), fields(participant_key = %ParticipantKey::new(user_a, user_b)))]
    async fn find_by_participants(
        &self,
        user_a: &Username,
        user_b: &Username,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let key = ParticipantKey::new(user_a, user_b);

        let row = sqlx::query_as::<_, ConversationRow>(
            r#"
            SELECT id, participants, created_at, last_updated, messages, unread_counts, deleted_by, version
            FROM conversations
            WHERE participant_key = $1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_read_error)?;

        row.map(Conversation::try_from).transpose()
    }

    #[instrument(skip(self, conversation), fields(participant_key = %conversation.participant_key()))]
    async fn insert(&self, conversation: &Conversation) -> Result<ConversationId, RepositoryError> {
        let id = ConversationId::new();
        let key = conversation.participant_key();

        sqlx::query(
            r#"
            INSERT INTO conversations
                (id, participant_key, participants, created_at, last_updated, messages, unread_counts, deleted_by, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1)
            "#,
        )
        .bind(id.as_uuid())
        .bind(key.as_str())
        .bind(username_strings(conversation.participants()))
        .bind(conversation.created_at())
        .bind(conversation.last_updated())
        .bind(Json(message_records(conversation)))
        .bind(Json(unread_records(conversation)))
        .bind(username_strings(conversation.deleted_by()))
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, key))?;

        debug!(conversation_id = %id, "Conversation inserted");
        Ok(id)
    }

    #[instrument(skip(self, conversation), fields(participant_key = %conversation.participant_key(), version = conversation.version()))]
    async fn update(&self, conversation: &Conversation) -> Result<i64, RepositoryError> {
        let id = conversation.id().ok_or_else(|| {
            RepositoryError::NotFound(format!(
                "conversation {} has not been inserted",
                conversation.participant_key()
            ))
        })?;

        let new_version = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE conversations
            SET last_updated = $2,
                messages = $3,
                unread_counts = $4,
                deleted_by = $5,
                version = version + 1
            WHERE id = $1 AND version = $6
            RETURNING version
            "#,
        )
        .bind(id.as_uuid())
        .bind(conversation.last_updated())
        .bind(Json(message_records(conversation)))
        .bind(Json(unread_records(conversation)))
        .bind(username_strings(conversation.deleted_by()))
        .bind(conversation.version())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, conversation.participant_key()))?;

        new_version.ok_or_else(|| RepositoryError::VersionConflict {
            id: id.to_string(),
            expected: conversation.version(),
        })
    }

    #[instrument(skip(self), fields(conversation_id = %id))]
    async fn remove(
        &self,
        id: ConversationId,
        expected_version: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1 AND version = $2")
            .bind(id.as_uuid())
            .bind(expected_version)
            .execute(&self.pool)
            .await
            .map_err(map_read_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
            });
        }

        debug!("Conversation removed");
        Ok(())
    }

    #[instrument(skip(self), fields(user = %user))]
    async fn list_for_user(&self, user: &Username) -> Result<Vec<Conversation>, RepositoryError> {
        let rows = sqlx::query_as::<_, ConversationRow>(
            r#"
            SELECT id, participants, created_at, last_updated,
                   CASE WHEN jsonb_array_length(messages) > 0
                        THEN jsonb_build_array(messages -> -1)
                        ELSE '[]'::jsonb
                   END AS messages,
                   unread_counts, deleted_by, version
            FROM conversations
            WHERE $1 = ANY(participants) AND NOT ($1 = ANY(deleted_by))
            ORDER BY last_updated DESC
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_read_error)?;

        rows.into_iter().map(Conversation::try_from).collect()
    }

    #[instrument(skip(self), fields(user = %user))]
    async fn total_unread_for_user(&self, user: &Username) -> Result<u64, RepositoryError> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM((unread_counts ->> $1)::BIGINT), 0)::BIGINT
            FROM conversations
            WHERE $1 = ANY(participants) AND NOT ($1 = ANY(deleted_by))
            "#,
        )
        .bind(user.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_read_error)?;

        u64::try_from(total)
            .map_err(|_| RepositoryError::CorruptRecord(format!("negative unread total: {}", total)))
    }
}
