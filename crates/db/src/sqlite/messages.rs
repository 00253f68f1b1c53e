//! SQLite-Implementierung des MessageRepository

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{NachrichtRecord, NeueNachricht};
use crate::repository::{DbResult, MessageRepository};
use crate::sqlite::pool::SqliteDb;

impl MessageRepository for SqliteDb {
    async fn create(&self, data: NeueNachricht<'_>) -> DbResult<NachrichtRecord> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO messages (id, channel_id, sender_id, content, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(data.channel_id.to_string())
        .bind(data.sender_id.to_string())
        .bind(data.content)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(NachrichtRecord {
            id,
            channel_id: data.channel_id,
            sender_id: data.sender_id,
            content: data.content.to_string(),
            created_at: now,
        })
    }

    async fn history(
        &self,
        channel_id: Uuid,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> DbResult<Vec<NachrichtRecord>> {
        // RFC3339-Strings sortieren chronologisch, der Vergleich auf der
        // Textspalte ist daher korrekt
        let rows = match since {
            Some(seit) => {
                sqlx::query(
                    "SELECT id, channel_id, sender_id, content, created_at FROM messages
                     WHERE channel_id = ? AND created_at > ?
                     ORDER BY created_at ASC LIMIT ?",
                )
                .bind(channel_id.to_string())
                .bind(seit.to_rfc3339())
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, channel_id, sender_id, content, created_at FROM messages
                     WHERE channel_id = ?
                     ORDER BY created_at ASC LIMIT ?",
                )
                .bind(channel_id.to_string())
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(row_to_nachricht).collect()
    }
}

fn row_to_nachricht(row: &sqlx::sqlite::SqliteRow) -> DbResult<NachrichtRecord> {
    use sqlx::Row as _;

    let uuid_spalte = |spalte: &str| -> DbResult<Uuid> {
        let wert: String = row.try_get(spalte)?;
        Uuid::parse_str(&wert)
            .map_err(|e| DbError::intern(format!("Ungueltige UUID '{wert}': {e}")))
    };

    let created_at_str: String = row.try_get("created_at")?;
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| DbError::intern(format!("Ungueltige created_at '{created_at_str}': {e}")))?
        .with_timezone(&Utc);

    Ok(NachrichtRecord {
        id: uuid_spalte("id")?,
        channel_id: uuid_spalte("channel_id")?,
        sender_id: uuid_spalte("sender_id")?,
        content: row.try_get("content")?,
        created_at,
    })
}
