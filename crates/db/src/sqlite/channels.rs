//! SQLite-Implementierung des ChannelRepository

use chrono::Utc;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{KanalRecord, NeuerKanal};
use crate::repository::{ChannelRepository, DbResult};
use crate::sqlite::pool::SqliteDb;

impl ChannelRepository for SqliteDb {
    async fn create(&self, data: NeuerKanal<'_>) -> DbResult<KanalRecord> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO channels (id, name, channel_type, is_default, key_material, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(data.name)
        .bind(data.kanal_typ.als_str())
        .bind(data.is_default as i64)
        .bind(data.key_material)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(KanalRecord {
            id,
            name: data.name.to_string(),
            kanal_typ: data.kanal_typ,
            is_default: data.is_default,
            key_material: data.key_material.to_vec(),
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<KanalRecord>> {
        let row = sqlx::query(
            "SELECT id, name, channel_type, is_default, key_material, created_at
             FROM channels WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_kanal(&r)).transpose()
    }

    async fn get_default(&self) -> DbResult<Option<KanalRecord>> {
        let row = sqlx::query(
            "SELECT id, name, channel_type, is_default, key_material, created_at
             FROM channels WHERE is_default = 1 LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_kanal(&r)).transpose()
    }

    async fn list(&self) -> DbResult<Vec<KanalRecord>> {
        let rows = sqlx::query(
            "SELECT id, name, channel_type, is_default, key_material, created_at
             FROM channels ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_kanal).collect()
    }

    async fn count(&self) -> DbResult<u64> {
        use sqlx::Row as _;
        let row = sqlx::query("SELECT COUNT(*) AS anzahl FROM channels")
            .fetch_one(&self.pool)
            .await?;
        let anzahl: i64 = row.try_get("anzahl")?;
        Ok(anzahl as u64)
    }

    async fn update_key(&self, id: Uuid, key_material: &[u8]) -> DbResult<()> {
        let affected = sqlx::query("UPDATE channels SET key_material = ? WHERE id = ?")
            .bind(key_material)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(DbError::nicht_gefunden(format!("Kanal {id}")));
        }
        Ok(())
    }
}

fn row_to_kanal(row: &sqlx::sqlite::SqliteRow) -> DbResult<KanalRecord> {
    use sqlx::Row as _;

    let id_str: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| DbError::intern(format!("Ungueltige UUID '{id_str}': {e}")))?;

    let typ_str: String = row.try_get("channel_type")?;
    let kanal_typ = typ_str
        .parse()
        .map_err(|e| DbError::intern(format!("Ungueltiger Kanal-Typ: {e}")))?;

    let is_default: i64 = row.try_get("is_default")?;

    let created_at_str: String = row.try_get("created_at")?;
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| DbError::intern(format!("Ungueltige created_at '{created_at_str}': {e}")))?
        .with_timezone(&Utc);

    Ok(KanalRecord {
        id,
        name: row.try_get("name")?,
        kanal_typ,
        is_default: is_default != 0,
        key_material: row.try_get("key_material")?,
        created_at,
    })
}
