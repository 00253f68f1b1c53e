//! SQLite-Implementierung des PermissionRepository

use uuid::Uuid;
use whispr_core::types::PermissionZustand;

use crate::error::DbError;
use crate::models::{PermissionRecord, RolleRecord};
use crate::repository::{DbResult, PermissionRepository};
use crate::sqlite::pool::SqliteDb;

fn zustand_aus_i64(wert: i64) -> DbResult<PermissionZustand> {
    PermissionZustand::aus_i64(wert)
        .ok_or_else(|| DbError::intern(format!("Ungueltiger Berechtigungszustand: {wert}")))
}

impl PermissionRepository for SqliteDb {
    async fn ensure_permission(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
    ) -> DbResult<()> {
        sqlx::query("INSERT OR IGNORE INTO permissions (id, name, description) VALUES (?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(description)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_permissions(&self) -> DbResult<Vec<PermissionRecord>> {
        use sqlx::Row as _;
        let rows = sqlx::query("SELECT id, name, description FROM permissions ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|r| {
                Ok(PermissionRecord {
                    id: r.try_get("id")?,
                    name: r.try_get("name")?,
                    description: r.try_get("description")?,
                })
            })
            .collect()
    }

    async fn ensure_role(
        &self,
        id: &str,
        name: &str,
        zustaende: &[(&str, PermissionZustand)],
    ) -> DbResult<()> {
        sqlx::query("INSERT OR IGNORE INTO roles (id, name) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(&self.pool)
            .await?;

        // Bestehende Anpassungen werden nicht ueberschrieben
        for (permission_id, zustand) in zustaende {
            sqlx::query(
                "INSERT OR IGNORE INTO role_permissions (role_id, permission_id, state)
                 VALUES (?, ?, ?)",
            )
            .bind(id)
            .bind(permission_id)
            .bind(zustand.als_i64())
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn list_roles(&self) -> DbResult<Vec<RolleRecord>> {
        use sqlx::Row as _;
        let rollen_rows = sqlx::query("SELECT id, name FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut rollen = Vec::with_capacity(rollen_rows.len());
        for row in &rollen_rows {
            let id: String = row.try_get("id")?;
            let zustaende = self.role_states(&id).await?;
            rollen.push(RolleRecord {
                id,
                name: row.try_get("name")?,
                zustaende,
            });
        }
        Ok(rollen)
    }

    async fn role_states(&self, role_id: &str) -> DbResult<Vec<(String, PermissionZustand)>> {
        use sqlx::Row as _;
        let rows = sqlx::query(
            "SELECT permission_id, state FROM role_permissions
             WHERE role_id = ? ORDER BY permission_id",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                let permission_id: String = r.try_get("permission_id")?;
                let zustand = zustand_aus_i64(r.try_get("state")?)?;
                Ok((permission_id, zustand))
            })
            .collect()
    }

    async fn user_roles(&self, user_id: Uuid) -> DbResult<Vec<String>> {
        use sqlx::Row as _;
        let rows = sqlx::query("SELECT role_id FROM user_roles WHERE user_id = ? ORDER BY role_id")
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(|r| Ok(r.try_get("role_id")?)).collect()
    }

    async fn set_user_role(&self, user_id: Uuid, role_id: &str, assign: bool) -> DbResult<()> {
        if assign {
            sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?, ?)")
                .bind(user_id.to_string())
                .bind(role_id)
                .execute(&self.pool)
                .await?;
        } else {
            sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role_id = ?")
                .bind(user_id.to_string())
                .bind(role_id)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    async fn user_states(&self, user_id: Uuid) -> DbResult<Vec<(String, PermissionZustand)>> {
        use sqlx::Row as _;
        let rows = sqlx::query(
            "SELECT permission_id, state FROM user_permissions
             WHERE user_id = ? ORDER BY permission_id",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                let permission_id: String = r.try_get("permission_id")?;
                let zustand = zustand_aus_i64(r.try_get("state")?)?;
                Ok((permission_id, zustand))
            })
            .collect()
    }

    async fn set_user_state(
        &self,
        user_id: Uuid,
        permission_id: &str,
        zustand: Option<PermissionZustand>,
    ) -> DbResult<()> {
        match zustand {
            Some(z) => {
                sqlx::query(
                    "INSERT OR REPLACE INTO user_permissions (user_id, permission_id, state)
                     VALUES (?, ?, ?)",
                )
                .bind(user_id.to_string())
                .bind(permission_id)
                .bind(z.als_i64())
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    "DELETE FROM user_permissions WHERE user_id = ? AND permission_id = ?",
                )
                .bind(user_id.to_string())
                .bind(permission_id)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    async fn channel_role_states(
        &self,
        channel_id: Uuid,
    ) -> DbResult<Vec<(String, String, PermissionZustand)>> {
        use sqlx::Row as _;
        let rows = sqlx::query(
            "SELECT role_id, permission_id, state FROM channel_role_permissions
             WHERE channel_id = ? ORDER BY role_id, permission_id",
        )
        .bind(channel_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                let role_id: String = r.try_get("role_id")?;
                let permission_id: String = r.try_get("permission_id")?;
                let zustand = zustand_aus_i64(r.try_get("state")?)?;
                Ok((role_id, permission_id, zustand))
            })
            .collect()
    }

    async fn channel_user_states(
        &self,
        channel_id: Uuid,
    ) -> DbResult<Vec<(Uuid, String, PermissionZustand)>> {
        use sqlx::Row as _;
        let rows = sqlx::query(
            "SELECT user_id, permission_id, state FROM channel_user_permissions
             WHERE channel_id = ? ORDER BY user_id, permission_id",
        )
        .bind(channel_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                let user_id_str: String = r.try_get("user_id")?;
                let user_id = Uuid::parse_str(&user_id_str)
                    .map_err(|e| DbError::intern(format!("Ungueltige UUID: {e}")))?;
                let permission_id: String = r.try_get("permission_id")?;
                let zustand = zustand_aus_i64(r.try_get("state")?)?;
                Ok((user_id, permission_id, zustand))
            })
            .collect()
    }

    async fn set_channel_role_state(
        &self,
        channel_id: Uuid,
        role_id: &str,
        permission_id: &str,
        zustand: Option<PermissionZustand>,
    ) -> DbResult<()> {
        match zustand {
            Some(z) => {
                sqlx::query(
                    "INSERT OR REPLACE INTO channel_role_permissions
                     (channel_id, role_id, permission_id, state) VALUES (?, ?, ?, ?)",
                )
                .bind(channel_id.to_string())
                .bind(role_id)
                .bind(permission_id)
                .bind(z.als_i64())
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    "DELETE FROM channel_role_permissions
                     WHERE channel_id = ? AND role_id = ? AND permission_id = ?",
                )
                .bind(channel_id.to_string())
                .bind(role_id)
                .bind(permission_id)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    async fn set_channel_user_state(
        &self,
        channel_id: Uuid,
        user_id: Uuid,
        permission_id: &str,
        zustand: Option<PermissionZustand>,
    ) -> DbResult<()> {
        match zustand {
            Some(z) => {
                sqlx::query(
                    "INSERT OR REPLACE INTO channel_user_permissions
                     (channel_id, user_id, permission_id, state) VALUES (?, ?, ?, ?)",
                )
                .bind(channel_id.to_string())
                .bind(user_id.to_string())
                .bind(permission_id)
                .bind(z.als_i64())
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    "DELETE FROM channel_user_permissions
                     WHERE channel_id = ? AND user_id = ? AND permission_id = ?",
                )
                .bind(channel_id.to_string())
                .bind(user_id.to_string())
                .bind(permission_id)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }
}
