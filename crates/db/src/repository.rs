//! Repository-Trait-Definitionen
//!
//! Das Repository-Pattern entkoppelt die Geschaeftslogik von der konkreten
//! Persistenz. [`crate::sqlite::SqliteDb`] und [`crate::memory::MemoryDb`]
//! implementieren alle Traits; die Services haengen nur von den Traits ab.
//!
//! Die Traits nutzen `async fn` ohne Send-Garantie (async_fn_in_trait);
//! Verbindungs-Tasks laufen deshalb in einer `tokio::task::LocalSet`.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use whispr_core::types::PermissionZustand;

use crate::error::DbError;
use crate::models::{
    BenutzerRecord, KanalRecord, NachrichtRecord, NeueNachricht, NeuerBenutzer, NeuerKanal,
    PermissionRecord, RolleRecord,
};

/// Result-Alias fuer alle Repository-Operationen
pub type DbResult<T> = Result<T, DbError>;

/// Repository fuer Benutzer-Datenzugriffe
#[allow(async_fn_in_trait)]
pub trait UserRepository: Send + Sync {
    /// Legt einen neuen Benutzer an; `Eindeutigkeit` wenn der Name vergeben ist
    async fn create(&self, data: NeuerBenutzer<'_>) -> DbResult<BenutzerRecord>;

    /// Laedt einen Benutzer anhand seiner ID
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<BenutzerRecord>>;

    /// Laedt einen Benutzer anhand seines Namens (case-insensitiv)
    async fn get_by_name(&self, username: &str) -> DbResult<Option<BenutzerRecord>>;

    /// Alle Benutzer, nach Name sortiert
    async fn list(&self) -> DbResult<Vec<BenutzerRecord>>;

    /// Anzahl aller Benutzer
    async fn count(&self) -> DbResult<u64>;
}

/// Repository fuer Kanal-Datenzugriffe
#[allow(async_fn_in_trait)]
pub trait ChannelRepository: Send + Sync {
    /// Legt einen neuen Kanal an
    async fn create(&self, data: NeuerKanal<'_>) -> DbResult<KanalRecord>;

    /// Laedt einen Kanal anhand seiner ID
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<KanalRecord>>;

    /// Laedt den Standard-Kanal des Servers (hoechstens einer)
    async fn get_default(&self) -> DbResult<Option<KanalRecord>>;

    /// Alle Kanaele, nach Name sortiert
    async fn list(&self) -> DbResult<Vec<KanalRecord>>;

    /// Anzahl aller Kanaele
    async fn count(&self) -> DbResult<u64>;

    /// Ersetzt das Schluesselmaterial eines Kanals
    async fn update_key(&self, id: Uuid, key_material: &[u8]) -> DbResult<()>;
}

/// Repository fuer das Berechtigungsmodell
///
/// Zustaende werden als `0=Allow, 1=Deny, 2=Neutral` gespeichert.
/// Die `set_*`-Operationen mit `None` entfernen den jeweiligen Eintrag.
#[allow(async_fn_in_trait)]
pub trait PermissionRepository: Send + Sync {
    /// Legt eine Berechtigung an falls sie noch nicht existiert
    async fn ensure_permission(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
    ) -> DbResult<()>;

    /// Alle bekannten Berechtigungen
    async fn list_permissions(&self) -> DbResult<Vec<PermissionRecord>>;

    /// Legt eine Rolle samt Zustaenden an falls sie noch nicht existiert
    async fn ensure_role(
        &self,
        id: &str,
        name: &str,
        zustaende: &[(&str, PermissionZustand)],
    ) -> DbResult<()>;

    /// Alle Rollen mit ihren Zustaenden
    async fn list_roles(&self) -> DbResult<Vec<RolleRecord>>;

    /// Zustaende einer einzelnen Rolle
    async fn role_states(&self, role_id: &str) -> DbResult<Vec<(String, PermissionZustand)>>;

    /// Rollen-IDs eines Benutzers
    async fn user_roles(&self, user_id: Uuid) -> DbResult<Vec<String>>;

    /// Weist eine Rolle zu (`assign = true`) oder entzieht sie; idempotent
    async fn set_user_role(&self, user_id: Uuid, role_id: &str, assign: bool) -> DbResult<()>;

    /// Direkte Overrides eines Benutzers
    async fn user_states(&self, user_id: Uuid) -> DbResult<Vec<(String, PermissionZustand)>>;

    /// Setzt oder entfernt einen direkten Override
    async fn set_user_state(
        &self,
        user_id: Uuid,
        permission_id: &str,
        zustand: Option<PermissionZustand>,
    ) -> DbResult<()>;

    /// Kanal-Overrides pro Rolle: `(role_id, permission_id, zustand)`
    async fn channel_role_states(
        &self,
        channel_id: Uuid,
    ) -> DbResult<Vec<(String, String, PermissionZustand)>>;

    /// Kanal-Overrides pro Benutzer: `(user_id, permission_id, zustand)`
    async fn channel_user_states(
        &self,
        channel_id: Uuid,
    ) -> DbResult<Vec<(Uuid, String, PermissionZustand)>>;

    /// Setzt oder entfernt einen Kanal-Override fuer eine Rolle
    async fn set_channel_role_state(
        &self,
        channel_id: Uuid,
        role_id: &str,
        permission_id: &str,
        zustand: Option<PermissionZustand>,
    ) -> DbResult<()>;

    /// Setzt oder entfernt einen Kanal-Override fuer einen Benutzer
    async fn set_channel_user_state(
        &self,
        channel_id: Uuid,
        user_id: Uuid,
        permission_id: &str,
        zustand: Option<PermissionZustand>,
    ) -> DbResult<()>;
}

/// Repository fuer Chat-Nachrichten
#[allow(async_fn_in_trait)]
pub trait MessageRepository: Send + Sync {
    /// Persistiert eine neue Nachricht
    async fn create(&self, data: NeueNachricht<'_>) -> DbResult<NachrichtRecord>;

    /// Verlauf eines Kanals, aufsteigend nach Erstellungszeit
    ///
    /// `since` filtert auf Nachrichten nach dem Zeitpunkt (exklusiv).
    async fn history(
        &self,
        channel_id: Uuid,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> DbResult<Vec<NachrichtRecord>>;
}
