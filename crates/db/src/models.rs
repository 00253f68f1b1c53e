//! Datenbankmodelle fuer Whispr
//!
//! Diese Typen repraesentieren Datensaetze aus der Datenbank. Sie sind von
//! den Domain-Typen getrennt und dienen als reine Datenuebertragungsobjekte.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use whispr_core::types::{KanalTyp, PermissionZustand, UserRolle};

// ---------------------------------------------------------------------------
// Benutzer
// ---------------------------------------------------------------------------

/// Benutzer-Datensatz aus der Datenbank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenutzerRecord {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub rolle: UserRolle,
    pub created_at: DateTime<Utc>,
}

/// Daten zum Erstellen eines neuen Benutzers
#[derive(Debug, Clone)]
pub struct NeuerBenutzer<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub rolle: UserRolle,
}

// ---------------------------------------------------------------------------
// Kanaele
// ---------------------------------------------------------------------------

/// Kanal-Datensatz aus der Datenbank
///
/// Die Mitgliederliste ist bewusst kein Teil des Datensatzes: Mitgliedschaft
/// ist Session-Zustand und lebt nur im ChannelService.
#[derive(Debug, Clone)]
pub struct KanalRecord {
    pub id: Uuid,
    pub name: String,
    pub kanal_typ: KanalTyp,
    pub is_default: bool,
    /// 32 Bytes fuer Voice-Kanaele, leer fuer Text-Kanaele
    pub key_material: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Daten zum Erstellen eines neuen Kanals
#[derive(Debug, Clone)]
pub struct NeuerKanal<'a> {
    pub name: &'a str,
    pub kanal_typ: KanalTyp,
    pub is_default: bool,
    pub key_material: &'a [u8],
}

// ---------------------------------------------------------------------------
// Berechtigungen
// ---------------------------------------------------------------------------

/// Eine dem Server bekannte Berechtigung
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// Eine Rolle mit ihren Berechtigungszustaenden
#[derive(Debug, Clone)]
pub struct RolleRecord {
    pub id: String,
    pub name: String,
    /// `(permission_id, zustand)` – nur explizit gesetzte Eintraege
    pub zustaende: Vec<(String, PermissionZustand)>,
}

// ---------------------------------------------------------------------------
// Nachrichten
// ---------------------------------------------------------------------------

/// Nachrichten-Datensatz aus der Datenbank
///
/// `content` ist die Speicherform – bei aktivierter At-Rest-Verschluesselung
/// das `enc:`-praefixierte Base64, sonst Klartext.
#[derive(Debug, Clone)]
pub struct NachrichtRecord {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Daten zum Erstellen einer neuen Nachricht
#[derive(Debug, Clone)]
pub struct NeueNachricht<'a> {
    pub channel_id: Uuid,
    pub sender_id: Uuid,
    pub content: &'a str,
}
