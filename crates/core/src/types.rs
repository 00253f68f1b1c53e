//! Gemeinsame Identifikations- und Basistypen fuer Whispr
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Benutzer-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Erstellt eine neue zufaellige UserId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// Eindeutige Kanal-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub Uuid);

impl ChannelId {
    /// Erstellt eine neue zufaellige ChannelId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "channel:{}", self.0)
    }
}

/// Transport-Kennung eines UDP-Clients
///
/// Der Client waehlt die Kennung selbst bei der UDP-Registrierung.
/// Sie ist nur unter den aktuell registrierten Clients eindeutig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub u32);

impl ClientId {
    /// Gibt den inneren u32-Wert zurueck
    pub fn inner(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client:{}", self.0)
    }
}

/// Rolle eines Benutzerkontos
///
/// Unveraenderlich nach der Kontoerstellung. Auf dem Draht als
/// "Admin" / "User" serialisiert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRolle {
    Admin,
    User,
}

impl UserRolle {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::User => "User",
        }
    }
}

impl std::str::FromStr for UserRolle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Self::Admin),
            "User" => Ok(Self::User),
            other => Err(format!("Unbekannte Benutzerrolle: {other}")),
        }
    }
}

/// Kanal-Typ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KanalTyp {
    Voice,
    Text,
}

impl KanalTyp {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Voice => "voice",
            Self::Text => "text",
        }
    }
}

impl std::str::FromStr for KanalTyp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voice" => Ok(Self::Voice),
            "text" => Ok(Self::Text),
            other => Err(format!("Unbekannter Kanal-Typ: {other}")),
        }
    }
}

/// Zustand einer Berechtigung
///
/// Draht-Form: "allow" / "deny" / "neutral" (lowercase).
/// Speicher-Form: 0 = Allow, 1 = Deny, 2 = Neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionZustand {
    Allow,
    Deny,
    Neutral,
}

impl PermissionZustand {
    /// Speicher-Form fuer die Datenbank
    pub fn als_i64(&self) -> i64 {
        match self {
            Self::Allow => 0,
            Self::Deny => 1,
            Self::Neutral => 2,
        }
    }

    /// Liest die Speicher-Form; unbekannte Werte sind `None`
    pub fn aus_i64(wert: i64) -> Option<Self> {
        match wert {
            0 => Some(Self::Allow),
            1 => Some(Self::Deny),
            2 => Some(Self::Neutral),
            _ => None,
        }
    }
}
