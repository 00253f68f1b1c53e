//! Fehlertypen fuer den Kanal-Service

use thiserror::Error;
use whispr_core::types::ChannelId;

/// Alle moeglichen Fehler im Kanal-Service
#[derive(Debug, Error)]
pub enum KanalFehler {
    #[error("Kanal nicht gefunden: {0}")]
    NichtGefunden(ChannelId),

    #[error("Benutzer ist in keinem Kanal")]
    KeinMitglied,

    #[error("Kanal-Limit erreicht ({0} Kanaele)")]
    LimitErreicht(usize),

    #[error("Ungueltiger Kanalname: {0}")]
    UngueltigerName(String),

    #[error("Datenbankfehler: {0}")]
    Datenbank(#[from] whispr_db::DbError),
}

/// Result-Alias fuer den Kanal-Service
pub type KanalResult<T> = Result<T, KanalFehler>;
