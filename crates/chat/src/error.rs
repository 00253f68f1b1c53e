//! Fehlertypen fuer den Chat-Service

use thiserror::Error;

/// Alle moeglichen Fehler im Chat-Service
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    #[error("Krypto-Fehler: {0}")]
    Krypto(#[from] whispr_crypto::CryptoError),

    #[error("Datenbankfehler: {0}")]
    Datenbank(#[from] whispr_db::DbError),
}

/// Result-Alias fuer den Chat-Service
pub type ChatResult<T> = Result<T, ChatError>;
