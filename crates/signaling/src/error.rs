//! Fehlertypen fuer den Signaling-Service

use thiserror::Error;

/// Fehler beim Aufbau des Control-Servers
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("Zertifikat nicht ladbar: {0}")]
    Zertifikat(String),

    #[error("TLS-Konfiguration fehlgeschlagen: {0}")]
    Tls(String),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

/// Result-Alias fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
