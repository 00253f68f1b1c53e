//! Fehlertypen fuer das Krypto-Crate

use thiserror::Error;

/// Krypto-Fehlertypen
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Ungueltige Schluessel-Laenge: erwartet {erwartet}, erhalten {erhalten}")]
    UngueltigeSchluesselLaenge { erwartet: usize, erhalten: usize },

    #[error("Ungueltige Nonce-Laenge: erwartet {erwartet}, erhalten {erhalten}")]
    UngueltigeNonceLaenge { erwartet: usize, erhalten: usize },

    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),

    #[error("AEAD-Authentifizierung fehlgeschlagen")]
    Authentifizierung,

    #[error("Ungueltige Daten: {0}")]
    UngueltigeDaten(String),
}

/// Result-Alias fuer das Krypto-Crate
pub type CryptoResult<T> = Result<T, CryptoError>;
