//! At-Rest-Verschluesselung von Nachrichteninhalten
//!
//! Chat-Nachrichten werden optional mit einem serverweiten 32-Byte-Schluessel
//! verschluesselt gespeichert.
//!
//! ## Speicherformat
//! ```text
//! "enc:" + base64( nonce(12) || ciphertext + tag(16) )
//! ```
//!
//! Anders als beim Audio-Envelope sind die Nonces hier zufaellig: Inhalte
//! werden selten genug geschrieben dass Zaehler-Buchfuehrung ueber
//! Prozess-Neustarts hinweg den Aufwand nicht lohnt.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::seal::{NONCE_LAENGE, SCHLUESSEL_LAENGE, TAG_LAENGE};

/// Praefix verschluesselt gespeicherter Inhalte
pub const ENC_PRAEFIX: &str = "enc:";

/// Gibt `true` zurueck wenn der gespeicherte Inhalt verschluesselt ist
pub fn ist_verschluesselt(gespeichert: &str) -> bool {
    gespeichert.starts_with(ENC_PRAEFIX)
}

/// Verschluesselt einen Nachrichteninhalt fuer die Speicherung
pub fn inhalt_verschluesseln(
    schluessel: &[u8; SCHLUESSEL_LAENGE],
    klartext: &str,
) -> CryptoResult<String> {
    let mut nonce = [0u8; NONCE_LAENGE];
    OsRng.fill_bytes(&mut nonce);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(schluessel));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), klartext.as_bytes())
        .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;

    let mut blob = Vec::with_capacity(NONCE_LAENGE + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);

    Ok(format!("{}{}", ENC_PRAEFIX, BASE64.encode(blob)))
}

/// Entschluesselt einen gespeicherten Nachrichteninhalt
///
/// Erwartet das `enc:`-Praefix; unverschluesselte Inhalte muessen vom
/// Aufrufer vorher via [`ist_verschluesselt`] ausgefiltert werden.
pub fn inhalt_entschluesseln(
    schluessel: &[u8; SCHLUESSEL_LAENGE],
    gespeichert: &str,
) -> CryptoResult<String> {
    let blob_b64 = gespeichert
        .strip_prefix(ENC_PRAEFIX)
        .ok_or_else(|| CryptoError::UngueltigeDaten("Fehlendes enc:-Praefix".into()))?;

    let blob = BASE64
        .decode(blob_b64)
        .map_err(|e| CryptoError::UngueltigeDaten(format!("Ungueltiges Base64: {e}")))?;

    if blob.len() < NONCE_LAENGE + TAG_LAENGE {
        return Err(CryptoError::UngueltigeDaten(format!(
            "Blob zu kurz: {} Bytes",
            blob.len()
        )));
    }

    let (nonce, ciphertext) = blob.split_at(NONCE_LAENGE);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(schluessel));
    let klartext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Authentifizierung)?;

    String::from_utf8(klartext)
        .map_err(|e| CryptoError::UngueltigeDaten(format!("Ungueltiges UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seal::schluessel_erzeugen;

    #[test]
    fn inhalt_round_trip() {
        let schluessel = schluessel_erzeugen();
        let gespeichert = inhalt_verschluesseln(&schluessel, "Hallo Kanal!").unwrap();

        assert!(gespeichert.starts_with("enc:"));
        assert!(ist_verschluesselt(&gespeichert));

        let klartext = inhalt_entschluesseln(&schluessel, &gespeichert).unwrap();
        assert_eq!(klartext, "Hallo Kanal!");
    }

    #[test]
    fn gleicher_inhalt_verschiedene_blobs() {
        // Zufalls-Nonces: zweimal verschluesseln ergibt verschiedene Blobs
        let schluessel = schluessel_erzeugen();
        let a = inhalt_verschluesseln(&schluessel, "x").unwrap();
        let b = inhalt_verschluesseln(&schluessel, "x").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn falscher_schluessel_schlaegt_fehl() {
        let gespeichert = inhalt_verschluesseln(&[1u8; 32], "geheim").unwrap();
        let fehler = inhalt_entschluesseln(&[2u8; 32], &gespeichert).unwrap_err();
        assert!(matches!(fehler, CryptoError::Authentifizierung));
    }

    #[test]
    fn fehlendes_praefix_wird_abgelehnt() {
        let fehler = inhalt_entschluesseln(&[0u8; 32], "kein praefix").unwrap_err();
        assert!(matches!(fehler, CryptoError::UngueltigeDaten(_)));
    }

    #[test]
    fn klartext_wird_nicht_als_verschluesselt_erkannt() {
        assert!(!ist_verschluesselt("Hallo"));
    }
}
