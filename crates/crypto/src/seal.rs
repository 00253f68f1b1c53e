//! Audio-AEAD – Versiegeln und Oeffnen von Audio-Frames
//!
//! AES-256-GCM mit 16-Byte-Tag. Der `AudioSealer` haelt eine eigene Kopie
//! des 32-Byte-Kanalschluessels und einen monoton steigenden 64-Bit-Zaehler
//! fuer die Nonce-Erzeugung.
//!
//! ## Nonce-Aufbau
//! ```text
//! [0u8; 4] [zaehler: u64 little-endian]
//! ```
//!
//! Deterministische Zaehler-Nonces machen Replay-Erkennung zu einer
//! Entscheidung der hoeheren Schicht; der Relay-Server entschluesselt
//! Audio nie. Der Zaehler darf fuer einen Schluessel nie zuruecklaufen –
//! bei Wiederverwendung eines Schluessels ueber Sessions hinweg muss der
//! Kanal stattdessen einen frischen Schluessel ausgeben.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::types::SecretBytes;

/// Schluessel-Laenge in Bytes (AES-256)
pub const SCHLUESSEL_LAENGE: usize = 32;

/// Nonce-Laenge in Bytes (GCM-Standard)
pub const NONCE_LAENGE: usize = 12;

/// Auth-Tag-Laenge in Bytes
pub const TAG_LAENGE: usize = 16;

/// Erzeugt einen frischen 32-Byte-Kanalschluessel
pub fn schluessel_erzeugen() -> [u8; SCHLUESSEL_LAENGE] {
    let mut schluessel = [0u8; SCHLUESSEL_LAENGE];
    OsRng.fill_bytes(&mut schluessel);
    schluessel
}

fn schluessel_pruefen(schluessel: &[u8]) -> CryptoResult<()> {
    if schluessel.len() != SCHLUESSEL_LAENGE {
        return Err(CryptoError::UngueltigeSchluesselLaenge {
            erwartet: SCHLUESSEL_LAENGE,
            erhalten: schluessel.len(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// AudioSealer
// ---------------------------------------------------------------------------

/// Versiegelt Audio-Frames mit deterministischen Zaehler-Nonces
///
/// Ein Sealer gehoert genau einem Sender und genau einem Schluessel.
/// Der Zaehler startet bei 0 und wird unter einem Lock inkrementiert;
/// innerhalb einer Session ist er strikt monoton.
pub struct AudioSealer {
    schluessel: SecretBytes,
    zaehler: Mutex<u64>,
}

impl AudioSealer {
    /// Erstellt einen Sealer; erzwingt die 32-Byte-Schluessellaenge
    pub fn neu(schluessel: &[u8]) -> CryptoResult<Self> {
        schluessel_pruefen(schluessel)?;
        Ok(Self {
            schluessel: SecretBytes::new(schluessel.to_vec()),
            zaehler: Mutex::new(0),
        })
    }

    /// Versiegelt einen Klartext-Frame
    ///
    /// Gibt `(nonce, ciphertext||tag)` zurueck.
    pub fn versiegeln(&self, klartext: &[u8]) -> CryptoResult<([u8; NONCE_LAENGE], Vec<u8>)> {
        let wert = {
            let mut zaehler = self.zaehler.lock();
            let aktuell = *zaehler;
            *zaehler += 1;
            aktuell
        };

        let mut nonce = [0u8; NONCE_LAENGE];
        nonce[4..].copy_from_slice(&wert.to_le_bytes());

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.schluessel.as_bytes()));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), klartext)
            .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;

        Ok((nonce, ciphertext))
    }

    /// Gibt den naechsten Zaehler-Wert zurueck (fuer Diagnose)
    pub fn naechster_zaehler(&self) -> u64 {
        *self.zaehler.lock()
    }
}

// ---------------------------------------------------------------------------
// AudioOpener
// ---------------------------------------------------------------------------

/// Oeffnet versiegelte Audio-Frames
pub struct AudioOpener {
    schluessel: SecretBytes,
}

impl AudioOpener {
    /// Erstellt einen Opener; erzwingt die 32-Byte-Schluessellaenge
    pub fn neu(schluessel: &[u8]) -> CryptoResult<Self> {
        schluessel_pruefen(schluessel)?;
        Ok(Self {
            schluessel: SecretBytes::new(schluessel.to_vec()),
        })
    }

    /// Oeffnet `(nonce, ciphertext||tag)` und gibt den Klartext zurueck
    ///
    /// Schlaegt mit `Authentifizierung` fehl wenn Tag oder Nonce nicht
    /// zum Schluessel passen.
    pub fn oeffnen(&self, nonce: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        if nonce.len() != NONCE_LAENGE {
            return Err(CryptoError::UngueltigeNonceLaenge {
                erwartet: NONCE_LAENGE,
                erhalten: nonce.len(),
            });
        }

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.schluessel.as_bytes()));
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Authentifizierung)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versiegeln_und_oeffnen_round_trip() {
        let schluessel = schluessel_erzeugen();
        let sealer = AudioSealer::neu(&schluessel).unwrap();
        let opener = AudioOpener::neu(&schluessel).unwrap();

        let klartext = b"Opus-Frame 1234567890";
        let (nonce, ciphertext) = sealer.versiegeln(klartext).unwrap();

        assert_eq!(ciphertext.len(), klartext.len() + TAG_LAENGE);
        let geoffnet = opener.oeffnen(&nonce, &ciphertext).unwrap();
        assert_eq!(geoffnet, klartext);
    }

    #[test]
    fn zaehler_ist_strikt_monoton() {
        let sealer = AudioSealer::neu(&[7u8; SCHLUESSEL_LAENGE]).unwrap();

        let (n1, _) = sealer.versiegeln(b"a").unwrap();
        let (n2, _) = sealer.versiegeln(b"b").unwrap();
        let (n3, _) = sealer.versiegeln(b"c").unwrap();

        let zaehler = |n: &[u8; NONCE_LAENGE]| u64::from_le_bytes(n[4..].try_into().unwrap());
        assert_eq!(zaehler(&n1), 0);
        assert_eq!(zaehler(&n2), 1);
        assert_eq!(zaehler(&n3), 2);
        assert_eq!(&n1[..4], &[0u8; 4]);
        assert_eq!(sealer.naechster_zaehler(), 3);
    }

    #[test]
    fn falscher_schluessel_schlaegt_fehl() {
        let sealer = AudioSealer::neu(&[1u8; SCHLUESSEL_LAENGE]).unwrap();
        let opener = AudioOpener::neu(&[2u8; SCHLUESSEL_LAENGE]).unwrap();

        let (nonce, ciphertext) = sealer.versiegeln(b"geheim").unwrap();
        let fehler = opener.oeffnen(&nonce, &ciphertext).unwrap_err();
        assert!(matches!(fehler, CryptoError::Authentifizierung));
    }

    #[test]
    fn manipulierter_ciphertext_schlaegt_fehl() {
        let schluessel = schluessel_erzeugen();
        let sealer = AudioSealer::neu(&schluessel).unwrap();
        let opener = AudioOpener::neu(&schluessel).unwrap();

        let (nonce, mut ciphertext) = sealer.versiegeln(b"geheim").unwrap();
        ciphertext[0] ^= 0xFF;
        assert!(opener.oeffnen(&nonce, &ciphertext).is_err());
    }

    #[test]
    fn schluessellaenge_wird_erzwungen() {
        assert!(AudioSealer::neu(&[0u8; 16]).is_err());
        assert!(AudioOpener::neu(&[0u8; 31]).is_err());
    }

    #[test]
    fn noncelaenge_wird_erzwungen() {
        let opener = AudioOpener::neu(&[0u8; SCHLUESSEL_LAENGE]).unwrap();
        let fehler = opener.oeffnen(&[0u8; 8], &[0u8; 32]).unwrap_err();
        assert!(matches!(fehler, CryptoError::UngueltigeNonceLaenge { .. }));
    }

    #[test]
    fn erzeugte_schluessel_sind_verschieden() {
        assert_ne!(schluessel_erzeugen(), schluessel_erzeugen());
    }
}
