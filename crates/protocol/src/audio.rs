//! Audio-Protokoll (UDP)
//!
//! Definiert die binaere Paketstruktur fuer die Audio-Weiterleitung.
//! Der Server entschluesselt Audio nie; er parst nur den Kopf und leitet
//! die Bytes unveraendert weiter.
//!
//! ## Paketformat (Overhead = 32 Bytes, kein serde)
//!
//! ```text
//! Offset  Len   Beschreibung
//! ------  ---   -----------
//!  0       4    ClientId (u32, little-endian)
//!  4      12    AEAD-Nonce
//! 16+     N+16  Ciphertext inkl. 16 Bytes Auth-Tag
//! ```

use std::io;

/// Laenge des ClientId-Felds in Bytes
pub const CLIENT_ID_LAENGE: usize = 4;

/// Laenge der AEAD-Nonce in Bytes
pub const NONCE_LAENGE: usize = 12;

/// Laenge des AEAD-Auth-Tags in Bytes
pub const TAG_LAENGE: usize = 16;

/// Fester Overhead eines Pakets (ClientId + Nonce + Auth-Tag)
pub const PAKET_OVERHEAD: usize = CLIENT_ID_LAENGE + NONCE_LAENGE + TAG_LAENGE;

/// Maximale Paketgroesse in Bytes
pub const MAX_PAKET_LAENGE: usize = 1200;

/// Maximale Klartext-Laenge die in ein Paket passt
pub const MAX_NUTZDATEN_LAENGE: usize = MAX_PAKET_LAENGE - PAKET_OVERHEAD;

/// Geparstes Audio-Paket (borrowt aus dem Empfangspuffer)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioPaket<'a> {
    /// Transport-Kennung des Senders
    pub client_id: u32,
    /// 12-Byte AEAD-Nonce
    pub nonce: &'a [u8],
    /// Ciphertext inkl. Auth-Tag (mindestens 16 Bytes)
    pub ciphertext: &'a [u8],
}

impl<'a> AudioPaket<'a> {
    /// Parst ein Paket aus einem Byte-Slice
    ///
    /// # Fehler
    /// - `InvalidData` wenn das Paket kleiner als der Overhead ist
    /// - `InvalidData` wenn das Paket das Maximum ueberschreitet
    pub fn parsen(buf: &'a [u8]) -> io::Result<Self> {
        if buf.len() < PAKET_OVERHEAD {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Paket zu kurz: {} Bytes (Minimum {})",
                    buf.len(),
                    PAKET_OVERHEAD
                ),
            ));
        }
        if buf.len() > MAX_PAKET_LAENGE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Paket zu gross: {} Bytes (Maximum {})",
                    buf.len(),
                    MAX_PAKET_LAENGE
                ),
            ));
        }

        let client_id = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let nonce = &buf[CLIENT_ID_LAENGE..CLIENT_ID_LAENGE + NONCE_LAENGE];
        let ciphertext = &buf[CLIENT_ID_LAENGE + NONCE_LAENGE..];

        Ok(Self {
            client_id,
            nonce,
            ciphertext,
        })
    }
}

/// Baut ein Paket aus seinen Bestandteilen
pub fn paket_bauen(client_id: u32, nonce: &[u8; NONCE_LAENGE], ciphertext: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(CLIENT_ID_LAENGE + NONCE_LAENGE + ciphertext.len());
    buf.extend_from_slice(&client_id.to_le_bytes());
    buf.extend_from_slice(nonce);
    buf.extend_from_slice(ciphertext);
    buf
}
