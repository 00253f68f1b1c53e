//! Wire-Format fuer die Control-Verbindung
//!
//! Frame-basiertes Protokoll: Laenge (u32 little-endian) + JSON-Payload.
//!
//! ## Frame-Format
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 LE) | 4 Bytes         | JSON      |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge gibt die Anzahl der JSON-Bytes an (ohne die 4 Laengen-Bytes)
//! und muss `0 < len <= 65536` erfuellen. Verstoesse gelten als ungueltiger
//! Frame und beenden die Verbindung.
//!
//! ## Feld-Namen
//! Kodiert wird immer camelCase; dekodiert wird case-insensitiv. Dazu
//! faltet der Decoder alle Objekt-Schluessel auf Kleinbuchstaben, bevor
//! die typisierte Deserialisierung laeuft – die Payload-Strukturen in
//! [`crate::control`] tragen fuer jedes mehrteilige Feld einen
//! Kleinbuchstaben-Alias.

use bytes::{Buf, BufMut, BytesMut};
use serde_json::Value;
use std::io;
use tokio_util::codec::{Decoder, Encoder};

use crate::control::ControlMessage;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Maximale Frame-Groesse (64 KiB JSON-Payload)
pub const MAX_FRAME_LAENGE: usize = 65536;

/// Groesse des Laengen-Felds in Bytes
pub const LAENGENFELD_GROESSE: usize = 4;

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer die frame-basierte Control-Verbindung
///
/// Implementiert `Encoder<ControlMessage>` und `Decoder` fuer die
/// Integration mit `tokio_util::codec::Framed`.
#[derive(Debug, Clone, Default)]
pub struct FrameCodec;

impl FrameCodec {
    /// Erstellt einen neuen `FrameCodec`
    pub fn new() -> Self {
        Self
    }
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl Decoder for FrameCodec {
    type Item = ControlMessage;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Warte auf mindestens 4 Bytes fuer das Laengen-Feld
        if src.len() < LAENGENFELD_GROESSE {
            return Ok(None);
        }

        // Laenge lesen (little-endian u32) ohne den Buffer zu veraendern
        let laenge = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;

        if laenge == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Ungueltiger Frame: Laenge 0",
            ));
        }
        if laenge > MAX_FRAME_LAENGE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                    laenge, MAX_FRAME_LAENGE
                ),
            ));
        }

        // Pruefen ob der vollstaendige Frame bereits im Buffer ist
        let gesamt = LAENGENFELD_GROESSE + laenge;
        if src.len() < gesamt {
            src.reserve(gesamt - src.len());
            return Ok(None);
        }

        // Laengen-Feld verbrauchen, Payload extrahieren
        src.advance(LAENGENFELD_GROESSE);
        let payload = src.split_to(laenge);

        let roh: Value = serde_json::from_slice(&payload).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Deserialisierung fehlgeschlagen: {}", e),
            )
        })?;

        // Case-insensitives Dekodieren: Schluessel vor dem typisierten
        // Matching auf Kleinbuchstaben falten
        let nachricht: ControlMessage =
            serde_json::from_value(schluessel_falten(roh)).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("JSON-Deserialisierung fehlgeschlagen: {}", e),
                )
            })?;

        Ok(Some(nachricht))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Ein am Stream-Ende unvollstaendiger Frame ist ein regulaeres EOF,
        // kein Protokollfehler
        match self.decode(src)? {
            Some(nachricht) => Ok(Some(nachricht)),
            None => {
                src.clear();
                Ok(None)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl Encoder<ControlMessage> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: ControlMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Serialisierung fehlgeschlagen: {}", e),
            )
        })?;

        if json.len() > MAX_FRAME_LAENGE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Nachricht zu gross: {} Bytes (Maximum: {} Bytes)",
                    json.len(),
                    MAX_FRAME_LAENGE
                ),
            ));
        }

        dst.reserve(LAENGENFELD_GROESSE + json.len());
        dst.put_u32_le(json.len() as u32);
        dst.put_slice(&json);
        Ok(())
    }
}

/// Faltet alle Objekt-Schluessel rekursiv auf Kleinbuchstaben
fn schluessel_falten(wert: Value) -> Value {
    match wert {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(schluessel, wert)| (schluessel.to_lowercase(), schluessel_falten(wert)))
                .collect(),
        ),
        Value::Array(liste) => Value::Array(liste.into_iter().map(schluessel_falten).collect()),
        andere => andere,
    }
}

// ---------------------------------------------------------------------------
// Einzelframe-Helfer
// ---------------------------------------------------------------------------

/// Kodiert eine Nachricht als vollstaendigen Frame (Laengenpraefix + JSON)
pub fn nachricht_kodieren(nachricht: &ControlMessage) -> io::Result<Vec<u8>> {
    let mut buf = BytesMut::new();
    FrameCodec::new().encode(nachricht.clone(), &mut buf)?;
    Ok(buf.to_vec())
}

/// Dekodiert genau einen vollstaendigen Frame
///
/// Gibt `InvalidData` zurueck wenn der Frame unvollstaendig ist oder
/// Bytes uebrig bleiben.
pub fn nachricht_dekodieren(bytes: &[u8]) -> io::Result<ControlMessage> {
    let mut buf = BytesMut::from(bytes);
    let nachricht = FrameCodec::new()
        .decode(&mut buf)?
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Unvollstaendiger Frame"))?;
    if !buf.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Unerwartete Bytes nach dem Frame",
        ));
    }
    Ok(nachricht)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
