//! whispr-crypto – AEAD-Envelope fuer Audio und Nachrichten
//!
//! Dieses Crate implementiert den kryptografischen Umschlag den beide
//! Endpunkte teilen: AES-256-GCM mit 32-Byte-Schluesseln und 12-Byte-Nonces.
//! Audio nutzt deterministische Zaehler-Nonces pro Sender; die
//! At-Rest-Verschluesselung von Chat-Nachrichten nutzt Zufalls-Nonces.

pub mod error;
pub mod rest;
pub mod seal;
pub mod types;

pub use error::{CryptoError, CryptoResult};
pub use seal::{schluessel_erzeugen, AudioOpener, AudioSealer};
pub use types::SecretBytes;
