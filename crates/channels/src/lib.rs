//! whispr-channels – Kanal- und Mitgliedschafts-Service
//!
//! Kanaele sind persistiert; Mitgliedschaft ist Session-Zustand und lebt
//! ausschliesslich hier. Der Service ist die einzige Quelle fuer die
//! Invarianten "ein Benutzer ist in hoechstens einem Kanal" und
//! "Mitgliederliste und Benutzer-Kanal-Zuordnung sind konsistent".

pub mod error;
pub mod service;

pub use error::{KanalFehler, KanalResult};
pub use service::{ChannelService, JoinErgebnis, VerlassenErgebnis, KANAL_LIMIT};
