//! whispr-chat – Chat-Seitenkanal
//!
//! Minimaler Text-Kanal neben der Sprachuebertragung: Nachrichten werden
//! validiert, optional mit dem serverweiten Schluessel verschluesselt
//! gespeichert und als Verlauf wieder ausgeliefert. Editieren und
//! Loeschen gibt es bewusst nicht.

pub mod error;
pub mod service;

pub use error::{ChatError, ChatResult};
pub use service::{ChatNachricht, ChatService, MAX_NACHRICHT_LAENGE};
