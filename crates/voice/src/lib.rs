//! whispr-voice – UDP-Audio-Relay
//!
//! Der Server leitet versiegelte Audio-Datagramme zwischen den Mitgliedern
//! eines Kanals weiter ohne sie zu entschluesseln. Dieses Crate haelt die
//! Transport-Bindungen (ClientId <-> UserId <-> Adresse), das
//! Pro-Sender-Rate-Limit und die Empfangs-/Weiterleitungs-Loop.

pub mod limiter;
pub mod registry;
pub mod relay;

pub use limiter::PaketLimiter;
pub use registry::EndpunktRegistry;
pub use relay::AudioRelay;
