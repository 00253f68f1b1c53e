//! whispr-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert beide Draht-Protokolle des Servers:
//! das laengenpraefixierte JSON-Control-Protokoll (TCP/TLS) und das
//! binaere Audio-Paketformat (UDP).

pub mod audio;
pub mod control;
pub mod wire;

pub use audio::AudioPaket;
pub use control::{ControlMessage, FehlerCode};
pub use wire::FrameCodec;
