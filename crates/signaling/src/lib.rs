//! whispr-signaling – TLS Control Layer
//!
//! Dieses Crate implementiert die Steuerungs-Ebene des Servers: den
//! TLS-Listener, eine Session pro Verbindung, den Nachrichten-Dispatch
//! und die Ereignis-Verteilung an Kanal-Mitglieder.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener + TLS-Handshake (ControlServer)
//!     |
//!     v
//! ClientVerbindung (pro Verbindung ein Task)
//!     |  State Machine: Unauthentifiziert -> Authentifiziert -> Geschlossen
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- auth_handler        (Login)
//!     +-- server_handler      (Server-Zustand)
//!     +-- channel_handler     (Create, Join, Leave)
//!     +-- voice_handler       (UDP-Registrierung)
//!     +-- permission_handler  (Rollen, Overrides)
//!     +-- chat_handler        (Nachrichten, Verlauf)
//!
//! EventBroadcaster – Frames in die Send-Queues der Empfaenger legen
//! ```

pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod server_state;
pub mod tcp;
pub mod tls;

// Bequeme Re-Exporte
pub use broadcast::EventBroadcaster;
pub use connection::ClientVerbindung;
pub use dispatcher::MessageDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use server_state::{Repositorien, SignalingState};
pub use tcp::ControlServer;
