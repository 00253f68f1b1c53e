//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt alle geteilten Services als Arc-Referenzen. Die Services sind
//! prozessweite Singletons; sie werden einmal im Kompositions-Root gebaut
//! und in Listener und Relay gereicht.

use std::sync::Arc;

use whispr_auth::{AuthService, PermissionService};
use whispr_channels::ChannelService;
use whispr_chat::ChatService;
use whispr_db::{
    ChannelRepository, MessageRepository, PermissionRepository, UserRepository,
};
use whispr_voice::{AudioRelay, EndpunktRegistry};

use crate::broadcast::EventBroadcaster;

/// Sammel-Bound fuer das eine Repository-Backend hinter allen Services
pub trait Repositorien:
    UserRepository + ChannelRepository + PermissionRepository + MessageRepository
{
}

impl<T> Repositorien for T where
    T: UserRepository + ChannelRepository + PermissionRepository + MessageRepository
{
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState<R: Repositorien + 'static> {
    /// Direkter Repository-Zugriff (Berechtigungs-Tabellen)
    pub db: Arc<R>,
    /// Auth-Service (Login, Token, Admin-Pruefung)
    pub auth: Arc<AuthService<R>>,
    /// Berechtigungs-Evaluator
    pub berechtigungen: Arc<PermissionService<R>>,
    /// Kanal-Service (Mitgliedschaft, Schluesselmaterial)
    pub kanaele: Arc<ChannelService<R>>,
    /// Chat-Service (Nachrichten, Verlauf)
    pub chat: Arc<ChatService<R>>,
    /// UDP-Transport-Bindungen
    pub registry: Arc<EndpunktRegistry>,
    /// Audio-Relay (fuer das Vergessen von Limiter-Zustand beim Cleanup)
    pub relay: Arc<AudioRelay<R>>,
    /// Ereignis-Verteilung an verbundene Clients
    pub broadcaster: EventBroadcaster,
}

impl<R: Repositorien + 'static> SignalingState<R> {
    /// Baut den geteilten Zustand aus den fertigen Services
    #[allow(clippy::too_many_arguments)]
    pub fn neu(
        db: Arc<R>,
        auth: Arc<AuthService<R>>,
        berechtigungen: Arc<PermissionService<R>>,
        kanaele: Arc<ChannelService<R>>,
        chat: Arc<ChatService<R>>,
        registry: Arc<EndpunktRegistry>,
        relay: Arc<AudioRelay<R>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            auth,
            berechtigungen,
            kanaele,
            chat,
            registry,
            relay,
            broadcaster: EventBroadcaster::neu(),
        })
    }
}
