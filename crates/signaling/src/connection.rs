//! Client-Verbindung – verwaltet eine einzelne TLS-Control-Session
//!
//! Jede Verbindung laeuft in einem eigenen Task auf der LocalSet.
//!
//! ## State Machine
//! ```text
//! Unauthentifiziert -> Authentifiziert -> Geschlossen
//! ```
//! `login` wechselt nach Authentifiziert; Lesefehler, EOF oder das
//! Shutdown-Signal schliessen die Verbindung. Der Abbau (Kanal verlassen,
//! UDP-Bindung entfernen, Broadcaster abmelden) laeuft genau einmal;
//! Tokens ueberleben die Verbindung.
//!
//! ## Schreibordnung
//! Frames werden einzeln gelesen und beantwortet; Broadcasts anderer
//! Tasks landen in der mpsc-Send-Queue. Beide Wege schreiben ueber
//! dieselbe Framed-Haelfte dieses Tasks, die Reihenfolge pro Verbindung
//! ist damit strikt.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_rustls::server::TlsStream;
use tokio_util::codec::Framed;

use whispr_core::types::UserId;
use whispr_protocol::control::{ControlMessage, MitgliedEreignis};
use whispr_protocol::wire::FrameCodec;

use crate::broadcast::SEND_QUEUE_GROESSE;
use crate::dispatcher::{MessageDispatcher, VerbindungsKontext};
use crate::server_state::{Repositorien, SignalingState};

/// Eine einzelne Control-Verbindung
pub struct ClientVerbindung<R: Repositorien + 'static> {
    state: Arc<SignalingState<R>>,
    peer_addr: SocketAddr,
}

impl<R: Repositorien + 'static> ClientVerbindung<R> {
    /// Erstellt die Verbindungs-Verwaltung fuer einen akzeptierten Stream
    pub fn neu(state: Arc<SignalingState<R>>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Treibt die Session bis zum Verbindungsende
    pub async fn verarbeiten(
        self,
        stream: TlsStream<TcpStream>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut framed = Framed::new(stream, FrameCodec::new());
        let (tx, mut rx) = mpsc::channel::<ControlMessage>(SEND_QUEUE_GROESSE);

        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));
        let mut ctx = VerbindungsKontext {
            peer_addr: self.peer_addr,
            benutzer: None,
            ist_admin: false,
            sende_queue: tx,
        };

        loop {
            tokio::select! {
                eingehend = framed.next() => {
                    match eingehend {
                        Some(Ok(nachricht)) => {
                            if let Some(antwort) = dispatcher.dispatch(nachricht, &mut ctx).await {
                                if let Err(e) = framed.send(antwort).await {
                                    tracing::debug!(peer = %self.peer_addr, fehler = %e, "Schreibfehler");
                                    break;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            // Ungueltiger Frame oder Transportfehler: Verbindung beenden
                            tracing::debug!(peer = %self.peer_addr, fehler = %e, "Lesefehler");
                            break;
                        }
                        None => {
                            tracing::debug!(peer = %self.peer_addr, "Verbindung beendet (EOF)");
                            break;
                        }
                    }
                }

                ausgehend = rx.recv() => {
                    match ausgehend {
                        Some(nachricht) => {
                            if let Err(e) = framed.send(nachricht).await {
                                tracing::debug!(peer = %self.peer_addr, fehler = %e, "Schreibfehler");
                                break;
                            }
                        }
                        None => break,
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::debug!(peer = %self.peer_addr, "Session-Abbruch durch Shutdown");
                        break;
                    }
                }
            }
        }

        self.aufraeumen(&mut ctx).await;
    }

    /// Session-Abbau, laeuft genau einmal am Verbindungsende
    async fn aufraeumen(&self, ctx: &mut VerbindungsKontext) {
        let Some(benutzer) = ctx.benutzer.take() else {
            return;
        };
        let user_id = UserId(benutzer.id);

        self.state.broadcaster.entfernen(&user_id);

        let client_id = self.state.registry.client_id(user_id);

        // Kanal verlassen und die Verbliebenen informieren
        if let Ok(ergebnis) = self.state.kanaele.verlassen(user_id) {
            let ereignis = ControlMessage::MemberLeft(MitgliedEreignis {
                user_id,
                username: benutzer.username.clone(),
                client_id,
            });
            self.state
                .broadcaster
                .an_mitglieder_senden(&ergebnis.verbleibende, ereignis, None);
        }

        // UDP-Bindungen und Limiter-Zustand vergessen; Tokens bleiben gueltig
        if let Some(client_id) = client_id {
            self.state.relay.client_vergessen(client_id);
        }
        self.state.registry.entfernen(user_id);

        tracing::info!(peer = %self.peer_addr, user = %user_id, "Session abgebaut");
    }
}
