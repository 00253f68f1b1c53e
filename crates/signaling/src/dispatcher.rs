//! Message-Dispatcher – routet ControlMessages an die Handler
//!
//! ## Zustandspruefung
//! Vor der Anmeldung sind nur `login` und `ping` zulaessig; alles andere
//! beantwortet der Dispatcher mit `error { code: "not_authenticated" }`.
//! Nach der Anmeldung wird pro Nachrichtentyp an den passenden Handler
//! delegiert.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use whispr_db::models::BenutzerRecord;
use whispr_protocol::control::{ControlMessage, FehlerCode};

use crate::handlers::{
    auth_handler, channel_handler, chat_handler, permission_handler, server_handler, voice_handler,
};
use crate::server_state::{Repositorien, SignalingState};

/// Verbindungs-Kontext – Zustand einer einzelnen Control-Session
pub struct VerbindungsKontext {
    /// Peer-Adresse (fuer Logging)
    pub peer_addr: SocketAddr,
    /// Angemeldeter Benutzer; `None` solange unauthentifiziert
    pub benutzer: Option<BenutzerRecord>,
    /// Admin-Status, beim Login einmal ermittelt
    pub ist_admin: bool,
    /// Send-Queue dieser Verbindung (fuer die Broadcaster-Registrierung)
    pub sende_queue: mpsc::Sender<ControlMessage>,
}

/// Zentraler Message-Dispatcher
pub struct MessageDispatcher<R: Repositorien + 'static> {
    state: Arc<SignalingState<R>>,
}

impl<R: Repositorien + 'static> MessageDispatcher<R> {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState<R>>) -> Self {
        Self { state }
    }

    /// Verarbeitet eine eingehende Nachricht und gibt die Antwort zurueck
    pub async fn dispatch(
        &self,
        nachricht: ControlMessage,
        ctx: &mut VerbindungsKontext,
    ) -> Option<ControlMessage> {
        match nachricht {
            // Vor und nach der Anmeldung zulaessig
            ControlMessage::Ping => Some(ControlMessage::Pong),

            ControlMessage::Login(anfrage) => {
                if ctx.benutzer.is_some() {
                    return Some(ControlMessage::fehler(
                        FehlerCode::InvalidPayload,
                        "Bereits angemeldet",
                    ));
                }
                Some(auth_handler::handle_login(anfrage, ctx, &self.state).await)
            }

            // Alles andere erfordert eine Anmeldung
            nachricht => {
                let Some(benutzer) = ctx.benutzer.clone() else {
                    tracing::debug!(peer = %ctx.peer_addr, "Nachricht vor Anmeldung abgewiesen");
                    return Some(ControlMessage::fehler(
                        FehlerCode::NotAuthenticated,
                        "Nicht angemeldet",
                    ));
                };
                self.dispatch_authentifiziert(nachricht, &benutzer, ctx.ist_admin)
                    .await
            }
        }
    }

    async fn dispatch_authentifiziert(
        &self,
        nachricht: ControlMessage,
        benutzer: &BenutzerRecord,
        ist_admin: bool,
    ) -> Option<ControlMessage> {
        let state = &self.state;
        match nachricht {
            ControlMessage::RequestServerState => {
                Some(server_handler::handle_server_state(benutzer, ist_admin, state).await)
            }

            ControlMessage::CreateChannel(anfrage) => Some(
                channel_handler::handle_create_channel(anfrage, benutzer, ist_admin, state).await,
            ),

            ControlMessage::JoinChannel(anfrage) => Some(
                channel_handler::handle_join_channel(anfrage, benutzer, ist_admin, state).await,
            ),

            ControlMessage::LeaveRoom => {
                Some(channel_handler::handle_leave_room(benutzer, state).await)
            }

            ControlMessage::RegisterUdp(anfrage) => {
                Some(voice_handler::handle_register_udp(anfrage, benutzer, state).await)
            }

            ControlMessage::ListPermissions => {
                Some(permission_handler::handle_list_permissions(state).await)
            }

            ControlMessage::ListRoles => Some(permission_handler::handle_list_roles(state).await),

            ControlMessage::GetUserPermissions(anfrage) => {
                Some(permission_handler::handle_get_user_permissions(anfrage.user_id, state).await)
            }

            ControlMessage::SetUserPermission(anfrage) => Some(
                permission_handler::handle_set_user_permission(anfrage, ist_admin, state).await,
            ),

            ControlMessage::SetUserRole(anfrage) => {
                Some(permission_handler::handle_set_user_role(anfrage, ist_admin, state).await)
            }

            ControlMessage::GetChannelPermissions(anfrage) => Some(
                permission_handler::handle_get_channel_permissions(anfrage.channel_id, state).await,
            ),

            ControlMessage::SetChannelRolePermission(anfrage) => Some(
                permission_handler::handle_set_channel_role_permission(anfrage, ist_admin, state)
                    .await,
            ),

            ControlMessage::SetChannelUserPermission(anfrage) => Some(
                permission_handler::handle_set_channel_user_permission(anfrage, ist_admin, state)
                    .await,
            ),

            ControlMessage::SendMessage(anfrage) => Some(
                chat_handler::handle_send_message(anfrage, benutzer, ist_admin, state).await,
            ),

            ControlMessage::GetMessageHistory(anfrage) => {
                Some(chat_handler::handle_get_message_history(anfrage, state).await)
            }

            // Server->Client-Typen haben hier nichts verloren
            andere => {
                tracing::debug!(user = %benutzer.username, nachricht = ?andere, "Unerwarteter Nachrichtentyp");
                Some(ControlMessage::fehler(
                    FehlerCode::InvalidPayload,
                    "Unerwarteter Nachrichtentyp",
                ))
            }
        }
    }
}
