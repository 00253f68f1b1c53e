//! Handler fuer alle Control-Nachrichtentypen

pub mod auth_handler;
pub mod channel_handler;
pub mod chat_handler;
pub mod permission_handler;
pub mod server_handler;
pub mod voice_handler;

use std::sync::Arc;

use whispr_core::types::UserId;
use whispr_protocol::control::{ControlMessage, FehlerCode, MitgliedInfo};

use crate::server_state::{Repositorien, SignalingState};

/// Antwort fuer unerwartete interne Fehler; Details bleiben im Log
pub(crate) fn interner_fehler(fehler: impl std::fmt::Display) -> ControlMessage {
    tracing::error!(fehler = %fehler, "Handler-Fehler");
    ControlMessage::fehler(FehlerCode::InternalError, "Interner Fehler")
}

/// Baut die MitgliedInfo-Liste fuer eine Mitglieder-Menge
pub(crate) async fn mitglieder_infos<R: Repositorien + 'static>(
    mitglieder: &[UserId],
    state: &Arc<SignalingState<R>>,
) -> Vec<MitgliedInfo> {
    let mut infos = Vec::with_capacity(mitglieder.len());
    for user_id in mitglieder {
        let record = match state.auth.benutzer(user_id.inner()).await {
            Ok(Some(record)) => record,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(fehler = %e, user = %user_id, "Mitglied nicht ladbar");
                continue;
            }
        };
        let ist_admin = state.auth.ist_admin(&record).await.unwrap_or(false);
        infos.push(MitgliedInfo {
            user_id: *user_id,
            username: record.username,
            client_id: state.registry.client_id(*user_id),
            is_admin: ist_admin,
        });
    }
    infos
}
