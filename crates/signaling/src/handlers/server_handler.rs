//! Server-Handler – aggregierter Server-Zustand
//!
//! Liefert alle Kanaele mit ihren aktuellen Mitgliedern plus die
//! Information ob der anfragende Benutzer Kanaele erstellen darf.

use std::sync::Arc;

use whispr_auth::keys;
use whispr_core::types::ChannelId;
use whispr_db::models::BenutzerRecord;
use whispr_protocol::control::{ControlMessage, KanalZustand, ServerStateAntwort};

use crate::handlers::{interner_fehler, mitglieder_infos};
use crate::server_state::{Repositorien, SignalingState};

/// Verarbeitet `request_server_state`
pub async fn handle_server_state<R: Repositorien + 'static>(
    benutzer: &BenutzerRecord,
    ist_admin: bool,
    state: &Arc<SignalingState<R>>,
) -> ControlMessage {
    let kanal_records = match state.kanaele.liste().await {
        Ok(records) => records,
        Err(e) => return interner_fehler(e),
    };
    let mitgliedschaften = state.kanaele.mitgliedschaften();

    let mut channels = Vec::with_capacity(kanal_records.len());
    for record in kanal_records {
        let kanal_id = ChannelId(record.id);
        let member_ids = mitgliedschaften.get(&kanal_id).cloned().unwrap_or_default();
        let members = mitglieder_infos(&member_ids, state).await;
        channels.push(KanalZustand {
            id: kanal_id,
            name: record.name,
            member_ids,
            members,
        });
    }

    let darf_erstellen = ist_admin
        || state
            .berechtigungen
            .hat_berechtigung(benutzer.id, keys::CREATE_CHANNEL)
            .await
            .unwrap_or(false);
    let unter_limit = state.kanaele.unter_limit().await.unwrap_or(false);

    ControlMessage::ServerState(ServerStateAntwort {
        channels,
        can_create_channel: darf_erstellen && unter_limit,
    })
}
