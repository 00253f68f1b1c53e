//! Voice-Handler – UDP-Registrierung
//!
//! Der Client waehlt seine 32-Bit-ClientId selbst; die Registry bindet
//! sie atomar an den angemeldeten Benutzer. Die Absenderadresse lernt
//! erst das Relay aus dem ersten Datagramm.

use std::sync::Arc;

use whispr_core::types::UserId;
use whispr_protocol::control::{ControlMessage, RegisterUdpAnfrage, UdpRegistriertEreignis};

use crate::server_state::{Repositorien, SignalingState};

/// Verarbeitet `register_udp`
pub async fn handle_register_udp<R: Repositorien + 'static>(
    anfrage: RegisterUdpAnfrage,
    benutzer: &whispr_db::models::BenutzerRecord,
    state: &Arc<SignalingState<R>>,
) -> ControlMessage {
    let user_id = UserId(benutzer.id);

    state
        .registry
        .client_registrieren(anfrage.client_id, user_id);

    let ereignis = UdpRegistriertEreignis {
        user_id,
        client_id: anfrage.client_id,
    };

    // Kanal-Peers ueber die neue Transport-Bindung informieren
    if let Some(kanal_id) = state.kanaele.benutzer_kanal(user_id) {
        let peers = state.kanaele.andere_mitglieder(kanal_id, user_id);
        state.broadcaster.an_mitglieder_senden(
            &peers,
            ControlMessage::MemberUdpRegistered(ereignis.clone()),
            None,
        );
    }

    ControlMessage::RegisterUdpResponse(ereignis)
}
