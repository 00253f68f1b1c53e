//! Channel-Handler – Create, Join, Leave
//!
//! Join prueft die Kanal-Zugriffs-Entscheidung des Evaluators; Create
//! erfordert die `create_channel`-Berechtigung oder Admin. Mitglieder-
//! Snapshots kommen aus dem ChannelService, Broadcasts laufen ueber den
//! EventBroadcaster.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::sync::Arc;

use whispr_auth::keys;
use whispr_channels::KanalFehler;
use whispr_core::types::{KanalTyp, UserId};
use whispr_db::models::BenutzerRecord;
use whispr_protocol::control::{
    ControlMessage, CreateChannelAnfrage, FehlerCode, JoinChannelAnfrage, MitgliedEreignis,
    RoomJoinedEreignis,
};

use crate::handlers::{interner_fehler, mitglieder_infos, server_handler};
use crate::server_state::{Repositorien, SignalingState};

/// Verarbeitet `create_channel`
///
/// Das Control-Protokoll erstellt Voice-Kanaele; Text-Kanaele legt die
/// Administration direkt an. Die Antwort ist der aktualisierte
/// Server-Zustand.
pub async fn handle_create_channel<R: Repositorien + 'static>(
    anfrage: CreateChannelAnfrage,
    benutzer: &BenutzerRecord,
    ist_admin: bool,
    state: &Arc<SignalingState<R>>,
) -> ControlMessage {
    let darf = ist_admin
        || state
            .berechtigungen
            .hat_berechtigung(benutzer.id, keys::CREATE_CHANNEL)
            .await
            .unwrap_or(false);
    if !darf {
        return ControlMessage::fehler(
            FehlerCode::AccessDenied,
            "Berechtigung create_channel fehlt",
        );
    }

    match state.kanaele.erstellen(&anfrage.name, KanalTyp::Voice).await {
        Ok(kanal) => {
            tracing::info!(kanal = %kanal.name, von = %benutzer.username, "Kanal erstellt");
            server_handler::handle_server_state(benutzer, ist_admin, state).await
        }
        Err(KanalFehler::LimitErreicht(limit)) => ControlMessage::fehler(
            FehlerCode::LimitReached,
            format!("Kanal-Limit erreicht ({limit})"),
        ),
        Err(KanalFehler::UngueltigerName(_)) => {
            ControlMessage::fehler(FehlerCode::InvalidPayload, "Ungueltiger Kanalname")
        }
        Err(e) => interner_fehler(e),
    }
}

/// Verarbeitet `join_channel` / `join_room`
pub async fn handle_join_channel<R: Repositorien + 'static>(
    anfrage: JoinChannelAnfrage,
    benutzer: &BenutzerRecord,
    ist_admin: bool,
    state: &Arc<SignalingState<R>>,
) -> ControlMessage {
    let kanal_id = anfrage.room_id;

    match state.kanaele.holen(kanal_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return ControlMessage::fehler(FehlerCode::NotFound, "Kanal nicht gefunden");
        }
        Err(e) => return interner_fehler(e),
    }

    match state
        .berechtigungen
        .kanal_zugriff(benutzer.id, kanal_id.inner(), ist_admin)
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(user = %benutzer.username, kanal = %kanal_id, "Kanal-Zugriff verweigert");
            return ControlMessage::fehler(FehlerCode::AccessDenied, "Kein Zugriff auf diesen Kanal");
        }
        Err(e) => return interner_fehler(e),
    }

    let user_id = UserId(benutzer.id);
    let ergebnis = match state.kanaele.beitreten(kanal_id, user_id).await {
        Ok(ergebnis) => ergebnis,
        Err(KanalFehler::NichtGefunden(_)) => {
            return ControlMessage::fehler(FehlerCode::NotFound, "Kanal nicht gefunden");
        }
        Err(e) => return interner_fehler(e),
    };

    let client_id = state.registry.client_id(user_id);

    // Verlassenen Kanal informieren
    if let Some((_, verbliebene)) = &ergebnis.verlassen {
        let ereignis = ControlMessage::MemberLeft(MitgliedEreignis {
            user_id,
            username: benutzer.username.clone(),
            client_id,
        });
        state
            .broadcaster
            .an_mitglieder_senden(verbliebene, ereignis, None);
    }

    // Peers im neuen Kanal informieren
    let beitritt = ControlMessage::MemberJoined(MitgliedEreignis {
        user_id,
        username: benutzer.username.clone(),
        client_id,
    });
    state
        .broadcaster
        .an_mitglieder_senden(&ergebnis.mitglieder, beitritt, Some(user_id));

    let members = mitglieder_infos(&ergebnis.mitglieder, state).await;
    ControlMessage::RoomJoined(RoomJoinedEreignis {
        room_id: kanal_id,
        room_name: ergebnis.kanal.name,
        member_ids: ergebnis.mitglieder,
        members,
        key_material: ergebnis.schluessel.map(|schluessel| BASE64.encode(schluessel)),
    })
}

/// Verarbeitet `leave_room`
pub async fn handle_leave_room<R: Repositorien + 'static>(
    benutzer: &BenutzerRecord,
    state: &Arc<SignalingState<R>>,
) -> ControlMessage {
    let user_id = UserId(benutzer.id);
    let client_id = state.registry.client_id(user_id);

    match state.kanaele.verlassen(user_id) {
        Ok(ergebnis) => {
            let ereignis = MitgliedEreignis {
                user_id,
                username: benutzer.username.clone(),
                client_id,
            };
            state.broadcaster.an_mitglieder_senden(
                &ergebnis.verbleibende,
                ControlMessage::MemberLeft(ereignis.clone()),
                None,
            );
            ControlMessage::RoomLeft(ereignis)
        }
        Err(KanalFehler::KeinMitglied) => {
            ControlMessage::fehler(FehlerCode::InvalidPayload, "Nicht in einem Kanal")
        }
        Err(e) => interner_fehler(e),
    }
}
