//! Chat-Handler – Nachricht senden, Verlauf lesen
//!
//! `send_message` wird nur durch ein effektives Deny auf `send_message`
//! blockiert; die Zustellung geht an alle aktuellen Mitglieder des
//! Zielkanals, der Sender erhaelt dieselbe Nachricht als Antwort.

use std::sync::Arc;

use whispr_auth::keys;
use whispr_chat::ChatError;
use whispr_core::types::UserId;
use whispr_db::models::BenutzerRecord;
use whispr_protocol::control::{
    ControlMessage, FehlerCode, GetMessageHistoryAnfrage, MessageHistoryAntwort, NachrichtEreignis,
    NachrichtInfo, SendMessageAnfrage,
};

use crate::handlers::interner_fehler;
use crate::server_state::{Repositorien, SignalingState};

/// Verarbeitet `send_message`
pub async fn handle_send_message<R: Repositorien + 'static>(
    anfrage: SendMessageAnfrage,
    benutzer: &BenutzerRecord,
    ist_admin: bool,
    state: &Arc<SignalingState<R>>,
) -> ControlMessage {
    match state.kanaele.holen(anfrage.channel_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return ControlMessage::fehler(FehlerCode::NotFound, "Kanal nicht gefunden"),
        Err(e) => return interner_fehler(e),
    }

    let darf = ist_admin
        || state
            .berechtigungen
            .nicht_verweigert(benutzer.id, keys::SEND_MESSAGE)
            .await
            .unwrap_or(false);
    if !darf {
        return ControlMessage::fehler(FehlerCode::AccessDenied, "Berechtigung send_message verweigert");
    }

    let nachricht = match state
        .chat
        .nachricht_senden(anfrage.channel_id.inner(), benutzer.id, &anfrage.content)
        .await
    {
        Ok(nachricht) => nachricht,
        Err(ChatError::UngueltigeEingabe(grund)) => {
            return ControlMessage::fehler(FehlerCode::InvalidPayload, grund);
        }
        Err(e) => return interner_fehler(e),
    };

    let sender_id = UserId(benutzer.id);
    let ereignis = NachrichtEreignis {
        channel_id: anfrage.channel_id,
        message_id: nachricht.id,
        sender_id,
        username: benutzer.username.clone(),
        content: nachricht.content,
        created_at: nachricht.created_at,
    };

    // Zustellung an die aktuellen Kanal-Mitglieder; der Sender bekommt
    // seine Nachricht als direkte Antwort
    let mitglieder = state.kanaele.mitglieder(anfrage.channel_id);
    state.broadcaster.an_mitglieder_senden(
        &mitglieder,
        ControlMessage::MessageReceived(ereignis.clone()),
        Some(sender_id),
    );

    ControlMessage::MessageReceived(ereignis)
}

/// Verarbeitet `get_message_history`
pub async fn handle_get_message_history<R: Repositorien + 'static>(
    anfrage: GetMessageHistoryAnfrage,
    state: &Arc<SignalingState<R>>,
) -> ControlMessage {
    match state.kanaele.holen(anfrage.channel_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return ControlMessage::fehler(FehlerCode::NotFound, "Kanal nicht gefunden"),
        Err(e) => return interner_fehler(e),
    }

    let nachrichten = match state
        .chat
        .verlauf(anfrage.channel_id.inner(), anfrage.since, anfrage.limit)
        .await
    {
        Ok(nachrichten) => nachrichten,
        Err(ChatError::UngueltigeEingabe(grund)) => {
            return ControlMessage::fehler(FehlerCode::InvalidPayload, grund);
        }
        Err(e) => return interner_fehler(e),
    };

    let messages = nachrichten
        .into_iter()
        .map(|nachricht| NachrichtInfo {
            id: nachricht.id,
            channel_id: anfrage.channel_id,
            sender_id: UserId(nachricht.sender_id),
            content: nachricht.content,
            created_at: nachricht.created_at,
        })
        .collect();

    ControlMessage::MessageHistory(MessageHistoryAntwort {
        channel_id: anfrage.channel_id,
        messages,
    })
}
