//! Auth-Handler – Login
//!
//! Prueft die Anmeldedaten (bzw. registriert bei aktivierter
//! Selbstregistrierung), stellt ein Bearer-Token aus und registriert die
//! Verbindung im Broadcaster. Der Verbindungs-Kontext wechselt damit in
//! den authentifizierten Zustand.

use std::sync::Arc;

use whispr_core::types::UserId;
use whispr_protocol::control::{ControlMessage, LoginAnfrage, LoginAntwort};

use crate::dispatcher::VerbindungsKontext;
use crate::server_state::{Repositorien, SignalingState};

/// Verarbeitet eine Login-Anfrage
pub async fn handle_login<R: Repositorien + 'static>(
    anfrage: LoginAnfrage,
    ctx: &mut VerbindungsKontext,
    state: &Arc<SignalingState<R>>,
) -> ControlMessage {
    let benutzer = match state
        .auth
        .anmelden_oder_registrieren(&anfrage.username, &anfrage.password)
        .await
    {
        Ok(Some(benutzer)) => benutzer,
        Ok(None) => {
            tracing::warn!(peer = %ctx.peer_addr, username = %anfrage.username, "Fehlgeschlagener Login");
            return ControlMessage::login_fehlgeschlagen("Ungueltige Anmeldedaten");
        }
        Err(e) => {
            tracing::error!(fehler = %e, "Login-Fehler");
            return ControlMessage::login_fehlgeschlagen("Interner Fehler");
        }
    };

    let ist_admin = match state.auth.ist_admin(&benutzer).await {
        Ok(ist_admin) => ist_admin,
        Err(e) => {
            tracing::error!(fehler = %e, "Admin-Pruefung fehlgeschlagen");
            false
        }
    };
    let token = state.auth.token_ausstellen(&benutzer).await;
    let user_id = UserId(benutzer.id);

    state
        .broadcaster
        .registrieren(user_id, ctx.sende_queue.clone());
    ctx.ist_admin = ist_admin;
    ctx.benutzer = Some(benutzer.clone());

    tracing::info!(peer = %ctx.peer_addr, user = %user_id, username = %benutzer.username, "Verbindung authentifiziert");

    ControlMessage::LoginResponse(LoginAntwort {
        success: true,
        token: Some(token),
        user_id: Some(user_id),
        username: Some(benutzer.username),
        role: Some(benutzer.rolle),
        is_admin: ist_admin,
        error: None,
    })
}
