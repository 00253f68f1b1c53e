//! Permission-Handler – Rollen, direkte Overrides, Kanal-Overrides
//!
//! Lesende Operationen erfordern nur eine Anmeldung; alle mutierenden
//! Operationen erfordern Admin. Kanal-Overrides betreffen auf dem Draht
//! implizit `channel_access` – die einzige kanal-gebundene Berechtigung
//! des Protokolls.

use std::sync::Arc;

use whispr_auth::keys;
use whispr_core::types::{ChannelId, UserId};
use whispr_protocol::control::{
    ChannelPermissionsAntwort, ControlMessage, FehlerCode, PermissionInfo, PermissionStateEintrag,
    PermissionsListeAntwort, RolleInfo, RoleStateEintrag, RollenListeAntwort,
    SetChannelRolePermissionAnfrage, SetChannelUserPermissionAnfrage, SetUserPermissionAnfrage,
    SetUserRoleAnfrage, UserPermissionsAntwort, UserStateEintrag,
};

use crate::handlers::interner_fehler;
use crate::server_state::{Repositorien, SignalingState};

/// Gibt `true` zurueck wenn die Berechtigung zum geschlossenen Satz gehoert
fn bekannte_permission(id: &str) -> bool {
    matches!(
        id,
        keys::ADMIN | keys::CHANNEL_ACCESS | keys::CREATE_CHANNEL | keys::SEND_MESSAGE
    )
}

fn nur_admin() -> ControlMessage {
    ControlMessage::fehler(FehlerCode::AccessDenied, "Nur fuer Administratoren")
}

/// Verarbeitet `list_permissions`
pub async fn handle_list_permissions<R: Repositorien + 'static>(
    state: &Arc<SignalingState<R>>,
) -> ControlMessage {
    match state.db.list_permissions().await {
        Ok(permissions) => ControlMessage::PermissionsList(PermissionsListeAntwort {
            permissions: permissions
                .into_iter()
                .map(|p| PermissionInfo {
                    id: p.id,
                    name: p.name,
                    description: p.description,
                })
                .collect(),
        }),
        Err(e) => interner_fehler(e),
    }
}

/// Verarbeitet `list_roles`
pub async fn handle_list_roles<R: Repositorien + 'static>(
    state: &Arc<SignalingState<R>>,
) -> ControlMessage {
    match state.db.list_roles().await {
        Ok(rollen) => ControlMessage::RolesList(RollenListeAntwort {
            roles: rollen
                .into_iter()
                .map(|rolle| RolleInfo {
                    id: rolle.id,
                    name: rolle.name,
                    permissions: rolle
                        .zustaende
                        .into_iter()
                        .map(|(permission_id, state)| PermissionStateEintrag {
                            permission_id,
                            state,
                        })
                        .collect(),
                })
                .collect(),
        }),
        Err(e) => interner_fehler(e),
    }
}

/// Verarbeitet `get_user_permissions`
pub async fn handle_get_user_permissions<R: Repositorien + 'static>(
    user_id: UserId,
    state: &Arc<SignalingState<R>>,
) -> ControlMessage {
    match state.auth.benutzer(user_id.inner()).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return ControlMessage::fehler(FehlerCode::NotFound, "Benutzer nicht gefunden");
        }
        Err(e) => return interner_fehler(e),
    }

    let permissions = match state.db.user_states(user_id.inner()).await {
        Ok(zustaende) => zustaende
            .into_iter()
            .map(|(permission_id, state)| PermissionStateEintrag {
                permission_id,
                state,
            })
            .collect(),
        Err(e) => return interner_fehler(e),
    };

    let role_ids = match state.db.user_roles(user_id.inner()).await {
        Ok(rollen) => rollen,
        Err(e) => return interner_fehler(e),
    };

    ControlMessage::UserPermissions(UserPermissionsAntwort {
        user_id,
        permissions,
        role_ids,
    })
}

/// Verarbeitet `set_user_permission`; `state: null` entfernt den Override
pub async fn handle_set_user_permission<R: Repositorien + 'static>(
    anfrage: SetUserPermissionAnfrage,
    ist_admin: bool,
    state: &Arc<SignalingState<R>>,
) -> ControlMessage {
    if !ist_admin {
        return nur_admin();
    }
    if !bekannte_permission(&anfrage.permission_id) {
        return ControlMessage::fehler(
            FehlerCode::InvalidPayload,
            format!("Unbekannte Berechtigung '{}'", anfrage.permission_id),
        );
    }
    match state.auth.benutzer(anfrage.user_id.inner()).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return ControlMessage::fehler(FehlerCode::NotFound, "Benutzer nicht gefunden");
        }
        Err(e) => return interner_fehler(e),
    }

    if let Err(e) = state
        .db
        .set_user_state(
            anfrage.user_id.inner(),
            &anfrage.permission_id,
            anfrage.state,
        )
        .await
    {
        return interner_fehler(e);
    }

    tracing::info!(user = %anfrage.user_id, permission = %anfrage.permission_id, zustand = ?anfrage.state, "Benutzer-Override gesetzt");
    handle_get_user_permissions(anfrage.user_id, state).await
}

/// Verarbeitet `set_user_role`
pub async fn handle_set_user_role<R: Repositorien + 'static>(
    anfrage: SetUserRoleAnfrage,
    ist_admin: bool,
    state: &Arc<SignalingState<R>>,
) -> ControlMessage {
    if !ist_admin {
        return nur_admin();
    }
    match state.auth.benutzer(anfrage.user_id.inner()).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return ControlMessage::fehler(FehlerCode::NotFound, "Benutzer nicht gefunden");
        }
        Err(e) => return interner_fehler(e),
    }
    match rolle_existiert(&anfrage.role_id, state).await {
        Ok(true) => {}
        Ok(false) => {
            return ControlMessage::fehler(FehlerCode::NotFound, "Rolle nicht gefunden");
        }
        Err(antwort) => return antwort,
    }

    if let Err(e) = state
        .db
        .set_user_role(anfrage.user_id.inner(), &anfrage.role_id, anfrage.assign)
        .await
    {
        return interner_fehler(e);
    }

    tracing::info!(user = %anfrage.user_id, rolle = %anfrage.role_id, assign = anfrage.assign, "Rollen-Zuweisung geaendert");
    handle_get_user_permissions(anfrage.user_id, state).await
}

/// Verarbeitet `get_channel_permissions`
pub async fn handle_get_channel_permissions<R: Repositorien + 'static>(
    channel_id: ChannelId,
    state: &Arc<SignalingState<R>>,
) -> ControlMessage {
    match state.kanaele.holen(channel_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return ControlMessage::fehler(FehlerCode::NotFound, "Kanal nicht gefunden"),
        Err(e) => return interner_fehler(e),
    }

    let role_states = match state.db.channel_role_states(channel_id.inner()).await {
        Ok(zustaende) => zustaende
            .into_iter()
            .filter(|(_, permission_id, _)| permission_id == keys::CHANNEL_ACCESS)
            .map(|(role_id, _, state)| RoleStateEintrag { role_id, state })
            .collect(),
        Err(e) => return interner_fehler(e),
    };

    let user_states = match state.db.channel_user_states(channel_id.inner()).await {
        Ok(zustaende) => zustaende
            .into_iter()
            .filter(|(_, permission_id, _)| permission_id == keys::CHANNEL_ACCESS)
            .map(|(user_id, _, state)| UserStateEintrag {
                user_id: UserId(user_id),
                state,
            })
            .collect(),
        Err(e) => return interner_fehler(e),
    };

    ControlMessage::ChannelPermissions(ChannelPermissionsAntwort {
        channel_id,
        role_states,
        user_states,
    })
}

/// Verarbeitet `set_channel_role_permission`
pub async fn handle_set_channel_role_permission<R: Repositorien + 'static>(
    anfrage: SetChannelRolePermissionAnfrage,
    ist_admin: bool,
    state: &Arc<SignalingState<R>>,
) -> ControlMessage {
    if !ist_admin {
        return nur_admin();
    }
    match state.kanaele.holen(anfrage.channel_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return ControlMessage::fehler(FehlerCode::NotFound, "Kanal nicht gefunden"),
        Err(e) => return interner_fehler(e),
    }
    match rolle_existiert(&anfrage.role_id, state).await {
        Ok(true) => {}
        Ok(false) => return ControlMessage::fehler(FehlerCode::NotFound, "Rolle nicht gefunden"),
        Err(antwort) => return antwort,
    }

    if let Err(e) = state
        .db
        .set_channel_role_state(
            anfrage.channel_id.inner(),
            &anfrage.role_id,
            keys::CHANNEL_ACCESS,
            anfrage.state,
        )
        .await
    {
        return interner_fehler(e);
    }

    tracing::info!(kanal = %anfrage.channel_id, rolle = %anfrage.role_id, zustand = ?anfrage.state, "Kanal-Rollen-Override gesetzt");
    handle_get_channel_permissions(anfrage.channel_id, state).await
}

/// Verarbeitet `set_channel_user_permission`
pub async fn handle_set_channel_user_permission<R: Repositorien + 'static>(
    anfrage: SetChannelUserPermissionAnfrage,
    ist_admin: bool,
    state: &Arc<SignalingState<R>>,
) -> ControlMessage {
    if !ist_admin {
        return nur_admin();
    }
    match state.kanaele.holen(anfrage.channel_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return ControlMessage::fehler(FehlerCode::NotFound, "Kanal nicht gefunden"),
        Err(e) => return interner_fehler(e),
    }
    match state.auth.benutzer(anfrage.user_id.inner()).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return ControlMessage::fehler(FehlerCode::NotFound, "Benutzer nicht gefunden");
        }
        Err(e) => return interner_fehler(e),
    }

    if let Err(e) = state
        .db
        .set_channel_user_state(
            anfrage.channel_id.inner(),
            anfrage.user_id.inner(),
            keys::CHANNEL_ACCESS,
            anfrage.state,
        )
        .await
    {
        return interner_fehler(e);
    }

    tracing::info!(kanal = %anfrage.channel_id, user = %anfrage.user_id, zustand = ?anfrage.state, "Kanal-Benutzer-Override gesetzt");
    handle_get_channel_permissions(anfrage.channel_id, state).await
}

async fn rolle_existiert<R: Repositorien + 'static>(
    role_id: &str,
    state: &Arc<SignalingState<R>>,
) -> Result<bool, ControlMessage> {
    match state.db.list_roles().await {
        Ok(rollen) => Ok(rollen.iter().any(|rolle| rolle.id == role_id)),
        Err(e) => Err(interner_fehler(e)),
    }
}
