//! Control-Protokoll (TCP/TLS)
//!
//! Definiert alle Steuerungsnachrichten die ueber die TLS-Verbindung
//! zwischen Client und Server ausgetauscht werden.
//!
//! ## Design
//! - JSON-Serialisierung via serde (TCP, nicht zeitkritisch)
//! - Adjazent getaggtes Enum: `{ "type": "...", "payload": { ... } }`
//! - Nachrichtentypen in snake_case, Payload-Felder in camelCase
//! - Dekodiert wird case-insensitiv: der Frame-Decoder faltet alle
//!   Objekt-Schluessel auf Kleinbuchstaben, jedes mehrteilige Feld
//!   traegt dafuer einen Kleinbuchstaben-Alias
//! - Das vestigiale "room"-Vokabular der Clients bleibt erhalten:
//!   `join_room` ist ein Alias fuer `join_channel`, Antworten heissen
//!   `room_joined` / `room_left`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use whispr_core::types::{ChannelId, ClientId, PermissionZustand, UserId, UserRolle};

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Standardisierte Fehler-Codes fuer `error`-Frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FehlerCode {
    NotAuthenticated,
    InvalidPayload,
    AccessDenied,
    NotFound,
    LimitReached,
    InternalError,
}

// ---------------------------------------------------------------------------
// Nachrichten-Enum
// ---------------------------------------------------------------------------

/// Eine vollstaendige Control-Nachricht
///
/// Client- und Server-Nachrichten teilen sich einen Namensraum; die
/// Richtung ergibt sich aus dem Typ. Unbekannte Typen schlagen bei der
/// Deserialisierung fehl und fuehren zum Verbindungsabbau.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ControlMessage {
    // --- Client -> Server ---
    Login(LoginAnfrage),
    Ping,
    RequestServerState,
    CreateChannel(CreateChannelAnfrage),
    #[serde(alias = "join_room")]
    JoinChannel(JoinChannelAnfrage),
    #[serde(alias = "leave_channel")]
    LeaveRoom,
    RegisterUdp(RegisterUdpAnfrage),
    ListPermissions,
    ListRoles,
    GetUserPermissions(GetUserPermissionsAnfrage),
    SetUserPermission(SetUserPermissionAnfrage),
    SetUserRole(SetUserRoleAnfrage),
    GetChannelPermissions(GetChannelPermissionsAnfrage),
    SetChannelRolePermission(SetChannelRolePermissionAnfrage),
    SetChannelUserPermission(SetChannelUserPermissionAnfrage),
    SendMessage(SendMessageAnfrage),
    GetMessageHistory(GetMessageHistoryAnfrage),

    // --- Server -> Client ---
    LoginResponse(LoginAntwort),
    Pong,
    ServerState(ServerStateAntwort),
    RoomJoined(RoomJoinedEreignis),
    RoomLeft(MitgliedEreignis),
    MemberJoined(MitgliedEreignis),
    MemberLeft(MitgliedEreignis),
    RegisterUdpResponse(UdpRegistriertEreignis),
    MemberUdpRegistered(UdpRegistriertEreignis),
    PermissionsList(PermissionsListeAntwort),
    RolesList(RollenListeAntwort),
    UserPermissions(UserPermissionsAntwort),
    ChannelPermissions(ChannelPermissionsAntwort),
    MessageReceived(NachrichtEreignis),
    MessageHistory(MessageHistoryAntwort),
    Error(FehlerAntwort),
}

impl ControlMessage {
    /// Erstellt einen `error`-Frame
    pub fn fehler(code: FehlerCode, message: impl Into<String>) -> Self {
        Self::Error(FehlerAntwort {
            code,
            message: message.into(),
        })
    }

    /// Erstellt eine fehlgeschlagene Login-Antwort
    pub fn login_fehlgeschlagen(grund: impl Into<String>) -> Self {
        Self::LoginResponse(LoginAntwort {
            success: false,
            token: None,
            user_id: None,
            username: None,
            role: None,
            is_admin: false,
            error: Some(grund.into()),
        })
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Login-Anfrage vom Client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginAnfrage {
    pub username: String,
    /// Klartext – wird serverseitig gegen den Argon2id-Hash verifiziert
    pub password: String,
}

/// Antwort auf eine Login-Anfrage (Erfolg und Fehlschlag)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginAntwort {
    pub success: bool,
    /// Opaker Bearer-Token, nur bei Erfolg
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "userid")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRolle>,
    #[serde(alias = "isadmin")]
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Server-Zustand
// ---------------------------------------------------------------------------

/// Mitglieds-Info innerhalb eines Kanals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MitgliedInfo {
    #[serde(alias = "userid")]
    pub user_id: UserId,
    pub username: String,
    /// UDP-Client-Kennung, falls der Client bereits registriert ist
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "clientid")]
    pub client_id: Option<ClientId>,
    #[serde(alias = "isadmin")]
    pub is_admin: bool,
}

/// Kanal-Eintrag im Server-Zustand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KanalZustand {
    pub id: ChannelId,
    pub name: String,
    #[serde(alias = "memberids")]
    pub member_ids: Vec<UserId>,
    pub members: Vec<MitgliedInfo>,
}

/// Vollstaendiger Server-Zustand fuer einen Client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStateAntwort {
    pub channels: Vec<KanalZustand>,
    #[serde(alias = "cancreatechannel")]
    pub can_create_channel: bool,
}

// ---------------------------------------------------------------------------
// Kanaele
// ---------------------------------------------------------------------------

/// Kanal-Erstellungs-Anfrage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannelAnfrage {
    pub name: String,
}

/// Kanal-Beitritts-Anfrage (`join_channel` oder `join_room`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinChannelAnfrage {
    #[serde(alias = "roomid")]
    pub room_id: ChannelId,
}

/// Bestaetigung eines Kanal-Beitritts an den Beitretenden
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinedEreignis {
    #[serde(alias = "roomid")]
    pub room_id: ChannelId,
    #[serde(alias = "roomname")]
    pub room_name: String,
    #[serde(alias = "memberids")]
    pub member_ids: Vec<UserId>,
    pub members: Vec<MitgliedInfo>,
    /// Base64 des 32-Byte-Kanalschluessels (nur Voice-Kanaele)
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "keymaterial")]
    pub key_material: Option<String>,
}

/// Mitglieds-Ereignis (`member_joined`, `member_left`, `room_left`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MitgliedEreignis {
    #[serde(alias = "userid")]
    pub user_id: UserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "clientid")]
    pub client_id: Option<ClientId>,
}

// ---------------------------------------------------------------------------
// UDP-Registrierung
// ---------------------------------------------------------------------------

/// UDP-Registrierungs-Anfrage mit der vom Client gewaehlten Kennung
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUdpAnfrage {
    #[serde(alias = "clientid")]
    pub client_id: ClientId,
}

/// Bestaetigung bzw. Peer-Benachrichtigung einer UDP-Registrierung
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UdpRegistriertEreignis {
    #[serde(alias = "userid")]
    pub user_id: UserId,
    #[serde(alias = "clientid")]
    pub client_id: ClientId,
}

// ---------------------------------------------------------------------------
// Berechtigungen
// ---------------------------------------------------------------------------

/// Eintrag `(permissionId, state)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionStateEintrag {
    #[serde(alias = "permissionid")]
    pub permission_id: String,
    pub state: PermissionZustand,
}

/// Eine bekannte Berechtigung
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionInfo {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Antwort auf `list_permissions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionsListeAntwort {
    pub permissions: Vec<PermissionInfo>,
}

/// Eine Rolle mit ihren Berechtigungszustaenden
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolleInfo {
    pub id: String,
    pub name: String,
    pub permissions: Vec<PermissionStateEintrag>,
}

/// Antwort auf `list_roles`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollenListeAntwort {
    pub roles: Vec<RolleInfo>,
}

/// Anfrage nach den direkten Berechtigungen eines Benutzers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserPermissionsAnfrage {
    #[serde(alias = "userid")]
    pub user_id: UserId,
}

/// Antwort auf `get_user_permissions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPermissionsAntwort {
    #[serde(alias = "userid")]
    pub user_id: UserId,
    pub permissions: Vec<PermissionStateEintrag>,
    #[serde(alias = "roleids")]
    pub role_ids: Vec<String>,
}

/// Setzt oder entfernt (`state: null`) eine direkte Benutzer-Berechtigung
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetUserPermissionAnfrage {
    #[serde(alias = "userid")]
    pub user_id: UserId,
    #[serde(alias = "permissionid")]
    pub permission_id: String,
    pub state: Option<PermissionZustand>,
}

/// Weist eine Rolle zu oder entzieht sie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetUserRoleAnfrage {
    #[serde(alias = "userid")]
    pub user_id: UserId,
    #[serde(alias = "roleid")]
    pub role_id: String,
    pub assign: bool,
}

/// Anfrage nach den Kanal-Overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetChannelPermissionsAnfrage {
    #[serde(alias = "channelid")]
    pub channel_id: ChannelId,
}

/// Kanal-Override einer Rolle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleStateEintrag {
    #[serde(alias = "roleid")]
    pub role_id: String,
    pub state: PermissionZustand,
}

/// Kanal-Override eines Benutzers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStateEintrag {
    #[serde(alias = "userid")]
    pub user_id: UserId,
    pub state: PermissionZustand,
}

/// Antwort auf `get_channel_permissions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPermissionsAntwort {
    #[serde(alias = "channelid")]
    pub channel_id: ChannelId,
    #[serde(alias = "rolestates")]
    pub role_states: Vec<RoleStateEintrag>,
    #[serde(alias = "userstates")]
    pub user_states: Vec<UserStateEintrag>,
}

/// Setzt oder entfernt (`state: null`) einen Kanal-Override fuer eine Rolle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetChannelRolePermissionAnfrage {
    #[serde(alias = "channelid")]
    pub channel_id: ChannelId,
    #[serde(alias = "roleid")]
    pub role_id: String,
    pub state: Option<PermissionZustand>,
}

/// Setzt oder entfernt (`state: null`) einen Kanal-Override fuer einen Benutzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetChannelUserPermissionAnfrage {
    #[serde(alias = "channelid")]
    pub channel_id: ChannelId,
    #[serde(alias = "userid")]
    pub user_id: UserId,
    pub state: Option<PermissionZustand>,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Chat-Nachricht senden
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageAnfrage {
    #[serde(alias = "channelid")]
    pub channel_id: ChannelId,
    pub content: String,
}

/// Zustellung einer Chat-Nachricht an Kanal-Mitglieder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NachrichtEreignis {
    #[serde(alias = "channelid")]
    pub channel_id: ChannelId,
    #[serde(alias = "messageid")]
    pub message_id: uuid::Uuid,
    #[serde(alias = "senderid")]
    pub sender_id: UserId,
    pub username: String,
    pub content: String,
    #[serde(alias = "createdat")]
    pub created_at: DateTime<Utc>,
}

/// Anfrage nach dem Nachrichtenverlauf eines Kanals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMessageHistoryAnfrage {
    #[serde(alias = "channelid")]
    pub channel_id: ChannelId,
    /// Nur Nachrichten nach diesem Zeitpunkt (RFC3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    /// 1..=500; fehlend = Standardwert des Servers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Eintrag im Nachrichtenverlauf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NachrichtInfo {
    pub id: uuid::Uuid,
    #[serde(alias = "channelid")]
    pub channel_id: ChannelId,
    #[serde(alias = "senderid")]
    pub sender_id: UserId,
    pub content: String,
    #[serde(alias = "createdat")]
    pub created_at: DateTime<Utc>,
}

/// Antwort auf `get_message_history`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHistoryAntwort {
    #[serde(alias = "channelid")]
    pub channel_id: ChannelId,
    pub messages: Vec<NachrichtInfo>,
}

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// `error`-Frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FehlerAntwort {
    pub code: FehlerCode,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn login_als_getaggtes_json() {
        let msg = ControlMessage::Login(LoginAnfrage {
            username: "admin".into(),
            password: "admin".into(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "login");
        assert_eq!(json["payload"]["username"], "admin");
    }

    #[test]
    fn ping_ohne_payload() {
        let json = serde_json::to_value(&ControlMessage::Ping).unwrap();
        assert_eq!(json["type"], "ping");
        assert!(json.get("payload").is_none());

        let zurueck: ControlMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(zurueck, ControlMessage::Ping);
    }

    #[test]
    fn join_room_alias_wird_akzeptiert() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"type":"join_room","payload":{{"roomId":"{id}"}}}}"#);
        let msg: ControlMessage = serde_json::from_str(&json).unwrap();
        match msg {
            ControlMessage::JoinChannel(anfrage) => assert_eq!(anfrage.room_id.inner(), id),
            other => panic!("Unerwartete Nachricht: {other:?}"),
        }
    }

    #[test]
    fn payload_felder_sind_camel_case() {
        let msg = ControlMessage::RegisterUdp(RegisterUdpAnfrage {
            client_id: ClientId(424242),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["payload"]["clientId"], 424242);
    }

    #[test]
    fn state_null_entfernt_override() {
        let json = r#"{"type":"set_user_permission","payload":{"userId":"00000000-0000-0000-0000-000000000000","permissionId":"send_message","state":null}}"#;
        let msg: ControlMessage = serde_json::from_str(json).unwrap();
        match msg {
            ControlMessage::SetUserPermission(anfrage) => assert_eq!(anfrage.state, None),
            other => panic!("Unerwartete Nachricht: {other:?}"),
        }
    }

    #[test]
    fn kleinbuchstaben_aliase_fuer_gefaltete_schluessel() {
        // Der Frame-Decoder faltet Schluessel auf Kleinbuchstaben; die
        // Aliase muessen diese Form annehmen
        let json = r#"{"type":"set_user_role","payload":{"userid":"00000000-0000-0000-0000-000000000000","roleid":"member","assign":true}}"#;
        let msg: ControlMessage = serde_json::from_str(json).unwrap();
        match msg {
            ControlMessage::SetUserRole(anfrage) => {
                assert_eq!(anfrage.role_id, "member");
                assert!(anfrage.assign);
            }
            andere => panic!("Unerwartete Nachricht: {andere:?}"),
        }
    }

    #[test]
    fn fehler_code_snake_case() {
        let msg = ControlMessage::fehler(FehlerCode::AccessDenied, "Zugriff verweigert");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["payload"]["code"], "access_denied");
    }

    #[test]
    fn unbekannter_typ_schlaegt_fehl() {
        let ergebnis: Result<ControlMessage, _> =
            serde_json::from_str(r#"{"type":"format_hard_drive"}"#);
        assert!(ergebnis.is_err());
    }

    #[test]
    fn login_antwort_ohne_token_feld() {
        let msg = ControlMessage::login_fehlgeschlagen("Ungueltige Anmeldedaten");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["payload"]["success"], false);
        assert!(json["payload"].get("token").is_none());
        assert_eq!(json["payload"]["isAdmin"], false);
    }
}
