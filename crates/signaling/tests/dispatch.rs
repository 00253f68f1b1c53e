//! Integration-Tests fuer den Dispatcher (ohne TLS-Transport)
//!
//! Treibt die Session-Logik direkt ueber den MessageDispatcher: Login mit
//! den Testkonten, Kanal-Beitritt samt Schluesselausgabe und
//! Peer-Benachrichtigung, UDP-Registrierung, Kanal-Sperren und Chat.

use std::sync::Arc;

use tokio::sync::mpsc;

use whispr_auth::{seed, AuthService, PermissionService, TokenStore};
use whispr_channels::ChannelService;
use whispr_chat::ChatService;
use whispr_core::types::{ChannelId, ClientId, PermissionZustand, UserId, UserRolle};
use whispr_db::MemoryDb;
use whispr_protocol::control::{
    ControlMessage, FehlerCode, GetMessageHistoryAnfrage, JoinChannelAnfrage, LoginAnfrage,
    RegisterUdpAnfrage, SendMessageAnfrage, SetChannelRolePermissionAnfrage,
    SetUserPermissionAnfrage,
};
use whispr_signaling::dispatcher::{MessageDispatcher, VerbindungsKontext};
use whispr_signaling::SignalingState;
use whispr_voice::{AudioRelay, EndpunktRegistry};

async fn test_state() -> Arc<SignalingState<MemoryDb>> {
    let db = Arc::new(MemoryDb::neu());
    seed::grunddaten_seeden(db.as_ref()).await.unwrap();
    seed::testbenutzer_seeden(db.as_ref()).await.unwrap();

    let berechtigungen = PermissionService::neu(Arc::clone(&db));
    let auth = AuthService::neu(
        Arc::clone(&db),
        Arc::clone(&berechtigungen),
        TokenStore::neu(24),
        false,
    );
    let kanaele = ChannelService::neu(Arc::clone(&db));
    kanaele.standard_sicherstellen().await.unwrap();
    let chat = ChatService::neu(Arc::clone(&db), None);
    let registry = Arc::new(EndpunktRegistry::neu());
    let relay = AudioRelay::binden(
        "127.0.0.1:0".parse().unwrap(),
        Arc::clone(&registry),
        Arc::clone(&kanaele),
    )
    .await
    .unwrap();

    SignalingState::neu(db, auth, berechtigungen, kanaele, chat, registry, relay)
}

fn verbindung() -> (VerbindungsKontext, mpsc::Receiver<ControlMessage>) {
    let (tx, rx) = mpsc::channel(64);
    let ctx = VerbindungsKontext {
        peer_addr: "127.0.0.1:9".parse().unwrap(),
        benutzer: None,
        ist_admin: false,
        sende_queue: tx,
    };
    (ctx, rx)
}

async fn anmelden(
    dispatcher: &MessageDispatcher<MemoryDb>,
    ctx: &mut VerbindungsKontext,
    username: &str,
    password: &str,
) -> ControlMessage {
    dispatcher
        .dispatch(
            ControlMessage::Login(LoginAnfrage {
                username: username.into(),
                password: password.into(),
            }),
            ctx,
        )
        .await
        .expect("Login muss eine Antwort liefern")
}

/// Liefert die ID des Standard-Kanals ueber `request_server_state`
async fn standard_kanal_id(
    dispatcher: &MessageDispatcher<MemoryDb>,
    ctx: &mut VerbindungsKontext,
) -> ChannelId {
    let antwort = dispatcher
        .dispatch(ControlMessage::RequestServerState, ctx)
        .await
        .unwrap();
    match antwort {
        ControlMessage::ServerState(zustand) => {
            let kanal = zustand
                .channels
                .iter()
                .find(|k| k.name == "General")
                .expect("Standard-Kanal muss existieren");
            kanal.id
        }
        andere => panic!("Unerwartete Antwort: {andere:?}"),
    }
}

#[tokio::test]
async fn login_mit_testkonto() {
    let state = test_state().await;
    let dispatcher = MessageDispatcher::neu(state);
    let (mut ctx, _rx) = verbindung();

    let antwort = anmelden(&dispatcher, &mut ctx, "admin", "admin").await;
    match antwort {
        ControlMessage::LoginResponse(resp) => {
            assert!(resp.success);
            assert!(!resp.token.unwrap().is_empty());
            assert!(resp.user_id.is_some());
            assert_eq!(resp.username.as_deref(), Some("admin"));
            assert_eq!(resp.role, Some(UserRolle::Admin));
            assert!(resp.is_admin);
        }
        andere => panic!("Unerwartete Antwort: {andere:?}"),
    }

    // Falsches Passwort auf einer frischen Verbindung
    let (mut ctx2, _rx2) = verbindung();
    let dispatcher = MessageDispatcher::neu(test_state().await);
    let antwort = anmelden(&dispatcher, &mut ctx2, "admin", "falsch").await;
    match antwort {
        ControlMessage::LoginResponse(resp) => {
            assert!(!resp.success);
            assert!(resp.token.is_none());
            assert!(resp.error.is_some());
        }
        andere => panic!("Unerwartete Antwort: {andere:?}"),
    }
}

#[tokio::test]
async fn unauthentifizierte_nachrichten_werden_abgewiesen() {
    let state = test_state().await;
    let dispatcher = MessageDispatcher::neu(state);
    let (mut ctx, _rx) = verbindung();

    // Ping geht immer
    let pong = dispatcher
        .dispatch(ControlMessage::Ping, &mut ctx)
        .await
        .unwrap();
    assert_eq!(pong, ControlMessage::Pong);

    // Alles andere nicht
    let antwort = dispatcher
        .dispatch(ControlMessage::RequestServerState, &mut ctx)
        .await
        .unwrap();
    match antwort {
        ControlMessage::Error(fehler) => {
            assert_eq!(fehler.code, FehlerCode::NotAuthenticated);
        }
        andere => panic!("Unerwartete Antwort: {andere:?}"),
    }
}

#[tokio::test]
async fn kanal_beitritt_mit_schluessel_und_peer_benachrichtigung() {
    let state = test_state().await;
    let dispatcher = MessageDispatcher::neu(Arc::clone(&state));

    let (mut admin_ctx, mut admin_rx) = verbindung();
    anmelden(&dispatcher, &mut admin_ctx, "admin", "admin").await;
    let kanal_id = standard_kanal_id(&dispatcher, &mut admin_ctx).await;

    // Admin betritt den Standard-Kanal
    let beitritt = dispatcher
        .dispatch(
            ControlMessage::JoinChannel(JoinChannelAnfrage { room_id: kanal_id }),
            &mut admin_ctx,
        )
        .await
        .unwrap();
    let admin_id = match beitritt {
        ControlMessage::RoomJoined(ereignis) => {
            assert_eq!(ereignis.room_id, kanal_id);
            assert_eq!(ereignis.room_name, "General");
            // 32 Bytes Schluesselmaterial, Base64-kodiert
            let schluessel = base64::Engine::decode(
                &base64::engine::general_purpose::STANDARD,
                ereignis.key_material.expect("Voice-Kanal braucht Schluessel"),
            )
            .unwrap();
            assert_eq!(schluessel.len(), 32);
            ereignis.member_ids[0]
        }
        andere => panic!("Unerwartete Antwort: {andere:?}"),
    };

    // Bob folgt; Admin muss member_joined sehen
    let (mut bob_ctx, _bob_rx) = verbindung();
    anmelden(&dispatcher, &mut bob_ctx, "bob", "bob").await;
    let beitritt = dispatcher
        .dispatch(
            ControlMessage::JoinChannel(JoinChannelAnfrage { room_id: kanal_id }),
            &mut bob_ctx,
        )
        .await
        .unwrap();
    match beitritt {
        ControlMessage::RoomJoined(ereignis) => {
            assert_eq!(ereignis.member_ids.len(), 2);
            assert!(ereignis.member_ids.contains(&admin_id));
        }
        andere => panic!("Unerwartete Antwort: {andere:?}"),
    }

    match admin_rx.recv().await {
        Some(ControlMessage::MemberJoined(ereignis)) => {
            assert_eq!(ereignis.username, "bob");
        }
        andere => panic!("Admin muss member_joined sehen: {andere:?}"),
    }
}

#[tokio::test]
async fn udp_registrierung_mit_peer_benachrichtigung() {
    let state = test_state().await;
    let dispatcher = MessageDispatcher::neu(Arc::clone(&state));

    let (mut admin_ctx, mut admin_rx) = verbindung();
    anmelden(&dispatcher, &mut admin_ctx, "admin", "admin").await;
    let kanal_id = standard_kanal_id(&dispatcher, &mut admin_ctx).await;
    dispatcher
        .dispatch(
            ControlMessage::JoinChannel(JoinChannelAnfrage { room_id: kanal_id }),
            &mut admin_ctx,
        )
        .await
        .unwrap();

    let (mut bob_ctx, _bob_rx) = verbindung();
    anmelden(&dispatcher, &mut bob_ctx, "bob", "bob").await;
    dispatcher
        .dispatch(
            ControlMessage::JoinChannel(JoinChannelAnfrage { room_id: kanal_id }),
            &mut bob_ctx,
        )
        .await
        .unwrap();
    let _ = admin_rx.recv().await; // member_joined von bob

    let antwort = dispatcher
        .dispatch(
            ControlMessage::RegisterUdp(RegisterUdpAnfrage {
                client_id: ClientId(424242),
            }),
            &mut bob_ctx,
        )
        .await
        .unwrap();
    let bob_id = UserId(bob_ctx.benutzer.as_ref().unwrap().id);
    match antwort {
        ControlMessage::RegisterUdpResponse(ereignis) => {
            assert_eq!(ereignis.client_id, ClientId(424242));
            assert_eq!(ereignis.user_id, bob_id);
        }
        andere => panic!("Unerwartete Antwort: {andere:?}"),
    }

    match admin_rx.recv().await {
        Some(ControlMessage::MemberUdpRegistered(ereignis)) => {
            assert_eq!(ereignis.client_id, ClientId(424242));
            assert_eq!(ereignis.user_id, bob_id);
        }
        andere => panic!("Admin muss member_udp_registered sehen: {andere:?}"),
    }

    assert_eq!(state.registry.user_id(ClientId(424242)), Some(bob_id));
}

#[tokio::test]
async fn kanal_deny_sperrt_mitglieder_rolle() {
    let state = test_state().await;
    let dispatcher = MessageDispatcher::neu(Arc::clone(&state));

    let (mut admin_ctx, _admin_rx) = verbindung();
    anmelden(&dispatcher, &mut admin_ctx, "admin", "admin").await;
    let kanal_id = standard_kanal_id(&dispatcher, &mut admin_ctx).await;

    // Admin sperrt den Kanal fuer die member-Rolle
    let antwort = dispatcher
        .dispatch(
            ControlMessage::SetChannelRolePermission(SetChannelRolePermissionAnfrage {
                channel_id: kanal_id,
                role_id: "member".into(),
                state: Some(PermissionZustand::Deny),
            }),
            &mut admin_ctx,
        )
        .await
        .unwrap();
    match antwort {
        ControlMessage::ChannelPermissions(perms) => {
            assert_eq!(perms.role_states.len(), 1);
            assert_eq!(perms.role_states[0].state, PermissionZustand::Deny);
        }
        andere => panic!("Unerwartete Antwort: {andere:?}"),
    }

    // Bob (haelt nur member) wird abgewiesen
    let (mut bob_ctx, _bob_rx) = verbindung();
    anmelden(&dispatcher, &mut bob_ctx, "bob", "bob").await;
    let antwort = dispatcher
        .dispatch(
            ControlMessage::JoinChannel(JoinChannelAnfrage { room_id: kanal_id }),
            &mut bob_ctx,
        )
        .await
        .unwrap();
    match antwort {
        ControlMessage::Error(fehler) => {
            assert_eq!(fehler.code, FehlerCode::AccessDenied);
        }
        andere => panic!("Bob muss abgewiesen werden: {andere:?}"),
    }

    // Admins passieren weiterhin
    let antwort = dispatcher
        .dispatch(
            ControlMessage::JoinChannel(JoinChannelAnfrage { room_id: kanal_id }),
            &mut admin_ctx,
        )
        .await
        .unwrap();
    assert!(matches!(antwort, ControlMessage::RoomJoined(_)));
}

#[tokio::test]
async fn mutierende_permission_operationen_nur_fuer_admins() {
    let state = test_state().await;
    let dispatcher = MessageDispatcher::neu(state);

    let (mut bob_ctx, _rx) = verbindung();
    anmelden(&dispatcher, &mut bob_ctx, "bob", "bob").await;
    let bob_id = UserId(bob_ctx.benutzer.as_ref().unwrap().id);

    let antwort = dispatcher
        .dispatch(
            ControlMessage::SetUserPermission(SetUserPermissionAnfrage {
                user_id: bob_id,
                permission_id: "admin".into(),
                state: Some(PermissionZustand::Allow),
            }),
            &mut bob_ctx,
        )
        .await
        .unwrap();
    match antwort {
        ControlMessage::Error(fehler) => {
            assert_eq!(fehler.code, FehlerCode::AccessDenied);
        }
        andere => panic!("Bob darf keine Overrides setzen: {andere:?}"),
    }
}

#[tokio::test]
async fn chat_nachricht_mit_verlauf() {
    let state = test_state().await;
    let dispatcher = MessageDispatcher::neu(Arc::clone(&state));

    let (mut admin_ctx, mut admin_rx) = verbindung();
    anmelden(&dispatcher, &mut admin_ctx, "admin", "admin").await;
    let kanal_id = standard_kanal_id(&dispatcher, &mut admin_ctx).await;
    dispatcher
        .dispatch(
            ControlMessage::JoinChannel(JoinChannelAnfrage { room_id: kanal_id }),
            &mut admin_ctx,
        )
        .await
        .unwrap();

    let (mut bob_ctx, _bob_rx) = verbindung();
    anmelden(&dispatcher, &mut bob_ctx, "bob", "bob").await;
    dispatcher
        .dispatch(
            ControlMessage::JoinChannel(JoinChannelAnfrage { room_id: kanal_id }),
            &mut bob_ctx,
        )
        .await
        .unwrap();
    let _ = admin_rx.recv().await; // member_joined von bob

    // Bob schreibt; die Antwort ist die zugestellte Nachricht
    let antwort = dispatcher
        .dispatch(
            ControlMessage::SendMessage(SendMessageAnfrage {
                channel_id: kanal_id,
                content: "  Hallo zusammen!  ".into(),
            }),
            &mut bob_ctx,
        )
        .await
        .unwrap();
    match &antwort {
        ControlMessage::MessageReceived(ereignis) => {
            assert_eq!(ereignis.content, "Hallo zusammen!");
            assert_eq!(ereignis.username, "bob");
        }
        andere => panic!("Unerwartete Antwort: {andere:?}"),
    }

    // Admin sieht dieselbe Nachricht als Broadcast
    match admin_rx.recv().await {
        Some(ControlMessage::MessageReceived(ereignis)) => {
            assert_eq!(ereignis.content, "Hallo zusammen!");
        }
        andere => panic!("Admin muss message_received sehen: {andere:?}"),
    }

    // Verlauf liefert die Nachricht zurueck
    let antwort = dispatcher
        .dispatch(
            ControlMessage::GetMessageHistory(GetMessageHistoryAnfrage {
                channel_id: kanal_id,
                since: None,
                limit: Some(50),
            }),
            &mut admin_ctx,
        )
        .await
        .unwrap();
    match antwort {
        ControlMessage::MessageHistory(verlauf) => {
            assert_eq!(verlauf.messages.len(), 1);
            assert_eq!(verlauf.messages[0].content, "Hallo zusammen!");
        }
        andere => panic!("Unerwartete Antwort: {andere:?}"),
    }

    // Ungueltiges Limit
    let antwort = dispatcher
        .dispatch(
            ControlMessage::GetMessageHistory(GetMessageHistoryAnfrage {
                channel_id: kanal_id,
                since: None,
                limit: Some(0),
            }),
            &mut admin_ctx,
        )
        .await
        .unwrap();
    match antwort {
        ControlMessage::Error(fehler) => {
            assert_eq!(fehler.code, FehlerCode::InvalidPayload);
        }
        andere => panic!("Limit 0 muss abgewiesen werden: {andere:?}"),
    }
}
