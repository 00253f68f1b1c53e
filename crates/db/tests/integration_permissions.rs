//! Integration-Tests fuer PermissionRepository
//!
//! Jedes Szenario laeuft gegen beide Backends: In-Memory SQLite und
//! das fluechtige MemoryDb-Backend. Benutzer und Kanaele werden echt
//! angelegt, damit auch die Fremdschluessel des SQLite-Schemas greifen.

use uuid::Uuid;
use whispr_core::types::{KanalTyp, PermissionZustand, UserRolle};
use whispr_db::{
    models::{NeuerBenutzer, NeuerKanal},
    ChannelRepository, MemoryDb, PermissionRepository, SqliteDb, UserRepository,
};

async fn sqlite_db() -> SqliteDb {
    SqliteDb::in_memory()
        .await
        .expect("In-Memory DB konnte nicht erstellt werden")
}

async fn permissions_seeden<R: PermissionRepository>(db: &R) {
    for id in ["admin", "channel_access", "create_channel", "send_message"] {
        db.ensure_permission(id, id, None).await.unwrap();
    }
}

async fn benutzer_anlegen<R: UserRepository>(db: &R, name: &str) -> Uuid {
    UserRepository::create(
        db,
        NeuerBenutzer {
            username: name,
            password_hash: "hash",
            rolle: UserRolle::User,
        },
    )
    .await
    .unwrap()
    .id
}

async fn kanal_anlegen<R: ChannelRepository>(db: &R, name: &str) -> Uuid {
    ChannelRepository::create(
        db,
        NeuerKanal {
            name,
            kanal_typ: KanalTyp::Voice,
            is_default: false,
            key_material: &[0u8; 32],
        },
    )
    .await
    .unwrap()
    .id
}

async fn permissions_werden_nur_einmal_angelegt<R: PermissionRepository>(db: &R) {
    permissions_seeden(db).await;
    db.ensure_permission("admin", "Anderer Name", None)
        .await
        .unwrap();

    let alle = db.list_permissions().await.unwrap();
    assert_eq!(alle.len(), 4);
    let admin = alle.iter().find(|p| p.id == "admin").unwrap();
    assert_eq!(admin.name, "admin", "ensure darf nicht ueberschreiben");
}

#[tokio::test]
async fn permissions_werden_nur_einmal_angelegt_sqlite() {
    permissions_werden_nur_einmal_angelegt(&sqlite_db().await).await;
}

#[tokio::test]
async fn permissions_werden_nur_einmal_angelegt_memory() {
    permissions_werden_nur_einmal_angelegt(&MemoryDb::neu()).await;
}

async fn rolle_mit_zustaenden_anlegen<R: PermissionRepository>(db: &R) {
    permissions_seeden(db).await;
    db.ensure_role(
        "member",
        "Mitglied",
        &[("send_message", PermissionZustand::Allow)],
    )
    .await
    .unwrap();

    let rollen = db.list_roles().await.unwrap();
    assert_eq!(rollen.len(), 1);
    assert_eq!(rollen[0].id, "member");
    assert_eq!(
        rollen[0].zustaende,
        vec![("send_message".to_string(), PermissionZustand::Allow)]
    );

    let zustaende = db.role_states("member").await.unwrap();
    assert_eq!(zustaende.len(), 1);
}

#[tokio::test]
async fn rolle_mit_zustaenden_anlegen_sqlite() {
    rolle_mit_zustaenden_anlegen(&sqlite_db().await).await;
}

#[tokio::test]
async fn rolle_mit_zustaenden_anlegen_memory() {
    rolle_mit_zustaenden_anlegen(&MemoryDb::neu()).await;
}

async fn rollen_zuweisung<R: UserRepository + PermissionRepository>(db: &R) {
    permissions_seeden(db).await;
    db.ensure_role(
        "admin",
        "Administrator",
        &[("admin", PermissionZustand::Allow)],
    )
    .await
    .unwrap();
    let benutzer = benutzer_anlegen(db, "alice").await;

    db.set_user_role(benutzer, "admin", true).await.unwrap();
    db.set_user_role(benutzer, "admin", true).await.unwrap();
    assert_eq!(db.user_roles(benutzer).await.unwrap(), vec!["admin"]);

    db.set_user_role(benutzer, "admin", false).await.unwrap();
    assert!(db.user_roles(benutzer).await.unwrap().is_empty());
}

#[tokio::test]
async fn rollen_zuweisung_sqlite() {
    rollen_zuweisung(&sqlite_db().await).await;
}

#[tokio::test]
async fn rollen_zuweisung_memory() {
    rollen_zuweisung(&MemoryDb::neu()).await;
}

async fn direkter_override_setzen_ueberschreiben_entfernen<R>(db: &R)
where
    R: UserRepository + PermissionRepository,
{
    permissions_seeden(db).await;
    let benutzer = benutzer_anlegen(db, "bob").await;

    db.set_user_state(benutzer, "send_message", Some(PermissionZustand::Allow))
        .await
        .unwrap();
    db.set_user_state(benutzer, "send_message", Some(PermissionZustand::Deny))
        .await
        .unwrap();

    assert_eq!(
        db.user_states(benutzer).await.unwrap(),
        vec![("send_message".to_string(), PermissionZustand::Deny)]
    );

    db.set_user_state(benutzer, "send_message", None)
        .await
        .unwrap();
    assert!(db.user_states(benutzer).await.unwrap().is_empty());
}

#[tokio::test]
async fn direkter_override_setzen_ueberschreiben_entfernen_sqlite() {
    direkter_override_setzen_ueberschreiben_entfernen(&sqlite_db().await).await;
}

#[tokio::test]
async fn direkter_override_setzen_ueberschreiben_entfernen_memory() {
    direkter_override_setzen_ueberschreiben_entfernen(&MemoryDb::neu()).await;
}

async fn kanal_overrides<R>(db: &R)
where
    R: UserRepository + ChannelRepository + PermissionRepository,
{
    permissions_seeden(db).await;
    db.ensure_role("member", "Mitglied", &[]).await.unwrap();
    let kanal = kanal_anlegen(db, "Gesperrt").await;
    let benutzer = benutzer_anlegen(db, "carol").await;

    db.set_channel_role_state(
        kanal,
        "member",
        "channel_access",
        Some(PermissionZustand::Deny),
    )
    .await
    .unwrap();
    db.set_channel_user_state(
        kanal,
        benutzer,
        "channel_access",
        Some(PermissionZustand::Allow),
    )
    .await
    .unwrap();

    let rollen_zustaende = db.channel_role_states(kanal).await.unwrap();
    assert_eq!(
        rollen_zustaende,
        vec![(
            "member".to_string(),
            "channel_access".to_string(),
            PermissionZustand::Deny
        )]
    );

    let benutzer_zustaende = db.channel_user_states(kanal).await.unwrap();
    assert_eq!(
        benutzer_zustaende,
        vec![(
            benutzer,
            "channel_access".to_string(),
            PermissionZustand::Allow
        )]
    );

    // Entfernen macht den Kanal wieder override-frei
    db.set_channel_role_state(kanal, "member", "channel_access", None)
        .await
        .unwrap();
    db.set_channel_user_state(kanal, benutzer, "channel_access", None)
        .await
        .unwrap();
    assert!(db.channel_role_states(kanal).await.unwrap().is_empty());
    assert!(db.channel_user_states(kanal).await.unwrap().is_empty());
}

#[tokio::test]
async fn kanal_overrides_sqlite() {
    kanal_overrides(&sqlite_db().await).await;
}

#[tokio::test]
async fn kanal_overrides_memory() {
    kanal_overrides(&MemoryDb::neu()).await;
}
