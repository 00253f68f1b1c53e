//! Integration-Tests fuer UserRepository
//!
//! Jedes Szenario laeuft gegen beide Backends: In-Memory SQLite und
//! das fluechtige MemoryDb-Backend.

use whispr_core::types::UserRolle;
use whispr_db::{models::NeuerBenutzer, MemoryDb, SqliteDb, UserRepository};

async fn sqlite_db() -> SqliteDb {
    SqliteDb::in_memory()
        .await
        .expect("In-Memory DB konnte nicht erstellt werden")
}

async fn benutzer_erstellen_und_laden<R: UserRepository>(db: &R) {
    let user = db
        .create(NeuerBenutzer {
            username: "alice",
            password_hash: "hash_alice",
            rolle: UserRolle::User,
        })
        .await
        .expect("Benutzer erstellen fehlgeschlagen");

    assert_eq!(user.username, "alice");
    assert_eq!(user.rolle, UserRolle::User);

    let geladen = db
        .get_by_id(user.id)
        .await
        .expect("get_by_id fehlgeschlagen")
        .expect("Benutzer sollte gefunden werden");

    assert_eq!(geladen.id, user.id);
    assert_eq!(geladen.username, "alice");
    assert_eq!(geladen.password_hash, "hash_alice");
}

#[tokio::test]
async fn benutzer_erstellen_und_laden_sqlite() {
    benutzer_erstellen_und_laden(&sqlite_db().await).await;
}

#[tokio::test]
async fn benutzer_erstellen_und_laden_memory() {
    benutzer_erstellen_und_laden(&MemoryDb::neu()).await;
}

async fn benutzer_nach_name_case_insensitiv<R: UserRepository>(db: &R) {
    db.create(NeuerBenutzer {
        username: "Bob",
        password_hash: "hash_bob",
        rolle: UserRolle::Admin,
    })
    .await
    .unwrap();

    let gefunden = db
        .get_by_name("bob")
        .await
        .unwrap()
        .expect("Benutzer 'bob' sollte case-insensitiv gefunden werden");
    assert_eq!(gefunden.username, "Bob");
    assert_eq!(gefunden.rolle, UserRolle::Admin);

    let nicht_gefunden = db.get_by_name("unbekannt").await.unwrap();
    assert!(nicht_gefunden.is_none());
}

#[tokio::test]
async fn benutzer_nach_name_case_insensitiv_sqlite() {
    benutzer_nach_name_case_insensitiv(&sqlite_db().await).await;
}

#[tokio::test]
async fn benutzer_nach_name_case_insensitiv_memory() {
    benutzer_nach_name_case_insensitiv(&MemoryDb::neu()).await;
}

async fn benutzername_unique_auch_bei_anderer_schreibweise<R: UserRepository>(db: &R) {
    db.create(NeuerBenutzer {
        username: "charlie",
        password_hash: "hash1",
        rolle: UserRolle::User,
    })
    .await
    .unwrap();

    let fehler = db
        .create(NeuerBenutzer {
            username: "CHARLIE",
            password_hash: "hash2",
            rolle: UserRolle::User,
        })
        .await
        .unwrap_err();

    assert!(fehler.ist_eindeutigkeit(), "Erwarteter Eindeutigkeitsfehler");
}

#[tokio::test]
async fn benutzername_unique_auch_bei_anderer_schreibweise_sqlite() {
    benutzername_unique_auch_bei_anderer_schreibweise(&sqlite_db().await).await;
}

#[tokio::test]
async fn benutzername_unique_auch_bei_anderer_schreibweise_memory() {
    benutzername_unique_auch_bei_anderer_schreibweise(&MemoryDb::neu()).await;
}

async fn liste_und_anzahl<R: UserRepository>(db: &R) {
    assert_eq!(db.count().await.unwrap(), 0);

    for name in ["zoe", "anna", "mark"] {
        db.create(NeuerBenutzer {
            username: name,
            password_hash: "hash",
            rolle: UserRolle::User,
        })
        .await
        .unwrap();
    }

    assert_eq!(db.count().await.unwrap(), 3);
    let alle = db.list().await.unwrap();
    let namen: Vec<_> = alle.iter().map(|b| b.username.as_str()).collect();
    assert_eq!(namen, vec!["anna", "mark", "zoe"]);
}

#[tokio::test]
async fn liste_und_anzahl_sqlite() {
    liste_und_anzahl(&sqlite_db().await).await;
}

#[tokio::test]
async fn liste_und_anzahl_memory() {
    liste_und_anzahl(&MemoryDb::neu()).await;
}
