//! Integration-Tests fuer MessageRepository
//!
//! Jedes Szenario laeuft gegen beide Backends: In-Memory SQLite und
//! das fluechtige MemoryDb-Backend.

use uuid::Uuid;
use whispr_core::types::{KanalTyp, UserRolle};
use whispr_db::{
    models::{NeueNachricht, NeuerBenutzer, NeuerKanal},
    ChannelRepository, MemoryDb, MessageRepository, SqliteDb, UserRepository,
};

async fn sqlite_db() -> SqliteDb {
    SqliteDb::in_memory()
        .await
        .expect("In-Memory DB konnte nicht erstellt werden")
}

/// Legt Kanal und Absender an (die Fremdschluessel des SQLite-Schemas
/// verlangen echte Datensaetze)
async fn kanal_und_sender<R>(db: &R) -> (Uuid, Uuid)
where
    R: UserRepository + ChannelRepository,
{
    let kanal = ChannelRepository::create(
        db,
        NeuerKanal {
            name: "Text",
            kanal_typ: KanalTyp::Text,
            is_default: false,
            key_material: &[],
        },
    )
    .await
    .unwrap()
    .id;

    let sender = UserRepository::create(
        db,
        NeuerBenutzer {
            username: "alice",
            password_hash: "hash",
            rolle: UserRolle::User,
        },
    )
    .await
    .unwrap()
    .id;

    (kanal, sender)
}

async fn nachricht_persistieren_und_lesen<R>(db: &R)
where
    R: UserRepository + ChannelRepository + MessageRepository,
{
    let (kanal, sender) = kanal_und_sender(db).await;

    let nachricht = MessageRepository::create(
        db,
        NeueNachricht {
            channel_id: kanal,
            sender_id: sender,
            content: "enc:QUJDRA==",
        },
    )
    .await
    .unwrap();

    let verlauf = db.history(kanal, None, 100).await.unwrap();
    assert_eq!(verlauf.len(), 1);
    assert_eq!(verlauf[0].id, nachricht.id);
    assert_eq!(verlauf[0].content, "enc:QUJDRA==");
    assert_eq!(verlauf[0].sender_id, sender);
}

#[tokio::test]
async fn nachricht_persistieren_und_lesen_sqlite() {
    nachricht_persistieren_und_lesen(&sqlite_db().await).await;
}

#[tokio::test]
async fn nachricht_persistieren_und_lesen_memory() {
    nachricht_persistieren_und_lesen(&MemoryDb::neu()).await;
}

async fn verlauf_aufsteigend_mit_limit_und_since<R>(db: &R)
where
    R: UserRepository + ChannelRepository + MessageRepository,
{
    let (kanal, sender) = kanal_und_sender(db).await;

    let mut erstellt = Vec::new();
    for i in 0..5 {
        let nachricht = MessageRepository::create(
            db,
            NeueNachricht {
                channel_id: kanal,
                sender_id: sender,
                content: &format!("nachricht {i}"),
            },
        )
        .await
        .unwrap();
        erstellt.push(nachricht);
        // Erzwingt unterscheidbare Zeitstempel fuer den since-Filter
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let alle = db.history(kanal, None, 100).await.unwrap();
    assert_eq!(alle.len(), 5);
    assert_eq!(alle[0].content, "nachricht 0");
    assert_eq!(alle[4].content, "nachricht 4");

    let begrenzt = db.history(kanal, None, 3).await.unwrap();
    assert_eq!(begrenzt.len(), 3);
    assert_eq!(begrenzt[2].content, "nachricht 2");

    let seit = erstellt[2].created_at;
    let neuere = db.history(kanal, Some(seit), 100).await.unwrap();
    assert_eq!(neuere.len(), 2);
    assert_eq!(neuere[0].content, "nachricht 3");
}

#[tokio::test]
async fn verlauf_aufsteigend_mit_limit_und_since_sqlite() {
    verlauf_aufsteigend_mit_limit_und_since(&sqlite_db().await).await;
}

#[tokio::test]
async fn verlauf_aufsteigend_mit_limit_und_since_memory() {
    verlauf_aufsteigend_mit_limit_und_since(&MemoryDb::neu()).await;
}

async fn verlauf_ist_pro_kanal<R>(db: &R)
where
    R: UserRepository + ChannelRepository + MessageRepository,
{
    let (kanal, sender) = kanal_und_sender(db).await;

    let anderer_kanal = ChannelRepository::create(
        db,
        NeuerKanal {
            name: "Anderer",
            kanal_typ: KanalTyp::Text,
            is_default: false,
            key_material: &[],
        },
    )
    .await
    .unwrap()
    .id;

    MessageRepository::create(
        db,
        NeueNachricht {
            channel_id: kanal,
            sender_id: sender,
            content: "hier",
        },
    )
    .await
    .unwrap();

    let fremd = db.history(anderer_kanal, None, 100).await.unwrap();
    assert!(fremd.is_empty());
}

#[tokio::test]
async fn verlauf_ist_pro_kanal_sqlite() {
    verlauf_ist_pro_kanal(&sqlite_db().await).await;
}

#[tokio::test]
async fn verlauf_ist_pro_kanal_memory() {
    verlauf_ist_pro_kanal(&MemoryDb::neu()).await;
}
