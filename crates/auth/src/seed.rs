//! Seeding der Grunddaten und Testkonten
//!
//! Die geschlossene Berechtigungsmenge und die beiden Standard-Rollen
//! werden bei jedem Start sichergestellt (idempotent). Testkonten werden
//! nur auf ausdrueckliche Konfiguration und nur in eine leere
//! Benutzertabelle geschrieben – im Produktivbetrieb bleibt das aus.

use whispr_core::types::{PermissionZustand, UserRolle};
use whispr_db::{models::NeuerBenutzer, PermissionRepository, UserRepository};

use crate::{
    error::AuthResult,
    password::passwort_hashen,
    permissions::keys,
};

/// ID der Standard-Admin-Rolle
pub const ROLLE_ADMIN: &str = "admin";

/// ID der Standard-Mitglieder-Rolle
pub const ROLLE_MEMBER: &str = "member";

/// Stellt Berechtigungen und Standard-Rollen sicher (idempotent)
pub async fn grunddaten_seeden<R: PermissionRepository>(repo: &R) -> AuthResult<()> {
    let permissions = [
        (keys::ADMIN, "Administration", "Voller Serverzugriff"),
        (
            keys::CHANNEL_ACCESS,
            "Kanal-Zugriff",
            "Beschraenkte Kanaele betreten",
        ),
        (
            keys::CREATE_CHANNEL,
            "Kanal erstellen",
            "Neue Kanaele anlegen",
        ),
        (
            keys::SEND_MESSAGE,
            "Nachrichten senden",
            "Chat-Nachrichten in Kanaele schreiben",
        ),
    ];
    for (id, name, beschreibung) in permissions {
        repo.ensure_permission(id, name, Some(beschreibung)).await?;
    }

    repo.ensure_role(
        ROLLE_ADMIN,
        "Administrator",
        &[
            (keys::ADMIN, PermissionZustand::Allow),
            (keys::CREATE_CHANNEL, PermissionZustand::Allow),
        ],
    )
    .await?;

    repo.ensure_role(
        ROLLE_MEMBER,
        "Mitglied",
        &[(keys::SEND_MESSAGE, PermissionZustand::Allow)],
    )
    .await?;

    Ok(())
}

/// Legt die Testkonten `admin/admin` und `bob/bob` an
///
/// Greift nur wenn die Benutzertabelle leer ist.
pub async fn testbenutzer_seeden<R: UserRepository + PermissionRepository>(
    repo: &R,
) -> AuthResult<()> {
    if UserRepository::count(repo).await? > 0 {
        return Ok(());
    }

    let admin_hash = passwort_hashen("admin")?;
    let admin = repo
        .create(NeuerBenutzer {
            username: "admin",
            password_hash: &admin_hash,
            rolle: UserRolle::Admin,
        })
        .await?;
    repo.set_user_role(admin.id, ROLLE_ADMIN, true).await?;

    let bob_hash = passwort_hashen("bob")?;
    let bob = repo
        .create(NeuerBenutzer {
            username: "bob",
            password_hash: &bob_hash,
            rolle: UserRolle::User,
        })
        .await?;
    repo.set_user_role(bob.id, ROLLE_MEMBER, true).await?;

    tracing::warn!("Testbenutzer admin/admin und bob/bob angelegt – nicht fuer Produktivbetrieb");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::passwort_verifizieren;
    use whispr_db::MemoryDb;

    #[tokio::test]
    async fn grunddaten_sind_idempotent() {
        let repo = MemoryDb::neu();
        grunddaten_seeden(&repo).await.unwrap();
        grunddaten_seeden(&repo).await.unwrap();

        assert_eq!(repo.list_permissions().await.unwrap().len(), 4);
        let rollen = repo.list_roles().await.unwrap();
        let ids: Vec<_> = rollen.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["admin", "member"]);
    }

    #[tokio::test]
    async fn testbenutzer_nur_in_leere_tabelle() {
        let repo = MemoryDb::neu();
        grunddaten_seeden(&repo).await.unwrap();
        testbenutzer_seeden(&repo).await.unwrap();

        let admin = repo.get_by_name("admin").await.unwrap().unwrap();
        assert_eq!(admin.rolle, UserRolle::Admin);
        assert!(passwort_verifizieren("admin", &admin.password_hash).unwrap());
        assert_eq!(repo.user_roles(admin.id).await.unwrap(), vec!["admin"]);

        let bob = repo.get_by_name("bob").await.unwrap().unwrap();
        assert_eq!(repo.user_roles(bob.id).await.unwrap(), vec!["member"]);

        // Zweiter Lauf legt nichts mehr an
        testbenutzer_seeden(&repo).await.unwrap();
        assert_eq!(UserRepository::count(&repo).await.unwrap(), 2);
    }
}
