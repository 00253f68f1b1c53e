//! Berechtigungs-Evaluator
//!
//! Loest den effektiven Zustand einer Berechtigung fuer einen Benutzer auf:
//!
//! 1. **Globaler effektiver Zustand** = Merge aus direktem Override und
//!    allen Rollen-Zustaenden des Benutzers. Merge-Regel: Deny dominiert,
//!    sonst gewinnt Allow sobald eine Quelle erlaubt, sonst Neutral.
//! 2. **Admin**: `effektiv("admin") == Allow` oder Konto-Rolle `Admin`.
//! 3. **Kanal-Zugriff**: Admins passieren immer. Ein Kanal ohne jegliche
//!    `channel_access`-Overrides ist oeffentlich. Sobald Overrides
//!    existieren: Deny dominiert, sonst oeffnet ein Allow, sonst ist der
//!    Kanal geschlossen.

use std::sync::Arc;

use uuid::Uuid;
use whispr_core::types::{PermissionZustand, UserRolle};
use whispr_db::{models::BenutzerRecord, PermissionRepository};

use crate::error::AuthResult;

/// IDs der dem Server bekannten Berechtigungen
pub mod keys {
    pub const ADMIN: &str = "admin";
    pub const CHANNEL_ACCESS: &str = "channel_access";
    pub const CREATE_CHANNEL: &str = "create_channel";
    pub const SEND_MESSAGE: &str = "send_message";
}

/// Merged Zustaende mehrerer Quellen: Deny > Allow > Neutral
pub fn zustaende_mergen(quellen: &[PermissionZustand]) -> PermissionZustand {
    let mut hat_allow = false;
    for zustand in quellen {
        match zustand {
            PermissionZustand::Deny => return PermissionZustand::Deny,
            PermissionZustand::Allow => hat_allow = true,
            PermissionZustand::Neutral => {}
        }
    }
    if hat_allow {
        PermissionZustand::Allow
    } else {
        PermissionZustand::Neutral
    }
}

/// Berechtigungs-Service ueber dem PermissionRepository
pub struct PermissionService<P: PermissionRepository> {
    repo: Arc<P>,
}

impl<P: PermissionRepository> PermissionService<P> {
    /// Erstellt einen neuen PermissionService
    pub fn neu(repo: Arc<P>) -> Arc<Self> {
        Arc::new(Self { repo })
    }

    /// Globaler effektiver Zustand einer Berechtigung fuer einen Benutzer
    pub async fn effektiver_zustand(
        &self,
        user_id: Uuid,
        permission_id: &str,
    ) -> AuthResult<PermissionZustand> {
        let mut quellen = Vec::new();

        for (perm, zustand) in self.repo.user_states(user_id).await? {
            if perm == permission_id {
                quellen.push(zustand);
            }
        }

        for rolle in self.repo.user_roles(user_id).await? {
            for (perm, zustand) in self.repo.role_states(&rolle).await? {
                if perm == permission_id {
                    quellen.push(zustand);
                }
            }
        }

        Ok(zustaende_mergen(&quellen))
    }

    /// Gibt `true` zurueck wenn der effektive Zustand explizit Allow ist
    pub async fn hat_berechtigung(&self, user_id: Uuid, permission_id: &str) -> AuthResult<bool> {
        Ok(self.effektiver_zustand(user_id, permission_id).await? == PermissionZustand::Allow)
    }

    /// Gibt `true` zurueck solange kein effektives Deny vorliegt
    ///
    /// Neutrale oder fehlende Zustaende blockieren nicht.
    pub async fn nicht_verweigert(&self, user_id: Uuid, permission_id: &str) -> AuthResult<bool> {
        Ok(self.effektiver_zustand(user_id, permission_id).await? != PermissionZustand::Deny)
    }

    /// Admin-Pruefung: Konto-Rolle oder effektives Allow auf `admin`
    pub async fn ist_admin(&self, benutzer: &BenutzerRecord) -> AuthResult<bool> {
        if benutzer.rolle == UserRolle::Admin {
            return Ok(true);
        }
        self.hat_berechtigung(benutzer.id, keys::ADMIN).await
    }

    /// Kanal-Zugriffs-Entscheidung
    ///
    /// Oeffentlich solange der Kanal keinerlei `channel_access`-Overrides
    /// traegt; danach oeffnet nur ein explizites Allow.
    pub async fn kanal_zugriff(
        &self,
        user_id: Uuid,
        channel_id: Uuid,
        ist_admin: bool,
    ) -> AuthResult<bool> {
        if ist_admin {
            return Ok(true);
        }

        let rollen_overrides: Vec<(String, PermissionZustand)> = self
            .repo
            .channel_role_states(channel_id)
            .await?
            .into_iter()
            .filter(|(_, perm, _)| perm == keys::CHANNEL_ACCESS)
            .map(|(rolle, _, zustand)| (rolle, zustand))
            .collect();

        let benutzer_overrides: Vec<(Uuid, PermissionZustand)> = self
            .repo
            .channel_user_states(channel_id)
            .await?
            .into_iter()
            .filter(|(_, perm, _)| perm == keys::CHANNEL_ACCESS)
            .map(|(benutzer, _, zustand)| (benutzer, zustand))
            .collect();

        // Keine Overrides: oeffentlicher Kanal
        if rollen_overrides.is_empty() && benutzer_overrides.is_empty() {
            return Ok(true);
        }

        let meine_rollen = self.repo.user_roles(user_id).await?;
        let mut quellen = Vec::new();

        for (rolle, zustand) in rollen_overrides {
            if meine_rollen.contains(&rolle) {
                quellen.push(zustand);
            }
        }
        for (benutzer, zustand) in benutzer_overrides {
            if benutzer == user_id {
                quellen.push(zustand);
            }
        }

        // Geschlossener Default sobald ein Override existiert
        Ok(zustaende_mergen(&quellen) == PermissionZustand::Allow)
    }
}
