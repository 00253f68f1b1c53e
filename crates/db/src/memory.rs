//! In-Memory-Implementierung aller Repository-Traits
//!
//! Fluechtiger Speicher hinter einem einzelnen Mutex. Gedacht fuer Tests
//! und fuer Betrieb ohne Datenbank-Datei; implementiert exakt dieselben
//! Vertraege wie das SQLite-Backend (inkl. case-insensitiver
//! Benutzernamen und idempotenter set-Operationen).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;
use whispr_core::types::PermissionZustand;

use crate::error::DbError;
use crate::models::{
    BenutzerRecord, KanalRecord, NachrichtRecord, NeueNachricht, NeuerBenutzer, NeuerKanal,
    PermissionRecord, RolleRecord,
};
use crate::repository::{
    ChannelRepository, DbResult, MessageRepository, PermissionRepository, UserRepository,
};

#[derive(Default)]
struct MemoryInnen {
    benutzer: HashMap<Uuid, BenutzerRecord>,
    /// lowercase(username) -> id
    benutzer_namen: HashMap<String, Uuid>,
    kanaele: HashMap<Uuid, KanalRecord>,
    permissions: BTreeMap<String, PermissionRecord>,
    rollen: BTreeMap<String, RolleInnen>,
    benutzer_rollen: HashMap<Uuid, BTreeSet<String>>,
    benutzer_zustaende: HashMap<Uuid, BTreeMap<String, PermissionZustand>>,
    kanal_rollen_zustaende: HashMap<Uuid, BTreeMap<(String, String), PermissionZustand>>,
    kanal_benutzer_zustaende: HashMap<Uuid, BTreeMap<(Uuid, String), PermissionZustand>>,
    nachrichten: Vec<NachrichtRecord>,
}

struct RolleInnen {
    name: String,
    zustaende: BTreeMap<String, PermissionZustand>,
}

/// Fluechtiges Repository-Backend
#[derive(Default)]
pub struct MemoryDb {
    innen: Mutex<MemoryInnen>,
}

impl MemoryDb {
    pub fn neu() -> Self {
        Self::default()
    }
}

impl UserRepository for MemoryDb {
    async fn create(&self, data: NeuerBenutzer<'_>) -> DbResult<BenutzerRecord> {
        let mut innen = self.innen.lock();
        let schluessel = data.username.to_lowercase();
        if innen.benutzer_namen.contains_key(&schluessel) {
            return Err(DbError::Eindeutigkeit(format!(
                "Benutzername '{}' bereits vergeben",
                data.username
            )));
        }

        let record = BenutzerRecord {
            id: Uuid::new_v4(),
            username: data.username.to_string(),
            password_hash: data.password_hash.to_string(),
            rolle: data.rolle,
            created_at: Utc::now(),
        };
        innen.benutzer_namen.insert(schluessel, record.id);
        innen.benutzer.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<BenutzerRecord>> {
        Ok(self.innen.lock().benutzer.get(&id).cloned())
    }

    async fn get_by_name(&self, username: &str) -> DbResult<Option<BenutzerRecord>> {
        let innen = self.innen.lock();
        Ok(innen
            .benutzer_namen
            .get(&username.to_lowercase())
            .and_then(|id| innen.benutzer.get(id))
            .cloned())
    }

    async fn list(&self) -> DbResult<Vec<BenutzerRecord>> {
        let mut alle: Vec<_> = self.innen.lock().benutzer.values().cloned().collect();
        alle.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(alle)
    }

    async fn count(&self) -> DbResult<u64> {
        Ok(self.innen.lock().benutzer.len() as u64)
    }
}

impl ChannelRepository for MemoryDb {
    async fn create(&self, data: NeuerKanal<'_>) -> DbResult<KanalRecord> {
        let record = KanalRecord {
            id: Uuid::new_v4(),
            name: data.name.to_string(),
            kanal_typ: data.kanal_typ,
            is_default: data.is_default,
            key_material: data.key_material.to_vec(),
            created_at: Utc::now(),
        };
        self.innen.lock().kanaele.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<KanalRecord>> {
        Ok(self.innen.lock().kanaele.get(&id).cloned())
    }

    async fn get_default(&self) -> DbResult<Option<KanalRecord>> {
        Ok(self
            .innen
            .lock()
            .kanaele
            .values()
            .find(|k| k.is_default)
            .cloned())
    }

    async fn list(&self) -> DbResult<Vec<KanalRecord>> {
        let mut alle: Vec<_> = self.innen.lock().kanaele.values().cloned().collect();
        alle.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(alle)
    }

    async fn count(&self) -> DbResult<u64> {
        Ok(self.innen.lock().kanaele.len() as u64)
    }

    async fn update_key(&self, id: Uuid, key_material: &[u8]) -> DbResult<()> {
        let mut innen = self.innen.lock();
        let kanal = innen
            .kanaele
            .get_mut(&id)
            .ok_or_else(|| DbError::nicht_gefunden(format!("Kanal {id}")))?;
        kanal.key_material = key_material.to_vec();
        Ok(())
    }
}

impl PermissionRepository for MemoryDb {
    async fn ensure_permission(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
    ) -> DbResult<()> {
        self.innen
            .lock()
            .permissions
            .entry(id.to_string())
            .or_insert_with(|| PermissionRecord {
                id: id.to_string(),
                name: name.to_string(),
                description: description.map(str::to_string),
            });
        Ok(())
    }

    async fn list_permissions(&self) -> DbResult<Vec<PermissionRecord>> {
        Ok(self.innen.lock().permissions.values().cloned().collect())
    }

    async fn ensure_role(
        &self,
        id: &str,
        name: &str,
        zustaende: &[(&str, PermissionZustand)],
    ) -> DbResult<()> {
        let mut innen = self.innen.lock();
        let rolle = innen
            .rollen
            .entry(id.to_string())
            .or_insert_with(|| RolleInnen {
                name: name.to_string(),
                zustaende: BTreeMap::new(),
            });
        for (permission_id, zustand) in zustaende {
            rolle
                .zustaende
                .entry(permission_id.to_string())
                .or_insert(*zustand);
        }
        Ok(())
    }

    async fn list_roles(&self) -> DbResult<Vec<RolleRecord>> {
        Ok(self
            .innen
            .lock()
            .rollen
            .iter()
            .map(|(id, rolle)| RolleRecord {
                id: id.clone(),
                name: rolle.name.clone(),
                zustaende: rolle
                    .zustaende
                    .iter()
                    .map(|(k, z)| (k.clone(), *z))
                    .collect(),
            })
            .collect())
    }

    async fn role_states(&self, role_id: &str) -> DbResult<Vec<(String, PermissionZustand)>> {
        Ok(self
            .innen
            .lock()
            .rollen
            .get(role_id)
            .map(|rolle| {
                rolle
                    .zustaende
                    .iter()
                    .map(|(k, z)| (k.clone(), *z))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn user_roles(&self, user_id: Uuid) -> DbResult<Vec<String>> {
        Ok(self
            .innen
            .lock()
            .benutzer_rollen
            .get(&user_id)
            .map(|rollen| rollen.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn set_user_role(&self, user_id: Uuid, role_id: &str, assign: bool) -> DbResult<()> {
        let mut innen = self.innen.lock();
        let rollen = innen.benutzer_rollen.entry(user_id).or_default();
        if assign {
            rollen.insert(role_id.to_string());
        } else {
            rollen.remove(role_id);
        }
        Ok(())
    }

    async fn user_states(&self, user_id: Uuid) -> DbResult<Vec<(String, PermissionZustand)>> {
        Ok(self
            .innen
            .lock()
            .benutzer_zustaende
            .get(&user_id)
            .map(|zustaende| zustaende.iter().map(|(k, z)| (k.clone(), *z)).collect())
            .unwrap_or_default())
    }

    async fn set_user_state(
        &self,
        user_id: Uuid,
        permission_id: &str,
        zustand: Option<PermissionZustand>,
    ) -> DbResult<()> {
        let mut innen = self.innen.lock();
        let zustaende = innen.benutzer_zustaende.entry(user_id).or_default();
        match zustand {
            Some(z) => {
                zustaende.insert(permission_id.to_string(), z);
            }
            None => {
                zustaende.remove(permission_id);
            }
        }
        Ok(())
    }

    async fn channel_role_states(
        &self,
        channel_id: Uuid,
    ) -> DbResult<Vec<(String, String, PermissionZustand)>> {
        Ok(self
            .innen
            .lock()
            .kanal_rollen_zustaende
            .get(&channel_id)
            .map(|zustaende| {
                zustaende
                    .iter()
                    .map(|((rolle, perm), z)| (rolle.clone(), perm.clone(), *z))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn channel_user_states(
        &self,
        channel_id: Uuid,
    ) -> DbResult<Vec<(Uuid, String, PermissionZustand)>> {
        Ok(self
            .innen
            .lock()
            .kanal_benutzer_zustaende
            .get(&channel_id)
            .map(|zustaende| {
                zustaende
                    .iter()
                    .map(|((benutzer, perm), z)| (*benutzer, perm.clone(), *z))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set_channel_role_state(
        &self,
        channel_id: Uuid,
        role_id: &str,
        permission_id: &str,
        zustand: Option<PermissionZustand>,
    ) -> DbResult<()> {
        let mut innen = self.innen.lock();
        let zustaende = innen.kanal_rollen_zustaende.entry(channel_id).or_default();
        let schluessel = (role_id.to_string(), permission_id.to_string());
        match zustand {
            Some(z) => {
                zustaende.insert(schluessel, z);
            }
            None => {
                zustaende.remove(&schluessel);
            }
        }
        Ok(())
    }

    async fn set_channel_user_state(
        &self,
        channel_id: Uuid,
        user_id: Uuid,
        permission_id: &str,
        zustand: Option<PermissionZustand>,
    ) -> DbResult<()> {
        let mut innen = self.innen.lock();
        let zustaende = innen
            .kanal_benutzer_zustaende
            .entry(channel_id)
            .or_default();
        let schluessel = (user_id, permission_id.to_string());
        match zustand {
            Some(z) => {
                zustaende.insert(schluessel, z);
            }
            None => {
                zustaende.remove(&schluessel);
            }
        }
        Ok(())
    }
}

impl MessageRepository for MemoryDb {
    async fn create(&self, data: NeueNachricht<'_>) -> DbResult<NachrichtRecord> {
        let record = NachrichtRecord {
            id: Uuid::new_v4(),
            channel_id: data.channel_id,
            sender_id: data.sender_id,
            content: data.content.to_string(),
            created_at: Utc::now(),
        };
        self.innen.lock().nachrichten.push(record.clone());
        Ok(record)
    }

    async fn history(
        &self,
        channel_id: Uuid,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> DbResult<Vec<NachrichtRecord>> {
        let innen = self.innen.lock();
        let mut treffer: Vec<_> = innen
            .nachrichten
            .iter()
            .filter(|n| n.channel_id == channel_id)
            .filter(|n| since.map(|seit| n.created_at > seit).unwrap_or(true))
            .cloned()
            .collect();
        treffer.sort_by_key(|n| n.created_at);
        treffer.truncate(limit as usize);
        Ok(treffer)
    }
}
