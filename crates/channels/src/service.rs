//! ChannelService – Kanaele, Mitgliedschaft und Schluesselmaterial
//!
//! Alle mutierenden Operationen serialisieren ueber einen einzelnen Mutex;
//! Leseoperationen geben Snapshots zurueck, damit kein Aufrufer den Lock
//! ueber I/O haelt. Der Service ruft das Repository nie mit gehaltenem
//! Lock auf.
//!
//! ## Schluessel-Lebenszyklus
//! Der laufzeit-autoritative Kanalschluessel liegt im selben Lock wie die
//! Mitgliedschaft. Beim Beitritt in einen leeren Voice-Kanal wird ein
//! frischer Schluessel erzeugt (frischer Nonce-Zaehlerraum fuer jeden
//! Neustart einer Runde); solange Mitglieder anwesend sind bleibt der
//! Schluessel stabil und Beitretende erhalten den aktuellen. Die
//! Persistierung in die Kanal-Tabelle ist nachlaufend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use whispr_core::types::{ChannelId, KanalTyp, UserId};
use whispr_crypto::seal::{schluessel_erzeugen, SCHLUESSEL_LAENGE};
use whispr_db::{
    models::{KanalRecord, NeuerKanal},
    ChannelRepository,
};

use crate::error::{KanalFehler, KanalResult};

/// Serverweite Obergrenze fuer die Kanalanzahl
pub const KANAL_LIMIT: usize = 64;

/// Name des lazy erstellten Standard-Kanals
const STANDARD_KANAL_NAME: &str = "General";

/// Ergebnis eines Kanal-Beitritts
#[derive(Debug)]
pub struct JoinErgebnis {
    pub kanal: KanalRecord,
    /// Mitglieder nach dem Beitritt (inkl. Beitretendem)
    pub mitglieder: Vec<UserId>,
    /// Aktueller Kanalschluessel (nur Voice-Kanaele)
    pub schluessel: Option<[u8; SCHLUESSEL_LAENGE]>,
    /// Zuvor verlassener Kanal mit den dort verbliebenen Mitgliedern
    pub verlassen: Option<(ChannelId, Vec<UserId>)>,
}

/// Ergebnis eines Kanal-Austritts
#[derive(Debug)]
pub struct VerlassenErgebnis {
    pub kanal_id: ChannelId,
    /// Im Kanal verbliebene Mitglieder
    pub verbleibende: Vec<UserId>,
}

#[derive(Default)]
struct Mitgliedschaft {
    benutzer_kanal: HashMap<UserId, ChannelId>,
    mitglieder: HashMap<ChannelId, Vec<UserId>>,
    schluessel: HashMap<ChannelId, [u8; SCHLUESSEL_LAENGE]>,
}

impl Mitgliedschaft {
    /// Entfernt den Benutzer aus seinem aktuellen Kanal
    ///
    /// Gibt den verlassenen Kanal samt Snapshot der Verbliebenen zurueck.
    fn entfernen(&mut self, user_id: UserId) -> Option<(ChannelId, Vec<UserId>)> {
        let kanal_id = self.benutzer_kanal.remove(&user_id)?;
        let verbleibende = match self.mitglieder.get_mut(&kanal_id) {
            Some(liste) => {
                liste.retain(|uid| *uid != user_id);
                liste.clone()
            }
            None => Vec::new(),
        };
        if verbleibende.is_empty() {
            self.mitglieder.remove(&kanal_id);
        }
        Some((kanal_id, verbleibende))
    }
}

/// Kanal-Service – einzige Quelle fuer Mitgliedschafts-Zustand
pub struct ChannelService<R: ChannelRepository> {
    repo: Arc<R>,
    kanal_limit: usize,
    innen: Mutex<Mitgliedschaft>,
}

impl<R: ChannelRepository> ChannelService<R> {
    /// Erstellt einen neuen ChannelService mit dem Standard-Limit
    pub fn neu(repo: Arc<R>) -> Arc<Self> {
        Self::neu_mit_limit(repo, KANAL_LIMIT)
    }

    /// Erstellt einen ChannelService mit eigenem Kanal-Limit (fuer Tests)
    pub fn neu_mit_limit(repo: Arc<R>, kanal_limit: usize) -> Arc<Self> {
        Arc::new(Self {
            repo,
            kanal_limit,
            innen: Mutex::new(Mitgliedschaft::default()),
        })
    }

    /// Stellt den Standard-Kanal sicher; legt ihn beim ersten Mal an
    pub async fn standard_sicherstellen(&self) -> KanalResult<KanalRecord> {
        if let Some(kanal) = self.repo.get_default().await? {
            return Ok(kanal);
        }

        let schluessel = schluessel_erzeugen();
        let kanal = self
            .repo
            .create(NeuerKanal {
                name: STANDARD_KANAL_NAME,
                kanal_typ: KanalTyp::Voice,
                is_default: true,
                key_material: &schluessel,
            })
            .await?;
        tracing::info!(kanal = %kanal.name, "Standard-Kanal angelegt");
        Ok(kanal)
    }

    /// Betritt den Standard-Kanal; legt ihn beim ersten Mal an
    pub async fn standard_beitreten(&self, user_id: UserId) -> KanalResult<JoinErgebnis> {
        let kanal = self.standard_sicherstellen().await?;
        self.beitreten_mit_record(kanal, user_id).await
    }

    /// Betritt einen Kanal anhand seiner ID
    pub async fn beitreten(
        &self,
        kanal_id: ChannelId,
        user_id: UserId,
    ) -> KanalResult<JoinErgebnis> {
        let kanal = self
            .repo
            .get_by_id(kanal_id.inner())
            .await?
            .ok_or(KanalFehler::NichtGefunden(kanal_id))?;

        self.beitreten_mit_record(kanal, user_id).await
    }

    async fn beitreten_mit_record(
        &self,
        kanal: KanalRecord,
        user_id: UserId,
    ) -> KanalResult<JoinErgebnis> {
        let kanal_id = ChannelId(kanal.id);
        let ist_voice = kanal.kanal_typ == KanalTyp::Voice;

        let (mitglieder, schluessel, verlassen, rotiert) = {
            let mut innen = self.innen.lock();

            let vorher = innen.benutzer_kanal.get(&user_id).copied();
            let verlassen = if vorher == Some(kanal_id) {
                // Wiederholter Beitritt in denselben Kanal
                None
            } else {
                innen.entfernen(user_id)
            };

            let mut rotiert = false;
            let schluessel = if ist_voice {
                let war_leer = innen
                    .mitglieder
                    .get(&kanal_id)
                    .map(|liste| liste.is_empty())
                    .unwrap_or(true);
                if war_leer {
                    innen.schluessel.insert(kanal_id, schluessel_erzeugen());
                    rotiert = true;
                }
                innen.schluessel.get(&kanal_id).copied()
            } else {
                None
            };

            let liste = innen.mitglieder.entry(kanal_id).or_default();
            if !liste.contains(&user_id) {
                liste.push(user_id);
            }
            let mitglieder = liste.clone();
            innen.benutzer_kanal.insert(user_id, kanal_id);

            (mitglieder, schluessel, verlassen, rotiert)
        };

        // Nachlaufende Persistierung des rotierten Schluessels
        if rotiert {
            if let Some(ref neuer) = schluessel {
                if let Err(e) = self.repo.update_key(kanal.id, neuer).await {
                    tracing::warn!(fehler = %e, kanal = %kanal_id, "Schluessel nicht persistiert");
                }
            }
        }

        tracing::debug!(user = %user_id, kanal = %kanal_id, "Kanal betreten");

        Ok(JoinErgebnis {
            kanal,
            mitglieder,
            schluessel,
            verlassen,
        })
    }

    /// Verlaesst den aktuellen Kanal
    pub fn verlassen(&self, user_id: UserId) -> KanalResult<VerlassenErgebnis> {
        let mut innen = self.innen.lock();
        let (kanal_id, verbleibende) = innen.entfernen(user_id).ok_or(KanalFehler::KeinMitglied)?;

        tracing::debug!(user = %user_id, kanal = %kanal_id, "Kanal verlassen");
        Ok(VerlassenErgebnis {
            kanal_id,
            verbleibende,
        })
    }

    /// Legt einen neuen Kanal an (Berechtigung prueft der Aufrufer)
    pub async fn erstellen(&self, name: &str, typ: KanalTyp) -> KanalResult<KanalRecord> {
        let name = name.trim();
        if name.is_empty() || name.len() > 64 {
            return Err(KanalFehler::UngueltigerName(name.to_string()));
        }

        if self.repo.count().await? as usize >= self.kanal_limit {
            return Err(KanalFehler::LimitErreicht(self.kanal_limit));
        }

        let schluessel;
        let key_material: &[u8] = match typ {
            KanalTyp::Voice => {
                schluessel = schluessel_erzeugen();
                &schluessel
            }
            KanalTyp::Text => &[],
        };

        let kanal = self
            .repo
            .create(NeuerKanal {
                name,
                kanal_typ: typ,
                is_default: false,
                key_material,
            })
            .await?;

        tracing::info!(kanal = %kanal.name, typ = %typ.als_str(), "Kanal angelegt");
        Ok(kanal)
    }

    /// Alle Kanaele
    pub async fn liste(&self) -> KanalResult<Vec<KanalRecord>> {
        Ok(self.repo.list().await?)
    }

    /// Einzelner Kanal
    pub async fn holen(&self, kanal_id: ChannelId) -> KanalResult<Option<KanalRecord>> {
        Ok(self.repo.get_by_id(kanal_id.inner()).await?)
    }

    /// Gibt `true` zurueck solange das Kanal-Limit nicht erreicht ist
    pub async fn unter_limit(&self) -> KanalResult<bool> {
        Ok((self.repo.count().await? as usize) < self.kanal_limit)
    }

    // --- Synchrone Mitgliedschafts-Reads (Snapshots, kein Repository) ---

    /// Aktueller Kanal eines Benutzers
    pub fn benutzer_kanal(&self, user_id: UserId) -> Option<ChannelId> {
        self.innen.lock().benutzer_kanal.get(&user_id).copied()
    }

    /// Mitglieder eines Kanals
    pub fn mitglieder(&self, kanal_id: ChannelId) -> Vec<UserId> {
        self.innen
            .lock()
            .mitglieder
            .get(&kanal_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Mitglieder eines Kanals ohne einen bestimmten Benutzer
    pub fn andere_mitglieder(&self, kanal_id: ChannelId, ausser: UserId) -> Vec<UserId> {
        self.innen
            .lock()
            .mitglieder
            .get(&kanal_id)
            .map(|liste| {
                liste
                    .iter()
                    .copied()
                    .filter(|uid| *uid != ausser)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Aktuelles Schluesselmaterial eines Kanals (nur Voice, nur belegt)
    pub fn schluessel(&self, kanal_id: ChannelId) -> Option<[u8; SCHLUESSEL_LAENGE]> {
        self.innen.lock().schluessel.get(&kanal_id).copied()
    }

    /// Snapshot aller Mitgliedschaften (fuer den Server-Zustand)
    pub fn mitgliedschaften(&self) -> HashMap<ChannelId, Vec<UserId>> {
        self.innen.lock().mitglieder.clone()
    }
}
