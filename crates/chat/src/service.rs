//! ChatService – Nachrichten senden und Verlauf lesen

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use whispr_crypto::rest::{inhalt_entschluesseln, inhalt_verschluesseln, ist_verschluesselt};
use whispr_crypto::seal::SCHLUESSEL_LAENGE;
use whispr_db::{
    models::{NachrichtRecord, NeueNachricht},
    MessageRepository,
};

use crate::error::{ChatError, ChatResult};

/// Maximale Nachrichtenlaenge in Zeichen (nach dem Trimmen)
pub const MAX_NACHRICHT_LAENGE: usize = 2000;

/// Standard-Limit fuer Verlaufs-Anfragen
const STANDARD_VERLAUF_LIMIT: u32 = 100;

/// Hoechstes erlaubtes Verlaufs-Limit
const MAX_VERLAUF_LIMIT: u32 = 500;

/// Eine Chat-Nachricht in Klartext-Form
#[derive(Debug, Clone)]
pub struct ChatNachricht {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// ChatService – validiert, verschluesselt und persistiert Nachrichten
pub struct ChatService<R: MessageRepository> {
    repo: Arc<R>,
    /// Serverweiter At-Rest-Schluessel; `None` = Klartext-Speicherung
    schluessel: Option<[u8; SCHLUESSEL_LAENGE]>,
}

impl<R: MessageRepository> ChatService<R> {
    /// Erstellt einen neuen ChatService
    pub fn neu(repo: Arc<R>, schluessel: Option<[u8; SCHLUESSEL_LAENGE]>) -> Arc<Self> {
        Arc::new(Self { repo, schluessel })
    }

    /// Sendet eine Nachricht in einen Kanal
    ///
    /// Der Inhalt wird getrimmt; leere oder ueberlange Nachrichten werden
    /// abgelehnt. Die Rueckgabe traegt den Klartext, die Speicherform ist
    /// bei konfiguriertem Schluessel das `enc:`-Base64.
    pub async fn nachricht_senden(
        &self,
        channel_id: Uuid,
        sender_id: Uuid,
        inhalt: &str,
    ) -> ChatResult<ChatNachricht> {
        let inhalt = inhalt.trim();
        if inhalt.is_empty() {
            return Err(ChatError::UngueltigeEingabe(
                "Nachrichteninhalt darf nicht leer sein".into(),
            ));
        }
        let laenge = inhalt.chars().count();
        if laenge > MAX_NACHRICHT_LAENGE {
            return Err(ChatError::UngueltigeEingabe(format!(
                "Nachricht zu lang: {} Zeichen (Maximum: {})",
                laenge, MAX_NACHRICHT_LAENGE
            )));
        }

        let speicherform = match &self.schluessel {
            Some(schluessel) => inhalt_verschluesseln(schluessel, inhalt)?,
            None => inhalt.to_string(),
        };

        let record = self
            .repo
            .create(NeueNachricht {
                channel_id,
                sender_id,
                content: &speicherform,
            })
            .await?;

        Ok(ChatNachricht {
            id: record.id,
            channel_id: record.channel_id,
            sender_id: record.sender_id,
            content: inhalt.to_string(),
            created_at: record.created_at,
        })
    }

    /// Liest den Verlauf eines Kanals, aufsteigend nach Erstellungszeit
    ///
    /// `limit` muss in 1..=500 liegen; fehlend greift der Standardwert.
    pub async fn verlauf(
        &self,
        channel_id: Uuid,
        since: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> ChatResult<Vec<ChatNachricht>> {
        let limit = match limit {
            None => STANDARD_VERLAUF_LIMIT,
            Some(l) if (1..=MAX_VERLAUF_LIMIT).contains(&l) => l,
            Some(l) => {
                return Err(ChatError::UngueltigeEingabe(format!(
                    "Limit {} ausserhalb von 1..={}",
                    l, MAX_VERLAUF_LIMIT
                )));
            }
        };

        let records = self.repo.history(channel_id, since, limit).await?;
        Ok(records
            .into_iter()
            .filter_map(|record| self.entschluesseln(record))
            .collect())
    }

    /// Loest die Speicherform einer Nachricht in Klartext auf
    ///
    /// Nicht entschluesselbare Nachrichten (fehlender oder gewechselter
    /// Schluessel) werden mit Warnung uebersprungen statt den ganzen
    /// Verlauf scheitern zu lassen.
    fn entschluesseln(&self, record: NachrichtRecord) -> Option<ChatNachricht> {
        let content = if ist_verschluesselt(&record.content) {
            match &self.schluessel {
                Some(schluessel) => match inhalt_entschluesseln(schluessel, &record.content) {
                    Ok(klartext) => klartext,
                    Err(e) => {
                        tracing::warn!(nachricht = %record.id, fehler = %e, "Nachricht nicht entschluesselbar");
                        return None;
                    }
                },
                None => {
                    tracing::warn!(nachricht = %record.id, "Verschluesselte Nachricht ohne konfigurierten Schluessel");
                    return None;
                }
            }
        } else {
            record.content
        };

        Some(ChatNachricht {
            id: record.id,
            channel_id: record.channel_id,
            sender_id: record.sender_id,
            content,
            created_at: record.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whispr_crypto::seal::schluessel_erzeugen;
    use whispr_db::MemoryDb;

    fn service(schluessel: Option<[u8; 32]>) -> (Arc<ChatService<MemoryDb>>, Arc<MemoryDb>) {
        let repo = Arc::new(MemoryDb::neu());
        (ChatService::neu(Arc::clone(&repo), schluessel), repo)
    }

    #[tokio::test]
    async fn klartext_speicherung_ohne_schluessel() {
        let (service, repo) = service(None);
        let kanal = Uuid::new_v4();

        let nachricht = service
            .nachricht_senden(kanal, Uuid::new_v4(), "  Hallo!  ")
            .await
            .unwrap();
        assert_eq!(nachricht.content, "Hallo!");

        let gespeichert = repo.history(kanal, None, 10).await.unwrap();
        assert_eq!(gespeichert[0].content, "Hallo!");
    }

    #[tokio::test]
    async fn verschluesselte_speicherung_mit_schluessel() {
        let schluessel = schluessel_erzeugen();
        let (service, repo) = service(Some(schluessel));
        let kanal = Uuid::new_v4();

        service
            .nachricht_senden(kanal, Uuid::new_v4(), "geheimer Text")
            .await
            .unwrap();

        // Speicherform ist enc:-Base64, nicht der Klartext
        let gespeichert = repo.history(kanal, None, 10).await.unwrap();
        assert!(gespeichert[0].content.starts_with("enc:"));
        assert!(!gespeichert[0].content.contains("geheimer"));

        // Verlauf liefert den Klartext zurueck
        let verlauf = service.verlauf(kanal, None, None).await.unwrap();
        assert_eq!(verlauf.len(), 1);
        assert_eq!(verlauf[0].content, "geheimer Text");
    }

    #[tokio::test]
    async fn leere_und_ueberlange_nachrichten_werden_abgelehnt() {
        let (service, _) = service(None);
        let kanal = Uuid::new_v4();
        let sender = Uuid::new_v4();

        assert!(service.nachricht_senden(kanal, sender, "   ").await.is_err());

        let lang = "x".repeat(MAX_NACHRICHT_LAENGE + 1);
        assert!(service.nachricht_senden(kanal, sender, &lang).await.is_err());

        let genau = "x".repeat(MAX_NACHRICHT_LAENGE);
        assert!(service.nachricht_senden(kanal, sender, &genau).await.is_ok());
    }

    #[tokio::test]
    async fn verlauf_limit_wird_validiert() {
        let (service, _) = service(None);
        let kanal = Uuid::new_v4();

        assert!(service.verlauf(kanal, None, Some(0)).await.is_err());
        assert!(service.verlauf(kanal, None, Some(501)).await.is_err());
        assert!(service.verlauf(kanal, None, Some(500)).await.is_ok());
        assert!(service.verlauf(kanal, None, None).await.is_ok());
    }

    #[tokio::test]
    async fn nicht_entschluesselbare_nachrichten_werden_uebersprungen() {
        let schluessel_a = schluessel_erzeugen();
        let (service_a, repo) = service(Some(schluessel_a));
        let kanal = Uuid::new_v4();

        service_a
            .nachricht_senden(kanal, Uuid::new_v4(), "mit altem Schluessel")
            .await
            .unwrap();

        // Anderer Schluessel: Nachricht ist nicht mehr lesbar
        let service_b = ChatService::neu(Arc::clone(&repo), Some(schluessel_erzeugen()));
        let verlauf = service_b.verlauf(kanal, None, None).await.unwrap();
        assert!(verlauf.is_empty());
    }
}
