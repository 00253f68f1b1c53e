//! Ereignis-Verteilung an verbundene Clients
//!
//! Der EventBroadcaster kennt pro angemeldetem Benutzer die Send-Queue
//! seiner Verbindung. Die Mitgliederliste fuer einen Kanal-Fan-out kommt
//! immer als Snapshot aus dem ChannelService – der Broadcaster fuehrt
//! bewusst keine eigene Mitgliedschafts-Buchhaltung.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use whispr_core::types::UserId;
use whispr_protocol::control::ControlMessage;

/// Groesse der Send-Queue pro Client
pub const SEND_QUEUE_GROESSE: usize = 64;

/// Handle auf die Send-Queue eines verbundenen Clients
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub user_id: UserId,
    pub tx: mpsc::Sender<ControlMessage>,
}

impl ClientSender {
    /// Reiht eine Nachricht nicht-blockierend ein
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: ControlMessage) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(user_id = %self.user_id, "Send-Queue voll – Nachricht verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(user_id = %self.user_id, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

/// Zentraler Ereignis-Verteiler
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    clients: Arc<DashMap<UserId, ClientSender>>,
}

impl EventBroadcaster {
    /// Erstellt einen neuen EventBroadcaster
    pub fn neu() -> Self {
        Self {
            clients: Arc::new(DashMap::new()),
        }
    }

    /// Registriert die Send-Queue eines angemeldeten Clients
    ///
    /// Eine zweite Anmeldung desselben Benutzers ersetzt die alte Queue.
    pub fn registrieren(&self, user_id: UserId, tx: mpsc::Sender<ControlMessage>) {
        self.clients.insert(user_id, ClientSender { user_id, tx });
        tracing::debug!(user_id = %user_id, "Client im Broadcaster registriert");
    }

    /// Entfernt einen Client
    pub fn entfernen(&self, user_id: &UserId) {
        self.clients.remove(user_id);
        tracing::debug!(user_id = %user_id, "Client aus Broadcaster entfernt");
    }

    /// Sendet eine Nachricht an einen einzelnen Client
    pub fn an_user_senden(&self, user_id: &UserId, nachricht: ControlMessage) -> bool {
        match self.clients.get(user_id) {
            Some(sender) => sender.senden(nachricht),
            None => false,
        }
    }

    /// Sendet eine Nachricht an eine Mitglieder-Menge
    ///
    /// `ausser` schliesst optional den Ausloeser aus. Gibt die Anzahl der
    /// erfolgreich eingereihten Sendungen zurueck.
    pub fn an_mitglieder_senden(
        &self,
        mitglieder: &[UserId],
        nachricht: ControlMessage,
        ausser: Option<UserId>,
    ) -> usize {
        let mut gesendet = 0;
        for user_id in mitglieder {
            if Some(*user_id) == ausser {
                continue;
            }
            if let Some(sender) = self.clients.get(user_id) {
                if sender.senden(nachricht.clone()) {
                    gesendet += 1;
                }
            }
        }
        gesendet
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ping() -> ControlMessage {
        ControlMessage::Ping
    }

    #[tokio::test]
    async fn senden_an_registrierte_clients() {
        let broadcaster = EventBroadcaster::neu();
        let benutzer = UserId::new();
        let (tx, mut rx) = mpsc::channel(8);

        broadcaster.registrieren(benutzer, tx);
        assert!(broadcaster.an_user_senden(&benutzer, ping()));
        assert_eq!(rx.recv().await, Some(ping()));

        broadcaster.entfernen(&benutzer);
        assert!(!broadcaster.an_user_senden(&benutzer, ping()));
    }

    #[tokio::test]
    async fn mitglieder_fanout_ohne_ausloeser() {
        let broadcaster = EventBroadcaster::neu();
        let a = UserId::new();
        let b = UserId::new();
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);

        broadcaster.registrieren(a, tx_a);
        broadcaster.registrieren(b, tx_b);

        let gesendet = broadcaster.an_mitglieder_senden(&[a, b], ping(), Some(a));
        assert_eq!(gesendet, 1);
        assert_eq!(rx_b.recv().await, Some(ping()));
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn volle_queue_verwirft_statt_zu_blockieren() {
        let broadcaster = EventBroadcaster::neu();
        let benutzer = UserId::new();
        let (tx, _rx) = mpsc::channel(1);

        broadcaster.registrieren(benutzer, tx);
        assert!(broadcaster.an_user_senden(&benutzer, ping()));
        assert!(!broadcaster.an_user_senden(&benutzer, ping()));
    }
}
