//! UDP-Relay – Empfangs-Loop und Fan-out
//!
//! Bindet den UDP-Socket, parst eingehende Pakete und leitet sie
//! unveraendert an die anderen Mitglieder des Sender-Kanals weiter.
//!
//! ```text
//! UDP Socket (recv_from)
//!     |
//!     v
//! AudioPaket::parsen()          <- kaputte Pakete: stiller Drop
//!     |
//!     v
//! PaketLimiter::erlauben()      <- 100 Pakete / 1000 ms pro ClientId
//!     |
//!     v
//! EndpunktRegistry              <- Sender aufloesen, Adresse erneuern
//!     |
//!     v
//! ChannelService                <- Kanal + Peer-Snapshot (ohne Repository)
//!     |
//!     +--> send_to pro Peer     <- Sendefehler nur geloggt
//! ```
//!
//! Kein Entschluesseln, kein Reordering, keine Pufferung jenseits der
//! OS-Socket-Puffer.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::watch;

use whispr_channels::ChannelService;
use whispr_core::types::ClientId;
use whispr_db::ChannelRepository;
use whispr_protocol::audio::AudioPaket;

use crate::limiter::PaketLimiter;
use crate::registry::EndpunktRegistry;

/// Empfangspuffer-Groesse; Pakete ueber dem Protokoll-Maximum scheitern
/// am Parser und werden verworfen
const UDP_PUFFER_GROESSE: usize = 1500;

/// UDP-Audio-Relay
pub struct AudioRelay<R: ChannelRepository> {
    socket: Arc<UdpSocket>,
    registry: Arc<EndpunktRegistry>,
    kanaele: Arc<ChannelService<R>>,
    limiter: PaketLimiter,
}

impl<R: ChannelRepository> AudioRelay<R> {
    /// Bindet den UDP-Socket und erstellt das Relay
    pub async fn binden(
        bind_addr: SocketAddr,
        registry: Arc<EndpunktRegistry>,
        kanaele: Arc<ChannelService<R>>,
    ) -> std::io::Result<Arc<Self>> {
        let socket = UdpSocket::bind(bind_addr).await?;
        tracing::info!(adresse = %bind_addr, "UDP-Audio-Relay gebunden");

        Ok(Arc::new(Self {
            socket: Arc::new(socket),
            registry,
            kanaele,
            limiter: PaketLimiter::neu(),
        }))
    }

    /// Gibt die lokale Bind-Adresse zurueck
    pub fn lokale_adresse(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Vergisst den Limiter-Zustand eines Clients (beim Unregister)
    pub fn client_vergessen(&self, client_id: ClientId) {
        self.limiter.entfernen(client_id);
    }

    /// Startet die Empfangs-Loop; laeuft bis zum Shutdown-Signal
    pub async fn empfangs_loop(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        // Wiederverwendeter Empfangspuffer, keine Allokation pro Paket
        let mut puffer = [0u8; UDP_PUFFER_GROESSE];

        tracing::info!("Audio-Empfangs-Loop gestartet");

        loop {
            tokio::select! {
                ergebnis = self.socket.recv_from(&mut puffer) => {
                    match ergebnis {
                        Ok((laenge, absender)) => {
                            self.paket_behandeln(&puffer[..laenge], absender).await;
                        }
                        Err(e) => {
                            tracing::warn!(fehler = %e, "UDP-Empfangsfehler");
                        }
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Audio-Relay: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("Audio-Empfangs-Loop beendet");
    }

    /// Verarbeitet ein einzelnes Datagramm
    async fn paket_behandeln(&self, daten: &[u8], absender: SocketAddr) {
        let paket = match AudioPaket::parsen(daten) {
            Ok(paket) => paket,
            Err(_) => {
                tracing::trace!(von = %absender, laenge = daten.len(), "Unparsbares Paket verworfen");
                return;
            }
        };
        let client_id = ClientId(paket.client_id);

        if !self.limiter.erlauben(client_id) {
            tracing::trace!(client = %client_id, "Rate-Limit: Paket verworfen");
            return;
        }

        let Some(user_id) = self.registry.user_id(client_id) else {
            tracing::trace!(client = %client_id, "Unbekannte ClientId: Paket verworfen");
            return;
        };

        // NAT-Rebinding: Absenderadresse bei jedem Paket erneuern
        self.registry.endpunkt_aktualisieren(client_id, absender);

        let Some(kanal_id) = self.kanaele.benutzer_kanal(user_id) else {
            tracing::trace!(user = %user_id, "Sender ohne Kanal: Paket verworfen");
            return;
        };

        for peer in self.kanaele.andere_mitglieder(kanal_id, user_id) {
            let Some(ziel) = self.registry.endpunkt(peer) else {
                continue;
            };
            if let Err(e) = self.socket.send_to(daten, ziel).await {
                tracing::warn!(fehler = %e, ziel = %ziel, "UDP-Sendefehler");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use whispr_core::types::UserId;
    use whispr_db::MemoryDb;
    use whispr_protocol::audio::{paket_bauen, NONCE_LAENGE, TAG_LAENGE};

    async fn testaufbau() -> (
        Arc<AudioRelay<MemoryDb>>,
        Arc<EndpunktRegistry>,
        Arc<ChannelService<MemoryDb>>,
        SocketAddr,
    ) {
        let registry = Arc::new(EndpunktRegistry::neu());
        let kanaele = ChannelService::neu(Arc::new(MemoryDb::neu()));
        let relay = AudioRelay::binden(
            "127.0.0.1:0".parse().unwrap(),
            Arc::clone(&registry),
            Arc::clone(&kanaele),
        )
        .await
        .unwrap();
        let adresse = relay.lokale_adresse().unwrap();
        (relay, registry, kanaele, adresse)
    }

    fn testpaket(client_id: u32, fuellung: u8) -> Vec<u8> {
        paket_bauen(
            client_id,
            &[fuellung; NONCE_LAENGE],
            &vec![fuellung; TAG_LAENGE + 8],
        )
    }

    #[tokio::test]
    async fn weiterleitung_an_kanal_peers_und_nicht_an_fremde() {
        let (relay, registry, kanaele, relay_adresse) = testaufbau().await;

        let benutzer_a = UserId::new();
        let benutzer_b = UserId::new();
        let benutzer_c = UserId::new();

        // A und B teilen den Standard-Kanal, C sitzt in einem anderen
        let ergebnis = kanaele.standard_beitreten(benutzer_a).await.unwrap();
        let kanal_schluessel = ergebnis.schluessel.unwrap();
        kanaele
            .beitreten(whispr_core::types::ChannelId(ergebnis.kanal.id), benutzer_b)
            .await
            .unwrap();
        let anderer = kanaele
            .erstellen("Anderer", whispr_core::types::KanalTyp::Voice)
            .await
            .unwrap();
        kanaele
            .beitreten(whispr_core::types::ChannelId(anderer.id), benutzer_c)
            .await
            .unwrap();

        registry.client_registrieren(ClientId(1), benutzer_a);
        registry.client_registrieren(ClientId(2), benutzer_b);
        registry.client_registrieren(ClientId(3), benutzer_c);

        let (tx, rx) = watch::channel(false);
        let relay_task = tokio::spawn(Arc::clone(&relay).empfangs_loop(rx));

        let socket_a = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let socket_b = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let socket_c = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        // B und C lassen ihre Adressen lernen
        socket_b
            .send_to(&testpaket(2, 0xBB), relay_adresse)
            .await
            .unwrap();
        socket_c
            .send_to(&testpaket(3, 0xCC), relay_adresse)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // A versiegelt einen Frame mit dem Kanalschluessel und sendet ihn
        let sealer = whispr_crypto::AudioSealer::neu(&kanal_schluessel).unwrap();
        let (nonce, ciphertext) = sealer.versiegeln(b"Opus-Frame von A").unwrap();
        let paket_von_a = paket_bauen(1, &nonce, &ciphertext);
        socket_a.send_to(&paket_von_a, relay_adresse).await.unwrap();

        // B muss exakt dieselben Bytes sehen und den Frame oeffnen koennen
        let mut puffer = [0u8; 1500];
        let (laenge, _) = tokio::time::timeout(
            Duration::from_secs(2),
            socket_b.recv_from(&mut puffer),
        )
        .await
        .expect("B muss das Paket erhalten")
        .unwrap();
        assert_eq!(&puffer[..laenge], &paket_von_a[..]);

        let empfangen = AudioPaket::parsen(&puffer[..laenge]).unwrap();
        let opener = whispr_crypto::AudioOpener::neu(&kanal_schluessel).unwrap();
        let klartext = opener
            .oeffnen(empfangen.nonce, empfangen.ciphertext)
            .unwrap();
        assert_eq!(klartext, b"Opus-Frame von A");

        // C (anderer Kanal) darf nichts erhalten
        let fremd = tokio::time::timeout(
            Duration::from_millis(200),
            socket_c.recv_from(&mut puffer),
        )
        .await;
        assert!(fremd.is_err(), "C darf kein Paket erhalten");

        let _ = tx.send(true);
        let _ = relay_task.await;
    }

    #[tokio::test]
    async fn unbekannte_client_id_wird_verworfen() {
        let (relay, _registry, _kanaele, relay_adresse) = testaufbau().await;

        let (tx, rx) = watch::channel(false);
        let relay_task = tokio::spawn(Arc::clone(&relay).empfangs_loop(rx));

        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket
            .send_to(&testpaket(999, 0x11), relay_adresse)
            .await
            .unwrap();
        // Kein Absturz, nichts zu empfangen – der Drop ist still
        tokio::time::sleep(Duration::from_millis(50)).await;

        let _ = tx.send(true);
        let _ = relay_task.await;
    }

    #[tokio::test]
    async fn zu_kurze_datagramme_werden_verworfen() {
        let (relay, registry, kanaele, relay_adresse) = testaufbau().await;

        let benutzer = UserId::new();
        kanaele.standard_beitreten(benutzer).await.unwrap();
        registry.client_registrieren(ClientId(1), benutzer);

        let (tx, rx) = watch::channel(false);
        let relay_task = tokio::spawn(Arc::clone(&relay).empfangs_loop(rx));

        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket.send_to(&[0u8; 31], relay_adresse).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Die Adresse darf aus dem kaputten Paket nicht gelernt worden sein
        assert_eq!(registry.endpunkt(benutzer), None);

        let _ = tx.send(true);
        let _ = relay_task.await;
    }
}
