//! Pro-Client Paket-Rate-Limit
//!
//! Fenster-Limit pro ClientId: hoechstens 100 Pakete pro 1000 ms, wobei
//! das Fenster mit dem ersten Paket beginnt. Das 100. Paket eines
//! Fensters passiert, das 101. wird verworfen; 1000 ms nach dem ersten
//! Paket oeffnet das naechste Fenster.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use whispr_core::types::ClientId;

/// Maximale Paketanzahl pro Fenster
pub const MAX_PAKETE_PRO_FENSTER: u32 = 100;

/// Fensterdauer
pub const FENSTER_DAUER: Duration = Duration::from_millis(1000);

#[derive(Debug)]
struct Fenster {
    start: Instant,
    anzahl: u32,
}

/// Paket-Limiter, indiziert nach ClientId
#[derive(Default)]
pub struct PaketLimiter {
    fenster: DashMap<ClientId, Fenster>,
}

impl PaketLimiter {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Verbraucht ein Kontingent; `false` bedeutet: Paket verwerfen
    pub fn erlauben(&self, client_id: ClientId) -> bool {
        let jetzt = Instant::now();
        let mut eintrag = self.fenster.entry(client_id).or_insert(Fenster {
            start: jetzt,
            anzahl: 0,
        });

        if jetzt.duration_since(eintrag.start) >= FENSTER_DAUER {
            eintrag.start = jetzt;
            eintrag.anzahl = 0;
        }

        if eintrag.anzahl < MAX_PAKETE_PRO_FENSTER {
            eintrag.anzahl += 1;
            true
        } else {
            false
        }
    }

    /// Vergisst den Zustand eines Clients (beim Unregister)
    pub fn entfernen(&self, client_id: ClientId) {
        self.fenster.remove(&client_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hundertstes_paket_passiert_hundertunderstes_nicht() {
        let limiter = PaketLimiter::neu();
        let client = ClientId(1);

        for i in 0..MAX_PAKETE_PRO_FENSTER {
            assert!(limiter.erlauben(client), "Paket {} muss passieren", i + 1);
        }
        assert!(!limiter.erlauben(client), "Paket 101 muss verworfen werden");
        assert!(!limiter.erlauben(client));
    }

    #[test]
    fn clients_haben_getrennte_fenster() {
        let limiter = PaketLimiter::neu();

        for _ in 0..MAX_PAKETE_PRO_FENSTER {
            assert!(limiter.erlauben(ClientId(1)));
        }
        assert!(!limiter.erlauben(ClientId(1)));
        assert!(limiter.erlauben(ClientId(2)));
    }

    #[test]
    fn fenster_oeffnet_nach_ablauf_neu() {
        let limiter = PaketLimiter::neu();
        let client = ClientId(3);

        for _ in 0..MAX_PAKETE_PRO_FENSTER {
            limiter.erlauben(client);
        }
        assert!(!limiter.erlauben(client));

        std::thread::sleep(FENSTER_DAUER + Duration::from_millis(50));
        assert!(limiter.erlauben(client), "Neues Fenster muss oeffnen");
    }

    #[test]
    fn entfernen_setzt_den_zustand_zurueck() {
        let limiter = PaketLimiter::neu();
        let client = ClientId(4);

        for _ in 0..MAX_PAKETE_PRO_FENSTER {
            limiter.erlauben(client);
        }
        assert!(!limiter.erlauben(client));

        limiter.entfernen(client);
        assert!(limiter.erlauben(client));
    }
}
