//! Bearer-Token-Store
//!
//! Opake Tokens beweisen einen frueheren erfolgreichen Login. Sie leben
//! im Speicher, ueberleben Verbindungen (ein Disconnect widerruft nichts)
//! und laufen nach der konfigurierten Lebensdauer ab. Abgelaufene
//! Eintraege werden opportunistisch beim Ausstellen weggeraeumt –
//! es gibt keinen Hintergrund-Task.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Ein ausgestelltes Bearer-Token
#[derive(Debug, Clone)]
pub struct TokenEintrag {
    /// Der Token-String (URL-sicheres Base64, 32 Bytes Entropie)
    pub token: String,
    /// ID des Benutzers dem dieses Token gehoert
    pub user_id: Uuid,
    pub erstellt_am: DateTime<Utc>,
    pub laeuft_ab_am: DateTime<Utc>,
}

impl TokenEintrag {
    /// Gibt `true` zurueck wenn das Token noch gueltig ist
    pub fn ist_gueltig(&self) -> bool {
        Utc::now() < self.laeuft_ab_am
    }
}

/// In-Memory Token-Store mit TTL
#[derive(Debug)]
pub struct TokenStore {
    lebensdauer: Duration,
    /// token -> Eintrag
    tokens: RwLock<HashMap<String, TokenEintrag>>,
}

impl TokenStore {
    /// Erstellt einen Store mit der angegebenen Token-Lebensdauer in Stunden
    pub fn neu(lebensdauer_stunden: i64) -> Arc<Self> {
        Arc::new(Self {
            lebensdauer: Duration::hours(lebensdauer_stunden),
            tokens: RwLock::new(HashMap::new()),
        })
    }

    /// Erstellt einen Store mit beliebiger Lebensdauer (fuer Tests)
    pub fn neu_mit_lebensdauer(lebensdauer: Duration) -> Arc<Self> {
        Arc::new(Self {
            lebensdauer,
            tokens: RwLock::new(HashMap::new()),
        })
    }

    /// Stellt ein neues Token fuer den Benutzer aus
    pub async fn ausstellen(&self, user_id: Uuid) -> TokenEintrag {
        let jetzt = Utc::now();
        let eintrag = TokenEintrag {
            token: token_generieren(),
            user_id,
            erstellt_am: jetzt,
            laeuft_ab_am: jetzt + self.lebensdauer,
        };

        let mut tokens = self.tokens.write().await;
        // Opportunistischer Sweep abgelaufener Eintraege
        tokens.retain(|_, t| t.laeuft_ab_am > jetzt);
        tokens.insert(eintrag.token.clone(), eintrag.clone());

        tracing::debug!(user_id = %user_id, "Token ausgestellt");
        eintrag
    }

    /// Validiert ein Token; unbekannt oder abgelaufen ergibt `None`
    pub async fn validieren(&self, token: &str) -> Option<TokenEintrag> {
        let tokens = self.tokens.read().await;
        tokens
            .get(token)
            .filter(|eintrag| eintrag.ist_gueltig())
            .cloned()
    }

    /// Widerruft ein Token; idempotent
    pub async fn widerrufen(&self, token: &str) {
        let mut tokens = self.tokens.write().await;
        if tokens.remove(token).is_some() {
            tracing::debug!("Token widerrufen");
        }
    }

    /// Anzahl der aktuell gueltigen Tokens
    pub async fn anzahl_aktive(&self) -> usize {
        let jetzt = Utc::now();
        self.tokens
            .read()
            .await
            .values()
            .filter(|t| t.laeuft_ab_am > jetzt)
            .count()
    }
}

/// Generiert ein kryptografisch sicheres Token (URL-sicheres Base64)
fn token_generieren() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}
