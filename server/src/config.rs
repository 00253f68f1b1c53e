//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! Standardwerte, sodass der Server ohne Konfigurationsdatei lauffaehig
//! ist. Geheimnisse (Zertifikats-Passwort, Nachrichten-Schluessel)
//! koennen ueber die Umgebung gesetzt werden und haben dann Vorrang.

use serde::{Deserialize, Serialize};

/// Umgebungsvariable fuer das PKCS#12-Passwort
pub const ENV_CERT_PASSWORD: &str = "WHISPR_CERT_PASSWORD";

/// Umgebungsvariable fuer den At-Rest-Nachrichten-Schluessel (Base64, 32 Bytes)
pub const ENV_MESSAGE_KEY: &str = "WHISPR_MESSAGE_ENCRYPTION_KEY";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhisprConfig {
    /// Bind-Adresse fuer beide Ports
    pub bind_adresse: String,
    /// TCP-Port des TLS-Control-Protokolls
    pub control_port: u16,
    /// UDP-Port des Audio-Relays
    pub audio_port: u16,
    /// Pfad zum PKCS#12-Zertifikat (.pfx)
    pub certificate_path: String,
    /// Zertifikats-Passwort (Umgebung hat Vorrang)
    pub certificate_password: Option<String>,
    /// Pfad zur SQLite-Datenbankdatei
    pub database_path: String,
    /// Legt beim Start die Testkonten admin/admin und bob/bob an
    pub seed_test_users: bool,
    /// Erlaubt Selbstregistrierung beim ersten Login
    pub auto_register: bool,
    /// Lebensdauer ausgestellter Bearer-Tokens in Stunden
    pub token_lifetime_hours: i64,
    /// At-Rest-Schluessel fuer Chat-Nachrichten (Base64, 32 Bytes)
    pub message_encryption_key_base64: Option<String>,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

impl Default for WhisprConfig {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            control_port: 8443,
            audio_port: 8444,
            certificate_path: "whispr.pfx".into(),
            certificate_password: None,
            database_path: "whispr.db".into(),
            seed_test_users: false,
            auto_register: false,
            token_lifetime_hours: 24,
            message_encryption_key_base64: None,
            logging: LoggingEinstellungen::default(),
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl WhisprConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ));
            }
        };

        Ok(config.mit_umgebung())
    }

    /// Uebernimmt Geheimnisse aus der Umgebung
    fn mit_umgebung(mut self) -> Self {
        if let Ok(passwort) = std::env::var(ENV_CERT_PASSWORD) {
            self.certificate_password = Some(passwort);
        }
        if let Ok(schluessel) = std::env::var(ENV_MESSAGE_KEY) {
            self.message_encryption_key_base64 = Some(schluessel);
        }
        self
    }

    /// Gibt die vollstaendige Bind-Adresse fuer das Control-Protokoll zurueck
    pub fn control_bind_adresse(&self) -> String {
        format!("{}:{}", self.bind_adresse, self.control_port)
    }

    /// Gibt die vollstaendige Bind-Adresse fuer das Audio-Relay zurueck
    pub fn audio_bind_adresse(&self) -> String {
        format!("{}:{}", self.bind_adresse, self.audio_port)
    }

    /// SQLite-Verbindungs-URL
    pub fn datenbank_url(&self) -> String {
        format!("sqlite://{}", self.database_path)
    }

    /// Dekodiert den optionalen Nachrichten-Schluessel (32 Bytes, Base64)
    pub fn nachrichten_schluessel(&self) -> anyhow::Result<Option<[u8; 32]>> {
        let Some(ref kodiert) = self.message_encryption_key_base64 else {
            return Ok(None);
        };

        let bytes = base64::Engine::decode(
            &base64::engine::general_purpose::STANDARD,
            kodiert.trim(),
        )
        .map_err(|e| anyhow::anyhow!("Nachrichten-Schluessel ist kein gueltiges Base64: {e}"))?;

        let schluessel: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            anyhow::anyhow!(
                "Nachrichten-Schluessel muss 32 Bytes lang sein (war: {})",
                bytes.len()
            )
        })?;

        Ok(Some(schluessel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = WhisprConfig::default();
        assert_eq!(cfg.control_port, 8443);
        assert_eq!(cfg.audio_port, 8444);
        assert_eq!(cfg.token_lifetime_hours, 24);
        assert!(!cfg.seed_test_users);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn bind_adressen() {
        let cfg = WhisprConfig::default();
        assert_eq!(cfg.control_bind_adresse(), "0.0.0.0:8443");
        assert_eq!(cfg.audio_bind_adresse(), "0.0.0.0:8444");
        assert_eq!(cfg.datenbank_url(), "sqlite://whispr.db");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            control_port = 9000
            seed_test_users = true

            [logging]
            level = "debug"
        "#;
        let cfg: WhisprConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.control_port, 9000);
        assert!(cfg.seed_test_users);
        assert_eq!(cfg.logging.level, "debug");
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.audio_port, 8444);
    }

    #[test]
    fn nachrichten_schluessel_laengenpruefung() {
        let mut cfg = WhisprConfig::default();
        assert!(cfg.nachrichten_schluessel().unwrap().is_none());

        cfg.message_encryption_key_base64 = Some(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            [7u8; 32],
        ));
        assert_eq!(cfg.nachrichten_schluessel().unwrap(), Some([7u8; 32]));

        cfg.message_encryption_key_base64 = Some("QUJD".into());
        assert!(cfg.nachrichten_schluessel().is_err());

        cfg.message_encryption_key_base64 = Some("kein base64!!".into());
        assert!(cfg.nachrichten_schluessel().is_err());
    }
}
