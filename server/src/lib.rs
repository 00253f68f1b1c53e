//! whispr-server – Kompositions-Root
//!
//! Baut aus Konfiguration, Datenbank und den Service-Singletons den
//! laufenden Server zusammen: TLS-Control-Listener plus UDP-Audio-Relay,
//! verbunden ueber den geteilten SignalingState, beendet ueber ein
//! watch-basiertes Shutdown-Signal.

pub mod config;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;

use whispr_auth::{
    seed::{grunddaten_seeden, testbenutzer_seeden, ROLLE_ADMIN, ROLLE_MEMBER},
    AuthService, PermissionService, TokenStore,
};
use whispr_channels::ChannelService;
use whispr_chat::ChatService;
use whispr_core::types::UserRolle;
use whispr_db::{PermissionRepository, SqliteDb, UserRepository};
use whispr_signaling::{tls::acceptor_aus_pkcs12, ControlServer, SignalingState};
use whispr_voice::{AudioRelay, EndpunktRegistry};

use config::WhisprConfig;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: WhisprConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: WhisprConfig) -> Self {
        Self { config }
    }

    /// Startet alle Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Datenbank oeffnen, migrieren, seeden
    /// 2. Services bauen (prozessweite Singletons)
    /// 3. UDP-Relay binden und starten
    /// 4. TLS-Acceptor aus dem PKCS#12-Container laden
    /// 5. Control-Listener starten, auf Ctrl-C warten
    pub async fn starten(self) -> Result<()> {
        let config = self.config;

        tracing::info!(
            control = %config.control_bind_adresse(),
            audio = %config.audio_bind_adresse(),
            datenbank = %config.database_path,
            "Whispr-Server startet"
        );

        // Datenbank + Seeding
        let db = Arc::new(
            SqliteDb::oeffnen(&config.datenbank_url())
                .await
                .context("Datenbank nicht oeffenbar")?,
        );
        grunddaten_seeden(db.as_ref()).await?;
        if config.seed_test_users {
            testbenutzer_seeden(db.as_ref()).await?;
        }

        // Services
        let tokens = TokenStore::neu(config.token_lifetime_hours);
        let berechtigungen = PermissionService::neu(Arc::clone(&db));
        let auth = AuthService::neu(
            Arc::clone(&db),
            Arc::clone(&berechtigungen),
            tokens,
            config.auto_register,
        );
        let kanaele = ChannelService::neu(Arc::clone(&db));
        kanaele.standard_sicherstellen().await?;
        let chat = ChatService::neu(Arc::clone(&db), config.nachrichten_schluessel()?);
        let registry = Arc::new(EndpunktRegistry::neu());

        // UDP-Relay
        let audio_addr = config
            .audio_bind_adresse()
            .parse()
            .context("Ungueltige Audio-Bind-Adresse")?;
        let relay = AudioRelay::binden(audio_addr, Arc::clone(&registry), Arc::clone(&kanaele))
            .await
            .context("UDP-Relay nicht bindbar")?;

        // TLS
        let passwort = config.certificate_password.clone().unwrap_or_default();
        let tls_acceptor = acceptor_aus_pkcs12(Path::new(&config.certificate_path), &passwort)
            .context("TLS-Zertifikat nicht ladbar")?;

        let state = SignalingState::neu(
            Arc::clone(&db),
            auth,
            berechtigungen,
            kanaele,
            chat,
            registry,
            Arc::clone(&relay),
        );

        // Shutdown-Signal: stoppt Accept-Loop, Sessions und Relay
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(fehler = %e, "Ctrl-C-Handler fehlgeschlagen");
            }
            tracing::info!("Shutdown-Signal empfangen");
            let _ = shutdown_tx.send(true);
        });

        let relay_task = tokio::spawn(relay.empfangs_loop(shutdown_rx.clone()));

        let control_addr = config
            .control_bind_adresse()
            .parse()
            .context("Ungueltige Control-Bind-Adresse")?;
        ControlServer::neu(state, control_addr, tls_acceptor)
            .starten(shutdown_rx)
            .await
            .context("Control-Server fehlgeschlagen")?;

        let _ = relay_task.await;
        tracing::info!("Whispr-Server beendet");
        Ok(())
    }
}

/// Legt ein Benutzerkonto an (CLI `add-user`)
///
/// Gibt `false` zurueck wenn der Benutzername bereits vergeben ist.
pub async fn benutzer_hinzufuegen(
    config: &WhisprConfig,
    username: &str,
    passwort: &str,
    admin: bool,
) -> Result<bool> {
    let db = Arc::new(
        SqliteDb::oeffnen(&config.datenbank_url())
            .await
            .context("Datenbank nicht oeffenbar")?,
    );
    grunddaten_seeden(db.as_ref()).await?;

    let berechtigungen = PermissionService::neu(Arc::clone(&db));
    let auth = AuthService::neu(
        Arc::clone(&db),
        berechtigungen,
        TokenStore::neu(config.token_lifetime_hours),
        false,
    );

    let rolle = if admin {
        UserRolle::Admin
    } else {
        UserRolle::User
    };
    if !auth.benutzer_anlegen(username, passwort, rolle).await? {
        return Ok(false);
    }

    // Passende Standard-Rolle zuweisen
    if let Some(benutzer) = db.get_by_name(username).await? {
        let standard_rolle = if admin { ROLLE_ADMIN } else { ROLLE_MEMBER };
        db.set_user_role(benutzer.id, standard_rolle, true).await?;
    }

    tracing::info!(username = %username, admin = admin, "Benutzer angelegt");
    Ok(true)
}
