//! Whispr Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den
//! Server bzw. fuehrt den `add-user`-Unterbefehl aus.

use anyhow::Result;
use clap::{Parser, Subcommand};

use whispr_server::{benutzer_hinzufuegen, config::WhisprConfig, Server};

#[derive(Parser)]
#[command(name = "whispr-server", version, about = "Whispr Voice-Relay-Server")]
struct Cli {
    #[command(subcommand)]
    befehl: Option<Befehl>,
}

#[derive(Subcommand)]
enum Befehl {
    /// Legt ein Benutzerkonto an und beendet sich
    AddUser {
        username: String,
        password: String,
        /// Konto mit Admin-Rolle anlegen
        #[arg(long)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("WHISPR_CONFIG").unwrap_or_else(|_| "whispr.toml".into());
    let config = WhisprConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.logging.level, &config.logging.format);

    match cli.befehl {
        Some(Befehl::AddUser {
            username,
            password,
            admin,
        }) => {
            if benutzer_hinzufuegen(&config, &username, &password, admin).await? {
                println!("Benutzer '{username}' angelegt");
                Ok(())
            } else {
                eprintln!("Benutzername '{username}' ist bereits vergeben");
                std::process::exit(1);
            }
        }
        None => {
            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                config = %config_pfad,
                "Whispr-Server wird initialisiert"
            );
            Server::neu(config).starten().await
        }
    }
}

/// Initialisiert tracing-subscriber mit dem konfigurierten Level und Format
fn logging_initialisieren(level: &str, format: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
    }
}
