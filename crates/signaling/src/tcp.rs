//! TLS-Listener – bindet den Control-Port, akzeptiert Verbindungen
//!
//! ## Concurrency-Modell
//! Die Repository-Traits verwenden `async fn` ohne Send-Garantie
//! (async_fn_in_trait), deshalb laufen alle Verbindungs-Tasks in einer
//! `tokio::task::LocalSet` auf dem aufrufenden Thread. Das UDP-Relay ist
//! davon unabhaengig und laeuft als normaler Task.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::LocalSet;
use tokio_rustls::TlsAcceptor;

use crate::connection::ClientVerbindung;
use crate::server_state::{Repositorien, SignalingState};

/// TLS-Control-Server
pub struct ControlServer<R: Repositorien + 'static> {
    state: Arc<SignalingState<R>>,
    bind_addr: SocketAddr,
    tls_acceptor: TlsAcceptor,
}

impl<R: Repositorien + 'static> ControlServer<R> {
    /// Erstellt einen neuen ControlServer
    pub fn neu(
        state: Arc<SignalingState<R>>,
        bind_addr: SocketAddr,
        tls_acceptor: TlsAcceptor,
    ) -> Self {
        Self {
            state,
            bind_addr,
            tls_acceptor,
        }
    }

    /// Startet den Listener und akzeptiert Verbindungen bis zum Shutdown
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        let local = LocalSet::new();
        local.run_until(self.accept_loop(shutdown_rx)).await
    }

    async fn accept_loop(self, mut shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        let lokale_addr = listener.local_addr()?;

        tracing::info!(adresse = %lokale_addr, "TLS-Control-Server gestartet");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            tracing::debug!(peer = %peer_addr, "Verbindung akzeptiert");

                            let acceptor = self.tls_acceptor.clone();
                            let state = Arc::clone(&self.state);
                            let shutdown = shutdown_rx.clone();

                            // Lokaler Task – kein Send erforderlich
                            tokio::task::spawn_local(async move {
                                match acceptor.accept(stream).await {
                                    Ok(tls_stream) => {
                                        ClientVerbindung::neu(state, peer_addr)
                                            .verarbeiten(tls_stream, shutdown)
                                            .await;
                                    }
                                    Err(e) => {
                                        tracing::warn!(peer = %peer_addr, fehler = %e, "TLS-Handshake fehlgeschlagen");
                                    }
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Control-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("TLS-Control-Server gestoppt");
        Ok(())
    }

    /// Gibt die Bind-Adresse zurueck
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
