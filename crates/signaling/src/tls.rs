//! TLS-Acceptor aus einem PKCS#12-Container
//!
//! Der Server erwartet Zertifikat und privaten Schluessel in einer
//! `.pfx`-Datei; das Passwort kommt aus der Umgebung oder der
//! Konfiguration. Ein fehlendes oder unlesbares Zertifikat ist fatal.

use std::path::Path;
use std::sync::Arc;

use p12_keystore::{KeyStore, KeyStoreEntry};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio_rustls::TlsAcceptor;

use crate::error::SignalingError;

/// Laedt einen PKCS#12-Container und baut den rustls-Acceptor
pub fn acceptor_aus_pkcs12(pfad: &Path, passwort: &str) -> Result<TlsAcceptor, SignalingError> {
    let daten = std::fs::read(pfad).map_err(|e| {
        SignalingError::Zertifikat(format!("'{}' nicht lesbar: {e}", pfad.display()))
    })?;

    let keystore = KeyStore::from_pkcs12(&daten, passwort)
        .map_err(|e| SignalingError::Zertifikat(format!("PKCS#12-Parsing fehlgeschlagen: {e}")))?;

    let kette = keystore
        .entries()
        .find_map(|(_, eintrag)| match eintrag {
            KeyStoreEntry::PrivateKeyChain(kette) => Some(kette),
            _ => None,
        })
        .ok_or_else(|| {
            SignalingError::Zertifikat("PKCS#12 enthaelt keinen privaten Schluessel".into())
        })?;

    let zertifikate: Vec<CertificateDer<'static>> = kette
        .chain()
        .iter()
        .map(|zert| CertificateDer::from(zert.as_der().to_vec()))
        .collect();
    if zertifikate.is_empty() {
        return Err(SignalingError::Zertifikat(
            "PKCS#12 enthaelt keine Zertifikatskette".into(),
        ));
    }

    let schluessel = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(kette.key().to_vec()));

    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(zertifikate, schluessel)
        .map_err(|e| SignalingError::Tls(e.to_string()))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehlende_datei_ist_ein_zertifikatsfehler() {
        let fehler = acceptor_aus_pkcs12(Path::new("/gibt/es/nicht.pfx"), "pw").err().unwrap();
        assert!(matches!(fehler, SignalingError::Zertifikat(_)));
    }

    #[test]
    fn muell_daten_scheitern_am_parser() {
        let dir = std::env::temp_dir().join("whispr-tls-test");
        std::fs::create_dir_all(&dir).unwrap();
        let pfad = dir.join("kaputt.pfx");
        std::fs::write(&pfad, b"kein pkcs12").unwrap();

        let fehler = acceptor_aus_pkcs12(&pfad, "pw").err().unwrap();
        assert!(matches!(fehler, SignalingError::Zertifikat(_)));
    }
}
