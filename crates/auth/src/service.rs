//! Auth-Service fuer Whispr
//!
//! Zentraler Service fuer Anmeldung, optionale Selbstregistrierung,
//! Konto-Anlage per CLI und Token-Verwaltung. Nutzt die DB-Repositories
//! und den Token-Store.

use std::sync::Arc;

use uuid::Uuid;
use whispr_core::types::UserRolle;

use whispr_db::{
    models::{BenutzerRecord, NeuerBenutzer},
    PermissionRepository, UserRepository,
};

use crate::{
    error::{AuthError, AuthResult},
    password::{passwort_hashen, passwort_verifizieren},
    permissions::PermissionService,
    token::TokenStore,
};

/// Auth-Service – zentraler Einstiegspunkt fuer alle Anmeldevorgaenge
pub struct AuthService<R: UserRepository + PermissionRepository> {
    repo: Arc<R>,
    berechtigungen: Arc<PermissionService<R>>,
    tokens: Arc<TokenStore>,
    auto_registrieren: bool,
}

impl<R: UserRepository + PermissionRepository> AuthService<R> {
    /// Erstellt einen neuen AuthService
    pub fn neu(
        repo: Arc<R>,
        berechtigungen: Arc<PermissionService<R>>,
        tokens: Arc<TokenStore>,
        auto_registrieren: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            repo,
            berechtigungen,
            tokens,
            auto_registrieren,
        })
    }

    /// Prueft Anmeldedaten; `None` bei unbekanntem Namen oder falschem
    /// Passwort
    pub async fn anmelden(
        &self,
        username: &str,
        passwort: &str,
    ) -> AuthResult<Option<BenutzerRecord>> {
        let Some(benutzer) = self.repo.get_by_name(username).await? else {
            return Ok(None);
        };

        if passwort_verifizieren(passwort, &benutzer.password_hash)? {
            Ok(Some(benutzer))
        } else {
            Ok(None)
        }
    }

    /// Anmeldung mit optionaler Selbstregistrierung
    ///
    /// Ist die Selbstregistrierung aktiviert und der Name frei, wird ein
    /// neues Konto mit Rolle `User` angelegt und direkt angemeldet.
    pub async fn anmelden_oder_registrieren(
        &self,
        username: &str,
        passwort: &str,
    ) -> AuthResult<Option<BenutzerRecord>> {
        if self.auto_registrieren && self.repo.get_by_name(username).await?.is_none() {
            if eingabe_pruefen(username, passwort).is_err() {
                return Ok(None);
            }

            let hash = passwort_hashen(passwort)?;
            match self
                .repo
                .create(NeuerBenutzer {
                    username,
                    password_hash: &hash,
                    rolle: UserRolle::User,
                })
                .await
            {
                Ok(benutzer) => {
                    self.repo
                        .set_user_role(benutzer.id, crate::seed::ROLLE_MEMBER, true)
                        .await?;
                    tracing::info!(username = %benutzer.username, "Konto selbstregistriert");
                    return Ok(Some(benutzer));
                }
                // Wettlauf mit einer parallelen Registrierung: regulaer anmelden
                Err(e) if e.ist_eindeutigkeit() => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.anmelden(username, passwort).await
    }

    /// Legt ein Konto an; `false` wenn der Name bereits vergeben ist
    pub async fn benutzer_anlegen(
        &self,
        username: &str,
        passwort: &str,
        rolle: UserRolle,
    ) -> AuthResult<bool> {
        eingabe_pruefen(username, passwort)?;

        let hash = passwort_hashen(passwort)?;
        match self
            .repo
            .create(NeuerBenutzer {
                username,
                password_hash: &hash,
                rolle,
            })
            .await
        {
            Ok(benutzer) => {
                tracing::info!(username = %benutzer.username, rolle = ?rolle, "Konto angelegt");
                Ok(true)
            }
            Err(e) if e.ist_eindeutigkeit() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Stellt ein Bearer-Token fuer den Benutzer aus
    pub async fn token_ausstellen(&self, benutzer: &BenutzerRecord) -> String {
        self.tokens.ausstellen(benutzer.id).await.token
    }

    /// Loest ein Token zum Benutzer auf; unbekannt/abgelaufen ergibt `None`
    pub async fn token_validieren(&self, token: &str) -> AuthResult<Option<BenutzerRecord>> {
        let Some(eintrag) = self.tokens.validieren(token).await else {
            return Ok(None);
        };
        self.repo.get_by_id(eintrag.user_id).await.map_err(Into::into)
    }

    /// Widerruft ein Token; idempotent
    pub async fn token_widerrufen(&self, token: &str) {
        self.tokens.widerrufen(token).await;
    }

    /// Admin-Pruefung (Konto-Rolle oder effektive `admin`-Berechtigung)
    pub async fn ist_admin(&self, benutzer: &BenutzerRecord) -> AuthResult<bool> {
        self.berechtigungen.ist_admin(benutzer).await
    }

    /// Benutzername zu einer ID
    pub async fn benutzername(&self, user_id: Uuid) -> AuthResult<Option<String>> {
        Ok(self
            .repo
            .get_by_id(user_id)
            .await?
            .map(|benutzer| benutzer.username))
    }

    /// Laedt einen Benutzer anhand seiner ID
    pub async fn benutzer(&self, user_id: Uuid) -> AuthResult<Option<BenutzerRecord>> {
        self.repo.get_by_id(user_id).await.map_err(Into::into)
    }
}

fn eingabe_pruefen(username: &str, passwort: &str) -> AuthResult<()> {
    if username.trim().is_empty() || username.len() > 64 {
        return Err(AuthError::UngueltigeEingabe(
            "Benutzername fehlt oder ist zu lang".into(),
        ));
    }
    if passwort.is_empty() {
        return Err(AuthError::UngueltigeEingabe("Passwort fehlt".into()));
    }
    Ok(())
}
