//! Endpunkt-Registry – Transport-Bindungen der UDP-Clients
//!
//! Bindet eine authentifizierte UserId an die vom Client gewaehlte
//! ClientId und lernt die UDP-Absenderadresse aus eingehenden Paketen
//! (NAT-Rebinding-Toleranz). Die Registry ist der alleinige Eigentuemer
//! dieser Zuordnungen; ein einzelner Lock macht jede Operation atomar.

use std::collections::HashMap;
use std::net::SocketAddr;

use parking_lot::Mutex;
use whispr_core::types::{ClientId, UserId};

#[derive(Default)]
struct RegistryMaps {
    client_zu_user: HashMap<ClientId, UserId>,
    user_zu_client: HashMap<UserId, ClientId>,
    endpunkte: HashMap<ClientId, SocketAddr>,
}

/// Bidirektionale Registry ClientId <-> UserId plus Adress-Zuordnung
#[derive(Default)]
pub struct EndpunktRegistry {
    innen: Mutex<RegistryMaps>,
}

impl EndpunktRegistry {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Bindet eine ClientId an einen Benutzer
    ///
    /// Eine bereits anderweitig vergebene ClientId wird uebernommen; eine
    /// fruehere ClientId desselben Benutzers wird geloescht. Eine bereits
    /// gelernte Adresse ueberlebt nur wenn die ClientId unveraendert bleibt.
    pub fn client_registrieren(&self, client_id: ClientId, user_id: UserId) {
        let mut innen = self.innen.lock();

        // Alte Bindung desselben Benutzers entfernen
        if let Some(alte) = innen.user_zu_client.get(&user_id).copied() {
            if alte != client_id {
                innen.client_zu_user.remove(&alte);
                innen.endpunkte.remove(&alte);
            }
        }

        // ClientId von einem anderen Benutzer uebernehmen
        if let Some(anderer) = innen.client_zu_user.get(&client_id).copied() {
            if anderer != user_id {
                innen.user_zu_client.remove(&anderer);
                innen.endpunkte.remove(&client_id);
            }
        }

        innen.client_zu_user.insert(client_id, user_id);
        innen.user_zu_client.insert(user_id, client_id);

        tracing::debug!(client = %client_id, user = %user_id, "UDP-Client registriert");
    }

    /// Setzt oder erneuert die Absenderadresse eines gebundenen Clients
    ///
    /// Adressen ohne bestehende Bindung werden nicht gelernt.
    pub fn endpunkt_aktualisieren(&self, client_id: ClientId, adresse: SocketAddr) {
        let mut innen = self.innen.lock();
        if innen.client_zu_user.contains_key(&client_id) {
            innen.endpunkte.insert(client_id, adresse);
        }
    }

    /// Benutzer zu einer ClientId
    pub fn user_id(&self, client_id: ClientId) -> Option<UserId> {
        self.innen.lock().client_zu_user.get(&client_id).copied()
    }

    /// ClientId eines Benutzers
    pub fn client_id(&self, user_id: UserId) -> Option<ClientId> {
        self.innen.lock().user_zu_client.get(&user_id).copied()
    }

    /// Aktuelle UDP-Adresse eines Benutzers
    pub fn endpunkt(&self, user_id: UserId) -> Option<SocketAddr> {
        let innen = self.innen.lock();
        let client_id = innen.user_zu_client.get(&user_id)?;
        innen.endpunkte.get(client_id).copied()
    }

    /// Entfernt alle Bindungen eines Benutzers
    pub fn entfernen(&self, user_id: UserId) {
        let mut innen = self.innen.lock();
        if let Some(client_id) = innen.user_zu_client.remove(&user_id) {
            innen.client_zu_user.remove(&client_id);
            innen.endpunkte.remove(&client_id);
            tracing::debug!(user = %user_id, client = %client_id, "UDP-Bindung entfernt");
        }
    }

    /// Entfernt alle Bindungen anhand der ClientId
    pub fn entfernen_nach_client(&self, client_id: ClientId) {
        let mut innen = self.innen.lock();
        if let Some(user_id) = innen.client_zu_user.remove(&client_id) {
            innen.user_zu_client.remove(&user_id);
            innen.endpunkte.remove(&client_id);
        }
    }
}
