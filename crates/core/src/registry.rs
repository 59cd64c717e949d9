use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::RwLock;

use tss_protocol::{PartyDescriptor, PartyIdentity};

use crate::{Error, Result};

/// Tracks known peers and their reachable addresses, and derives the
/// canonical, sorted party list for a session.
///
/// Bindings are learned from handshake envelopes and forgotten on
/// disconnect; both operations are idempotent, matching the
/// coordinator's own address bookkeeping (a handshake for an address
/// already on file is a no-op, not an error).
pub struct PartyRegistry {
    local_id: PartyIdentity,
    local_pubkey: String,
    peers: RwLock<HashMap<PartyIdentity, SocketAddr>>,
}

impl PartyRegistry {
    /// Create a registry for the local party identified by
    /// `local_pubkey`.
    pub fn new(local_pubkey: impl Into<String>) -> Result<Self> {
        let local_pubkey = local_pubkey.into();
        let local_id = PartyIdentity::new(local_pubkey.clone())?;
        Ok(Self {
            local_id,
            local_pubkey,
            peers: RwLock::new(HashMap::new()),
        })
    }

    /// This node's own identity.
    pub fn local_id(&self) -> &PartyIdentity {
        &self.local_id
    }

    /// Record or refresh a peer's address, from an inbound handshake.
    ///
    /// Returns `true` if this changed the registry (a new peer, or an
    /// address change for an existing one); `false` if the handshake
    /// merely repeated a binding we already have.
    pub fn handle_handshake(
        &self,
        pubkey: &str,
        peer_addr: SocketAddr,
    ) -> Result<bool> {
        let id = PartyIdentity::new(pubkey)?;
        let mut peers = self.peers.write().unwrap();
        if peers.get(&id) == Some(&peer_addr) {
            return Ok(false);
        }
        peers.insert(id, peer_addr);
        Ok(true)
    }

    /// Remove a peer's binding, from an inbound disconnect.
    ///
    /// Only removes the binding if `peer_addr` still matches what is
    /// on file — a disconnect for a stale address is ignored, since
    /// the peer may since have re-announced a new one.
    pub fn handle_disconnect(
        &self,
        pubkey: &str,
        peer_addr: SocketAddr,
    ) -> Result<bool> {
        let id = PartyIdentity::new(pubkey)?;
        let mut peers = self.peers.write().unwrap();
        if peers.get(&id) == Some(&peer_addr) {
            peers.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    /// Current reachable address for `id`, if known.
    pub fn address_of(&self, id: &PartyIdentity) -> Option<SocketAddr> {
        self.peers.read().unwrap().get(id).copied()
    }

    /// Every currently known peer address, for broadcast fan-out.
    pub fn peer_addresses(&self) -> Vec<SocketAddr> {
        self.peers.read().unwrap().values().copied().collect()
    }

    /// Build the canonical, big-integer-sorted party list for a
    /// session: every known peer plus the local party.
    pub fn sorted_parties(&self) -> Result<Vec<PartyDescriptor>> {
        let peers = self.peers.read().unwrap();
        let mut ids: Vec<PartyIdentity> = peers.keys().cloned().collect();
        ids.push(self.local_id.clone());
        Ok(PartyDescriptor::sorted_parties(ids, &self.local_id)?)
    }

    /// This node's descriptor (identity, moniker, index) within the
    /// current party set.
    pub fn local_descriptor(&self) -> Result<PartyDescriptor> {
        self.sorted_parties()?
            .into_iter()
            .find(|p| p.id == self.local_id)
            .ok_or_else(|| {
                Error::UnknownParty(self.local_pubkey.clone())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn handshake_is_idempotent_for_the_same_address() {
        let registry = PartyRegistry::new("1").unwrap();
        assert!(registry.handle_handshake("2", addr(9000)).unwrap());
        assert!(!registry.handle_handshake("2", addr(9000)).unwrap());
    }

    #[test]
    fn handshake_with_a_new_address_updates_the_binding() {
        let registry = PartyRegistry::new("1").unwrap();
        registry.handle_handshake("2", addr(9000)).unwrap();
        assert!(registry.handle_handshake("2", addr(9001)).unwrap());
        assert_eq!(
            registry.address_of(&PartyIdentity::new("2").unwrap()),
            Some(addr(9001))
        );
    }

    #[test]
    fn disconnect_for_a_stale_address_is_ignored() {
        let registry = PartyRegistry::new("1").unwrap();
        registry.handle_handshake("2", addr(9000)).unwrap();
        assert!(!registry.handle_disconnect("2", addr(9999)).unwrap());
        assert!(registry
            .address_of(&PartyIdentity::new("2").unwrap())
            .is_some());
    }

    #[test]
    fn sorted_parties_includes_local_and_peers() {
        let registry = PartyRegistry::new("9").unwrap();
        registry.handle_handshake("10", addr(9000)).unwrap();
        registry.handle_handshake("2", addr(9001)).unwrap();
        let parties = registry.sorted_parties().unwrap();
        let ids: Vec<_> =
            parties.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "9", "10"]);
    }
}
