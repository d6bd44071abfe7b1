// host.rs - RADIUS peer (NAS / server) configuration
//
// A `Host` binds a peer's address to the shared secret and dictionary used
// to talk to it, plus the UDP ports it listens on for each packet family.
// The client and server modules both resolve peers through a `HostMap`
// rather than threading `(IpAddr, secret)` pairs through every call.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::dictionary::Dictionary;

/// The three RADIUS service ports a host may expose (RFC 2865 §4.1, RFC
/// 2866 §4.1, RFC 5176 §3.3). Zero disables that family for this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPorts {
    pub auth: u16,
    pub acct: u16,
    pub coa: u16,
}

impl Default for HostPorts {
    fn default() -> Self {
        Self {
            auth: 1812,
            acct: 1813,
            coa: 3799,
        }
    }
}

/// A single RADIUS peer: its address, display name, shared secret, port
/// assignment, and the dictionary used to interpret its attributes. The
/// host table maps `address -> { secret, name }`; `name` has no wire role,
/// it's the label an embedder's logs/admin UI shows for this peer.
#[derive(Clone)]
pub struct Host {
    pub address: IpAddr,
    pub name: String,
    pub secret: Vec<u8>,
    pub ports: HostPorts,
    pub dictionary: Arc<Dictionary>,
    identifiers: Arc<AtomicU8>,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("address", &self.address)
            .field("name", &self.name)
            .field("ports", &self.ports)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Host {
    pub fn new(address: IpAddr, secret: Vec<u8>, dictionary: Arc<Dictionary>) -> Self {
        Self {
            address,
            name: String::new(),
            secret,
            ports: HostPorts::default(),
            dictionary,
            identifiers: Arc::new(AtomicU8::new(0)),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_ports(mut self, ports: HostPorts) -> Self {
        self.ports = ports;
        self
    }

    /// Next packet identifier for this host, wrapping at 256 (RFC 2865
    /// §3: "one octet... used to match requests with responses"). Shared
    /// across a request's retransmissions by the caller reusing the same
    /// value rather than calling this again.
    pub fn next_identifier(&self) -> u8 {
        self.identifiers.fetch_add(1, Ordering::Relaxed)
    }
}

/// Looks up hosts by peer address. Read-mostly: shared across worker tasks
/// behind a reader-writer lock by `Server` so the embedder can register
/// hosts at startup or dynamically while the server is running.
#[derive(Debug, Clone, Default)]
pub struct HostMap {
    hosts: HashMap<IpAddr, Host>,
}

impl HostMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, host: Host) {
        self.hosts.insert(host.address, host);
    }

    pub fn get(&self, address: &IpAddr) -> Option<&Host> {
        self.hosts.get(address)
    }

    pub fn addresses(&self) -> impl Iterator<Item = &IpAddr> {
        self.hosts.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;
    use std::net::Ipv4Addr;

    fn dict() -> Arc<Dictionary> {
        Arc::new(Dictionary::base())
    }

    #[test]
    fn identifier_wraps_at_256() {
        let host = Host::new(IpAddr::V4(Ipv4Addr::LOCALHOST), b"s".to_vec(), dict());
        for expected in 0..=255u8 {
            assert_eq!(host.next_identifier(), expected);
        }
        assert_eq!(host.next_identifier(), 0);
    }

    #[test]
    fn host_map_resolves_by_address() {
        let mut map = HostMap::new();
        let addr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        map.insert(Host::new(addr, b"secret1".to_vec(), dict()).with_name("nas1"));
        let resolved = map.get(&addr).unwrap();
        assert_eq!(resolved.name, "nas1");
        assert!(map.get(&IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2))).is_none());
    }

    #[test]
    fn unknown_host_resolves_to_none() {
        let map = HostMap::new();
        assert!(map.get(&IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1))).is_none());
    }
}
