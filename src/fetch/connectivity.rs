//! Host connectivity signal
//!
//! A synchronous yes/no answer to "is any network reachable right now?",
//! consulted when a request fails so that offline failures can be reported
//! as such instead of as generic transport errors.

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};

/// Public addresses used to ask the OS for a route. No packets are sent.
const PROBE_TARGETS: [&str; 2] = ["1.1.1.1:53", "[2606:4700:4700::1111]:53"];

/// Source of the host connectivity signal
pub trait Connectivity: Send + Sync {
    /// Whether the host currently has a usable network
    fn is_online(&self) -> bool;
}

/// Reports online when the OS has a route to a public address
///
/// Connecting a UDP socket only performs route selection, so the probe is
/// cheap and never leaves the machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct RouteProbe;

impl RouteProbe {
    fn has_route(target: &str) -> bool {
        let Ok(addr) = target.parse::<SocketAddr>() else {
            return false;
        };
        let bind_addr = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        UdpSocket::bind(bind_addr)
            .and_then(|socket| socket.connect(addr))
            .is_ok()
    }
}

impl Connectivity for RouteProbe {
    fn is_online(&self) -> bool {
        PROBE_TARGETS.iter().any(|target| Self::has_route(target))
    }
}

/// A connectivity flag that is set explicitly
#[derive(Debug)]
pub struct FixedConnectivity {
    online: AtomicBool,
}

impl FixedConnectivity {
    /// Starts out online
    pub fn online() -> Self {
        Self {
            online: AtomicBool::new(true),
        }
    }

    /// Starts out offline
    pub fn offline() -> Self {
        Self {
            online: AtomicBool::new(false),
        }
    }

    /// Flips the signal
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Connectivity for FixedConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
