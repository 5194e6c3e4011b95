//! # Network Module
//!
//! Decides whether the engine may touch the network right now.
//!
//! The user may forbid downloads on metered connections, so "connected" and
//! "allowed" are different questions. `PolicyGate` combines the user's
//! `NetworkPolicy` with the connection state reported by the platform.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Reports whether network access is currently permitted
pub trait NetworkGate: Send + Sync {
    fn can_access_network(&self) -> bool;
}

/// User preference for when the network may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkPolicy {
    /// Any connection is fine
    #[default]
    Always,
    /// Only unmetered connections (e.g. Wi-Fi)
    UnmeteredOnly,
    /// Never use the network, serve from cache only
    Never,
}

/// Connection state as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ConnectionKind {
    Offline = 0,
    Metered = 1,
    Unmetered = 2,
}

impl ConnectionKind {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Metered,
            2 => Self::Unmetered,
            _ => Self::Offline,
        }
    }
}

impl NetworkPolicy {
    /// Whether this policy allows using the given connection
    pub fn allows(&self, connection: ConnectionKind) -> bool {
        match (self, connection) {
            (_, ConnectionKind::Offline) => false,
            (NetworkPolicy::Never, _) => false,
            (NetworkPolicy::UnmeteredOnly, ConnectionKind::Metered) => false,
            _ => true,
        }
    }
}

/// Gate driven by a user policy and the latest connection state
///
/// The platform layer calls `set_connection` whenever connectivity changes.
pub struct PolicyGate {
    policy: NetworkPolicy,
    connection: AtomicU8,
}

impl PolicyGate {
    pub fn new(policy: NetworkPolicy, connection: ConnectionKind) -> Self {
        Self {
            policy,
            connection: AtomicU8::new(connection as u8),
        }
    }

    pub fn set_connection(&self, connection: ConnectionKind) {
        self.connection.store(connection as u8, Ordering::SeqCst);
    }

    pub fn connection(&self) -> ConnectionKind {
        ConnectionKind::from_u8(self.connection.load(Ordering::SeqCst))
    }

    pub fn policy(&self) -> NetworkPolicy {
        self.policy
    }
}

impl NetworkGate for PolicyGate {
    fn can_access_network(&self) -> bool {
        self.policy.allows(self.connection())
    }
}

/// Gate with a directly settable answer, for tests and tooling
#[derive(Debug, Default)]
pub struct StaticGate {
    allowed: AtomicBool,
}

impl StaticGate {
    pub fn new(allowed: bool) -> Self {
        Self {
            allowed: AtomicBool::new(allowed),
        }
    }

    pub fn set(&self, allowed: bool) {
        self.allowed.store(allowed, Ordering::SeqCst);
    }
}

impl NetworkGate for StaticGate {
    fn can_access_network(&self) -> bool {
        self.allowed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metered_connection_blocked_by_unmetered_policy() {
        let gate = PolicyGate::new(NetworkPolicy::UnmeteredOnly, ConnectionKind::Metered);
        assert!(!gate.can_access_network());

        gate.set_connection(ConnectionKind::Unmetered);
        assert!(gate.can_access_network());
    }

    #[test]
    fn offline_is_never_allowed() {
        let gate = PolicyGate::new(NetworkPolicy::Always, ConnectionKind::Offline);
        assert!(!gate.can_access_network());
    }

    #[test]
    fn never_policy_blocks_everything() {
        assert!(!NetworkPolicy::Never.allows(ConnectionKind::Unmetered));
        assert!(!NetworkPolicy::Never.allows(ConnectionKind::Metered));
    }

    #[test]
    fn static_gate_can_be_toggled() {
        let gate = StaticGate::new(true);
        assert!(gate.can_access_network());
        gate.set(false);
        assert!(!gate.can_access_network());
    }

    #[test]
    fn policy_deserializes_from_snake_case() {
        let policy: NetworkPolicy = serde_json::from_str("\"unmetered_only\"").unwrap();
        assert_eq!(policy, NetworkPolicy::UnmeteredOnly);
    }
}
