//! In-memory authorization sessions.

use std::collections::HashMap;
use std::sync::Mutex;

use groupvault_core::Identity;
use groupvault_providers::google::DeviceFlow;

/// Owner of the in-flight device flows, keyed by identity.
///
/// Flows are deliberately not persisted: a device code is short-lived
/// and a restart simply requires the user to run `/link` again.
#[derive(Debug, Default)]
pub struct SessionCoordinator {
    flows: Mutex<HashMap<Identity, DeviceFlow>>,
}

impl SessionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a flow for an identity, superseding any previous one.
    ///
    /// The orphaned device code expires on the provider side; nothing
    /// to clean up locally.
    pub fn insert(&self, identity: Identity, flow: DeviceFlow) {
        self.flows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(identity, flow);
    }

    /// Returns a copy of the identity's current flow.
    pub fn current(&self, identity: Identity) -> Option<DeviceFlow> {
        self.flows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&identity)
            .cloned()
    }

    /// Removes the identity's flow.
    pub fn remove(&self, identity: Identity) {
        self.flows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&identity);
    }
}
