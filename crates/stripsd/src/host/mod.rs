//! Host platform collaborators.
//!
//! The capability registry, settings store, maintenance-action registry and
//! flow-trigger registry belong to the host. Devices only see them through
//! these traits, which keeps them replaceable by the in-memory host in tests
//! and in the daemon.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::capability::CapabilityId;
use crate::capability::CapabilitySet;
use crate::capability::CapabilityValue;
use crate::settings::Settings;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("failed to add capability {capability}: {reason}")]
    AddCapability {
        capability: CapabilityId,
        reason: String,
    },

    #[error("failed to remove capability {capability}: {reason}")]
    RemoveCapability {
        capability: CapabilityId,
        reason: String,
    },

    #[error("capability {0} is not present on the device")]
    MissingCapability(CapabilityId),

    #[error("settings store error: {0}")]
    Settings(String),

    #[error("flow trigger card not found: {0}")]
    UnknownTrigger(String),

    #[error("flow trigger {card} failed: {reason}")]
    Trigger { card: String, reason: String },
}

/// The host's registry of capabilities for one device.
#[async_trait]
pub trait CapabilityRegistry: Send + Sync {
    /// Capabilities currently present on the device
    async fn current(&self) -> Result<CapabilitySet, HostError>;

    /// Converge the device's capabilities to `desired`.
    ///
    /// Missing capabilities are added and extraneous ones removed. Returns
    /// exactly the ids added by this call.
    async fn reconcile(&self, desired: &CapabilitySet) -> Result<CapabilitySet, HostError>;

    /// Publish a new value for a present capability
    async fn set_value(
        &self,
        capability: &CapabilityId,
        value: CapabilityValue,
    ) -> Result<(), HostError>;
}

/// The host's persisted settings for one device.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self) -> Result<Settings, HostError>;

    /// Overwrite the keys present in `partial`
    async fn set(&self, partial: Settings) -> Result<(), HostError>;

    /// Delete `keys`. Missing keys are ignored.
    async fn unset(&self, keys: &[String]) -> Result<(), HostError>;
}

/// The host's registry of user-invocable maintenance actions for one device.
#[async_trait]
pub trait MaintenanceActionRegistry: Send + Sync {
    /// Replace the set of maintenance buttons offered to the user
    async fn register_actions(&self, buttons: &CapabilitySet) -> Result<(), HostError>;
}

/// A named flow trigger card.
#[async_trait]
pub trait FlowTrigger: Send + Sync {
    async fn trigger(&self, device: &str, tokens: &Value, state: &Value) -> Result<(), HostError>;
}

/// The host's flow-trigger registry, shared by all devices of a driver.
#[async_trait]
pub trait FlowTriggerRegistry: Send + Sync {
    /// Resolves once the registry can be used. Cards must not be looked up
    /// before this completes.
    async fn ready(&self);

    fn get_trigger(&self, name: &str) -> Result<Arc<dyn FlowTrigger>, HostError>;
}

/// Handles to every host collaborator a device talks to.
#[derive(Clone)]
pub struct HostServices {
    pub capabilities: Arc<dyn CapabilityRegistry>,
    pub settings: Arc<dyn SettingsStore>,
    pub maintenance: Arc<dyn MaintenanceActionRegistry>,
    pub flows: Arc<dyn FlowTriggerRegistry>,
}

impl HostServices {
    /// Services backed by one in-memory device and a shared flow registry.
    pub fn in_memory(device: Arc<memory::MemoryDevice>, flows: Arc<memory::MemoryFlows>) -> Self {
        Self {
            capabilities: device.clone(),
            settings: device.clone(),
            maintenance: device,
            flows,
        }
    }
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices").finish_non_exhaustive()
    }
}
