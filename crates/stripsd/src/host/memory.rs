//! In-memory host used by the daemon and by tests.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use strum::IntoEnumIterator;
use tokio::sync::watch;
use tokio::sync::Mutex;
use tracing::info;

use super::CapabilityRegistry;
use super::FlowTrigger;
use super::FlowTriggerRegistry;
use super::HostError;
use super::MaintenanceActionRegistry;
use super::SettingsStore;
use crate::capability::CapabilityId;
use crate::capability::CapabilitySet;
use crate::capability::CapabilityValue;
use crate::scene::FlowCard;
use crate::settings::Settings;

#[derive(Debug, Default)]
struct DeviceState {
    capabilities: CapabilitySet,
    values: HashMap<CapabilityId, CapabilityValue>,
    settings: Settings,
    actions: CapabilitySet,
    /// Capabilities the registry refuses to add
    rejected: HashSet<CapabilityId>,
}

/// Capability registry, settings store and maintenance-action registry for
/// a single device.
#[derive(Debug, Default)]
pub struct MemoryDevice {
    state: Mutex<DeviceState>,
}

impl MemoryDevice {
    pub fn new(settings: Settings) -> Self {
        Self::with_capabilities(settings, CapabilitySet::new())
    }

    /// A device that already carries `capabilities`, as after a restart.
    pub fn with_capabilities(settings: Settings, capabilities: CapabilitySet) -> Self {
        Self {
            state: Mutex::new(DeviceState {
                capabilities,
                settings,
                ..Default::default()
            }),
        }
    }

    /// Make every later attempt to add `capability` fail.
    pub async fn reject(&self, capability: CapabilityId) {
        self.state.lock().await.rejected.insert(capability);
    }

    pub async fn capabilities(&self) -> CapabilitySet {
        self.state.lock().await.capabilities.clone()
    }

    pub async fn value(&self, capability: &CapabilityId) -> Option<CapabilityValue> {
        self.state.lock().await.values.get(capability).copied()
    }

    pub async fn settings(&self) -> Settings {
        self.state.lock().await.settings.clone()
    }

    pub async fn registered_actions(&self) -> CapabilitySet {
        self.state.lock().await.actions.clone()
    }

    /// Capabilities with their current values, in capability order.
    pub async fn snapshot(&self) -> Value {
        let state = self.state.lock().await;
        let mut map = serde_json::Map::new();
        for id in &state.capabilities {
            let value = state
                .values
                .get(id)
                .map(|v| serde_json::to_value(v).unwrap_or(Value::Null))
                .unwrap_or(Value::Null);
            map.insert(id.to_string(), value);
        }
        Value::Object(map)
    }
}

#[async_trait]
impl CapabilityRegistry for MemoryDevice {
    async fn current(&self) -> Result<CapabilitySet, HostError> {
        Ok(self.state.lock().await.capabilities.clone())
    }

    async fn reconcile(&self, desired: &CapabilitySet) -> Result<CapabilitySet, HostError> {
        let mut state = self.state.lock().await;

        let added = desired.difference(&state.capabilities);
        if let Some(capability) = added.iter().find(|c| state.rejected.contains(*c)) {
            return Err(HostError::AddCapability {
                capability: capability.clone(),
                reason: "rejected by registry".to_string(),
            });
        }

        for removed in state.capabilities.difference(desired).iter() {
            state.values.remove(removed);
        }
        state.capabilities = desired.clone();

        Ok(added)
    }

    async fn set_value(
        &self,
        capability: &CapabilityId,
        value: CapabilityValue,
    ) -> Result<(), HostError> {
        let mut state = self.state.lock().await;
        if !state.capabilities.contains(capability) {
            return Err(HostError::MissingCapability(capability.clone()));
        }
        state.values.insert(capability.clone(), value);
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemoryDevice {
    async fn get(&self) -> Result<Settings, HostError> {
        Ok(self.state.lock().await.settings.clone())
    }

    async fn set(&self, partial: Settings) -> Result<(), HostError> {
        self.state.lock().await.settings.merge(&partial);
        Ok(())
    }

    async fn unset(&self, keys: &[String]) -> Result<(), HostError> {
        let mut state = self.state.lock().await;
        for key in keys {
            state.settings.remove(key);
        }
        Ok(())
    }
}

#[async_trait]
impl MaintenanceActionRegistry for MemoryDevice {
    async fn register_actions(&self, buttons: &CapabilitySet) -> Result<(), HostError> {
        self.state.lock().await.actions = buttons.clone();
        Ok(())
    }
}

/// A flow trigger call recorded by [`MemoryFlows`].
#[derive(Debug, Clone, PartialEq)]
pub struct FiredTrigger {
    pub card: String,
    pub device: String,
    pub tokens: Value,
    pub state: Value,
}

#[derive(Debug)]
struct RecordingTrigger {
    card: String,
    fired: Arc<Mutex<Vec<FiredTrigger>>>,
    failing: bool,
}

#[async_trait]
impl FlowTrigger for RecordingTrigger {
    async fn trigger(&self, device: &str, tokens: &Value, state: &Value) -> Result<(), HostError> {
        if self.failing {
            return Err(HostError::Trigger {
                card: self.card.clone(),
                reason: "card disabled".to_string(),
            });
        }
        info!(card = %self.card, device, "flow card fired");
        self.fired.lock().await.push(FiredTrigger {
            card: self.card.clone(),
            device: device.to_string(),
            tokens: tokens.clone(),
            state: state.clone(),
        });
        Ok(())
    }
}

/// Flow-trigger registry holding one recording card per [`FlowCard`].
///
/// Not ready until [`MemoryFlows::mark_ready`] is called.
#[derive(Debug)]
pub struct MemoryFlows {
    ready: watch::Sender<bool>,
    cards: HashMap<String, Arc<RecordingTrigger>>,
    fired: Arc<Mutex<Vec<FiredTrigger>>>,
}

impl MemoryFlows {
    pub fn new() -> Self {
        Self::with_failing(&[])
    }

    /// Registry whose `failing` cards reject every trigger.
    pub fn with_failing(failing: &[FlowCard]) -> Self {
        let (ready, _) = watch::channel(false);
        let fired = Arc::new(Mutex::new(Vec::new()));
        let cards = FlowCard::iter()
            .map(|card| {
                let name = card.to_string();
                let trigger = Arc::new(RecordingTrigger {
                    card: name.clone(),
                    fired: fired.clone(),
                    failing: failing.contains(&card),
                });
                (name, trigger)
            })
            .collect();
        Self {
            ready,
            cards,
            fired,
        }
    }

    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    pub async fn fired(&self) -> Vec<FiredTrigger> {
        self.fired.lock().await.clone()
    }
}

impl Default for MemoryFlows {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FlowTriggerRegistry for MemoryFlows {
    async fn ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives as long as `self`, so this only returns once ready.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    fn get_trigger(&self, name: &str) -> Result<Arc<dyn FlowTrigger>, HostError> {
        self.cards
            .get(name)
            .map(|card| card.clone() as Arc<dyn FlowTrigger>)
            .ok_or_else(|| HostError::UnknownTrigger(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_reconcile_adds_and_removes() {
        let device = MemoryDevice::with_capabilities(
            Settings::new(),
            vec![CapabilityId::AlarmHeat, CapabilityId::Other("measure_power".into())].into(),
        );
        device
            .set_value(&CapabilityId::AlarmHeat, CapabilityValue::Bool(true))
            .await
            .unwrap();

        let desired: CapabilitySet =
            vec![CapabilityId::MeasureTemperature, CapabilityId::AlarmHeat].into();
        let added = device.reconcile(&desired).await.unwrap();

        assert_eq!(added.to_string(), "measure_temperature");
        assert_eq!(device.capabilities().await, desired);
        assert_eq!(
            device.value(&CapabilityId::AlarmHeat).await,
            Some(CapabilityValue::Bool(true))
        );
    }

    #[tokio::test]
    async fn test_reconcile_rejection_leaves_state_untouched() {
        let device = MemoryDevice::new(Settings::new());
        device.reject(CapabilityId::AlarmWater).await;

        let desired: CapabilitySet =
            vec![CapabilityId::MeasureHumidity, CapabilityId::AlarmWater].into();
        let err = device.reconcile(&desired).await.unwrap_err();

        assert!(matches!(err, HostError::AddCapability { .. }));
        assert!(device.capabilities().await.is_empty());
    }

    #[tokio::test]
    async fn test_set_value_on_missing_capability() {
        let device = MemoryDevice::new(Settings::new());
        let err = device
            .set_value(&CapabilityId::AlarmWater, CapabilityValue::Bool(false))
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::MissingCapability(CapabilityId::AlarmWater)));
    }

    #[tokio::test]
    async fn test_settings_merge() {
        let device = MemoryDevice::new(Settings::from(json!({ "report_type": "0", "led_indication": true })));
        device
            .set(Settings::from(json!({ "report_type": "1" })))
            .await
            .unwrap();
        assert_eq!(
            device.settings().await,
            Settings::from(json!({ "report_type": "1", "led_indication": true }))
        );

        device
            .unset(&["led_indication".to_string(), "wake_interval".to_string()])
            .await
            .unwrap();
        assert_eq!(
            device.settings().await,
            Settings::from(json!({ "report_type": "1" }))
        );
    }

    #[tokio::test]
    async fn test_flows_unknown_card() {
        let flows = MemoryFlows::new();
        assert!(matches!(
            flows.get_trigger("doorbell_pressed"),
            Err(HostError::UnknownTrigger(_))
        ));
        assert!(flows.get_trigger("switch_on").is_ok());
    }

    #[tokio::test]
    async fn test_flows_ready_gate() {
        let flows = Arc::new(MemoryFlows::new());
        assert!(!flows.is_ready());

        let waiter = {
            let flows = flows.clone();
            tokio::spawn(async move { flows.ready().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        flows.mark_ready();
        waiter.await.unwrap();
        assert!(flows.is_ready());
    }
}
