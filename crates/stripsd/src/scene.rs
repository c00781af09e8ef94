//! Scene code to flow trigger dispatch.
//!
//! Delivery is best-effort: each trigger runs in its own task once the host's
//! flow registry is ready. Failures are logged and dropped. There is no retry,
//! no timeout and no ordering between dispatches.

use std::sync::Arc;

use serde_json::Value;
use strum::AsRefStr;
use strum::Display;
use strum::EnumIter;
use strum::EnumString;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::host::FlowTriggerRegistry;

/// Flow trigger cards fired by scene reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum FlowCard {
    /// Slider switched on
    SwitchOn,
    /// Slider switched off
    SwitchOff,
    HighAmbientLightLevel,
    LowAmbientLightLevel,
    HighTemperatureAlarm,
    LowTemperatureAlarm,
}

impl FlowCard {
    pub fn from_scene(scene: i64) -> Option<Self> {
        match scene {
            1 => Some(Self::SwitchOn),
            2 => Some(Self::SwitchOff),
            3 => Some(Self::HighAmbientLightLevel),
            4 => Some(Self::LowAmbientLightLevel),
            5 => Some(Self::HighTemperatureAlarm),
            6 => Some(Self::LowTemperatureAlarm),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct SceneDispatcher {
    flows: Arc<dyn FlowTriggerRegistry>,
}

impl SceneDispatcher {
    pub fn new(flows: Arc<dyn FlowTriggerRegistry>) -> Self {
        Self { flows }
    }

    /// Fire the card for `scene` on behalf of `device`.
    ///
    /// Unknown scene codes are ignored and return `None`. Otherwise the
    /// trigger is spawned and its handle returned; dropping the handle does
    /// not cancel it. Must be called from within a tokio runtime.
    pub fn dispatch(
        &self,
        scene: i64,
        device: &str,
        tokens: Value,
        state: Value,
    ) -> Option<JoinHandle<()>> {
        let Some(card) = FlowCard::from_scene(scene) else {
            debug!(device, scene, "ignoring unmapped scene");
            return None;
        };

        let flows = self.flows.clone();
        let device = device.to_string();
        Some(tokio::spawn(async move {
            flows.ready().await;

            let trigger = match flows.get_trigger(card.as_ref()) {
                Ok(trigger) => trigger,
                Err(e) => {
                    error!(device = %device, %card, "flow trigger unavailable: {}", e);
                    return;
                }
            };

            match trigger.trigger(&device, &tokens, &state).await {
                Ok(()) => info!(device = %device, %card, "flow triggered"),
                Err(e) => error!(device = %device, %card, "flow trigger failed: {}", e),
            }
        }))
    }
}

impl std::fmt::Debug for SceneDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneDispatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::host::memory::MemoryFlows;

    #[test]
    fn test_scene_mapping() {
        assert_eq!(FlowCard::from_scene(1), Some(FlowCard::SwitchOn));
        assert_eq!(FlowCard::from_scene(6), Some(FlowCard::LowTemperatureAlarm));
        assert_eq!(FlowCard::from_scene(0), None);
        assert_eq!(FlowCard::from_scene(7), None);
        assert_eq!(FlowCard::HighAmbientLightLevel.to_string(), "high_ambient_light_level");
    }

    #[tokio::test]
    async fn test_unmapped_scene_is_noop() {
        let flows = Arc::new(MemoryFlows::new());
        flows.mark_ready();
        let dispatcher = SceneDispatcher::new(flows.clone());

        assert!(dispatcher.dispatch(7, "comfort-1", json!({}), json!({})).is_none());
        assert!(flows.fired().await.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_waits_for_readiness() {
        let flows = Arc::new(MemoryFlows::new());
        let dispatcher = SceneDispatcher::new(flows.clone());

        let handle = dispatcher
            .dispatch(3, "comfort-1", json!({ "lux": 400 }), json!({ "source": "slider" }))
            .unwrap();

        tokio::task::yield_now().await;
        assert!(flows.fired().await.is_empty());

        flows.mark_ready();
        handle.await.unwrap();

        let fired = flows.fired().await;
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].card, "high_ambient_light_level");
        assert_eq!(fired[0].device, "comfort-1");
        assert_eq!(fired[0].tokens, json!({ "lux": 400 }));
        assert_eq!(fired[0].state, json!({ "source": "slider" }));
    }

    #[tokio::test]
    async fn test_trigger_failure_is_swallowed() {
        let flows = Arc::new(MemoryFlows::with_failing(&[FlowCard::SwitchOff]));
        flows.mark_ready();
        let dispatcher = SceneDispatcher::new(flows.clone());

        let handle = dispatcher.dispatch(2, "comfort-1", json!({}), json!({})).unwrap();
        handle.await.unwrap();

        assert!(flows.fired().await.is_empty());
    }
}
