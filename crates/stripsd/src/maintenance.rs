//! Maintenance buttons that clear latched alarms.
//!
//! Resets are optimistic. They set the alarm to `false` without checking the
//! physical condition; a device that still sees the hazard re-reports it.

use crate::capability::CapabilityId;
use crate::capability::CapabilitySet;
use crate::capability::CapabilityValue;
use crate::host::CapabilityRegistry;
use crate::host::HostError;

/// The alarm a maintenance button clears.
pub fn reset_target(button: &CapabilityId) -> Option<CapabilityId> {
    match button {
        CapabilityId::ResetHeatAlarm => Some(CapabilityId::AlarmHeat),
        CapabilityId::ResetWaterAlarm => Some(CapabilityId::AlarmWater),
        CapabilityId::ResetTamperAlarm => Some(CapabilityId::AlarmTamper),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetAction {
    pub button: CapabilityId,
    pub alarm: CapabilityId,
}

impl ResetAction {
    pub async fn run(&self, registry: &dyn CapabilityRegistry) -> Result<(), HostError> {
        registry
            .set_value(&self.alarm, CapabilityValue::Bool(false))
            .await
    }
}

/// Reset actions for the buttons present on a device.
#[derive(Debug, Clone, Default)]
pub struct AlarmResetRegistry {
    actions: Vec<ResetAction>,
}

impl AlarmResetRegistry {
    /// One action per maintenance button in `capabilities`.
    pub fn from_capabilities(capabilities: &CapabilitySet) -> Self {
        let actions = capabilities
            .iter()
            .filter_map(|button| {
                reset_target(button).map(|alarm| ResetAction {
                    button: button.clone(),
                    alarm,
                })
            })
            .collect();
        Self { actions }
    }

    pub fn get(&self, button: &CapabilityId) -> Option<&ResetAction> {
        self.actions.iter().find(|a| a.button == *button)
    }

    pub fn buttons(&self) -> CapabilitySet {
        self.actions.iter().map(|a| a.button.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
