//! Capability reconciliation against the host registry.

use serde::Deserialize;
use serde::Serialize;

use crate::capability::CapabilityId;
use crate::capability::CapabilitySet;
use crate::host::CapabilityRegistry;
use crate::host::HostError;
use crate::policy::compute_capabilities;
use crate::settings::Settings;
use crate::variant::DeviceVariant;

/// Hardware facts the transport reports about a node at init.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// The node has a tamper switch
    #[serde(default)]
    pub tamper: bool,
}

/// Desired capabilities: the variant's policy plus hardware-dependent extras.
pub fn desired_capabilities(
    variant: DeviceVariant,
    settings: &Settings,
    node: &NodeInfo,
) -> CapabilitySet {
    let mut desired = compute_capabilities(variant, settings);
    if node.tamper {
        desired.push(CapabilityId::AlarmTamper);
        if settings.maintenance_actions() {
            desired.push(CapabilityId::ResetTamperAlarm);
        }
    }
    desired
}

/// Result of converging a device to its desired capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Newly added by this reconciliation
    pub added: CapabilitySet,
    /// Present before, gone now
    pub removed: CapabilitySet,
    /// Everything present afterwards
    pub present: CapabilitySet,
}

/// Converge `registry` to `desired`.
///
/// Ids in `retained` the device already has are owned by the host and stay,
/// whether desired or not. They are never added.
pub async fn reconcile(
    registry: &dyn CapabilityRegistry,
    desired: &CapabilitySet,
    retained: &[CapabilityId],
) -> Result<Reconciliation, HostError> {
    let before = registry.current().await?;
    let mut target = desired.clone();
    for id in retained.iter().filter(|id| before.contains(id)) {
        target.push(id.clone());
    }
    let added = registry.reconcile(&target).await?;
    let present = registry.current().await?;
    let removed = before.difference(&present);
    Ok(Reconciliation {
        added,
        removed,
        present,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::host::memory::MemoryDevice;

    #[test]
    fn test_tamper_merged_from_hardware() {
        let settings = Settings::from(json!({ "maintenance_actions": true, "report_type": "1" }));
        let with_tamper = desired_capabilities(DeviceVariant::Guard, &settings, &NodeInfo { tamper: true });
        insta::assert_snapshot!(with_tamper, @"alarm_contact, alarm_tamper, button.reset_tamper_alarm");

        let without = desired_capabilities(DeviceVariant::Guard, &settings, &NodeInfo::default());
        insta::assert_snapshot!(without, @"alarm_contact");
    }

    #[test]
    fn test_tamper_button_requires_maintenance_actions() {
        let caps = desired_capabilities(
            DeviceVariant::Comfort,
            &Settings::new(),
            &NodeInfo { tamper: true },
        );
        assert!(caps.contains(&CapabilityId::AlarmTamper));
        assert!(!caps.contains(&CapabilityId::ResetTamperAlarm));
    }

    #[tokio::test]
    async fn test_reconcile_reports_diff() {
        let registry = MemoryDevice::with_capabilities(
            Settings::new(),
            vec![
                CapabilityId::MeasureTemperature,
                CapabilityId::AlarmHeat,
                CapabilityId::ResetHeatAlarm,
            ]
            .into(),
        );
        let desired: CapabilitySet = vec![
            CapabilityId::MeasureTemperature,
            CapabilityId::AlarmHeat,
            CapabilityId::MeasureLuminance,
        ]
        .into();

        let outcome = reconcile(&registry, &desired, &[]).await.unwrap();

        assert_eq!(outcome.added.to_string(), "measure_luminance");
        assert_eq!(outcome.removed.to_string(), "button.reset_heat_alarm");
        assert_eq!(outcome.present, desired);

        let again = reconcile(&registry, &desired, &[]).await.unwrap();
        assert!(again.added.is_empty());
        assert!(again.removed.is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_keeps_retained_host_capabilities() {
        let registry = MemoryDevice::with_capabilities(
            Settings::new(),
            vec![
                CapabilityId::AlarmContact,
                CapabilityId::MeasureBattery,
                CapabilityId::AlarmHeat,
            ]
            .into(),
        );
        let desired: CapabilitySet = vec![CapabilityId::AlarmContact].into();
        let retained = [CapabilityId::MeasureBattery, CapabilityId::AlarmBattery];

        let outcome = reconcile(&registry, &desired, &retained).await.unwrap();

        assert!(outcome.added.is_empty());
        assert_eq!(outcome.removed.to_string(), "alarm_heat");
        insta::assert_snapshot!(outcome.present, @"alarm_contact, measure_battery");
    }
}
