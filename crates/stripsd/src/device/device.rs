use serde::Serialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::DeviceError;
use crate::capability::CapabilityId;
use crate::capability::CapabilitySet;
use crate::capability::CapabilityValue;
use crate::host::HostServices;
use crate::maintenance::AlarmResetRegistry;
use crate::policy::ContactBinding;
use crate::policy::VariantPolicy;
use crate::reconcile::desired_capabilities;
use crate::reconcile::reconcile;
use crate::reconcile::NodeInfo;
use crate::report::CommandClass;
use crate::report::Interpreters;
use crate::report::RawReport;
use crate::scene::SceneDispatcher;
use crate::settings;
use crate::settings::Settings;
use crate::variant::DeviceVariant;

/// Settings whose change alters the capability set.
const CAPABILITY_SETTINGS: &[&str] = &[settings::MAINTENANCE_ACTIONS, settings::DEVICE_TYPE];

/// Configuration parameter the Drip reports once a leakage calibration ran.
const CALIBRATION_PARAMETER: i64 = 23;

/// User-facing message returned from a settings update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettingsMessage {
    pub en: &'static str,
    pub nl: &'static str,
}

impl SettingsMessage {
    pub const NOTIFICATION_TYPE_CHANGED: SettingsMessage = SettingsMessage {
        en: "Notification type changed. In order to ensure continued proper operation, the Strips needs to be woken up manually.",
        nl: "Notificatietype gewijzigd. Voor correct functioneren moet de Strips handmatig wakker gemaakt worden.",
    };
}

impl std::fmt::Display for SettingsMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.en)
    }
}

/// What handling one report did.
#[derive(Debug, Default)]
pub struct ReportOutcome {
    /// Capability values published to the host
    pub updated: Vec<(CapabilityId, CapabilityValue)>,
    /// Flow trigger spawned for a scene report
    pub scene: Option<JoinHandle<()>>,
}

/// One Strips device bound to its host collaborators.
///
/// All mutating operations take `&mut self`; the driver runs them one at a
/// time, so reconciliation and interpreter activation are never observed
/// half-done by a report.
#[derive(Debug)]
pub struct StripsDevice {
    id: String,
    variant: DeviceVariant,
    policy: &'static VariantPolicy,
    node: NodeInfo,
    host: HostServices,
    interpreters: Interpreters,
    resets: AlarmResetRegistry,
    scenes: SceneDispatcher,
}

impl StripsDevice {
    pub fn new(id: impl Into<String>, variant: DeviceVariant, host: HostServices) -> Self {
        let scenes = SceneDispatcher::new(host.flows.clone());
        Self {
            id: id.into(),
            variant,
            policy: VariantPolicy::for_variant(variant),
            node: NodeInfo::default(),
            host,
            interpreters: Interpreters::new(),
            resets: AlarmResetRegistry::default(),
            scenes,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn variant(&self) -> DeviceVariant {
        self.variant
    }

    pub fn interpreters(&self) -> &Interpreters {
        &self.interpreters
    }

    pub fn resets(&self) -> &AlarmResetRegistry {
        &self.resets
    }

    pub fn determine_capability_ids(&self, settings: &Settings) -> CapabilitySet {
        desired_capabilities(self.variant, settings, &self.node)
    }

    /// Bring the device's capabilities in line with its stored settings and
    /// activate interpreters for every capability present afterwards.
    pub async fn on_init(&mut self, node: NodeInfo) -> Result<(), DeviceError> {
        self.node = node;
        let settings = self.host.settings.get().await?;
        self.register_capabilities(&settings, true).await?;
        info!(
            device = %self.id,
            variant = %self.variant,
            interpreters = self.interpreters.len(),
            "device initialized"
        );
        Ok(())
    }

    /// Store a partial settings update and react to it.
    ///
    /// The update is stored whenever it differs from the stored settings.
    /// Without explicit `changed_keys` the keys whose stored value differs are
    /// reported to `on_settings`. If the device fails to handle the update,
    /// every stored key is put back the way it was before, including keys the
    /// device itself wrote while handling it.
    pub async fn apply_settings(
        &mut self,
        partial: Settings,
        changed_keys: Option<Vec<String>>,
    ) -> Result<Option<SettingsMessage>, DeviceError> {
        let old = self.host.settings.get().await?;
        let mut new = old.clone();
        new.merge(&partial);
        let stored_diff = old.changed_keys(&new);
        let changed = changed_keys.unwrap_or_else(|| stored_diff.clone());
        if stored_diff.is_empty() && changed.is_empty() {
            debug!(device = %self.id, "settings unchanged");
            return Ok(None);
        }

        self.host.settings.set(partial).await?;
        match self.on_settings(&old, &new, &changed).await {
            Ok(message) => Ok(message),
            Err(e) => {
                if let Err(rollback_err) = self.restore_settings(&old).await {
                    error!(device = %self.id, "failed to roll back settings: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    /// Put the stored settings back to `previous`.
    async fn restore_settings(&self, previous: &Settings) -> Result<(), DeviceError> {
        let current = self.host.settings.get().await?;
        let touched = previous.changed_keys(&current);
        if touched.is_empty() {
            return Ok(());
        }

        let (restore, absent): (Vec<String>, Vec<String>) = touched
            .into_iter()
            .partition(|key| previous.get(key).is_some());
        debug!(device = %self.id, ?restore, ?absent, "rolling back settings");
        if !restore.is_empty() {
            self.host.settings.set(previous.subset(&restore)).await?;
        }
        if !absent.is_empty() {
            self.host.settings.unset(&absent).await?;
        }
        Ok(())
    }

    /// React to a settings update. `new` is the full settings after the
    /// update; `changed_keys` lists what the user changed.
    ///
    /// Returns a message for the user when the change needs manual follow-up.
    pub async fn on_settings(
        &mut self,
        old: &Settings,
        new: &Settings,
        changed_keys: &[String],
    ) -> Result<Option<SettingsMessage>, DeviceError> {
        for key in changed_keys {
            debug!(
                device = %self.id,
                key = %key,
                from = ?old.get(key),
                to = ?new.get(key),
                "setting changed"
            );
        }

        if changed_keys
            .iter()
            .any(|k| CAPABILITY_SETTINGS.contains(&k.as_str()))
        {
            self.register_capabilities(new, false).await?;
        }

        let mut current = new.clone();
        if self.policy.light_thresholds {
            let normalized = current.normalized_light_thresholds();
            if !normalized.is_empty() {
                debug!(device = %self.id, ?normalized, "clamping light thresholds");
                self.host.settings.set(normalized.clone()).await?;
                current.merge(&normalized);
            }
        }

        if self.policy.contact == ContactBinding::FromReportType
            && changed_keys.iter().any(|k| k == settings::REPORT_TYPE)
        {
            self.activate(&CapabilityId::AlarmContact, &current);
            return Ok(Some(SettingsMessage::NOTIFICATION_TYPE_CHANGED));
        }

        Ok(None)
    }

    async fn register_capabilities(
        &mut self,
        settings: &Settings,
        initializing: bool,
    ) -> Result<(), DeviceError> {
        let desired = self.determine_capability_ids(settings);
        let outcome = reconcile(
            self.host.capabilities.as_ref(),
            &desired,
            self.policy.retained(),
        )
        .await?;
        debug!(
            device = %self.id,
            added = %outcome.added,
            removed = %outcome.removed,
            "capabilities reconciled"
        );

        for capability in &outcome.removed {
            self.interpreters.deactivate(capability);
        }

        // On a cold start nothing is "added" relative to the last session, so
        // everything present needs an interpreter.
        let activate = if initializing {
            &outcome.present
        } else {
            &outcome.added
        };
        for capability in activate {
            self.activate(capability, settings);
        }

        self.resets = AlarmResetRegistry::from_capabilities(&outcome.present);
        self.host
            .maintenance
            .register_actions(&self.resets.buttons())
            .await?;

        Ok(())
    }

    fn activate(&mut self, capability: &CapabilityId, settings: &Settings) {
        match self.policy.interpreter_for(capability, settings) {
            Some(interpreter) => {
                debug!(
                    device = %self.id,
                    capability = %capability,
                    command_class = %interpreter.command_class,
                    "interpreter active"
                );
                self.interpreters.activate(interpreter);
            }
            None if *capability == CapabilityId::AlarmContact => {
                warn!(
                    device = %self.id,
                    report_type = ?settings.report_type(),
                    "no valid notification type set"
                );
            }
            None => {}
        }
    }

    /// Route a transport report through the active interpreters.
    ///
    /// Reports no active interpreter claims are dropped.
    pub async fn handle_report(
        &self,
        command_class: CommandClass,
        report: &RawReport,
    ) -> Result<ReportOutcome, DeviceError> {
        match command_class {
            CommandClass::Configuration if self.policy.calibration_ack => {
                self.handle_configuration_report(report).await?;
                return Ok(ReportOutcome::default());
            }
            CommandClass::CentralScene if self.policy.scenes => {
                let scene = report
                    .scene_number()
                    .and_then(|scene| self.handle_scene(scene));
                return Ok(ReportOutcome {
                    updated: Vec::new(),
                    scene,
                });
            }
            _ => {}
        }

        let updated = self.interpreters.interpret(command_class, report);
        if updated.is_empty() {
            debug!(device = %self.id, %command_class, "report not applicable");
        }
        for (capability, value) in &updated {
            debug!(device = %self.id, capability = %capability, %value, "capability updated");
            self.host
                .capabilities
                .set_value(capability, *value)
                .await?;
        }

        Ok(ReportOutcome {
            updated,
            scene: None,
        })
    }

    async fn handle_configuration_report(&self, report: &RawReport) -> Result<(), DeviceError> {
        if report.parameter_number() != Some(CALIBRATION_PARAMETER) {
            return Ok(());
        }

        let mut partial = Settings::new();
        partial.insert(settings::LEAKAGE_SENSOR_CALIBRATION, "0");
        self.host.settings.set(partial).await?;
        info!(device = %self.id, "leakage sensor calibration done");
        Ok(())
    }

    /// Fire the flow card mapped to `scene`, once the host is ready.
    pub fn handle_scene(&self, scene: i64) -> Option<JoinHandle<()>> {
        self.scenes.dispatch(scene, &self.id, json!({}), json!({}))
    }

    /// Run the reset bound to a maintenance button.
    pub async fn run_maintenance_action(&self, button: &CapabilityId) -> Result<(), DeviceError> {
        let action = self
            .resets
            .get(button)
            .ok_or_else(|| DeviceError::UnknownAction(button.clone()))?;
        action.run(self.host.capabilities.as_ref()).await?;
        info!(device = %self.id, button = %button, alarm = %action.alarm, "alarm reset");
        Ok(())
    }
}
