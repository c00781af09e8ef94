//! Per-variant capability policies.
//!
//! Each [`DeviceVariant`] is described by data: an ordered list of capability
//! rules evaluated against the device settings, plus the report interpreters
//! and protocol hooks that apply to it.

use crate::capability::CapabilityId;
use crate::capability::CapabilitySet;
use crate::report::CommandClass;
use crate::report::HumidityTag;
use crate::report::Interpreter;
use crate::report::NotificationKind;
use crate::report::ParseRule;
use crate::settings::ReportType;
use crate::settings::Settings;
use crate::variant::DeviceVariant;

/// Condition a capability rule depends on. All conditions of a rule must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// `maintenance_actions` is enabled
    MaintenanceActions,
    /// `device_type` is anything but the given profile (including unset or
    /// unrecognized values)
    DeviceTypeIsNot(&'static str),
}

impl Condition {
    fn holds(&self, settings: &Settings) -> bool {
        match self {
            Self::MaintenanceActions => settings.maintenance_actions(),
            Self::DeviceTypeIsNot(profile) => settings.device_type() != Some(*profile),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Append,
    /// Always first, regardless of what else is appended
    Prepend,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityRule {
    pub capability: CapabilityId,
    pub when: &'static [Condition],
    pub placement: Placement,
}

impl CapabilityRule {
    fn applies(&self, settings: &Settings) -> bool {
        self.when.iter().all(|c| c.holds(settings))
    }
}

const fn always(capability: CapabilityId) -> CapabilityRule {
    CapabilityRule {
        capability,
        when: &[],
        placement: Placement::Append,
    }
}

const fn when(capability: CapabilityId, when: &'static [Condition]) -> CapabilityRule {
    CapabilityRule {
        capability,
        when,
        placement: Placement::Append,
    }
}

const fn first(capability: CapabilityId) -> CapabilityRule {
    CapabilityRule {
        capability,
        when: &[],
        placement: Placement::Prepend,
    }
}

const MAINTENANCE: &[Condition] = &[Condition::MaintenanceActions];
const NOT_DRIP: &[Condition] = &[Condition::DeviceTypeIsNot("drip")];
const NOT_COMFORT: &[Condition] = &[Condition::DeviceTypeIsNot("comfort")];
const NOT_COMFORT_MAINTENANCE: &[Condition] = &[
    Condition::DeviceTypeIsNot("comfort"),
    Condition::MaintenanceActions,
];

/// How the contact alarm interpreter is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactBinding {
    /// No contact alarm
    None,
    /// Selected by the `report_type` setting
    FromReportType,
    /// Always notification reports
    Notification,
}

#[derive(Debug)]
pub struct VariantPolicy {
    pub variant: DeviceVariant,
    pub rules: &'static [CapabilityRule],
    /// Reinterpret negative luminance readings as unsigned 16-bit values
    pub luminance_unsigned_fix: bool,
    pub humidity_tag: HumidityTag,
    pub contact: ContactBinding,
    /// Central scene reports are routed to flow triggers
    pub scenes: bool,
    /// Configuration reports acknowledge a leakage sensor calibration
    pub calibration_ack: bool,
    /// Light thresholds are clamped on settings updates
    pub light_thresholds: bool,
    /// Battery capabilities the host declares for this variant are kept and
    /// fed from battery reports
    pub battery: bool,
}

/// Capabilities the host declares for battery-reporting variants.
const BATTERY_CAPABILITIES: &[CapabilityId] =
    &[CapabilityId::MeasureBattery, CapabilityId::AlarmBattery];

static COMFORT: VariantPolicy = VariantPolicy {
    variant: DeviceVariant::Comfort,
    rules: &[
        always(CapabilityId::MeasureTemperature),
        always(CapabilityId::AlarmHeat),
        when(CapabilityId::ResetHeatAlarm, MAINTENANCE),
        always(CapabilityId::MeasureLuminance),
        always(CapabilityId::MeasureHumidity),
    ],
    luminance_unsigned_fix: false,
    humidity_tag: HumidityTag::RelativeHumidity,
    contact: ContactBinding::None,
    scenes: true,
    calibration_ack: false,
    light_thresholds: true,
    battery: false,
};

static DRIP: VariantPolicy = VariantPolicy {
    variant: DeviceVariant::Drip,
    rules: &[
        always(CapabilityId::MeasureHumidity),
        always(CapabilityId::AlarmWater),
        when(CapabilityId::ResetWaterAlarm, MAINTENANCE),
        always(CapabilityId::MeasureTemperature),
        always(CapabilityId::AlarmHeat),
        when(CapabilityId::ResetHeatAlarm, MAINTENANCE),
    ],
    luminance_unsigned_fix: false,
    humidity_tag: HumidityTag::Moisture,
    contact: ContactBinding::None,
    scenes: false,
    calibration_ack: true,
    light_thresholds: false,
    battery: false,
};

static GUARD: VariantPolicy = VariantPolicy {
    variant: DeviceVariant::Guard,
    rules: &[first(CapabilityId::AlarmContact)],
    luminance_unsigned_fix: false,
    humidity_tag: HumidityTag::RelativeHumidity,
    contact: ContactBinding::FromReportType,
    scenes: false,
    calibration_ack: false,
    light_thresholds: false,
    battery: true,
};

static GUARD_COMPACT: VariantPolicy = VariantPolicy {
    variant: DeviceVariant::GuardCompact,
    rules: &[first(CapabilityId::AlarmContact)],
    luminance_unsigned_fix: false,
    humidity_tag: HumidityTag::RelativeHumidity,
    contact: ContactBinding::Notification,
    scenes: false,
    calibration_ack: false,
    light_thresholds: false,
    battery: true,
};

static MULTI_SENSOR: VariantPolicy = VariantPolicy {
    variant: DeviceVariant::MultiSensor,
    rules: &[
        always(CapabilityId::MeasureTemperature),
        always(CapabilityId::AlarmHeat),
        when(CapabilityId::ResetHeatAlarm, MAINTENANCE),
        when(CapabilityId::MeasureLuminance, NOT_DRIP),
        when(CapabilityId::MeasureHumidity, NOT_COMFORT),
        when(CapabilityId::AlarmWater, NOT_COMFORT),
        when(CapabilityId::ResetWaterAlarm, NOT_COMFORT_MAINTENANCE),
    ],
    luminance_unsigned_fix: true,
    humidity_tag: HumidityTag::Moisture,
    contact: ContactBinding::None,
    scenes: false,
    calibration_ack: false,
    light_thresholds: false,
    battery: false,
};

impl VariantPolicy {
    pub fn for_variant(variant: DeviceVariant) -> &'static VariantPolicy {
        match variant {
            DeviceVariant::Comfort => &COMFORT,
            DeviceVariant::Drip => &DRIP,
            DeviceVariant::Guard => &GUARD,
            DeviceVariant::GuardCompact => &GUARD_COMPACT,
            DeviceVariant::MultiSensor => &MULTI_SENSOR,
        }
    }

    /// Evaluate the rule table. Prepended capabilities end up first.
    pub fn capabilities(&self, settings: &Settings) -> CapabilitySet {
        let mut set = CapabilitySet::new();
        let mut leading = Vec::new();
        for rule in self.rules.iter().filter(|r| r.applies(settings)) {
            match rule.placement {
                Placement::Append => {
                    set.push(rule.capability.clone());
                }
                Placement::Prepend => leading.push(rule.capability.clone()),
            }
        }
        for capability in leading.into_iter().rev() {
            set.prepend(capability);
        }
        set
    }

    /// Host-declared capabilities reconciliation keeps when already present.
    pub fn retained(&self) -> &'static [CapabilityId] {
        if self.battery {
            BATTERY_CAPABILITIES
        } else {
            &[]
        }
    }

    /// The interpreter for `capability` on this variant, if it has one.
    ///
    /// Buttons have no interpreter. On variants whose contact binding depends
    /// on `report_type`, an invalid value yields `None`.
    pub fn interpreter_for(&self, capability: &CapabilityId, settings: &Settings) -> Option<Interpreter> {
        let (command_class, rule) = match capability {
            CapabilityId::MeasureTemperature => {
                (CommandClass::SensorMultilevel, ParseRule::Temperature)
            }
            CapabilityId::AlarmHeat => (
                CommandClass::Notification,
                ParseRule::Notification(NotificationKind::Heat),
            ),
            CapabilityId::MeasureLuminance => (
                CommandClass::SensorMultilevel,
                ParseRule::Luminance {
                    unsigned_fix: self.luminance_unsigned_fix,
                },
            ),
            CapabilityId::MeasureHumidity => (
                CommandClass::SensorMultilevel,
                ParseRule::Humidity(self.humidity_tag),
            ),
            CapabilityId::AlarmWater => (
                CommandClass::Notification,
                ParseRule::Notification(NotificationKind::Water),
            ),
            CapabilityId::AlarmTamper => (
                CommandClass::Notification,
                ParseRule::Notification(NotificationKind::HomeSecurity),
            ),
            CapabilityId::AlarmContact => match self.contact_report_type(settings)? {
                ReportType::SensorBinary => (CommandClass::SensorBinary, ParseRule::BinarySensor),
                ReportType::Notification => (
                    CommandClass::Notification,
                    ParseRule::Notification(NotificationKind::AccessControl),
                ),
            },
            CapabilityId::MeasureBattery if self.battery => {
                (CommandClass::Battery, ParseRule::BatteryLevel)
            }
            CapabilityId::AlarmBattery if self.battery => {
                (CommandClass::Battery, ParseRule::BatteryLow)
            }
            CapabilityId::MeasureBattery
            | CapabilityId::AlarmBattery
            | CapabilityId::ResetHeatAlarm
            | CapabilityId::ResetWaterAlarm
            | CapabilityId::ResetTamperAlarm
            | CapabilityId::Other(_) => return None,
        };
        Some(Interpreter::new(capability.clone(), command_class, rule))
    }

    fn contact_report_type(&self, settings: &Settings) -> Option<ReportType> {
        match self.contact {
            ContactBinding::None => None,
            ContactBinding::FromReportType => ReportType::from_setting(settings.report_type()),
            ContactBinding::Notification => Some(ReportType::Notification),
        }
    }
}

/// Capabilities `variant` must expose for `settings`.
///
/// Pure: the same variant and settings always produce the same ordered set.
/// Hardware-dependent capabilities (tamper) are merged later by the
/// reconciler.
pub fn compute_capabilities(variant: DeviceVariant, settings: &Settings) -> CapabilitySet {
    VariantPolicy::for_variant(variant).capabilities(settings)
}
