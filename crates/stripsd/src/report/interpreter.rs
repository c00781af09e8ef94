use serde_json::Value;

use super::CommandClass;
use super::RawReport;
use super::SENSOR_VALUE;
use crate::capability::CapabilityId;
use crate::capability::CapabilityValue;

const LUMINANCE_TAG: &str = "Luminance (version 1)";
const TEMPERATURE_TAG: &str = "temperature";

/// Sensor-type tag a product lineage uses for its humidity reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HumidityTag {
    /// Comfort and Guard family
    RelativeHumidity,
    /// Drip and MultiSensor family
    Moisture,
}

impl HumidityTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RelativeHumidity => "Relative humidity (version 2)",
            Self::Moisture => "Moisture (v5)",
        }
    }
}

/// Notification types whose events map natively onto a boolean alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Heat,
    Water,
    AccessControl,
    HomeSecurity,
}

impl NotificationKind {
    pub fn notification_type(&self) -> &'static str {
        match self {
            Self::Heat => "Heat",
            Self::Water => "Water",
            Self::AccessControl => "Access Control",
            Self::HomeSecurity => "Home Security",
        }
    }

    /// Alarm state for an event code of this notification type.
    fn alarm_state(&self, event: i64) -> Option<bool> {
        match (self, event) {
            (_, 0) => Some(false),
            // overheat, underheat
            (Self::Heat, 2 | 6) => Some(true),
            // leak detected (with and without location)
            (Self::Water, 1 | 2) => Some(true),
            // window/door open, closed
            (Self::AccessControl, 22) => Some(true),
            (Self::AccessControl, 23) => Some(false),
            // tampering, cover removed / invalid code
            (Self::HomeSecurity, 3 | 4) => Some(true),
            _ => None,
        }
    }
}

/// How a report is turned into a capability value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseRule {
    /// Multilevel reading passed through unmodified.
    Temperature,
    /// Multilevel reading tagged as luminance.
    ///
    /// With `unsigned_fix`, negative readings are reinterpreted as the unsigned
    /// 16-bit quantity the firmware meant to send.
    Luminance { unsigned_fix: bool },
    /// Multilevel reading tagged with the lineage's humidity tag.
    Humidity(HumidityTag),
    /// Notification events of one type mapped onto an alarm state.
    Notification(NotificationKind),
    /// Native binary sensor value.
    BinarySensor,
    /// Battery percentage. A low battery warning reads as 1%.
    BatteryLevel,
    /// Low battery alarm.
    BatteryLow,
}

impl ParseRule {
    /// Interpret `report`. `None` means the report is not for this capability
    /// and the previous value stays.
    pub fn parse(&self, report: &RawReport) -> Option<CapabilityValue> {
        match self {
            Self::Temperature => {
                // Reports carrying another sensor kind's tag on the shared
                // multilevel channel are not temperatures.
                if let Some(tag) = report.sensor_type() {
                    if !tag.to_ascii_lowercase().contains(TEMPERATURE_TAG) {
                        return None;
                    }
                }
                report.sensor_value().map(CapabilityValue::Number)
            }
            Self::Luminance { unsigned_fix } => {
                if report.sensor_type() != Some(LUMINANCE_TAG) {
                    return None;
                }
                let value = report.sensor_value()?;
                if *unsigned_fix && value < 0.0 {
                    return Some(CapabilityValue::Number(65536.0 + value));
                }
                Some(CapabilityValue::Number(value))
            }
            Self::Humidity(tag) => {
                if report.sensor_type() != Some(tag.as_str()) {
                    return None;
                }
                report.sensor_value().map(CapabilityValue::Number)
            }
            Self::Notification(kind) => {
                if report.notification_type() != Some(kind.notification_type()) {
                    return None;
                }
                kind.alarm_state(report.event()?)
                    .map(CapabilityValue::Bool)
            }
            Self::BinarySensor => binary_sensor_state(report.get(SENSOR_VALUE)?)
                .map(CapabilityValue::Bool),
            Self::BatteryLevel => {
                if report.battery_low() {
                    return Some(CapabilityValue::Number(1.0));
                }
                report
                    .battery_level_raw()
                    .filter(|level| (0..=100).contains(level))
                    .map(|level| CapabilityValue::Number(level as f64))
            }
            Self::BatteryLow => {
                if report.battery_low() {
                    return Some(CapabilityValue::Bool(true));
                }
                report.battery_level_raw().map(|_| CapabilityValue::Bool(false))
            }
        }
    }
}

fn binary_sensor_state(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.starts_with("detected") => Some(true),
        Value::String(s) if s == "idle" => Some(false),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Some(false),
            Some(0xFF) => Some(true),
            _ => None,
        },
        _ => None,
    }
}

/// Binds a capability to the command class it listens on and its parse rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpreter {
    pub capability: CapabilityId,
    pub command_class: CommandClass,
    pub rule: ParseRule,
}

impl Interpreter {
    pub fn new(capability: CapabilityId, command_class: CommandClass, rule: ParseRule) -> Self {
        Self {
            capability,
            command_class,
            rule,
        }
    }

    pub fn interpret(&self, command_class: CommandClass, report: &RawReport) -> Option<CapabilityValue> {
        if command_class != self.command_class {
            return None;
        }
        self.rule.parse(report)
    }
}

/// The interpreters currently live on a device.
///
/// At most one interpreter per capability; activating a capability again
/// replaces its binding. Reports are only routed to active interpreters.
#[derive(Debug, Clone, Default)]
pub struct Interpreters {
    active: Vec<Interpreter>,
}

impl Interpreters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&mut self, interpreter: Interpreter) {
        match self
            .active
            .iter_mut()
            .find(|i| i.capability == interpreter.capability)
        {
            Some(existing) => *existing = interpreter,
            None => self.active.push(interpreter),
        }
    }

    pub fn deactivate(&mut self, capability: &CapabilityId) -> bool {
        let before = self.active.len();
        self.active.retain(|i| i.capability != *capability);
        self.active.len() != before
    }

    pub fn get(&self, capability: &CapabilityId) -> Option<&Interpreter> {
        self.active.iter().find(|i| i.capability == *capability)
    }

    pub fn is_active(&self, capability: &CapabilityId) -> bool {
        self.get(capability).is_some()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Values produced by every active interpreter that matches `report`.
    pub fn interpret(
        &self,
        command_class: CommandClass,
        report: &RawReport,
    ) -> Vec<(CapabilityId, CapabilityValue)> {
        self.active
            .iter()
            .filter_map(|i| {
                i.interpret(command_class, report)
                    .map(|value| (i.capability.clone(), value))
            })
            .collect()
    }
}
