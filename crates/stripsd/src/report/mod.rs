//! Inbound transport reports and their interpretation.
//!
//! Reports arrive as loosely typed key/value payloads whose shape depends on
//! the command class that produced them. Field names follow the transport's
//! human-readable labels (e.g. `"Sensor Value (Parsed)"`).

mod interpreter;

#[cfg(test)]
mod tests;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use strum::AsRefStr;
use strum::Display;
use strum::EnumString;

pub use interpreter::HumidityTag;
pub use interpreter::Interpreter;
pub use interpreter::Interpreters;
pub use interpreter::NotificationKind;
pub use interpreter::ParseRule;

pub const SENSOR_TYPE: &str = "Sensor Type";
pub const SENSOR_VALUE_PARSED: &str = "Sensor Value (Parsed)";
pub const SENSOR_VALUE: &str = "Sensor Value";
pub const NOTIFICATION_TYPE: &str = "Notification Type";
pub const EVENT: &str = "Event";
pub const PARAMETER_NUMBER: &str = "Parameter Number";
pub const SCENE_NUMBER: &str = "Scene Number";
pub const BATTERY_LEVEL: &str = "Battery Level";
pub const BATTERY_LEVEL_RAW: &str = "Battery Level (Raw)";

/// Raw battery level the device sends instead of a percentage when low.
const BATTERY_LOW_RAW: i64 = 0xFF;
const BATTERY_LOW_WARNING: &str = "battery low warning";

/// Command classes the Strips devices report on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandClass {
    SensorMultilevel,
    Notification,
    SensorBinary,
    Configuration,
    CentralScene,
    Battery,
}

/// A single report payload as delivered by the transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawReport(Map<String, Value>);

impl RawReport {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Integral numbers, including floats without a fractional part (`2.0`).
    pub fn i64(&self, key: &str) -> Option<i64> {
        let value = self.get(key)?;
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        })
    }

    pub fn sensor_type(&self) -> Option<&str> {
        self.str(SENSOR_TYPE)
    }

    /// The multilevel sensor reading after scale/precision decoding.
    pub fn sensor_value(&self) -> Option<f64> {
        self.f64(SENSOR_VALUE_PARSED)
    }

    pub fn notification_type(&self) -> Option<&str> {
        self.str(NOTIFICATION_TYPE)
    }

    pub fn event(&self) -> Option<i64> {
        self.i64(EVENT)
    }

    pub fn parameter_number(&self) -> Option<i64> {
        self.i64(PARAMETER_NUMBER)
    }

    pub fn scene_number(&self) -> Option<i64> {
        self.i64(SCENE_NUMBER)
    }

    /// Raw battery byte, sent either as a number or a one-byte buffer.
    pub fn battery_level_raw(&self) -> Option<i64> {
        match self.get(BATTERY_LEVEL_RAW)? {
            Value::Array(bytes) => bytes.first().and_then(Value::as_i64),
            _ => self.i64(BATTERY_LEVEL_RAW),
        }
    }

    /// The device flagged its battery as low.
    pub fn battery_low(&self) -> bool {
        self.str(BATTERY_LEVEL) == Some(BATTERY_LOW_WARNING)
            || self.battery_level_raw() == Some(BATTERY_LOW_RAW)
    }
}

impl From<Map<String, Value>> for RawReport {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Non-object payloads become an empty report, which no interpreter matches.
impl From<Value> for RawReport {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}
