//! Persisted per-device settings.
//!
//! Settings are a loosely typed key/value map owned by the host's settings
//! store. Accessors here follow the host's truthiness rules so that a setting
//! stored as `1` or `"true"` behaves the same as `true`.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

pub const MAINTENANCE_ACTIONS: &str = "maintenance_actions";
pub const DEVICE_TYPE: &str = "device_type";
pub const REPORT_TYPE: &str = "report_type";
pub const LIGHT_HIGH: &str = "light_high";
pub const LIGHT_LOW: &str = "light_low";
pub const LEAKAGE_SENSOR_CALIBRATION: &str = "leakage_sensor_calibration";
/// Guard status LED. Stored for the device, no capability effect.
pub const LED_INDICATION: &str = "led_indication";

/// Smallest non-zero high ambient light threshold the device accepts.
pub const LIGHT_HIGH_MINIMUM: u64 = 20;
/// Smallest non-zero low ambient light threshold the device accepts.
pub const LIGHT_LOW_MINIMUM: u64 = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(Map<String, Value>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overwrite keys present in `partial`, leaving the rest untouched.
    pub fn merge(&mut self, partial: &Settings) {
        for (key, value) in &partial.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Keys whose value differs between `self` and `other` (including keys
    /// present on only one side), sorted.
    pub fn changed_keys(&self, other: &Settings) -> Vec<String> {
        let mut keys: Vec<String> = self
            .0
            .keys()
            .chain(other.0.keys())
            .filter(|key| self.0.get(*key) != other.0.get(*key))
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Subset of `self` restricted to `keys`. Missing keys are skipped.
    pub fn subset<S: AsRef<str>>(&self, keys: &[S]) -> Settings {
        let mut out = Settings::new();
        for key in keys {
            if let Some(value) = self.0.get(key.as_ref()) {
                out.insert(key.as_ref(), value.clone());
            }
        }
        out
    }

    pub fn maintenance_actions(&self) -> bool {
        self.get(MAINTENANCE_ACTIONS).is_some_and(is_truthy)
    }

    pub fn device_type(&self) -> Option<&str> {
        self.get(DEVICE_TYPE).and_then(Value::as_str)
    }

    pub fn report_type(&self) -> Option<&Value> {
        self.get(REPORT_TYPE)
    }

    pub fn led_indication(&self) -> bool {
        self.get(LED_INDICATION).is_some_and(is_truthy)
    }

    pub fn leakage_sensor_calibration(&self) -> Option<&str> {
        self.get(LEAKAGE_SENSOR_CALIBRATION).and_then(Value::as_str)
    }

    /// Light thresholds after applying the device's clamping rules.
    ///
    /// Returns only the keys whose stored value must change.
    pub fn normalized_light_thresholds(&self) -> Settings {
        let mut out = Settings::new();
        for (key, minimum) in [(LIGHT_HIGH, LIGHT_HIGH_MINIMUM), (LIGHT_LOW, LIGHT_LOW_MINIMUM)] {
            if let Some(value) = self.get(key) {
                let normalized = normalize_light_threshold(value, minimum);
                if normalized != *value {
                    out.insert(key, normalized);
                }
            }
        }
        out
    }
}

impl From<Map<String, Value>> for Settings {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Non-object JSON values yield empty settings.
impl From<Value> for Settings {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

/// Clamp a light threshold setting.
///
/// `true` disables the threshold (stored as `0`). Values in `(0, minimum]`
/// are raised to `minimum`. Everything else is kept as-is, including negative
/// values and values above `minimum`.
pub fn normalize_light_threshold(value: &Value, minimum: u64) -> Value {
    match value {
        Value::Bool(true) => Value::from(0u64),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v > 0.0 && v <= minimum as f64 => Value::from(minimum),
            _ => value.clone(),
        },
        _ => value.clone(),
    }
}

/// Wire representation selected for the Guard contact alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    /// `"0"`: binary sensor reports
    SensorBinary,
    /// `"1"`: notification reports
    Notification,
}

impl ReportType {
    /// Parse the stored `report_type` setting. Only the strings `"0"` and `"1"`
    /// are valid.
    pub fn from_setting(value: Option<&Value>) -> Option<Self> {
        match value.and_then(Value::as_str) {
            Some("0") => Some(Self::SensorBinary),
            Some("1") => Some(Self::Notification),
            _ => None,
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
