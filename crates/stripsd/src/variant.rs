use serde::Deserialize;
use serde::Serialize;
use strum::AsRefStr;
use strum::Display;
use strum::EnumIter;
use strum::EnumString;

/// Strips product profile.
///
/// Selects the capability rules and report interpreters that apply to a device.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceVariant {
    /// Strips Comfort: temperature, luminance, humidity and scene slider
    Comfort,
    /// Strips Drip: water leak sensor with moisture level
    Drip,
    /// Strips Guard: door/window contact with selectable report type
    Guard,
    /// Strips Guard (700 series): contact always reported as notification
    GuardCompact,
    /// Strips MultiSensor: Comfort and/or Drip profile chosen at pairing
    MultiSensor,
}
