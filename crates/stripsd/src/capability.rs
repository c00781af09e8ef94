use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Capability identifiers exposed by the Strips drivers.
///
/// The host may carry capabilities these drivers do not manage (left over from
/// an older driver version, for example). Those are kept as `Other` so that
/// reconciliation can still remove them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CapabilityId {
    MeasureTemperature,
    AlarmHeat,
    MeasureLuminance,
    MeasureHumidity,
    AlarmWater,
    AlarmContact,
    AlarmTamper,
    MeasureBattery,
    AlarmBattery,
    ResetHeatAlarm,
    ResetWaterAlarm,
    ResetTamperAlarm,
    /// A capability not known to these drivers
    Other(String),
}

impl CapabilityId {
    pub fn as_str(&self) -> &str {
        match self {
            Self::MeasureTemperature => "measure_temperature",
            Self::AlarmHeat => "alarm_heat",
            Self::MeasureLuminance => "measure_luminance",
            Self::MeasureHumidity => "measure_humidity",
            Self::AlarmWater => "alarm_water",
            Self::AlarmContact => "alarm_contact",
            Self::AlarmTamper => "alarm_tamper",
            Self::MeasureBattery => "measure_battery",
            Self::AlarmBattery => "alarm_battery",
            Self::ResetHeatAlarm => "button.reset_heat_alarm",
            Self::ResetWaterAlarm => "button.reset_water_alarm",
            Self::ResetTamperAlarm => "button.reset_tamper_alarm",
            Self::Other(s) => s,
        }
    }

    /// Maintenance buttons are the `button.*` capabilities.
    pub fn is_button(&self) -> bool {
        self.as_str().starts_with("button.")
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for CapabilityId {
    fn from(s: &str) -> Self {
        match s {
            "measure_temperature" => Self::MeasureTemperature,
            "alarm_heat" => Self::AlarmHeat,
            "measure_luminance" => Self::MeasureLuminance,
            "measure_humidity" => Self::MeasureHumidity,
            "alarm_water" => Self::AlarmWater,
            "alarm_contact" => Self::AlarmContact,
            "alarm_tamper" => Self::AlarmTamper,
            "measure_battery" => Self::MeasureBattery,
            "alarm_battery" => Self::AlarmBattery,
            "button.reset_heat_alarm" => Self::ResetHeatAlarm,
            "button.reset_water_alarm" => Self::ResetWaterAlarm,
            "button.reset_tamper_alarm" => Self::ResetTamperAlarm,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for CapabilityId {
    fn from(s: String) -> Self {
        match Self::from(s.as_str()) {
            Self::Other(_) => Self::Other(s),
            known => known,
        }
    }
}

impl From<CapabilityId> for String {
    fn from(id: CapabilityId) -> Self {
        match id {
            CapabilityId::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

/// Ordered set of capability ids.
///
/// Order only matters for presentation in the host UI. Inserting an id that is
/// already present is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CapabilityId>", into = "Vec<CapabilityId>")]
pub struct CapabilitySet(Vec<CapabilityId>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` unless it is already present. Returns whether it was inserted.
    pub fn push(&mut self, id: CapabilityId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.0.push(id);
        true
    }

    /// Place `id` first, moving it there if it is already present.
    pub fn prepend(&mut self, id: CapabilityId) {
        self.0.retain(|existing| *existing != id);
        self.0.insert(0, id);
    }

    pub fn remove(&mut self, id: &CapabilityId) -> bool {
        let before = self.0.len();
        self.0.retain(|existing| existing != id);
        self.0.len() != before
    }

    pub fn contains(&self, id: &CapabilityId) -> bool {
        self.0.contains(id)
    }

    pub fn first(&self) -> Option<&CapabilityId> {
        self.0.first()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CapabilityId> {
        self.0.iter()
    }

    /// Ids in `self` that are not in `other`, in `self`'s order.
    pub fn difference(&self, other: &CapabilitySet) -> CapabilitySet {
        self.0
            .iter()
            .filter(|id| !other.contains(id))
            .cloned()
            .collect()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(id.as_str())?;
        }
        Ok(())
    }
}

impl FromIterator<CapabilityId> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = CapabilityId>>(iter: T) -> Self {
        let mut set = CapabilitySet::new();
        for id in iter {
            set.push(id);
        }
        set
    }
}

impl From<Vec<CapabilityId>> for CapabilitySet {
    fn from(ids: Vec<CapabilityId>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<CapabilitySet> for Vec<CapabilityId> {
    fn from(set: CapabilitySet) -> Self {
        set.0
    }
}

impl<'a> IntoIterator for &'a CapabilitySet {
    type Item = &'a CapabilityId;
    type IntoIter = std::slice::Iter<'a, CapabilityId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Typed value of a capability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapabilityValue {
    Bool(bool),
    Number(f64),
}

impl CapabilityValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Number(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Bool(_) => None,
        }
    }
}

impl From<bool> for CapabilityValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for CapabilityValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl fmt::Display for CapabilityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_id_round_trips_known_and_unknown() {
        assert_eq!(
            CapabilityId::from("button.reset_water_alarm"),
            CapabilityId::ResetWaterAlarm
        );
        assert_eq!(CapabilityId::AlarmHeat.to_string(), "alarm_heat");

        assert_eq!(CapabilityId::from("measure_battery"), CapabilityId::MeasureBattery);

        let legacy = CapabilityId::from("measure_power".to_string());
        assert_eq!(legacy, CapabilityId::Other("measure_power".to_string()));
        assert_eq!(legacy.as_str(), "measure_power");
    }

    #[test]
    fn test_is_button() {
        assert!(CapabilityId::ResetTamperAlarm.is_button());
        assert!(!CapabilityId::AlarmTamper.is_button());
    }

    #[test]
    fn test_set_ignores_duplicates() {
        let mut set = CapabilitySet::new();
        assert!(set.push(CapabilityId::AlarmHeat));
        assert!(!set.push(CapabilityId::AlarmHeat));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_prepend_moves_existing_to_front() {
        let mut set: CapabilitySet = vec![CapabilityId::AlarmTamper, CapabilityId::AlarmContact].into();
        set.prepend(CapabilityId::AlarmContact);
        assert_eq!(set.to_string(), "alarm_contact, alarm_tamper");
    }

    #[test]
    fn test_deserialize_dedups() {
        let set: CapabilitySet =
            serde_json::from_str(r#"["alarm_heat", "alarm_heat", "alarm_water"]"#).unwrap();
        assert_eq!(set.to_string(), "alarm_heat, alarm_water");
    }

    #[test]
    fn test_difference_keeps_order() {
        let a: CapabilitySet = vec![
            CapabilityId::MeasureHumidity,
            CapabilityId::AlarmWater,
            CapabilityId::MeasureTemperature,
        ]
        .into();
        let b: CapabilitySet = vec![CapabilityId::AlarmWater].into();
        assert_eq!(a.difference(&b).to_string(), "measure_humidity, measure_temperature");
    }

    #[test]
    fn test_value_serializes_untagged() {
        assert_eq!(serde_json::to_value(CapabilityValue::Bool(true)).unwrap(), true);
        assert_eq!(serde_json::to_value(CapabilityValue::Number(21.5)).unwrap(), 21.5);
    }
}
