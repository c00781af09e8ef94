use serde_json::json;

use super::*;
use crate::capability::CapabilityId;
use crate::capability::CapabilityValue;

fn luminance(value: f64) -> RawReport {
    RawReport::from(json!({
        "Sensor Type": "Luminance (version 1)",
        "Sensor Value (Parsed)": value,
    }))
}

fn heat(notification_type: &str, event: i64) -> RawReport {
    RawReport::from(json!({
        "Notification Type": notification_type,
        "Event": event,
    }))
}

// =============================================================================
// Luminance
// =============================================================================

#[test]
fn test_luminance_ignores_other_sensor_types() {
    let report = RawReport::from(json!({
        "Sensor Type": "Relative humidity (version 2)",
        "Sensor Value (Parsed)": 41,
    }));
    for unsigned_fix in [true, false] {
        assert_eq!(ParseRule::Luminance { unsigned_fix }.parse(&report), None);
    }
    assert_eq!(
        ParseRule::Luminance { unsigned_fix: true }.parse(&RawReport::default()),
        None
    );
}

#[test]
fn test_luminance_negative_value_fixed_only_with_flag() {
    assert_eq!(
        ParseRule::Luminance { unsigned_fix: true }.parse(&luminance(-10.0)),
        Some(CapabilityValue::Number(65526.0))
    );
    assert_eq!(
        ParseRule::Luminance { unsigned_fix: false }.parse(&luminance(-10.0)),
        Some(CapabilityValue::Number(-10.0))
    );
}

#[test]
fn test_luminance_positive_value_unchanged() {
    assert_eq!(
        ParseRule::Luminance { unsigned_fix: true }.parse(&luminance(320.0)),
        Some(CapabilityValue::Number(320.0))
    );
}

#[test]
fn test_luminance_requires_value() {
    let report = RawReport::from(json!({ "Sensor Type": "Luminance (version 1)" }));
    assert_eq!(ParseRule::Luminance { unsigned_fix: true }.parse(&report), None);
}

// =============================================================================
// Heat alarm
// =============================================================================

#[test]
fn test_heat_alarm_events() {
    let rule = ParseRule::Notification(NotificationKind::Heat);
    assert_eq!(rule.parse(&heat("Heat", 2)), Some(CapabilityValue::Bool(true)));
    assert_eq!(rule.parse(&heat("Heat", 6)), Some(CapabilityValue::Bool(true)));
    assert_eq!(rule.parse(&heat("Heat", 0)), Some(CapabilityValue::Bool(false)));
    assert_eq!(rule.parse(&heat("Heat", 99)), None);
    assert_eq!(rule.parse(&heat("Other", 2)), None);
}

// =============================================================================
// Humidity
// =============================================================================

#[test]
fn test_humidity_tags_are_mutually_exclusive() {
    let relative = RawReport::from(json!({
        "Sensor Type": "Relative humidity (version 2)",
        "Sensor Value (Parsed)": 55,
    }));
    let moisture = RawReport::from(json!({
        "Sensor Type": "Moisture (v5)",
        "Sensor Value (Parsed)": 12,
    }));

    let comfort = ParseRule::Humidity(HumidityTag::RelativeHumidity);
    let drip = ParseRule::Humidity(HumidityTag::Moisture);

    assert_eq!(comfort.parse(&relative), Some(CapabilityValue::Number(55.0)));
    assert_eq!(comfort.parse(&moisture), None);
    assert_eq!(drip.parse(&moisture), Some(CapabilityValue::Number(12.0)));
    assert_eq!(drip.parse(&relative), None);
}

// =============================================================================
// Temperature
// =============================================================================

#[test]
fn test_temperature_passes_value_through() {
    let tagged = RawReport::from(json!({
        "Sensor Type": "Temperature (version 1)",
        "Sensor Value (Parsed)": 21.4,
    }));
    let untagged = RawReport::from(json!({ "Sensor Value (Parsed)": -3.5 }));
    assert_eq!(
        ParseRule::Temperature.parse(&tagged),
        Some(CapabilityValue::Number(21.4))
    );
    assert_eq!(
        ParseRule::Temperature.parse(&untagged),
        Some(CapabilityValue::Number(-3.5))
    );
}

#[test]
fn test_temperature_skips_other_sensor_kinds() {
    assert_eq!(ParseRule::Temperature.parse(&luminance(5.0)), None);
}

#[test]
fn test_temperature_accepts_qualified_tags() {
    for tag in ["Air temperature (version 1)", "temperature"] {
        let report = RawReport::from(json!({
            "Sensor Type": tag,
            "Sensor Value (Parsed)": 19.0,
        }));
        assert_eq!(
            ParseRule::Temperature.parse(&report),
            Some(CapabilityValue::Number(19.0)),
            "tag {}",
            tag
        );
    }
}

// =============================================================================
// Battery
// =============================================================================

#[test]
fn test_battery_level() {
    let cases = [
        (json!({ "Battery Level": 80, "Battery Level (Raw)": [80] }), Some(80.0)),
        (json!({ "Battery Level (Raw)": 100 }), Some(100.0)),
        (json!({ "Battery Level": "battery low warning", "Battery Level (Raw)": [255] }), Some(1.0)),
        (json!({ "Battery Level (Raw)": 255 }), Some(1.0)),
        (json!({ "Battery Level (Raw)": 130 }), None),
        (json!({}), None),
    ];
    for (report, expected) in cases {
        assert_eq!(
            ParseRule::BatteryLevel.parse(&RawReport::from(report.clone())),
            expected.map(CapabilityValue::Number),
            "report {}",
            report
        );
    }
}

#[test]
fn test_battery_low_alarm() {
    let low = RawReport::from(json!({ "Battery Level (Raw)": [255] }));
    let fine = RawReport::from(json!({ "Battery Level (Raw)": [64] }));
    assert_eq!(ParseRule::BatteryLow.parse(&low), Some(CapabilityValue::Bool(true)));
    assert_eq!(ParseRule::BatteryLow.parse(&fine), Some(CapabilityValue::Bool(false)));
    assert_eq!(ParseRule::BatteryLow.parse(&RawReport::default()), None);
}

// =============================================================================
// Native alarms
// =============================================================================

#[test]
fn test_water_notification() {
    let rule = ParseRule::Notification(NotificationKind::Water);
    assert_eq!(rule.parse(&heat("Water", 2)), Some(CapabilityValue::Bool(true)));
    assert_eq!(rule.parse(&heat("Water", 0)), Some(CapabilityValue::Bool(false)));
    assert_eq!(rule.parse(&heat("Heat", 2)), None);
}

#[test]
fn test_access_control_notification() {
    let rule = ParseRule::Notification(NotificationKind::AccessControl);
    assert_eq!(
        rule.parse(&heat("Access Control", 22)),
        Some(CapabilityValue::Bool(true))
    );
    assert_eq!(
        rule.parse(&heat("Access Control", 23)),
        Some(CapabilityValue::Bool(false))
    );
    assert_eq!(rule.parse(&heat("Access Control", 5)), None);
}

#[test]
fn test_binary_sensor_native_values() {
    let cases = [
        (json!(true), Some(true)),
        (json!(false), Some(false)),
        (json!("detected an event"), Some(true)),
        (json!("idle"), Some(false)),
        (json!(255), Some(true)),
        (json!(0), Some(false)),
        (json!(17), None),
        (json!(null), None),
    ];
    for (value, expected) in cases {
        let report = RawReport::from(json!({ "Sensor Value": value.clone() }));
        assert_eq!(
            ParseRule::BinarySensor.parse(&report),
            expected.map(CapabilityValue::Bool),
            "value {}",
            value
        );
    }
}

#[test]
fn test_non_object_report_is_empty() {
    let report = RawReport::from(json!([1, 2, 3]));
    assert_eq!(report, RawReport::default());
    assert_eq!(ParseRule::BinarySensor.parse(&report), None);
}

// =============================================================================
// Interpreter routing
// =============================================================================

#[test]
fn test_interpreter_checks_command_class() {
    let interpreter = Interpreter::new(
        CapabilityId::MeasureLuminance,
        CommandClass::SensorMultilevel,
        ParseRule::Luminance { unsigned_fix: false },
    );
    assert_eq!(
        interpreter.interpret(CommandClass::SensorMultilevel, &luminance(12.0)),
        Some(CapabilityValue::Number(12.0))
    );
    assert_eq!(
        interpreter.interpret(CommandClass::Notification, &luminance(12.0)),
        None
    );
}

#[test]
fn test_interpreters_replace_and_route() {
    let mut interpreters = Interpreters::new();
    interpreters.activate(Interpreter::new(
        CapabilityId::AlarmContact,
        CommandClass::SensorBinary,
        ParseRule::BinarySensor,
    ));
    interpreters.activate(Interpreter::new(
        CapabilityId::AlarmContact,
        CommandClass::Notification,
        ParseRule::Notification(NotificationKind::AccessControl),
    ));
    assert_eq!(interpreters.len(), 1);

    let binary = RawReport::from(json!({ "Sensor Value": true }));
    assert!(interpreters
        .interpret(CommandClass::SensorBinary, &binary)
        .is_empty());

    let values = interpreters.interpret(CommandClass::Notification, &heat("Access Control", 22));
    assert_eq!(
        values,
        vec![(CapabilityId::AlarmContact, CapabilityValue::Bool(true))]
    );

    assert!(interpreters.deactivate(&CapabilityId::AlarmContact));
    assert!(interpreters.is_empty());
}

#[test]
fn test_command_class_names() {
    assert_eq!(CommandClass::SensorMultilevel.to_string(), "SENSOR_MULTILEVEL");
    let parsed: CommandClass = serde_json::from_str("\"CENTRAL_SCENE\"").unwrap();
    assert_eq!(parsed, CommandClass::CentralScene);
    assert_eq!(CommandClass::Battery.to_string(), "BATTERY");
}

#[test]
fn test_integral_floats_read_as_integers() {
    let report = RawReport::from(json!({ "Event": 2.0, "Scene Number": 3.5, "Parameter Number": 23 }));
    assert_eq!(report.event(), Some(2));
    assert_eq!(report.scene_number(), None);
    assert_eq!(report.parameter_number(), Some(23));

    let overheat = RawReport::from(json!({ "Notification Type": "Heat", "Event": 2.0 }));
    assert_eq!(
        ParseRule::Notification(NotificationKind::Heat).parse(&overheat),
        Some(CapabilityValue::Bool(true))
    );
}
