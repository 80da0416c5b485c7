// Schema validation tests for MQTT wire format
//
// Most tests construct JSON values directly (independent of Rust structs)
// and validate them against the JSON Schema files in schemas/mqtt/. The event
// tests also run library output through the schema.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use simon_says::{CodeTable, ReportDecoder};

fn load_schema(name: &str) -> serde_json::Value {
    let path = format!("{}/schemas/mqtt/{name}", env!("CARGO_MANIFEST_DIR"));
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read schema {path}: {e}"));
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("Failed to parse schema {path}: {e}"))
}

fn build_validator(schema_name: &str) -> jsonschema::Validator {
    let schema = load_schema(schema_name);
    jsonschema::validator_for(&schema)
        .unwrap_or_else(|e| panic!("Failed to compile schema {schema_name}: {e}"))
}

fn validate(schema_name: &str, instance: &serde_json::Value) {
    let validator = build_validator(schema_name);
    let errors: Vec<_> = validator.iter_errors(instance).collect();
    if !errors.is_empty() {
        let msgs: Vec<String> = errors.iter().map(|e| format!("  - {e}")).collect();
        panic!(
            "Schema validation failed for {schema_name}:\n{}\nInstance: {}",
            msgs.join("\n"),
            serde_json::to_string_pretty(instance).unwrap()
        );
    }
}

fn validate_fails(schema_name: &str, instance: &serde_json::Value) {
    let validator = build_validator(schema_name);
    assert!(
        !validator.is_valid(instance),
        "Expected schema validation to fail for {schema_name}, but it passed.\nInstance: {}",
        serde_json::to_string_pretty(instance).unwrap()
    );
}

fn decode_fixture(name: &str) -> serde_json::Value {
    let path = format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"));
    let raw = std::fs::read_to_string(path).unwrap();
    let mut zones = HashMap::new();
    zones.insert(15, "front window left".to_string());
    let decoder = ReportDecoder::new(Arc::new(CodeTable::builtin()), Arc::new(zones));
    let uid = name.strip_prefix("event-").unwrap();
    let event = decoder.decode(&raw, uid).unwrap().unwrap();
    serde_json::to_value(&event).unwrap()
}

fn zone_event() -> serde_json::Value {
    json!({
        "uid": "12abcd",
        "timestamp": "2020-12-26T16:16:29Z",
        "extension": "simonxt",
        "account": 1234,
        "msg_type": 18,
        "qualifier": 1,
        "code": 601,
        "code_description": "Manual trigger test report Zone",
        "partition": 0,
        "zone": 0,
        "zone_name": null,
        "user": null,
        "checksum": 8,
        "status": null
    })
}

// =========================================================================
// Event
// =========================================================================

#[test]
fn event_valid() {
    validate(
        "event.schema.json",
        &json!({ "now": 1738900000000_u64, "op": "EVENT", "event": zone_event() }),
    );
}

#[test]
fn event_user_valid() {
    let mut event = zone_event();
    event["code"] = json!(401);
    event["zone"] = json!(null);
    event["user"] = json!(3);
    event["status"] = json!("acknowledged");
    validate("event.schema.json", &json!({ "now": 1, "op": "EVENT", "event": event }));
}

#[test]
fn event_with_both_zone_and_user_rejected() {
    let mut event = zone_event();
    event["user"] = json!(3);
    validate_fails("event.schema.json", &json!({ "now": 1, "op": "EVENT", "event": event }));
}

#[test]
fn event_with_neither_zone_nor_user_rejected() {
    let mut event = zone_event();
    event["zone"] = json!(null);
    validate_fails("event.schema.json", &json!({ "now": 1, "op": "EVENT", "event": event }));
}

#[test]
fn event_missing_status_rejected() {
    let mut event = zone_event();
    event.as_object_mut().unwrap().remove("status");
    validate_fails("event.schema.json", &json!({ "now": 1, "op": "EVENT", "event": event }));
}

#[test]
fn event_code_out_of_range_rejected() {
    let mut event = zone_event();
    event["code"] = json!(1000);
    validate_fails("event.schema.json", &json!({ "now": 1, "op": "EVENT", "event": event }));
}

#[test]
fn decoded_zone_event_matches_schema() {
    let event = decode_fixture("event-34efgh");
    assert_eq!(event["zone"], 15);
    assert_eq!(event["zone_name"], "front window left");
    validate("event.schema.json", &json!({ "now": 1, "op": "EVENT", "event": event }));
}

#[test]
fn decoded_user_event_matches_schema() {
    let event = decode_fixture("event-56ijkl");
    assert_eq!(event["user"], 3);
    validate("event.schema.json", &json!({ "now": 1, "op": "EVENT", "event": event }));
}

// =========================================================================
// Sensor change
// =========================================================================

#[test]
fn sensor_change_opened() {
    validate(
        "sensor_change.schema.json",
        &json!({
            "now": 1738900000000_u64,
            "op": "SENSOR_CHANGE",
            "zone": 15,
            "name": "front window left",
            "from": "closed",
            "to": "open"
        }),
    );
}

#[test]
fn sensor_change_bypassed() {
    validate(
        "sensor_change.schema.json",
        &json!({
            "now": 1,
            "op": "SENSOR_CHANGE",
            "zone": 1,
            "name": "front door",
            "from": "closed",
            "to": "bypassed"
        }),
    );
}

#[test]
fn sensor_change_unknown_state_rejected() {
    validate_fails(
        "sensor_change.schema.json",
        &json!({
            "now": 1,
            "op": "SENSOR_CHANGE",
            "zone": 1,
            "name": "front door",
            "from": "closed",
            "to": "tampered"
        }),
    );
}

#[test]
fn sensor_change_missing_zone_rejected() {
    validate_fails(
        "sensor_change.schema.json",
        &json!({ "now": 1, "op": "SENSOR_CHANGE", "name": "x", "from": "closed", "to": "open" }),
    );
}

// =========================================================================
// Simple events
// =========================================================================

#[test]
fn sensors_cleared() {
    validate("simple_event.schema.json", &json!({ "now": 1, "op": "SENSORS_CLEARED" }));
}

#[test]
fn simple_event_unknown_op_rejected() {
    validate_fails("simple_event.schema.json", &json!({ "now": 1, "op": "ZONE_OPEN" }));
}

// =========================================================================
// Snapshot
// =========================================================================

#[test]
fn snapshot_valid() {
    validate(
        "snapshot.schema.json",
        &json!({
            "now": 1738900000000_u64,
            "op": "SNAPSHOT",
            "state": {
                "sensors": [
                    { "id": 1, "name": "front door", "state": "closed" },
                    { "id": 15, "name": "front window left", "state": "open" },
                    { "id": 16, "name": "back door", "state": "bypassed" }
                ],
                "events": 3
            }
        }),
    );
}

#[test]
fn snapshot_empty() {
    validate(
        "snapshot.schema.json",
        &json!({ "now": 1, "op": "SNAPSHOT", "state": { "sensors": [], "events": 0 } }),
    );
}

#[test]
fn snapshot_wrong_op() {
    validate_fails(
        "snapshot.schema.json",
        &json!({ "now": 1, "op": "STATE", "state": { "sensors": [], "events": 0 } }),
    );
}

#[test]
fn snapshot_timestamp_string_rejected() {
    validate_fails(
        "snapshot.schema.json",
        &json!({ "now": "2020-12-26", "op": "SNAPSHOT", "state": { "sensors": [], "events": 0 } }),
    );
}

#[test]
fn snapshot_sensor_extra_field_rejected() {
    validate_fails(
        "snapshot.schema.json",
        &json!({
            "now": 1,
            "op": "SNAPSHOT",
            "state": {
                "sensors": [{ "id": 1, "name": "front door", "state": "closed", "tamper": false }],
                "events": 0
            }
        }),
    );
}

// =========================================================================
// CMD_ACK
// =========================================================================

#[test]
fn cmd_ack_success() {
    validate("cmd_ack.schema.json", &json!({ "now": 1, "op": "CMD_ACK", "success": true }));
}

#[test]
fn cmd_ack_with_src_and_event_list() {
    validate(
        "cmd_ack.schema.json",
        &json!({
            "now": 1,
            "op": "CMD_ACK",
            "success": true,
            "src": { "op": "EVENTS", "op_id": "abc" },
            "data": [zone_event()]
        }),
    );
}

#[test]
fn cmd_ack_missing_success_rejected() {
    validate_fails("cmd_ack.schema.json", &json!({ "now": 1, "op": "CMD_ACK" }));
}

// =========================================================================
// Inbound commands
// =========================================================================

#[test]
fn command_simple_ops() {
    for op in ["SNAPSHOT", "PING", "DISARM", "ARM_HOME", "ARM_AWAY", "EVENTS"] {
        validate("command.schema.json", &json!({ "op": op }));
    }
}

#[test]
fn command_with_arguments() {
    validate("command.schema.json", &json!({ "op": "COMMAND", "action": "arm_motion_sensors" }));
    validate("command.schema.json", &json!({ "op": "ZONE_BYPASS", "zone": 15 }));
    validate("command.schema.json", &json!({ "op": "DELETE_EVENT", "uid": "12abcd", "op_id": "7" }));
}

#[test]
fn command_missing_arguments_rejected() {
    validate_fails("command.schema.json", &json!({ "op": "COMMAND" }));
    validate_fails("command.schema.json", &json!({ "op": "ZONE_BYPASS" }));
    validate_fails("command.schema.json", &json!({ "op": "DELETE_EVENT" }));
}

#[test]
fn command_unknown_op_rejected() {
    validate_fails("command.schema.json", &json!({ "op": "ARM_GROUP" }));
}
