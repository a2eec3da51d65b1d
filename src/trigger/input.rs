//! Input payloads for the selected start block.

use serde_json::{Map, Value};

use crate::domain::{Block, TriggerDefinition};

/// Field holding a trigger's declared input list.
pub const INPUT_FORMAT_FIELD: &str = "inputFormat";
/// Field holding a user-provided sample payload for external triggers.
pub const SAMPLE_PAYLOAD_FIELD: &str = "samplePayload";

/// Build a test input object from an `inputFormat` field list.
///
/// Entries are `{ "name", "type", "value" }` objects; entries without a name
/// or without a `value` key are skipped. Returns `None` when nothing usable
/// is declared.
pub fn input_from_format(block: &Block) -> Option<Value> {
    let fields = block.field(INPUT_FORMAT_FIELD)?.as_array()?;
    let mut input = Map::new();
    for field in fields {
        let Some(name) = field.get("name").and_then(Value::as_str) else {
            continue;
        };
        if name.trim().is_empty() {
            continue;
        }
        if let Some(value) = field.get("value") {
            input.insert(name.to_string(), value.clone());
        }
    }
    (!input.is_empty()).then_some(Value::Object(input))
}

/// Mock payload for a trigger that normally receives an external event.
///
/// A stored sample payload wins; otherwise one is synthesised from the
/// trigger's declared outputs.
pub fn mock_payload(block: &Block, trigger: Option<&TriggerDefinition>) -> Value {
    if let Some(sample) = block.field(SAMPLE_PAYLOAD_FIELD) {
        match sample {
            Value::Object(_) => return sample.clone(),
            Value::String(s) => {
                if let Ok(parsed @ Value::Object(_)) = serde_json::from_str::<Value>(s) {
                    return parsed;
                }
            }
            _ => {}
        }
    }

    let outputs = trigger.map(|t| t.outputs.as_slice()).unwrap_or_default();
    let payload: Map<String, Value> = outputs
        .iter()
        .map(|o| (o.name.clone(), mock_value(&o.field_type)))
        .collect();
    Value::Object(payload)
}

fn mock_value(field_type: &str) -> Value {
    match field_type {
        "string" => Value::String(String::new()),
        "number" => Value::from(0),
        "boolean" => Value::Bool(false),
        "array" => Value::Array(Vec::new()),
        "json" | "object" => Value::Object(Map::new()),
        _ => Value::Null,
    }
}
