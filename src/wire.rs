//! Codec for the partial-receiving API's request and response shapes.
//!
//! Requests go out flattened: a single-level JSON object whose keys are dot
//! paths with bracketed indices, e.g.
//! `containers[0].shipmentItems[2].quantityReceiving`. Responses come back
//! under a `data` member, nested or dot-keyed or a mix of both, and are
//! re-expanded into the full tree before deserialization.

use serde_json::{Map, Value};

use crate::errors::ReceivingError;
use crate::models::PartialReceipt;

#[derive(Debug, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

fn path_segments(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            continue;
        }
        let bracket = part.find('[').unwrap_or(part.len());
        if bracket > 0 {
            segments.push(Segment::Key(part[..bracket].to_string()));
        }
        let mut remainder = &part[bracket..];
        while let Some(stripped) = remainder.strip_prefix('[') {
            let Some(close) = stripped.find(']') else {
                segments.push(Segment::Key(stripped.to_string()));
                break;
            };
            let token = &stripped[..close];
            match token.parse::<usize>() {
                Ok(index) => segments.push(Segment::Index(index)),
                Err(_) => segments.push(Segment::Key(token.to_string())),
            }
            remainder = &stripped[close + 1..];
        }
    }
    segments
}

fn insert(target: &mut Value, segments: &[Segment], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *target = value;
        return;
    };
    match first {
        Segment::Key(key) => {
            if !matches!(target, Value::Object(_)) {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(map) = target {
                let slot = map.entry(key.clone()).or_insert(Value::Null);
                insert(slot, rest, value);
            }
        }
        Segment::Index(index) => {
            if !matches!(target, Value::Array(_)) {
                *target = Value::Array(Vec::new());
            }
            if let Value::Array(items) = target {
                while items.len() <= *index {
                    items.push(Value::Null);
                }
                insert(&mut items[*index], rest, value);
            }
        }
    }
}

/// Flattens a tree into dot-path keys. Nulls and empty containers produce
/// no keys, so the output carries values only.
pub fn flatten(value: &Value) -> Map<String, Value> {
    let mut flat = Map::new();
    flatten_into(value, String::new(), &mut flat);
    flat
}

fn flatten_into(value: &Value, prefix: String, out: &mut Map<String, Value>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(nested, path, out);
            }
        }
        Value::Array(items) => {
            for (index, nested) in items.iter().enumerate() {
                flatten_into(nested, format!("{prefix}[{index}]"), out);
            }
        }
        Value::Null => {}
        leaf => {
            out.insert(prefix, leaf.clone());
        }
    }
}

/// Re-nests dotted keys at every level. Plain nested input passes through
/// unchanged, so `expand(flatten(tree)) == tree` for trees without nulls or
/// empty containers.
pub fn expand(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut root = Value::Object(Map::new());
            for (key, nested) in map {
                insert(&mut root, &path_segments(key), expand(nested));
            }
            root
        }
        Value::Array(items) => Value::Array(items.iter().map(expand).collect()),
        leaf => leaf.clone(),
    }
}

/// Serializes the form for saving, replacing every recipient that has no
/// chosen id with the empty string the API reads as "clear the assignment".
pub fn normalize_for_save(payload: &PartialReceipt) -> Result<Value, ReceivingError> {
    let mut tree = serde_json::to_value(payload)?;
    if let Some(containers) = tree.get_mut("containers").and_then(Value::as_array_mut) {
        for container in containers {
            let Some(items) = container
                .get_mut("shipmentItems")
                .and_then(Value::as_array_mut)
            else {
                continue;
            };
            for item in items {
                let chosen = item
                    .get("recipient")
                    .and_then(|recipient| recipient.get("id"))
                    .and_then(Value::as_str)
                    .map_or(false, |id| !id.is_empty());
                if !chosen {
                    if let Value::Object(fields) = item {
                        fields.insert("recipient".to_string(), Value::String(String::new()));
                    }
                }
            }
        }
    }
    Ok(tree)
}

/// The request body for the step-2 save call: normalized, then flattened.
pub fn build_save_request(payload: &PartialReceipt) -> Result<Value, ReceivingError> {
    let normalized = normalize_for_save(payload)?;
    Ok(Value::Object(flatten(&normalized)))
}

/// Unwraps the `data` envelope, expands the tree, and deserializes it into
/// the authoritative form values.
pub fn parse_receipt(body: &Value) -> Result<PartialReceipt, ReceivingError> {
    let data = body.get("data").ok_or_else(|| {
        ReceivingError::MalformedResponse("response has no data member".to_string())
    })?;
    let receipt = serde_json::from_value(expand(data))?;
    Ok(receipt)
}
