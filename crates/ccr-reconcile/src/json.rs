//! Entry point for untyped (JSON) inputs, e.g. records relayed by a web client.

use ccr_schemas::{CounterRecord, ExpectedRecord, ReferenceDirectory};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{reconcile, InvalidInputError, ReconcileOptions, ReconcileReport};

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn decode_array<T: DeserializeOwned>(input: &'static str, v: &Value) -> Result<Vec<T>, InvalidInputError> {
    let items = v.as_array().ok_or(InvalidInputError::NotACollection {
        input,
        expected: "an array",
    })?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item.clone()).map_err(|e| InvalidInputError::Malformed {
                input,
                detail: format!("element #{i} ({}): {e}", value_kind(item)),
            })
        })
        .collect()
}

/// Decode the three inputs and run [`reconcile`].
///
/// `counter` and `expected` must be JSON arrays of records; `directory` must
/// be a JSON object keyed by machine ID (or `null` for an empty directory).
pub fn reconcile_from_json(
    counter: &Value,
    expected: &Value,
    directory: &Value,
    opts: &ReconcileOptions,
) -> Result<ReconcileReport, InvalidInputError> {
    let counter: Vec<CounterRecord> = decode_array("counter", counter)?;
    let expected: Vec<ExpectedRecord> = decode_array("expected", expected)?;
    let directory: ReferenceDirectory = match directory {
        Value::Null => ReferenceDirectory::new(),
        Value::Object(_) => serde_json::from_value(directory.clone()).map_err(|e| {
            InvalidInputError::Malformed {
                input: "directory",
                detail: e.to_string(),
            }
        })?,
        _ => {
            return Err(InvalidInputError::NotACollection {
                input: "directory",
                expected: "an object keyed by machine id",
            })
        }
    };
    reconcile(&counter, &expected, &directory, opts)
}
