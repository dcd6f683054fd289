//! Values returned by a remote PowerShell session.
//!
//! The transport resolves every output record into a [`RemoteValue`] once,
//! at the wire boundary, so the rest of the crate dispatches on a closed set
//! of shapes instead of re-inspecting raw JSON at each level.

pub mod normalize;

use serde_json::{Map, Value};

use crate::error::InvokeError;

pub use normalize::{normalize, normalize_all};

const SEQ_TAG: &str = "@seq";
const OBJ_TAG: &str = "@obj";

/// Depth past which the wire decoder refuses to recurse.
pub const MAX_WIRE_DEPTH: usize = 64;

#[derive(Clone, Debug, PartialEq)]
pub enum RemoteValue {
    Primitive(Value),
    Sequence(Vec<RemoteValue>),
    Complex(ComplexObject),
}

/// A structured remote object with its two named-property collections.
/// Both collections keep the order in which the remote side emitted them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComplexObject {
    pub adapted: Vec<(String, RemoteValue)>,
    pub extended: Vec<(String, RemoteValue)>,
}

impl ComplexObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_adapted(mut self, key: impl Into<String>, value: RemoteValue) -> Self {
        self.adapted.push((key.into(), value));
        self
    }

    pub fn with_extended(mut self, key: impl Into<String>, value: RemoteValue) -> Self {
        self.extended.push((key.into(), value));
        self
    }
}

impl From<Value> for RemoteValue {
    fn from(value: Value) -> Self {
        RemoteValue::Primitive(value)
    }
}

impl From<ComplexObject> for RemoteValue {
    fn from(object: ComplexObject) -> Self {
        RemoteValue::Complex(object)
    }
}

impl RemoteValue {
    /// Decode the tagged wire encoding produced by the pwsh wrapper.
    ///
    /// Scalars travel as plain JSON, sequences as `{"@seq": [...]}` and
    /// complex objects as `{"@obj": {"adapted": [[k, v], ...], "extended": [...]}}`.
    pub fn from_wire(value: Value) -> Result<Self, InvokeError> {
        decode(value, 0)
    }
}

fn decode(value: Value, depth: usize) -> Result<RemoteValue, InvokeError> {
    if depth > MAX_WIRE_DEPTH {
        return Err(InvokeError::transport(format!(
            "remote object graph exceeds {MAX_WIRE_DEPTH} levels"
        )));
    }
    match value {
        Value::Object(mut map) => {
            if let Some(items) = map.remove(SEQ_TAG) {
                let Value::Array(items) = items else {
                    return Err(malformed("`@seq` must hold an array"));
                };
                let decoded = items
                    .into_iter()
                    .map(|item| decode(item, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(RemoteValue::Sequence(decoded))
            } else if let Some(body) = map.remove(OBJ_TAG) {
                let Value::Object(mut body) = body else {
                    return Err(malformed("`@obj` must hold an object"));
                };
                Ok(RemoteValue::Complex(ComplexObject {
                    adapted: decode_properties(body.remove("adapted"), depth)?,
                    extended: decode_properties(body.remove("extended"), depth)?,
                }))
            } else {
                Err(malformed_object(&map))
            }
        }
        Value::Array(_) => Err(malformed("bare arrays must be wrapped in `@seq`")),
        scalar => Ok(RemoteValue::Primitive(scalar)),
    }
}

fn decode_properties(
    raw: Option<Value>,
    depth: usize,
) -> Result<Vec<(String, RemoteValue)>, InvokeError> {
    let entries = match raw {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(malformed("property collections must be arrays of pairs")),
    };
    let mut properties = Vec::with_capacity(entries.len());
    for entry in entries {
        let Value::Array(pair) = entry else {
            return Err(malformed("property entries must be [name, value] pairs"));
        };
        let mut pair = pair.into_iter();
        let (Some(Value::String(name)), Some(value), None) = (pair.next(), pair.next(), pair.next())
        else {
            return Err(malformed("property entries must be [name, value] pairs"));
        };
        properties.push((name, decode(value, depth + 1)?));
    }
    Ok(properties)
}

fn malformed(detail: &str) -> InvokeError {
    InvokeError::transport(format!("malformed remote value: {detail}"))
}

fn malformed_object(map: &Map<String, Value>) -> InvokeError {
    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    malformed(&format!("untagged object with keys [{}]", keys.join(", ")))
}
