use serde_json::{Map, Value};

use super::{ComplexObject, RemoteValue};

/// Convert a remote value into plain JSON.
///
/// Sequences map element-wise. Complex objects become objects holding the
/// adapted properties followed by the extended ones; an extended property
/// replaces an adapted property of the same name.
pub fn normalize(value: &RemoteValue) -> Value {
    match value {
        RemoteValue::Primitive(value) => value.clone(),
        RemoteValue::Sequence(items) => Value::Array(normalize_all(items)),
        RemoteValue::Complex(object) => Value::Object(normalize_object(object)),
    }
}

pub fn normalize_all(values: &[RemoteValue]) -> Vec<Value> {
    values.iter().map(normalize).collect()
}

fn normalize_object(object: &ComplexObject) -> Map<String, Value> {
    let mut map = Map::with_capacity(object.adapted.len() + object.extended.len());
    for (key, value) in object.adapted.iter().chain(object.extended.iter()) {
        map.insert(key.clone(), normalize(value));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extended_wins_but_keeps_first_position() {
        let object = ComplexObject::new()
            .with_adapted("Name", json!("a").into())
            .with_adapted("Id", json!(1).into())
            .with_extended("Name", json!("b").into())
            .with_extended("Extra", json!(null).into());
        let normalized = normalize(&RemoteValue::from(object));
        assert_eq!(normalized, json!({ "Name": "b", "Id": 1, "Extra": null }));
        let keys: Vec<&String> = normalized.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["Name", "Id", "Extra"]);
    }

    #[test]
    fn primitives_pass_through() {
        assert_eq!(normalize(&RemoteValue::from(json!("x"))), json!("x"));
    }
}
