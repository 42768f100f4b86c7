//! Canonical JSON mínimo: claves de objetos ordenadas, sin espacios.
//!
//! Es la forma que se hashea para la definición del wizard y para los tokens
//! de cada step, de modo que el orden de inserción de los campos no altera
//! el resultado.

use serde_json::Value;
use std::collections::BTreeMap;

pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(_) => value.to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let mut tree = BTreeMap::new();
            for (k, v) in map {
                tree.insert(k, to_canonical_json(v));
            }
            let items: Vec<String> = tree.into_iter()
                                         .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), v))
                                         .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_keys_recursively() {
        let v = json!({"b": {"y": 1, "x": [true, null]}, "a": "q\"uote"});
        assert_eq!(to_canonical_json(&v), r#"{"a":"q\"uote","b":{"x":[true,null],"y":1}}"#);
    }
}
