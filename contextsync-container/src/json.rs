//! Dot-path access inside plain JSON values.
//!
//! Objects are addressed by key and arrays by decimal index. Writes
//! auto-create intermediate objects and overwrite non-object intermediates.

use serde_json::{Map, Value};

/// Looks up `segments` inside `value`.
pub fn lookup<'a>(value: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments.iter().try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Returns true if `segments` resolve to a present (possibly null) value.
pub fn contains(value: &Value, segments: &[String]) -> bool {
    lookup(value, segments).is_some()
}

/// Writes `new_value` at `segments`, creating objects along the way.
///
/// A non-object intermediate (including arrays addressed by a non-numeric
/// segment) is replaced by an empty object.
pub fn insert(value: &mut Value, segments: &[String], new_value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        *value = new_value;
        return;
    };

    let mut current = value;
    for segment in parents {
        current = child_mut(current, segment);
    }

    if let Some(i) = array_index(current, last) {
        current[i] = new_value;
        return;
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    current[last.as_str()] = new_value;
}

/// True if [`insert`] writes through `value` at `segment` instead of
/// replacing it: objects, and arrays addressed by an in-bounds index.
pub fn descends_into(value: &Value, segment: &str) -> bool {
    value.is_object() || array_index(value, segment).is_some()
}

fn array_index(value: &Value, segment: &str) -> Option<usize> {
    let items = value.as_array()?;
    segment.parse::<usize>().ok().filter(|i| *i < items.len())
}

fn child_mut<'a>(current: &'a mut Value, segment: &str) -> &'a mut Value {
    if let Some(i) = array_index(current, segment) {
        return &mut current[i];
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    let child = &mut current[segment];
    if child.is_null() {
        *child = Value::Object(Map::new());
    }
    child
}

/// Removes the value at `segments`. Returns the removed value.
pub fn remove(value: &mut Value, segments: &[String]) -> Option<Value> {
    let (last, parents) = segments.split_last()?;
    let mut current = value;
    for segment in parents {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match current {
        Value::Object(map) => map.remove(last),
        Value::Array(items) => {
            let i = last.parse::<usize>().ok()?;
            (i < items.len()).then(|| items.remove(i))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segs(path: &str) -> Vec<String> {
        path.split('.').map(str::to_string).collect()
    }

    #[test]
    fn lookup_objects_and_arrays() {
        let v = json!({"a": {"b": [10, {"c": true}]}});
        assert_eq!(lookup(&v, &segs("a.b.0")), Some(&json!(10)));
        assert_eq!(lookup(&v, &segs("a.b.1.c")), Some(&json!(true)));
        assert_eq!(lookup(&v, &segs("a.x")), None);
        assert_eq!(lookup(&v, &segs("a.b.9")), None);
    }

    #[test]
    fn contains_null_value() {
        let v = json!({"a": null});
        assert!(contains(&v, &segs("a")));
        assert!(!contains(&v, &segs("b")));
    }

    #[test]
    fn insert_creates_intermediates() {
        let mut v = json!({});
        insert(&mut v, &segs("a.b.c"), json!(1));
        assert_eq!(v, json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn insert_overwrites_scalar_intermediate() {
        let mut v = json!({"a": 5});
        insert(&mut v, &segs("a.b"), json!("x"));
        assert_eq!(v, json!({"a": {"b": "x"}}));
    }

    #[test]
    fn insert_into_array_index() {
        let mut v = json!({"list": [1, 2, 3]});
        insert(&mut v, &segs("list.1"), json!(20));
        assert_eq!(v, json!({"list": [1, 20, 3]}));
    }

    #[test]
    fn remove_nested_key() {
        let mut v = json!({"a": {"b": 1, "c": 2}});
        assert_eq!(remove(&mut v, &segs("a.b")), Some(json!(1)));
        assert_eq!(v, json!({"a": {"c": 2}}));
        assert_eq!(remove(&mut v, &segs("a.zzz")), None);
    }
}
