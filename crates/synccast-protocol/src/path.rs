//! Path addressing for partial updates.
//!
//! A path is a dotted address into a JSON-like value tree, where each
//! segment is `name` or `name[index]`: `"tracks[2].title"` points at the
//! `title` field of the third element of `tracks`. The whole document is
//! addressed by `""`, `"."` or `"$"`; leading `.`/`$` segments are
//! stripped, so `"$.playing"` and `"playing"` are the same address.
//!
//! [`apply_at`] writes (or, given no value, removes) at an address by
//! mutating the existing tree in place; [`get_at`] is the symmetric read.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};

static SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^.\[\]]+)(?:\[(\d+)\])?$").expect("Invalid segment regex")
});

/// One parsed path segment: a key with an optional array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub key: String,
    pub index: Option<usize>,
}

fn is_root(path: &str) -> bool {
    matches!(path, "" | "." | "$")
}

/// Parses a path into its segments. The root path parses to no segments.
pub fn parse_path(path: &str) -> ProtocolResult<Vec<Segment>> {
    if is_root(path) {
        return Ok(Vec::new());
    }
    let mut segments = Vec::new();
    for raw in path.split('.') {
        if raw.is_empty() || raw == "$" {
            continue;
        }
        let captures = SEGMENT_RE.captures(raw).ok_or_else(|| ProtocolError::PathParse {
            path: path.to_string(),
            segment: raw.to_string(),
        })?;
        let index = match captures.get(2) {
            Some(digits) => {
                Some(digits.as_str().parse().map_err(|_| ProtocolError::PathParse {
                    path: path.to_string(),
                    segment: raw.to_string(),
                })?)
            }
            None => None,
        };
        segments.push(Segment {
            key: captures[1].to_string(),
            index,
        });
    }
    Ok(segments)
}

fn child<'a>(container: &'a Value, segment: &Segment) -> Option<&'a Value> {
    let slot = container.as_object()?.get(&segment.key)?;
    match segment.index {
        None => Some(slot),
        Some(index) => slot.as_array()?.get(index),
    }
}

fn child_mut<'a>(container: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    let slot = container.as_object_mut()?.get_mut(&segment.key)?;
    match segment.index {
        None => Some(slot),
        Some(index) => slot.as_array_mut()?.get_mut(index),
    }
}

/// Writes `value` at `path`, mutating the existing tree rather than
/// rebuilding it. `None` removes the addressed entry.
///
/// At the root, `Some(v)` replaces the whole document and `None` clears it
/// to `Value::Null`.
pub fn apply_at(root: &mut Value, path: &str, value: Option<Value>) -> ProtocolResult<()> {
    let segments = parse_path(path)?;
    let Some((last, parents)) = segments.split_last() else {
        *root = value.unwrap_or(Value::Null);
        return Ok(());
    };

    let mut cursor = root;
    for segment in parents {
        cursor = child_mut(cursor, segment)
            .ok_or_else(|| ProtocolError::PathUnresolved(path.to_string()))?;
    }

    match last.index {
        None => {
            let map = cursor
                .as_object_mut()
                .ok_or_else(|| ProtocolError::PathUnresolved(path.to_string()))?;
            match value {
                Some(v) => {
                    map.insert(last.key.clone(), v);
                }
                None => {
                    map.remove(&last.key);
                }
            }
        }
        Some(index) => {
            let array = cursor
                .as_object_mut()
                .and_then(|map| map.get_mut(&last.key))
                .and_then(Value::as_array_mut)
                .ok_or_else(|| ProtocolError::PathUnresolved(path.to_string()))?;
            match value {
                Some(v) if index < array.len() => array[index] = v,
                Some(v) if index == array.len() => array.push(v),
                None if index < array.len() => {
                    array.remove(index);
                }
                _ => return Err(ProtocolError::PathUnresolved(path.to_string())),
            }
        }
    }
    Ok(())
}

/// Reads the value at `path`. Returns `None` when the address does not
/// exist; returns an error only when the path fails to parse.
pub fn get_at(root: &Value, path: &str) -> ProtocolResult<Option<Value>> {
    let segments = parse_path(path)?;
    let mut cursor = root;
    for segment in &segments {
        match child(cursor, segment) {
            Some(next) => cursor = next,
            None => return Ok(None),
        }
    }
    Ok(Some(cursor.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "playing": false,
            "a": { "b": [10, 20, 30], "c": "x" },
        })
    }

    #[test]
    fn parse_plain_segments() {
        let segments = parse_path("a.b.c").unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1].key, "b");
        assert_eq!(segments[1].index, None);
    }

    #[test]
    fn parse_indexed_segment() {
        let segments = parse_path("a.b[2].c").unwrap();
        assert_eq!(segments[1].key, "b");
        assert_eq!(segments[1].index, Some(2));
    }

    #[test]
    fn root_forms_parse_to_nothing() {
        for path in ["", ".", "$"] {
            assert!(parse_path(path).unwrap().is_empty());
        }
    }

    #[test]
    fn leading_root_segments_stripped() {
        assert_eq!(parse_path("$.playing").unwrap(), parse_path("playing").unwrap());
        assert_eq!(parse_path(".playing").unwrap(), parse_path("playing").unwrap());
    }

    #[test]
    fn bad_grammar_rejected() {
        for path in ["a[b]", "a[1", "a]2[", "a.b[1.5]"] {
            assert!(
                matches!(parse_path(path), Err(ProtocolError::PathParse { .. })),
                "expected parse failure for {:?}",
                path
            );
        }
    }

    #[test]
    fn apply_sets_nested_field() {
        let mut doc = sample();
        apply_at(&mut doc, "a.c", Some(json!("y"))).unwrap();
        assert_eq!(doc["a"]["c"], json!("y"));
    }

    #[test]
    fn apply_sets_array_element() {
        let mut doc = sample();
        apply_at(&mut doc, "a.b[1]", Some(json!(99))).unwrap();
        assert_eq!(doc["a"]["b"], json!([10, 99, 30]));

        // Appending one past the end is allowed.
        apply_at(&mut doc, "a.b[3]", Some(json!(40))).unwrap();
        assert_eq!(doc["a"]["b"], json!([10, 99, 30, 40]));

        // Further out is not.
        assert!(apply_at(&mut doc, "a.b[9]", Some(json!(0))).is_err());
    }

    #[test]
    fn apply_is_idempotent() {
        let mut once = sample();
        apply_at(&mut once, "a.b[2]", Some(json!(7))).unwrap();
        let mut twice = sample();
        apply_at(&mut twice, "a.b[2]", Some(json!(7))).unwrap();
        apply_at(&mut twice, "a.b[2]", Some(json!(7))).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn get_after_apply_returns_value() {
        let mut doc = sample();
        apply_at(&mut doc, "a.b[2]", Some(json!({"deep": true}))).unwrap();
        assert_eq!(get_at(&doc, "a.b[2]").unwrap(), Some(json!({"deep": true})));
        assert_eq!(get_at(&doc, "a.b[2].deep").unwrap(), Some(json!(true)));
    }

    #[test]
    fn remove_field_and_element() {
        let mut doc = sample();
        apply_at(&mut doc, "a.c", None).unwrap();
        assert_eq!(get_at(&doc, "a.c").unwrap(), None);

        apply_at(&mut doc, "a.b[0]", None).unwrap();
        assert_eq!(doc["a"]["b"], json!([20, 30]));
    }

    #[test]
    fn root_replace_and_clear() {
        let mut doc = sample();
        apply_at(&mut doc, ".", Some(json!({"fresh": 1}))).unwrap();
        assert_eq!(doc, json!({"fresh": 1}));

        // An absent value clears the document.
        apply_at(&mut doc, "$", None).unwrap();
        assert_eq!(doc, Value::Null);
    }

    #[test]
    fn unresolved_parent_errors() {
        let mut doc = sample();
        assert!(matches!(
            apply_at(&mut doc, "missing.child", Some(json!(1))),
            Err(ProtocolError::PathUnresolved(_))
        ));
    }

    #[test]
    fn get_missing_is_none() {
        assert_eq!(get_at(&sample(), "a.nope").unwrap(), None);
        assert_eq!(get_at(&sample(), "a.b[9]").unwrap(), None);
    }

    #[test]
    fn get_root_returns_document() {
        let doc = sample();
        assert_eq!(get_at(&doc, ".").unwrap(), Some(doc.clone()));
    }
}
