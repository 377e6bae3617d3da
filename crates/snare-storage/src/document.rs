// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filter matching and update application over JSON documents.
//!
//! Paths are dotted (`agent_state.turn_count`). Both stores share these
//! rules so they agree on what matches and what counts as a modification.

use serde_json::{Map, Value};
use snare_core::traits::Condition;
use snare_core::{Filter, SnareError, Update};

/// Value at a dotted path, if every segment exists.
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, segment| current.get(segment))
}

/// Mutable slot at a dotted path, creating intermediate objects.
fn slot_mut<'a>(doc: &'a mut Value, path: &str) -> Result<&'a mut Value, SnareError> {
    let mut current = doc;
    for segment in path.split('.') {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return Err(SnareError::InvalidInput(format!(
                "cannot descend into non-object at `{segment}` of `{path}`"
            )));
        };
        current = map.entry(segment).or_insert(Value::Null);
    }
    Ok(current)
}

/// True when every condition holds. `Ne` also matches a missing field.
pub fn matches(doc: &Value, filter: &Filter) -> bool {
    filter.conditions.iter().all(|condition| match condition {
        Condition::Eq(path, expected) => get_path(doc, path) == Some(expected),
        Condition::Ne(path, unexpected) => get_path(doc, path) != Some(unexpected),
    })
}

/// Applies `$set`, `$inc`, then `$push`. Returns whether the document changed.
pub fn apply_update(doc: &mut Value, update: &Update) -> Result<bool, SnareError> {
    let before = doc.clone();

    for (path, value) in &update.set {
        *slot_mut(doc, path)? = value.clone();
    }

    for (path, by) in &update.inc {
        let slot = slot_mut(doc, path)?;
        let next = match &*slot {
            Value::Null => Value::from(*by),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Value::from(i + by),
                (None, Some(f)) => Value::from(f + *by as f64),
                (None, None) => {
                    return Err(SnareError::InvalidInput(format!(
                        "cannot increment `{path}`"
                    )));
                }
            },
            other => {
                return Err(SnareError::InvalidInput(format!(
                    "cannot increment non-numeric `{path}`: {other}"
                )));
            }
        };
        *slot = next;
    }

    for (path, value) in &update.push {
        let slot = slot_mut(doc, path)?;
        if slot.is_null() {
            *slot = Value::Array(Vec::new());
        }
        match slot {
            Value::Array(items) => items.push(value.clone()),
            other => {
                return Err(SnareError::InvalidInput(format!(
                    "cannot push onto non-array `{path}`: {other}"
                )));
            }
        }
    }

    Ok(*doc != before)
}

/// Starting document for an upsert: the filter's equality conditions.
pub fn seed_from_filter(filter: &Filter) -> Result<Value, SnareError> {
    let mut doc = Value::Object(Map::new());
    for condition in &filter.conditions {
        if let Condition::Eq(path, value) = condition {
            *slot_mut(&mut doc, path)? = value.clone();
        }
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_paths() {
        let doc = json!({ "agent_state": { "turn_count": 3 } });
        assert_eq!(get_path(&doc, "agent_state.turn_count"), Some(&json!(3)));
        assert_eq!(get_path(&doc, "agent_state.missing"), None);
    }

    #[test]
    fn ne_matches_missing_field() {
        let doc = json!({ "session_id": "s-1" });
        assert!(matches(&doc, &Filter::session("s-1").ne("status", "terminated")));
        let terminated = json!({ "session_id": "s-1", "status": "terminated" });
        assert!(!matches(&terminated, &Filter::session("s-1").ne("status", "terminated")));
    }

    #[test]
    fn update_reports_modification() {
        let mut doc = json!({ "status": "active", "message_count": 4 });
        let changed = apply_update(
            &mut doc,
            &Update::new()
                .set("status", "reported")
                .inc("message_count", 1)
                .push("transcript", json!({ "text": "hi" })),
        )
        .unwrap();
        assert!(changed);
        assert_eq!(doc["status"], "reported");
        assert_eq!(doc["message_count"], 5);
        assert_eq!(doc["transcript"][0]["text"], "hi");

        let unchanged = apply_update(&mut doc, &Update::new().set("status", "reported")).unwrap();
        assert!(!unchanged);
    }

    #[test]
    fn inc_on_float_and_set_creates_parents() {
        let mut doc = json!({ "score": 0.5 });
        apply_update(
            &mut doc,
            &Update::new().inc("score", 1).set("agent_state.notes", "x"),
        )
        .unwrap();
        assert_eq!(doc["score"], 1.5);
        assert_eq!(doc["agent_state"]["notes"], "x");
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let mut doc = json!({ "status": "active" });
        assert!(apply_update(&mut doc, &Update::new().inc("status", 1)).is_err());
        assert!(apply_update(&mut doc, &Update::new().push("status", 1)).is_err());
    }

    #[test]
    fn upsert_seed_uses_equalities_only() {
        let seed = seed_from_filter(&Filter::session("s-9").ne("status", "terminated")).unwrap();
        assert_eq!(seed, json!({ "session_id": "s-9" }));
    }
}
