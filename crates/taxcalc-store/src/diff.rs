//! Recursive structural diff between version contents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of change at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// One difference between two contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentChange {
    /// Dotted path, e.g. `breakdown.federal_tax`.
    pub path: String,
    pub kind: ChangeKind,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// Compare two JSON objects recursively. Nested objects are descended
/// into; arrays and scalars compare as whole values.
pub fn diff_contents(old: &Value, new: &Value) -> Vec<ContentChange> {
    let mut changes = Vec::new();
    diff_into(old, new, String::new(), &mut changes);
    changes
}

fn diff_into(old: &Value, new: &Value, path: String, changes: &mut Vec<ContentChange>) {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            let mut keys: Vec<&String> = old_map.keys().chain(new_map.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                match (old_map.get(key), new_map.get(key)) {
                    (None, Some(new_value)) => changes.push(ContentChange {
                        path: child_path,
                        kind: ChangeKind::Added,
                        old_value: None,
                        new_value: Some(new_value.clone()),
                    }),
                    (Some(old_value), None) => changes.push(ContentChange {
                        path: child_path,
                        kind: ChangeKind::Removed,
                        old_value: Some(old_value.clone()),
                        new_value: None,
                    }),
                    (Some(old_value), Some(new_value)) => {
                        diff_into(old_value, new_value, child_path, changes)
                    }
                    (None, None) => unreachable!(),
                }
            }
        }
        _ => {
            if old != new {
                changes.push(ContentChange {
                    path,
                    kind: ChangeKind::Modified,
                    old_value: Some(old.clone()),
                    new_value: Some(new.clone()),
                });
            }
        }
    }
}
