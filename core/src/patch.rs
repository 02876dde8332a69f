//! Sparse-update tracking for partial PATCH payloads.
//!
//! A `PatchSet` lives inside a model and records, field by field, what changed
//! since the last baseline. `adds` and `removes` never share a key.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

/// Accumulated changes since the last `reset`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchSet {
    adds: BTreeMap<String, Value>,
    removes: BTreeSet<String>,
}

/// One entry of the wire-level patch array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
}

impl PatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the transition of `key` from `old` to `new`.
    ///
    /// A cleared field moves to `removes`; a set or changed field moves to
    /// `adds`; an unchanged field is left alone.
    pub fn record_change<T>(&mut self, key: &str, old: Option<T>, new: Option<T>)
    where
        T: PartialEq + Into<Value>,
    {
        match (old, new) {
            (Some(_), None) => {
                self.adds.remove(key);
                self.removes.insert(key.to_string());
            }
            (Some(old), Some(new)) if old == new => {}
            (_, Some(new)) => {
                self.removes.remove(key);
                self.adds.insert(key.to_string(), new.into());
            }
            (None, None) => {}
        }
    }

    /// Drop all recorded changes, e.g. after a successful sync.
    pub fn reset(&mut self) {
        self.adds.clear();
        self.removes.clear();
    }

    pub fn adds(&self) -> &BTreeMap<String, Value> {
        &self.adds
    }

    pub fn removes(&self) -> &BTreeSet<String> {
        &self.removes
    }

    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.removes.is_empty()
    }

    /// Adds in key order, then removes in key order.
    pub fn operations(&self) -> Vec<PatchOperation> {
        let adds = self.adds.iter().map(|(field, value)| PatchOperation {
            op: PatchOp::Add,
            field: field.clone(),
            value: Some(value.clone()),
        });
        let removes = self.removes.iter().map(|field| PatchOperation {
            op: PatchOp::Remove,
            field: field.clone(),
            value: None,
        });
        adds.chain(removes).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_value_is_noop() {
        let mut patch = PatchSet::new();
        patch.record_change("age", Some(30), Some(30));
        assert!(patch.is_empty());
    }

    #[test]
    fn both_absent_is_noop() {
        let mut patch = PatchSet::new();
        patch.record_change::<String>("nickname", None, None);
        assert!(patch.is_empty());
    }

    #[test]
    fn new_value_is_added() {
        let mut patch = PatchSet::new();
        patch.record_change("email", None, Some("a@b.com"));
        assert_eq!(patch.adds().get("email"), Some(&Value::from("a@b.com")));
        assert!(patch.removes().is_empty());
    }

    #[test]
    fn changed_value_is_added() {
        let mut patch = PatchSet::new();
        patch.record_change("age", Some(30), Some(31));
        assert_eq!(patch.adds().get("age"), Some(&Value::from(31)));
    }

    #[test]
    fn cleared_value_moves_to_removes() {
        let mut patch = PatchSet::new();
        patch.record_change("nickname", None, Some("bo"));
        patch.record_change("nickname", Some("bo"), None);
        assert!(patch.adds().is_empty());
        assert!(patch.removes().contains("nickname"));
    }

    #[test]
    fn re_adding_clears_remove() {
        let mut patch = PatchSet::new();
        patch.record_change("nickname", Some("bo"), None);
        patch.record_change("nickname", None, Some("bob"));
        assert!(patch.removes().is_empty());
        assert_eq!(patch.adds().get("nickname"), Some(&Value::from("bob")));
    }

    #[test]
    fn unchanged_value_keeps_earlier_entry() {
        let mut patch = PatchSet::new();
        patch.record_change("name", Some("a"), Some("b"));
        patch.record_change("name", Some("b"), Some("b"));
        assert_eq!(patch.adds().get("name"), Some(&Value::from("b")));
    }

    #[test]
    fn sets_stay_disjoint() {
        let mut patch = PatchSet::new();
        let steps: [(Option<i64>, Option<i64>); 5] = [
            (None, Some(1)),
            (Some(1), None),
            (None, Some(2)),
            (Some(2), Some(3)),
            (Some(3), None),
        ];
        for (old, new) in steps {
            patch.record_change("n", old, new);
            let in_adds = patch.adds().contains_key("n");
            let in_removes = patch.removes().contains("n");
            assert!(!(in_adds && in_removes));
        }
        assert!(patch.removes().contains("n"));
    }

    #[test]
    fn reset_empties_both_sets() {
        let mut patch = PatchSet::new();
        patch.record_change("email", None, Some("a@b.com"));
        patch.record_change("nickname", Some("bo"), None);
        patch.reset();
        assert!(patch.adds().is_empty());
        assert!(patch.removes().is_empty());
    }

    #[test]
    fn operations_serialize_adds_then_removes() {
        let mut patch = PatchSet::new();
        patch.record_change("nickname", Some("bo"), None);
        patch.record_change("email", None, Some("a@b.com"));
        let json = serde_json::to_value(patch.operations()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"op": "add", "field": "email", "value": "a@b.com"},
                {"op": "remove", "field": "nickname"}
            ])
        );
    }
}
