//! Bounded per-variable history rings.
//!
//! A ring records the last `k` values a requirement variable took, most
//! recent first, across every call of every satisfier that declares the
//! variable. Rings are keyed by variable name only, so two satisfiers that
//! declare the same name share one history.

use std::collections::{BTreeMap, VecDeque};

use shellac_types::{ReqVarDecl, Value};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRing {
    depth: usize,
    entries: VecDeque<Value>,
}

impl HistoryRing {
    #[must_use]
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            depth,
            entries: VecDeque::with_capacity(depth),
        }
    }

    /// Record `value` as the most recent entry.
    ///
    /// The ring grows by one until it holds `depth` entries; after that the
    /// oldest entry falls off.
    pub fn push(&mut self, value: Value) {
        self.entries.push_front(value);
        self.entries.truncate(self.depth);
    }

    /// Adopt a new depth; entries beyond it are dropped.
    pub fn set_depth(&mut self, depth: usize) {
        self.depth = depth.max(1);
        self.entries.truncate(self.depth);
    }

    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<&Value> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter()
    }

    /// The ring as a list value, most recent first.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::List(self.iter().cloned().collect())
    }
}

/// All history rings of one shell context.
#[derive(Debug, Default, Clone)]
pub struct HistoryStore {
    rings: BTreeMap<String, HistoryRing>,
}

impl HistoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a deep copy of `value` into the ring of `decl` and return the
    /// updated ring as a list value, ready to bind under `name[]`.
    pub fn record(&mut self, decl: &ReqVarDecl, value: &Value) -> Value {
        let ring = self
            .rings
            .entry(decl.name.clone())
            .or_insert_with(|| HistoryRing::new(decl.history));
        if ring.depth() != decl.history.max(1) {
            ring.set_depth(decl.history);
        }
        ring.push(value.clone());
        debug!(
            variable = %decl.name,
            depth = ring.depth(),
            len = ring.len(),
            "history updated"
        );
        ring.to_value()
    }

    #[must_use]
    pub fn ring(&self, name: &str) -> Option<&HistoryRing> {
        self.rings.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ring_is_most_recent_first_and_capped() {
        let decl = ReqVarDecl::input("num").with_history(5);
        let mut store = HistoryStore::new();
        for i in 0..10 {
            store.record(&decl, &Value::Int(i));
        }
        let ring = store.ring("num").unwrap();
        assert_eq!(ring.to_value().as_int_list(), Some(vec![9, 8, 7, 6, 5]));
        assert_eq!(ring.iter().last(), Some(&Value::Int(5)));

        store.record(&decl, &Value::Int(2));
        let hist = store.record(&decl, &Value::Int(2));
        assert_eq!(hist.as_int_list(), Some(vec![2, 2, 9, 8, 7]));
    }

    #[test]
    fn ring_grows_one_at_a_time() {
        let decl = ReqVarDecl::input("output!").with_history(3);
        let mut store = HistoryStore::new();
        assert!(store.ring("output!").is_none());
        assert_eq!(store.record(&decl, &Value::Int(1)).as_int_list(), Some(vec![1]));
        assert_eq!(
            store.record(&decl, &Value::Int(2)).as_int_list(),
            Some(vec![2, 1])
        );
        assert_eq!(store.ring("output!").unwrap().latest(), Some(&Value::Int(2)));
    }

    #[test]
    fn recorded_values_are_copies() {
        let decl = ReqVarDecl::input("arr").with_history(2);
        let mut store = HistoryStore::new();
        let mut arr = Value::from(vec![1, 2, 3]);
        store.record(&decl, &arr);
        if let Some(items) = arr.as_list_mut() {
            items[0] = Value::Int(42);
        }
        let ring = store.ring("arr").unwrap();
        assert_eq!(ring.latest().and_then(Value::as_int_list), Some(vec![1, 2, 3]));
    }

    #[test]
    fn depth_change_truncates() {
        let mut store = HistoryStore::new();
        let wide = ReqVarDecl::input("x").with_history(4);
        for i in 0..4 {
            store.record(&wide, &Value::Int(i));
        }
        let narrow = ReqVarDecl::input("x").with_history(2);
        let hist = store.record(&narrow, &Value::Int(9));
        assert_eq!(hist.as_int_list(), Some(vec![9, 3]));
    }

    proptest! {
        #[test]
        fn ring_length_law(depth in 1usize..12, updates in 0usize..40) {
            let mut ring = HistoryRing::new(depth);
            for i in 0..updates {
                let before = ring.len();
                ring.push(Value::Int(i64::try_from(i).unwrap_or(i64::MAX)));
                prop_assert!(ring.len() >= before);
                prop_assert!(ring.len() <= before + 1);
            }
            prop_assert_eq!(ring.len(), updates.min(depth));
            if updates > 0 {
                let newest = i64::try_from(updates - 1).unwrap_or(i64::MAX);
                prop_assert_eq!(ring.latest(), Some(&Value::Int(newest)));
            }
        }
    }
}
