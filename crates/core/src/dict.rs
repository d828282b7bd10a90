//! Scoped, copy-on-write dictionary (SPEC_FULL §3.3/§4.3).

use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

type Layer = Arc<HashMap<String, Value>>;

/// A non-empty stack of scope layers. Dictionaries are themselves values:
/// cloning a `Dict` clones the `Vec` of layer pointers (cheap) while sharing
/// every layer's backing map (refcount bump), matching SPEC_FULL §3.3.
#[derive(Debug, Clone)]
pub struct Dict {
    layers: Vec<Layer>,
}

impl Default for Dict {
    fn default() -> Self {
        Dict { layers: vec![Arc::new(HashMap::new())] }
    }
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn new_scope(&mut self) {
        self.layers.push(Arc::new(HashMap::new()));
    }

    /// Pops the top layer. Returns it wrapped as a standalone one-layer
    /// `Dict` so it can be re-pushed with `push_scope` (used by `scope`
    /// which leaves the popped layer as a data value).
    pub fn pop_scope(&mut self) -> Option<Dict> {
        if self.layers.len() <= 1 {
            return None;
        }
        self.layers.pop().map(|l| Dict { layers: vec![l] })
    }

    /// Pushes `other`'s layers (shared by refcount) on top of this
    /// dictionary's own.
    pub fn push_scope(&mut self, other: &Dict) {
        self.layers.extend(other.layers.iter().cloned());
    }

    pub fn lookup(&self, key: &str) -> Option<&Value> {
        self.layers.iter().rev().find_map(|layer| layer.get(key))
    }

    /// Clone-on-write insert into the top layer.
    pub fn put(&mut self, key: impl Into<String>, val: Value) {
        let top = self.layers.last_mut().expect("dict always has at least one layer");
        if Arc::strong_count(top) > 1 {
            let mut cloned = (**top).clone();
            cloned.insert(key.into(), val);
            *top = Arc::new(cloned);
        } else {
            Arc::get_mut(top).expect("just checked strong_count == 1").insert(key.into(), val);
        }
    }

    pub fn defined(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Extracts the current binding for `mapdef` to transform. In place
    /// (leaving a placeholder) when the binding lives in a singly-owned top
    /// layer; otherwise a clone of whatever layer holds it (SPEC_FULL §4.3).
    pub fn swap_out(&mut self, key: &str) -> Option<Value> {
        if let Some(top) = self.layers.last_mut() {
            if Arc::strong_count(top) == 1 {
                if let Some(map) = Arc::get_mut(top) {
                    if let Some(slot) = map.get_mut(key) {
                        return Some(std::mem::replace(slot, Value::Int(0)));
                    }
                }
            }
        }
        self.lookup(key).cloned()
    }
}

impl PartialEq for Dict {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(
            self.layers.last().unwrap_or(&Arc::new(HashMap::new())),
            other.layers.last().unwrap_or(&Arc::new(HashMap::new())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_inner_to_outer() {
        let mut d = Dict::new();
        d.put("x", Value::Int(1));
        d.new_scope();
        d.put("x", Value::Int(2));
        assert_eq!(d.lookup("x"), Some(&Value::Int(2)));
    }

    #[test]
    fn scope_restores_prior_binding() {
        let mut d = Dict::new();
        d.put("x", Value::Int(1));
        let before = d.lookup("x").cloned();
        d.new_scope();
        d.put("x", Value::Int(2));
        d.pop_scope();
        assert_eq!(d.lookup("x").cloned(), before);
    }

    #[test]
    fn put_cow_when_layer_shared() {
        let mut d = Dict::new();
        d.put("x", Value::Int(1));
        let clone = d.clone();
        d.put("y", Value::Int(2));
        assert!(!clone.defined("y"));
        assert!(d.defined("y"));
    }
}
