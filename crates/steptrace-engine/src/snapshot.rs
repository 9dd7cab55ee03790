//! Value serializer: turns a variable mapping into a JSON-safe name→text map.
//!
//! Policy, in order:
//! 1. names with a double-underscore prefix are implementation internals and
//!    are skipped;
//! 2. callable values (functions, builtins) carry no line-by-line state and
//!    are skipped;
//! 3. everything else renders through the repr printer, degrading to a
//!    placeholder naming the type when a value cannot be rendered, so one
//!    bad value never loses the rest of the mapping.
//!
//! Snapshots are by value: the resulting strings never change when the
//! underlying objects are mutated later.

use indexmap::IndexMap;

use crate::value::{Value, ValueCategory};

/// Serializes one scope's variables, preserving the mapping's insertion
/// order.
pub fn snapshot(vars: &IndexMap<String, Value>) -> IndexMap<String, String> {
    let mut out = IndexMap::with_capacity(vars.len());
    for (name, value) in vars {
        if name.starts_with("__") {
            continue;
        }
        if value.category() == ValueCategory::Callable {
            continue;
        }
        let text = value
            .repr()
            .unwrap_or_else(|_| format!("<unserializable {}>", value.type_name()));
        out.insert(name.clone(), text);
    }
    out
}
