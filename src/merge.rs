use serde_json::{Map, Value};

use crate::path::FieldPath;

pub type Table = Map<String, Value>;

/// Deep-merge `overlay` on top of `base`.
/// If both sides have a mapping for the same key, recurse.
/// Otherwise, `overlay`'s value wins. Keys match ignoring ASCII case, the
/// same way [`lookup`] does; the overlay's spelling is kept.
pub fn deep_merge(mut base: Table, overlay: Table) -> Table {
    for (key, overlay_val) in overlay {
        let existing = match base.shift_remove(&key) {
            Some(value) => Some(value),
            None => matching_key(&base, &key).and_then(|k| base.shift_remove(&k)),
        };
        match (existing, overlay_val) {
            (Some(Value::Object(base_tbl)), Value::Object(overlay_tbl)) => {
                base.insert(key, Value::Object(deep_merge(base_tbl, overlay_tbl)));
            }
            (_, overlay_val) => {
                base.insert(key, overlay_val);
            }
        }
    }
    base
}

/// Find the value at `path`. Keys match exactly first, then ignoring ASCII
/// case, so `Port:` in a file feeds a field named `port`.
pub fn lookup<'a>(table: &'a Table, path: &FieldPath) -> Option<&'a Value> {
    let (last, parents) = path.segments().split_last()?;
    let mut current = table;
    for segment in parents {
        current = get_key(current, segment)?.as_object()?;
    }
    get_key(current, last)
}

/// Insert `value` at `path`, creating intermediate mappings. A non-mapping
/// in the way is replaced.
pub fn set_nested(table: &mut Table, path: &FieldPath, value: Value) {
    let Some((last, parents)) = path.segments().split_last() else {
        return;
    };
    let mut current = table;
    for segment in parents {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Table::new()));
        if !slot.is_object() {
            *slot = Value::Object(Table::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        current = next;
    }
    current.insert(last.clone(), value);
}

fn matching_key(table: &Table, key: &str) -> Option<String> {
    table.keys().find(|k| k.eq_ignore_ascii_case(key)).cloned()
}

fn get_key<'a>(table: &'a Table, key: &str) -> Option<&'a Value> {
    table.get(key).or_else(|| {
        table
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}
