//! Convert explicit overrides into a nested table.
//!
//! Each `("database.url", Value)` pair is expanded into the nested mapping
//! the binder looks leaves up in.

use serde_json::Value;

use crate::merge::{Table, set_nested};
use crate::path::FieldPath;

/// Convert path-keyed overrides into a nested table.
///
/// `("database.url", "pg://")` becomes `{"database": {"url": "pg://"}}`.
///
/// If multiple entries target the same key, the last one wins.
pub fn overrides_to_table(entries: &[(FieldPath, Value)]) -> Table {
    let mut table = Table::new();
    for (path, value) in entries {
        set_nested(&mut table, path, value.clone());
    }
    table
}

/// Overrides whose path reaches no bound field. An override is accepted if
/// it names a field, any struct above one, or a path inside a struct
/// collection.
pub fn unknown_paths<'a>(
    entries: &'a [(FieldPath, Value)],
    bound: &[FieldPath],
) -> Vec<&'a FieldPath> {
    entries
        .iter()
        .map(|(path, _)| path)
        .filter(|path| !bound.iter().any(|b| b.starts_with(path) || path.starts_with(b)))
        .collect()
}
