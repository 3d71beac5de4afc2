//! The layered binder: feed every leaf of a graph from the right layer.
//!
//! Operates on pre-loaded data ([`ResolveInput`]) with no I/O, making the
//! full pipeline testable with synthetic inputs. For each leaf, highest
//! precedence first:
//!
//! 1. an explicit override at the leaf's path
//! 2. a changed flag bound to the path
//! 3. the environment variable named after the path
//! 4. the merged file value at the path
//! 5. whatever the leaf already holds
//!
//! Files are deep-merged before lookup: later files override earlier ones,
//! selected in-file profile sections override the files, and profile files
//! override both. File keys match ignoring ASCII case. Struct-shaped
//! sequences and maps are rebuilt from the file value with any overrides
//! inside them laid on top; their elements are not bound from the
//! environment.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use serde_json::Value;
use tracing::trace;

use crate::env::env_var_name;
use crate::error::StrataError;
use crate::file::LoadedFile;
use crate::flags::FlagValue;
use crate::merge::{self, Table, deep_merge};
use crate::overrides;
use crate::path::{Field, FieldPath};
use crate::types::SourceLayer;
use crate::walk::{Config, Fields, Leaf, NodeCollection, Visitor};

/// All pre-loaded data needed to bind a graph. No I/O happens here.
#[derive(Debug, Clone, Default)]
pub struct ResolveInput {
    pub app_name: String,
    pub naming_key: String,
    /// Primary files in precedence order: first = lowest priority, last = highest.
    pub files: Vec<LoadedFile>,
    /// Profile files, same order as `profiles`. All rank above `files`.
    pub profile_files: Vec<LoadedFile>,
    /// Selected profiles. Later profiles override earlier ones.
    pub profiles: Vec<String>,
    /// Key of the table holding in-file profile sections. `None` disables them.
    pub profile_key: Option<String>,
    /// Environment snapshot. `None` means env disabled.
    pub env_vars: Option<HashMap<String, String>>,
    /// Values of changed flags, keyed by the path they feed.
    pub flags: HashMap<FieldPath, FlagValue>,
    /// Explicit overrides. Later entries win.
    pub overrides: Vec<(FieldPath, Value)>,
}

impl ResolveInput {
    /// Deep-merge every file layer into one table.
    pub fn merged_files(&self) -> Table {
        let mut merged = self
            .files
            .iter()
            .fold(Table::new(), |acc, f| deep_merge(acc, f.table.clone()));

        if let Some(key) = &self.profile_key {
            if let Some(Value::Object(sections)) = merged.shift_remove(key) {
                for name in &self.profiles {
                    if let Some(Value::Object(section)) = sections.get(name) {
                        trace!(profile = %name, "applying in-file profile section");
                        merged = deep_merge(merged, section.clone());
                    }
                }
            }
        }

        self.profile_files
            .iter()
            .fold(merged, |acc, f| deep_merge(acc, f.table.clone()))
    }

    /// The highest-priority file that sets `path`, for error reporting.
    fn file_origin(&self, path: &FieldPath) -> PathBuf {
        let mut ranked = self.profile_files.iter().rev().chain(self.files.iter().rev());
        ranked
            .find(|f| merge::lookup(&f.table, path).is_some())
            .or_else(|| self.files.last())
            .map(|f| f.path.clone())
            .unwrap_or_default()
    }
}

/// Binds one or more roots against a single [`ResolveInput`].
pub struct Binder<'i> {
    input: &'i ResolveInput,
    merged: Table,
    overrides: Table,
    seen: HashSet<FieldPath>,
    bound: Vec<FieldPath>,
}

impl<'i> Binder<'i> {
    pub fn new(input: &'i ResolveInput) -> Self {
        Self {
            input,
            merged: input.merged_files(),
            overrides: overrides::overrides_to_table(&input.overrides),
            seen: HashSet::new(),
            bound: Vec::new(),
        }
    }

    /// Bind every leaf of `root`, mounted under `prefix`.
    pub fn bind(&mut self, prefix: FieldPath, root: &mut dyn Config) -> Result<(), StrataError> {
        let mut visitor = BindVisitor {
            app_name: &self.input.app_name,
            naming_key: &self.input.naming_key,
            base: FieldPath::root(),
            sources: Sources::Layers {
                input: self.input,
                overrides: &self.overrides,
            },
            table: &self.merged,
            seen: &mut self.seen,
            bound: &mut self.bound,
        };
        Fields::walk(&mut visitor, &self.input.naming_key, prefix, root)
    }

    /// Check that every override reached a field. Returns the bound paths.
    pub fn finish(self) -> Result<Vec<FieldPath>, StrataError> {
        let unknown = overrides::unknown_paths(&self.input.overrides, &self.bound);
        if let Some(path) = unknown.first() {
            return Err(StrataError::usage(format!(
                "override for '{path}' does not match any configuration field"
            )));
        }
        Ok(self.bound)
    }
}

/// Bind a single root with no prefix.
pub fn resolve(input: &ResolveInput, root: &mut dyn Config) -> Result<(), StrataError> {
    let mut binder = Binder::new(input);
    binder.bind(FieldPath::root(), root)?;
    binder.finish().map(|_| ())
}

enum Sources<'a> {
    /// Every layer, for top-level binding.
    Layers {
        input: &'a ResolveInput,
        overrides: &'a Table,
    },
    /// A single element table taken from `origin`.
    Element { origin: SourceLayer },
}

struct BindVisitor<'a> {
    app_name: &'a str,
    naming_key: &'a str,
    /// Lookups in `table` are relative to this path.
    base: FieldPath,
    sources: Sources<'a>,
    table: &'a Table,
    seen: &'a mut HashSet<FieldPath>,
    bound: &'a mut Vec<FieldPath>,
}

impl BindVisitor<'_> {
    fn relative(&self, path: &FieldPath) -> FieldPath {
        path.strip_prefix(&self.base).unwrap_or_else(|| path.clone())
    }

    fn file_value(&self, path: &FieldPath) -> Option<(Value, SourceLayer)> {
        let value = merge::lookup(self.table, &self.relative(path))?;
        let origin = match &self.sources {
            Sources::Layers { input, .. } => SourceLayer::File(input.file_origin(path)),
            Sources::Element { origin } => origin.clone(),
        };
        Some((value.clone(), origin))
    }

    fn leaf_value(&self, path: &FieldPath) -> Option<(Value, SourceLayer)> {
        if let Sources::Layers { input, overrides } = &self.sources {
            if let Some(value) = merge::lookup(overrides, path) {
                return Some((value.clone(), SourceLayer::Override));
            }
            if let Some(flag) = input.flags.get(path) {
                return Some((flag.value.clone(), SourceLayer::Flag(flag.flag.clone())));
            }
            if let Some(vars) = &input.env_vars {
                let name = env_var_name(self.app_name, path);
                if let Some(value) = vars.get(&name) {
                    return Some((Value::String(value.clone()), SourceLayer::Env(name)));
                }
            }
        }
        self.file_value(path)
    }

    /// Overrides reaching inside a collection are laid over the file value
    /// for that collection, so only the overridden paths change.
    fn collection_value(&self, path: &FieldPath) -> Option<(Value, SourceLayer)> {
        let file = self.file_value(path);
        if let Sources::Layers { overrides, .. } = &self.sources {
            if let Some(value) = merge::lookup(overrides, path) {
                let value = match file {
                    Some((base, _)) => overlay_collection(base, value.clone()),
                    None => value.clone(),
                };
                return Some((value, SourceLayer::Override));
            }
        }
        file
    }

    fn claim(&mut self, path: &FieldPath) -> Result<(), StrataError> {
        if !self.seen.insert(path.clone()) {
            return Err(StrataError::usage(format!(
                "more than one field is bound to the path '{path}'"
            )));
        }
        self.bound.push(path.clone());
        Ok(())
    }
}

impl Visitor for BindVisitor<'_> {
    fn leaf(
        &mut self,
        path: &FieldPath,
        _field: &Field,
        leaf: &mut dyn Leaf,
    ) -> Result<(), StrataError> {
        self.claim(path)?;
        let Some((raw, origin)) = self.leaf_value(path) else {
            trace!(%path, origin = %SourceLayer::Default, "no source, keeping existing value");
            return Ok(());
        };
        trace!(%path, %origin, "binding");
        leaf.assign(&raw).map_err(|reason| StrataError::Coercion {
            path: path.to_string(),
            origin,
            reason,
        })
    }

    fn collection(
        &mut self,
        path: &FieldPath,
        _field: &Field,
        items: &mut dyn NodeCollection,
    ) -> Result<bool, StrataError> {
        self.claim(path)?;
        let Some((raw, origin)) = self.collection_value(path) else {
            return Ok(false);
        };
        let coercion = |reason: String| StrataError::Coercion {
            path: path.to_string(),
            origin: origin.clone(),
            reason,
        };

        let elements: Vec<(String, &Value)> = match (&raw, items.is_map()) {
            (Value::Null, _) => return Ok(false),
            (Value::Array(list), false) => list
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            (Value::Object(map), true) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            (other, is_map) => {
                let expected = if is_map { "a mapping" } else { "a sequence" };
                return Err(coercion(format!("expected {expected}, found {}", kind(other))));
            }
        };

        let mut tables: HashMap<String, Table> = HashMap::new();
        for (key, value) in &elements {
            let table = match value {
                Value::Object(map) => map.clone(),
                Value::Null => Table::new(),
                other => {
                    return Err(coercion(format!(
                        "element '{key}' must be a mapping, found {}",
                        kind(other)
                    )));
                }
            };
            tables.insert(key.clone(), table);
        }

        let keys: Vec<String> = elements.into_iter().map(|(k, _)| k).collect();
        items.reset(&keys);
        trace!(%path, %origin, count = keys.len(), "binding collection");

        for (key, node) in items.nodes_mut() {
            let table = tables.remove(&key).unwrap_or_default();
            let element_path = path.child(&key);
            let mut seen = HashSet::new();
            let mut discarded = Vec::new();
            let mut element = BindVisitor {
                app_name: self.app_name,
                naming_key: self.naming_key,
                base: element_path.clone(),
                sources: Sources::Element {
                    origin: origin.clone(),
                },
                table: &table,
                seen: &mut seen,
                bound: &mut discarded,
            };
            Fields::walk(&mut element, self.naming_key, element_path, node)?;
        }
        Ok(false)
    }
}

fn overlay_collection(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            Value::Object(deep_merge(base, overlay))
        }
        (Value::Array(mut list), Value::Object(overlay)) => {
            let indexed: Option<Vec<(usize, Value)>> = overlay
                .into_iter()
                .map(|(k, v)| k.parse::<usize>().ok().filter(|i| *i < list.len()).map(|i| (i, v)))
                .collect();
            let Some(indexed) = indexed else {
                return Value::Array(list);
            };
            for (i, value) in indexed {
                let slot = std::mem::take(&mut list[i]);
                list[i] = overlay_collection(slot, value);
            }
            Value::Array(list)
        }
        (_, overlay) => overlay,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Fleet, Root, Server, file, input};
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn flag(path: &str, name: &str, value: Value) -> HashMap<FieldPath, FlagValue> {
        HashMap::from([(
            FieldPath::parse(path),
            FlagValue {
                flag: name.into(),
                value,
            },
        )])
    }

    #[test]
    fn defaults_only() {
        let mut root = Root::new();
        resolve(&input(), &mut root).unwrap();
        assert_eq!(root.v, "default-v");
        assert_eq!(root.sub.sv, "default-sv");
        assert_eq!(root.flag, None);
    }

    #[test]
    fn optional_struct_is_instantiated_and_bound() {
        let mut root = Root::new();
        let input = ResolveInput {
            files: vec![file("a.yaml", json!({"ptr": {"sv": "from-file"}}))],
            ..input()
        };
        resolve(&input, &mut root).unwrap();
        assert_eq!(root.ptr.unwrap().sv, "from-file");
    }

    #[test]
    fn precedence_flag_env_file_default() {
        let files = vec![file("a.yaml", json!({"v": "file"}))];
        let env_vars = env(&[("APP_V", "env")]);
        let flags = flag("v", "v", json!("flag"));

        let full = ResolveInput {
            files: files.clone(),
            env_vars: env_vars.clone(),
            flags,
            ..input()
        };
        let mut root = Root::new();
        resolve(&full, &mut root).unwrap();
        assert_eq!(root.v, "flag");

        let no_flag = ResolveInput {
            flags: HashMap::new(),
            ..full.clone()
        };
        let mut root = Root::new();
        resolve(&no_flag, &mut root).unwrap();
        assert_eq!(root.v, "env");

        let no_env = ResolveInput {
            env_vars: None,
            ..no_flag.clone()
        };
        let mut root = Root::new();
        resolve(&no_env, &mut root).unwrap();
        assert_eq!(root.v, "file");

        let no_file = ResolveInput {
            files: vec![],
            ..no_env
        };
        let mut root = Root::new();
        resolve(&no_file, &mut root).unwrap();
        assert_eq!(root.v, "default-v");
    }

    #[test]
    fn override_beats_flag() {
        let input = ResolveInput {
            flags: flag("v", "v", json!("flag")),
            overrides: vec![(FieldPath::parse("v"), json!("override"))],
            ..input()
        };
        let mut root = Root::new();
        resolve(&input, &mut root).unwrap();
        assert_eq!(root.v, "override");
    }

    #[test]
    fn empty_env_value_is_honored() {
        let input = ResolveInput {
            env_vars: env(&[("APP_SUB_SV", "")]),
            ..input()
        };
        let mut root = Root::new();
        resolve(&input, &mut root).unwrap();
        assert_eq!(root.sub.sv, "");
    }

    #[test]
    fn env_value_is_coerced() {
        let input = ResolveInput {
            env_vars: env(&[("APP_FLAG", "true")]),
            ..input()
        };
        let mut root = Root::new();
        resolve(&input, &mut root).unwrap();
        assert_eq!(root.flag, Some(true));
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let input = ResolveInput {
            files: vec![
                file("a.yaml", json!({"sub": {"sv": "a", "extra": "a"}})),
                file("b.yaml", json!({"sub": {"sv": "b"}})),
            ],
            ..input()
        };
        let mut root = Root::new();
        resolve(&input, &mut root).unwrap();
        assert_eq!(root.sub.sv, "b");
        assert_eq!(input.merged_files()["sub"]["extra"], "a");
    }

    #[test]
    fn profile_file_overrides_primary() {
        let input = ResolveInput {
            files: vec![file("main.yaml", json!({"v": "base", "sub": {"sv": "base"}}))],
            profile_files: vec![file("override.yaml", json!({"v": "override"}))],
            profiles: vec!["override".into()],
            ..input()
        };
        let mut root = Root::new();
        resolve(&input, &mut root).unwrap();
        assert_eq!(root.v, "override");
        assert_eq!(root.sub.sv, "base");
    }

    #[test]
    fn in_file_profile_section_applies_below_profile_files() {
        let main = json!({
            "v": "base",
            "sub": {"sv": "base"},
            "profiles": {
                "dev": {"v": "section", "sub": {"sv": "section"}},
                "unused": {"v": "never"}
            }
        });
        let input = ResolveInput {
            files: vec![file("main.yaml", main)],
            profile_files: vec![file("dev.yaml", json!({"sub": {"sv": "profile-file"}}))],
            profiles: vec!["dev".into()],
            profile_key: Some("profiles".into()),
            ..input()
        };
        let mut root = Root::new();
        resolve(&input, &mut root).unwrap();
        assert_eq!(root.v, "section");
        assert_eq!(root.sub.sv, "profile-file");
    }

    #[test]
    fn coercion_failure_reports_path_and_origin() {
        let input = ResolveInput {
            files: vec![file("/etc/app/config.yaml", json!({"flag": "maybe"}))],
            ..input()
        };
        let mut root = Root::new();
        match resolve(&input, &mut root) {
            Err(StrataError::Coercion { path, origin, .. }) => {
                assert_eq!(path, "flag");
                assert_eq!(origin, SourceLayer::File("/etc/app/config.yaml".into()));
            }
            other => panic!("expected coercion error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_override_is_usage_error() {
        let input = ResolveInput {
            overrides: vec![(FieldPath::parse("nope"), json!(1))],
            ..input()
        };
        let mut root = Root::new();
        assert!(matches!(
            resolve(&input, &mut root),
            Err(StrataError::Usage { .. })
        ));
    }

    #[test]
    fn prefix_mounts_root() {
        let input = ResolveInput {
            files: vec![file("a.yaml", json!({"mounted": {"v": "file"}}))],
            env_vars: env(&[("APP_MOUNTED_SUB_SV", "env")]),
            ..input()
        };
        let mut root = Root::new();
        let mut binder = Binder::new(&input);
        binder.bind(FieldPath::parse("mounted"), &mut root).unwrap();
        binder.finish().unwrap();
        assert_eq!(root.v, "file");
        assert_eq!(root.sub.sv, "env");
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let mut server = Server {
            clash: true,
            ..Default::default()
        };
        assert!(matches!(
            resolve(&input(), &mut server),
            Err(StrataError::Usage { .. })
        ));
    }

    #[test]
    fn roots_sharing_a_leaf_are_rejected() {
        let input = input();
        let mut first = Root::new();
        let mut second = Root::new();
        let mut binder = Binder::new(&input);
        binder.bind(FieldPath::root(), &mut first).unwrap();
        assert!(matches!(
            binder.bind(FieldPath::root(), &mut second),
            Err(StrataError::Usage { .. })
        ));
    }

    #[test]
    fn struct_sequence_is_rebuilt_from_file() {
        let input = ResolveInput {
            files: vec![file(
                "a.yaml",
                json!({"routes": [{"shared": "one"}, {"shared": "two"}]}),
            )],
            ..input()
        };
        let mut server = Server::default();
        resolve(&input, &mut server).unwrap();
        let shared: Vec<&str> = server.routes.iter().map(|r| r.shared.as_str()).collect();
        assert_eq!(shared, ["one", "two"]);
    }

    #[test]
    fn struct_map_is_rebuilt_from_file() {
        let input = ResolveInput {
            files: vec![file(
                "a.yaml",
                json!({"servers": {"b": {"port": "81"}, "a": {"port": 80}}}),
            )],
            ..input()
        };
        let mut fleet = Fleet::default();
        resolve(&input, &mut fleet).unwrap();
        assert_eq!(fleet.servers["a"].port, 80);
        assert_eq!(fleet.servers["b"].port, 81);
    }

    #[test]
    fn file_keys_differing_in_case_merge() {
        let input = ResolveInput {
            files: vec![
                file("low.yaml", json!({"Sub": {"sv": "low"}, "v": "low"})),
                file("high.yaml", json!({"sub": {}, "V": "high"})),
            ],
            ..input()
        };
        let mut root = Root::new();
        resolve(&input, &mut root).unwrap();
        assert_eq!(root.sub.sv, "low");
        assert_eq!(root.v, "high");
    }

    #[test]
    fn override_inside_struct_map_keeps_other_values() {
        let input = ResolveInput {
            files: vec![file(
                "a.yaml",
                json!({"servers": {"main": {"port": 80, "token": "t"}, "b": {"port": 90}}}),
            )],
            overrides: vec![(FieldPath::parse("servers.main.port"), json!(81))],
            ..input()
        };
        let mut fleet = Fleet::default();
        resolve(&input, &mut fleet).unwrap();
        let keys: Vec<&str> = fleet.servers.keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "main"]);
        assert_eq!(fleet.servers["main"].port, 81);
        assert_eq!(fleet.servers["main"].token, "t");
        assert_eq!(fleet.servers["b"].port, 90);
    }

    #[test]
    fn override_inside_struct_sequence_keeps_other_elements() {
        let input = ResolveInput {
            files: vec![file(
                "a.yaml",
                json!({"routes": [{"shared": "one"}, {"shared": "two"}]}),
            )],
            overrides: vec![(FieldPath::parse("routes.1.shared"), json!("TWO"))],
            ..input()
        };
        let mut server = Server::default();
        resolve(&input, &mut server).unwrap();
        let shared: Vec<&str> = server.routes.iter().map(|r| r.shared.as_str()).collect();
        assert_eq!(shared, ["one", "TWO"]);
    }

    #[test]
    fn struct_sequence_ignores_env() {
        let input = ResolveInput {
            env_vars: env(&[("APP_ROUTES_0_SHARED", "env")]),
            ..input()
        };
        let mut server = Server::default();
        resolve(&input, &mut server).unwrap();
        assert!(server.routes.is_empty());
    }

    #[test]
    fn scalar_for_struct_sequence_is_coercion_error() {
        let input = ResolveInput {
            files: vec![file("a.yaml", json!({"routes": "oops"}))],
            ..input()
        };
        let mut server = Server::default();
        assert!(matches!(
            resolve(&input, &mut server),
            Err(StrataError::Coercion { .. })
        ));
    }
}
