//! Command-line flag bindings keyed by field path.
//!
//! A [`FlagSet`] records which flag feeds which field and, once the command
//! line has been parsed, which flags were explicitly given. Only changed
//! flags take part in binding; an untouched flag never masks the
//! environment or a file. The set is independent of any argument parser;
//! the `clap` adapter fills it from `ArgMatches`.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use crate::error::StrataError;
use crate::path::FieldPath;
use crate::walk::{Config, Fields, Visitor};

/// How many values a flag takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagArity {
    /// One value; the last occurrence wins.
    #[default]
    Single,
    /// No value. Present means `true`.
    Switch,
    /// Repeatable; every occurrence is kept, feeding a sequence leaf.
    Multiple,
}

/// A flag bound to the field at [`path`](Self::path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagBinding {
    path: FieldPath,
    name: String,
    short: Option<char>,
    usage: String,
    arity: FlagArity,
}

impl FlagBinding {
    pub fn short(&mut self, short: char) -> &mut Self {
        self.short = Some(short);
        self
    }

    pub fn switch(&mut self) -> &mut Self {
        self.arity = FlagArity::Switch;
        self
    }

    pub fn multiple(&mut self) -> &mut Self {
        self.arity = FlagArity::Multiple;
        self
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> Option<char> {
        self.short
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn arity(&self) -> FlagArity {
        self.arity
    }
}

/// The value of a changed flag, ready for binding.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagValue {
    pub flag: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default)]
pub struct FlagSet {
    bindings: Vec<FlagBinding>,
    changed: HashMap<String, Vec<String>>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind flag `--{name}` to the field at `path`.
    ///
    /// A flag name can only be bound once. Binding it again logs a warning
    /// and returns the existing binding.
    pub fn bind(
        &mut self,
        path: impl Into<FieldPath>,
        name: impl Into<String>,
        usage: impl Into<String>,
    ) -> &mut FlagBinding {
        let name = name.into();
        let path = path.into();
        let index = match self.bindings.iter().position(|b| b.name == name) {
            Some(existing) => {
                warn!(
                    flag = %name,
                    path = %path,
                    bound_to = %self.bindings[existing].path,
                    "flag is already bound; keeping the first binding"
                );
                existing
            }
            None => {
                self.bindings.push(FlagBinding {
                    path,
                    name,
                    short: None,
                    usage: usage.into(),
                    arity: FlagArity::default(),
                });
                self.bindings.len() - 1
            }
        };
        &mut self.bindings[index]
    }

    /// Collect the bindings every node of `root` declares in
    /// [`Config::add_flags`].
    pub fn register(&mut self, naming_key: &str, root: &mut dyn Config) -> Result<(), StrataError> {
        self.register_at(naming_key, FieldPath::root(), root)
    }

    /// Like [`register`](Self::register) for a root mounted under `prefix`.
    pub fn register_at(
        &mut self,
        naming_key: &str,
        prefix: FieldPath,
        root: &mut dyn Config,
    ) -> Result<(), StrataError> {
        let mut visitor = FlagVisitor { set: self };
        Fields::walk(&mut visitor, naming_key, prefix, root)
    }

    /// Record an explicitly given flag value.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<(), StrataError> {
        let Some(binding) = self.bindings.iter().find(|b| b.name == name) else {
            return Err(StrataError::usage(format!("unknown flag '--{name}'")));
        };
        let values = self.changed.entry(name.to_string()).or_default();
        if binding.arity != FlagArity::Multiple {
            values.clear();
        }
        values.push(value.into());
        Ok(())
    }

    pub fn is_changed(&self, name: &str) -> bool {
        self.changed.contains_key(name)
    }

    pub fn bindings(&self) -> &[FlagBinding] {
        &self.bindings
    }

    pub fn binding_for(&self, path: &FieldPath) -> Option<&FlagBinding> {
        self.bindings.iter().find(|b| &b.path == path)
    }

    /// Values of every changed flag, keyed by the path they feed.
    pub fn changed_values(&self) -> HashMap<FieldPath, FlagValue> {
        self.bindings
            .iter()
            .filter_map(|binding| {
                let raw = self.changed.get(&binding.name)?;
                let value = match binding.arity {
                    FlagArity::Multiple => {
                        Value::Array(raw.iter().cloned().map(Value::String).collect())
                    }
                    FlagArity::Switch if raw.last().is_none_or(|v| v.is_empty()) => {
                        Value::Bool(true)
                    }
                    _ => Value::String(raw.last().cloned().unwrap_or_default()),
                };
                Some((
                    binding.path.clone(),
                    FlagValue {
                        flag: binding.name.clone(),
                        value,
                    },
                ))
            })
            .collect()
    }
}

/// Handle given to [`Config::add_flags`]; keys are relative to the node.
pub struct FlagScope<'a> {
    base: &'a FieldPath,
    set: &'a mut FlagSet,
}

impl FlagScope<'_> {
    /// Bind `--{name}` to the field at `key`, a dotted path relative to
    /// the node.
    pub fn add(
        &mut self,
        key: &str,
        name: impl Into<String>,
        usage: impl Into<String>,
    ) -> &mut FlagBinding {
        let path = self.base.join(&FieldPath::parse(key));
        self.set.bind(path, name, usage)
    }
}

struct FlagVisitor<'s> {
    set: &'s mut FlagSet,
}

impl Visitor for FlagVisitor<'_> {
    fn enter(&mut self, path: &FieldPath, node: &mut dyn Config) -> Result<(), StrataError> {
        node.add_flags(&mut FlagScope {
            base: path,
            set: &mut *self.set,
        });
        Ok(())
    }
}
