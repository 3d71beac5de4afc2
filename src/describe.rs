//! Field descriptions for the rendered document.
//!
//! Text can come from three places: registered by a node in
//! [`Config::describe_fields`], declared on the field with
//! [`Field::describe`], or taken from the usage of the flag bound to the
//! field. [`DescriptionChain`] asks a list of providers in order and keeps
//! the first non-empty answer.

use std::collections::HashMap;

use crate::error::StrataError;
use crate::flags::FlagSet;
use crate::path::{Field, FieldPath};
use crate::walk::{Config, Fields, NodeCollection, Visitor};

/// A source of field descriptions.
pub trait DescriptionProvider {
    /// Description of the field at `path`, or `None`. `field` is absent for
    /// struct-shaped collections rendered as values.
    fn describe(&self, path: &FieldPath, field: Option<&Field>) -> Option<String>;
}

impl<F> DescriptionProvider for F
where
    F: Fn(&FieldPath) -> Option<String>,
{
    fn describe(&self, path: &FieldPath, _field: Option<&Field>) -> Option<String> {
        self(path)
    }
}

/// Descriptions registered directly, keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDescriptions {
    by_path: HashMap<FieldPath, String>,
}

impl FieldDescriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<FieldPath>, text: impl Into<String>) {
        self.by_path.insert(path.into(), text.into());
    }

    pub fn get(&self, path: &FieldPath) -> Option<&str> {
        self.by_path.get(path).map(String::as_str)
    }

    /// Collect what every node of `root` registers in
    /// [`Config::describe_fields`].
    pub fn collect(
        &mut self,
        naming_key: &str,
        prefix: FieldPath,
        root: &mut dyn Config,
    ) -> Result<(), StrataError> {
        let mut visitor = DescribeVisitor { set: self };
        Fields::walk(&mut visitor, naming_key, prefix, root)
    }
}

impl DescriptionProvider for FieldDescriptions {
    fn describe(&self, path: &FieldPath, _field: Option<&Field>) -> Option<String> {
        self.get(path).map(str::to_string)
    }
}

/// Text declared with [`Field::describe`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldText;

impl DescriptionProvider for FieldText {
    fn describe(&self, _path: &FieldPath, field: Option<&Field>) -> Option<String> {
        field.and_then(Field::description).map(str::to_string)
    }
}

/// Usage text of the flag bound to the field.
#[derive(Debug, Clone, Copy)]
pub struct FlagUsage<'a>(pub &'a FlagSet);

impl DescriptionProvider for FlagUsage<'_> {
    fn describe(&self, path: &FieldPath, _field: Option<&Field>) -> Option<String> {
        self.0.binding_for(path).map(|b| b.usage().to_string())
    }
}

/// Providers queried in order; the first non-empty description wins.
#[derive(Default)]
pub struct DescriptionChain<'a> {
    providers: Vec<Box<dyn DescriptionProvider + 'a>>,
}

impl<'a> DescriptionChain<'a> {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn with(mut self, provider: impl DescriptionProvider + 'a) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl DescriptionProvider for DescriptionChain<'_> {
    fn describe(&self, path: &FieldPath, field: Option<&Field>) -> Option<String> {
        self.providers
            .iter()
            .filter_map(|p| p.describe(path, field))
            .find(|text| !text.trim().is_empty())
    }
}

/// Handle given to [`Config::describe_fields`]; keys are relative to the
/// node.
pub struct DescriptionScope<'a> {
    base: &'a FieldPath,
    set: &'a mut FieldDescriptions,
}

impl DescriptionScope<'_> {
    /// Describe the field at `key`, a dotted path relative to the node.
    pub fn add(&mut self, key: &str, text: impl Into<String>) {
        let path = self.base.join(&FieldPath::parse(key));
        self.set.add(path, text);
    }
}

struct DescribeVisitor<'s> {
    set: &'s mut FieldDescriptions,
}

impl Visitor for DescribeVisitor<'_> {
    fn enter(&mut self, path: &FieldPath, node: &mut dyn Config) -> Result<(), StrataError> {
        node.describe_fields(&mut DescriptionScope {
            base: path,
            set: &mut *self.set,
        });
        Ok(())
    }

    fn collection(
        &mut self,
        _path: &FieldPath,
        _field: &Field,
        _items: &mut dyn NodeCollection,
    ) -> Result<bool, StrataError> {
        Ok(true)
    }
}
