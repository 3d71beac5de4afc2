//! The object-graph walker.
//!
//! Every pass over a configuration graph (binding, finalize hooks,
//! descriptions, flag registration, rendering) goes through [`Fields`], so
//! all of them agree on the path of every field.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::coerce;
use crate::describe::DescriptionScope;
use crate::error::{BoxError, StrataError};
use crate::flags::FlagScope;
use crate::path::{Field, FieldPath, Segment};

/// A node of a configuration graph.
///
/// `fields` declares the node's shape; the other methods are optional
/// capabilities. Each type declares its own capabilities, so a node
/// embedded with [`Field::squash`] keeps its own hooks and the embedding
/// node keeps its own.
pub trait Config {
    /// Declare every field, in order.
    fn fields(&mut self, fields: &mut Fields<'_>);

    /// Finalize hook, called once after every leaf has been bound. Parents
    /// are finalized before their fields.
    fn post_load(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Register descriptions for this node's fields, keyed by their
    /// path relative to the node.
    fn describe_fields(&self, _descriptions: &mut DescriptionScope<'_>) {}

    /// Register command-line flags for this node's fields.
    fn add_flags(&self, _flags: &mut FlagScope<'_>) {}
}

impl<C: Config + ?Sized> Config for Box<C> {
    fn fields(&mut self, fields: &mut Fields<'_>) {
        (**self).fields(fields)
    }

    fn post_load(&mut self) -> Result<(), BoxError> {
        (**self).post_load()
    }

    fn describe_fields(&self, descriptions: &mut DescriptionScope<'_>) {
        (**self).describe_fields(descriptions)
    }

    fn add_flags(&self, flags: &mut FlagScope<'_>) {
        (**self).add_flags(flags)
    }
}

/// A terminal value: scalar, optional scalar, or collection of scalars.
pub(crate) trait Leaf {
    fn to_value(&self) -> Result<Value, serde_json::Error>;
    /// Replace the value with `raw`, weakly coerced. A `null` that the type
    /// cannot take leaves the current value in place.
    fn assign(&mut self, raw: &Value) -> Result<(), String>;
}

impl<T: Serialize + DeserializeOwned> Leaf for T {
    fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn assign(&mut self, raw: &Value) -> Result<(), String> {
        match coerce::coerce::<T>(raw) {
            Ok(value) => {
                *self = value;
                Ok(())
            }
            Err(_) if raw.is_null() => Ok(()),
            Err(reason) => Err(reason),
        }
    }
}

/// A sequence or map whose elements are [`Config`] nodes.
pub trait NodeCollection {
    /// Whether elements are addressed by string key rather than index.
    fn is_map(&self) -> bool;

    /// Every element with its segment, in a stable order.
    fn nodes_mut(&mut self) -> Vec<(String, &mut dyn Config)>;

    /// Replace the contents with default elements at `keys`.
    fn reset(&mut self, keys: &[String]);
}

impl<C: Config + Default> NodeCollection for Vec<C> {
    fn is_map(&self) -> bool {
        false
    }

    fn nodes_mut(&mut self) -> Vec<(String, &mut dyn Config)> {
        self.iter_mut()
            .enumerate()
            .map(|(i, node)| (i.to_string(), node as &mut dyn Config))
            .collect()
    }

    fn reset(&mut self, keys: &[String]) {
        self.clear();
        self.resize_with(keys.len(), C::default);
    }
}

impl<C: Config + Default> NodeCollection for BTreeMap<String, C> {
    fn is_map(&self) -> bool {
        true
    }

    fn nodes_mut(&mut self) -> Vec<(String, &mut dyn Config)> {
        self.iter_mut()
            .map(|(key, node)| (key.clone(), node as &mut dyn Config))
            .collect()
    }

    fn reset(&mut self, keys: &[String]) {
        self.clear();
        for key in keys {
            self.insert(key.clone(), C::default());
        }
    }
}

impl<C: Config + Default> NodeCollection for HashMap<String, C> {
    fn is_map(&self) -> bool {
        true
    }

    fn nodes_mut(&mut self) -> Vec<(String, &mut dyn Config)> {
        let mut nodes: Vec<(String, &mut dyn Config)> = self
            .iter_mut()
            .map(|(key, node)| (key.clone(), node as &mut dyn Config))
            .collect();
        nodes.sort_by(|a, b| a.0.cmp(&b.0));
        nodes
    }

    fn reset(&mut self, keys: &[String]) {
        self.clear();
        for key in keys {
            self.insert(key.clone(), C::default());
        }
    }
}

/// One pass over a graph. Each method sees the full path of what it visits.
pub(crate) trait Visitor {
    /// A struct node: the root, a nested or optional field, or a collection
    /// element. Inline nodes are entered with their parent's path.
    fn enter(&mut self, _path: &FieldPath, _node: &mut dyn Config) -> Result<(), StrataError> {
        Ok(())
    }

    fn leaf(
        &mut self,
        _path: &FieldPath,
        _field: &Field,
        _leaf: &mut dyn Leaf,
    ) -> Result<(), StrataError> {
        Ok(())
    }

    /// A collection of struct nodes. Returning `true` makes the walker
    /// enter every element under its index or key.
    fn collection(
        &mut self,
        _path: &FieldPath,
        _field: &Field,
        _items: &mut dyn NodeCollection,
    ) -> Result<bool, StrataError> {
        Ok(false)
    }
}

/// Field registrar handed to [`Config::fields`].
///
/// Registration methods return `&mut Self` so declarations can be chained.
/// After the first error the remaining declarations are ignored and the
/// error is reported once the walk finishes.
pub struct Fields<'w> {
    visitor: &'w mut dyn Visitor,
    naming_key: &'w str,
    path: FieldPath,
    error: Option<StrataError>,
}

impl<'w> Fields<'w> {
    pub(crate) fn walk(
        visitor: &'w mut dyn Visitor,
        naming_key: &'w str,
        prefix: FieldPath,
        root: &mut dyn Config,
    ) -> Result<(), StrataError> {
        let mut fields = Fields {
            visitor,
            naming_key,
            path: prefix,
            error: None,
        };
        fields.node(root);
        match fields.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Path of the node whose fields are being declared.
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn naming_key(&self) -> &str {
        self.naming_key
    }

    /// A terminal value.
    pub fn leaf<T>(&mut self, field: impl Into<Field>, value: &mut T) -> &mut Self
    where
        T: Serialize + DeserializeOwned,
    {
        let field = field.into();
        if self.error.is_some() {
            return self;
        }
        match field.segment(self.naming_key) {
            Segment::Skip => {}
            Segment::Inline => {
                self.error = Some(StrataError::usage(format!(
                    "field '{}' under '{}' is not a struct and cannot be squashed",
                    field.name(),
                    self.path
                )));
            }
            Segment::Named(name) => {
                self.path.push(name);
                if let Err(err) = self.visitor.leaf(&self.path, &field, value) {
                    self.error = Some(err);
                }
                self.path.pop();
            }
        }
        self
    }

    /// A struct-shaped field.
    pub fn nested<C: Config>(&mut self, field: impl Into<Field>, node: &mut C) -> &mut Self {
        let field = field.into();
        self.descend(&field, node);
        self
    }

    /// An optional struct-shaped field. `None` is replaced by `C::default()`
    /// unless the field is skipped.
    pub fn optional<C: Config + Default>(
        &mut self,
        field: impl Into<Field>,
        node: &mut Option<C>,
    ) -> &mut Self {
        let field = field.into();
        if self.error.is_some() || field.segment(self.naming_key) == Segment::Skip {
            return self;
        }
        let node = node.get_or_insert_with(C::default);
        self.descend(&field, node);
        self
    }

    /// A sequence of struct-shaped elements, addressed by index.
    pub fn seq<C: Config + Default>(&mut self, field: impl Into<Field>, items: &mut Vec<C>) -> &mut Self {
        let field = field.into();
        self.collection(&field, items);
        self
    }

    /// A string-keyed map of struct-shaped elements.
    pub fn map<M: NodeCollection>(&mut self, field: impl Into<Field>, items: &mut M) -> &mut Self {
        let field = field.into();
        self.collection(&field, items);
        self
    }

    fn node(&mut self, node: &mut dyn Config) {
        if let Err(err) = self.visitor.enter(&self.path, node) {
            self.error = Some(err);
            return;
        }
        node.fields(self);
    }

    fn descend(&mut self, field: &Field, node: &mut dyn Config) {
        if self.error.is_some() {
            return;
        }
        match field.segment(self.naming_key) {
            Segment::Skip => {}
            Segment::Inline => self.node(node),
            Segment::Named(name) => {
                self.path.push(name);
                self.node(node);
                self.path.pop();
            }
        }
    }

    fn collection(&mut self, field: &Field, items: &mut dyn NodeCollection) {
        if self.error.is_some() {
            return;
        }
        let name = match field.segment(self.naming_key) {
            Segment::Skip => return,
            Segment::Inline => {
                self.error = Some(StrataError::usage(format!(
                    "collection field '{}' under '{}' cannot be squashed",
                    field.name(),
                    self.path
                )));
                return;
            }
            Segment::Named(name) => name,
        };
        self.path.push(name);
        match self.visitor.collection(&self.path, field, items) {
            Err(err) => self.error = Some(err),
            Ok(false) => {}
            Ok(true) => {
                for (key, node) in items.nodes_mut() {
                    self.path.push(&key);
                    self.node(node);
                    self.path.pop();
                    if self.error.is_some() {
                        break;
                    }
                }
            }
        }
        self.path.pop();
    }
}
