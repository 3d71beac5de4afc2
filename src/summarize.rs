//! Annotated configuration documents.
//!
//! A [`Summarizer`] walks one or more roots and renders every field as YAML,
//! with its description and environment variable in a comment above it:
//!
//! ```text
//! # port to listen on (env: MYAPP_SERVER_PORT)
//! port: 8080
//! ```
//!
//! Named struct fields open an indented section; squashed fields render in
//! their parent's section. Struct-shaped sequences and maps render as plain
//! values without an environment variable, since their elements are not
//! bound from the environment.
//!
//! Roots are cloned before walking, so rendering never touches the caller's
//! values. The output of an untouched graph is a valid configuration file:
//! loading it and rendering again reproduces it byte for byte.

use serde_json::Value;
use tracing::warn;

use crate::describe::{DescriptionChain, DescriptionProvider, FieldDescriptions, FieldText, FlagUsage};
use crate::env::env_var_name;
use crate::error::StrataError;
use crate::flags::FlagSet;
use crate::merge::{Table, set_nested};
use crate::path::{Field, FieldPath};
use crate::walk::{Config, Fields, Leaf, NodeCollection, Visitor};

/// Width at which description lines are wrapped.
const WRAP_WIDTH: usize = 95;

type ValueFilter<'a> = Box<dyn Fn(&str) -> String + 'a>;

/// Builder for a rendered document.
pub struct Summarizer<'a> {
    app_name: &'a str,
    naming_key: &'a str,
    flags: Option<&'a FlagSet>,
    roots: Vec<(FieldPath, Box<dyn Config + 'a>)>,
    descriptions: Option<Box<dyn DescriptionProvider + 'a>>,
    filter: Option<ValueFilter<'a>>,
}

impl<'a> Summarizer<'a> {
    pub fn new(app_name: &'a str, naming_key: &'a str) -> Self {
        Self {
            app_name,
            naming_key,
            flags: None,
            roots: Vec::new(),
            descriptions: None,
            filter: None,
        }
    }

    /// Use the usage text of these flags as descriptions.
    pub fn flags(mut self, flags: &'a FlagSet) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Add a root. Roots are rendered in the order they are added.
    pub fn root<C: Config + Clone + 'a>(self, root: &C) -> Self {
        self.root_at(FieldPath::root(), root)
    }

    /// Add a root mounted under `prefix`.
    pub fn root_at<C: Config + Clone + 'a>(mut self, prefix: impl Into<FieldPath>, root: &C) -> Self {
        self.roots.push((prefix.into(), Box::new(root.clone())));
        self
    }

    /// Replace the default description chain (registered descriptions,
    /// then [`Field::describe`] text, then flag usage).
    pub fn descriptions(mut self, provider: impl DescriptionProvider + 'a) -> Self {
        self.descriptions = Some(Box::new(provider));
        self
    }

    /// Pass every rendered scalar through `filter`, e.g. to redact secrets.
    pub fn filter(mut self, filter: impl Fn(&str) -> String + 'a) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn render(self) -> Result<String, StrataError> {
        let Summarizer {
            app_name,
            naming_key,
            flags,
            mut roots,
            descriptions,
            filter,
        } = self;

        let descriptions: Box<dyn DescriptionProvider + 'a> = match descriptions {
            Some(custom) => custom,
            None => {
                let mut direct = FieldDescriptions::new();
                for (prefix, root) in roots.iter_mut() {
                    direct.collect(naming_key, prefix.clone(), root.as_mut())?;
                }
                let mut chain = DescriptionChain::new().with(direct).with(FieldText);
                if let Some(flags) = flags {
                    chain = chain.with(FlagUsage(flags));
                }
                Box::new(chain)
            }
        };

        let mut tree = Section::default();
        for (prefix, root) in roots.iter_mut() {
            let mut visitor = RenderVisitor {
                tree: &mut tree,
                app_name,
                naming_key,
                descriptions: descriptions.as_ref(),
            };
            Fields::walk(&mut visitor, naming_key, prefix.clone(), root.as_mut())?;
        }

        let identity = |s: &str| s.to_string();
        let filter: &dyn Fn(&str) -> String = match &filter {
            Some(f) => f.as_ref(),
            None => &identity,
        };
        let mut out = String::new();
        tree.write(&mut out, "", filter);
        Ok(strip_trailing_whitespace(&out))
    }
}

/// A node of the document. The root has an empty name; leaves carry a value.
#[derive(Debug, Default, PartialEq)]
struct Section {
    name: String,
    value: Option<Value>,
    description: Option<String>,
    env: Option<String>,
    children: Vec<Section>,
}

impl Section {
    /// The section at `path`, created as needed.
    fn section_mut(&mut self, path: &FieldPath) -> &mut Section {
        let mut current = self;
        for segment in path.segments() {
            let index = match current.children.iter().position(|c| &c.name == segment) {
                Some(index) => index,
                None => {
                    current.children.push(Section {
                        name: segment.clone(),
                        ..Default::default()
                    });
                    current.children.len() - 1
                }
            };
            current = &mut current.children[index];
        }
        current
    }

    /// Add `entry` unless an entry of the same name exists. A differing
    /// duplicate is reported and dropped.
    fn add(&mut self, entry: Section) {
        match self.children.iter().find(|c| c.name == entry.name) {
            Some(existing) => {
                if existing.value != entry.value
                    || existing.description != entry.description
                    || existing.env != entry.env
                {
                    warn!(
                        name = %entry.name,
                        kept = ?existing.value,
                        dropped = ?entry.value,
                        "multiple entries with different values; keeping the first"
                    );
                }
            }
            None => self.children.push(entry),
        }
    }

    fn comment_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = match &self.description {
            Some(text) => text
                .trim()
                .lines()
                .flat_map(|line| word_wrap(line.trim(), WRAP_WIDTH))
                .collect(),
            None => Vec::new(),
        };
        if let Some(env) = &self.env {
            let hint = format!("(env: {env})");
            match lines.last_mut() {
                Some(last) if !last.is_empty() => {
                    last.push(' ');
                    last.push_str(&hint);
                }
                _ => lines.push(hint),
            }
        }
        lines
    }

    fn write(&self, out: &mut String, indent: &str, filter: &dyn Fn(&str) -> String) {
        let mut next_indent = indent.to_string();
        if !self.name.is_empty() {
            next_indent.push_str("  ");
            for line in self.comment_lines() {
                out.push_str(indent);
                out.push_str("# ");
                out.push_str(&line);
                out.push('\n');
            }
            out.push_str(indent);
            out.push_str(&self.name);
            out.push(':');
            if let Some(value) = &self.value {
                let rendered = render_value(value, &next_indent, filter);
                if !rendered.is_empty() {
                    out.push(' ');
                    out.push_str(&rendered);
                }
            }
            out.push('\n');
        }
        for child in &self.children {
            child.write(out, &next_indent, filter);
            if child.children.is_empty() {
                out.push('\n');
            }
        }
    }
}

/// Render `value` the way it follows `name:` on a line whose children are
/// indented by `indent`.
fn render_value(value: &Value, indent: &str, filter: &dyn Fn(&str) -> String) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => quote(&filter(s)),
        Value::Bool(_) | Value::Number(_) => filter(&value.to_string()),
        Value::Array(items) if items.is_empty() => "[]".to_string(),
        Value::Object(map) if map.is_empty() => "{}".to_string(),
        Value::Array(items) => {
            let child_indent = format!("{indent}  ");
            let mut buf = String::new();
            for item in items {
                buf.push('\n');
                buf.push_str(indent);
                buf.push_str("- ");
                buf.push_str(render_value(item, &child_indent, filter).trim());
                // separate mapping entries by an empty line
                if item.is_object() {
                    buf.push('\n');
                }
            }
            buf.strip_suffix('\n').map(str::to_string).unwrap_or(buf)
        }
        Value::Object(map) => {
            let child_indent = format!("{indent}  ");
            let mut buf = String::new();
            for (key, item) in map {
                buf.push('\n');
                buf.push_str(indent);
                buf.push_str(&render_key(key));
                buf.push_str(": ");
                buf.push_str(&render_value(item, &child_indent, filter));
            }
            buf
        }
    }
}

/// A mapping key, quoted unless it reads back as the same plain string.
fn render_key(key: &str) -> String {
    const RESERVED: [&str; 11] = [
        "true", "false", "null", "yes", "no", "on", "off", "y", "n", "~", "nan",
    ];
    let plain = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'))
        && !RESERVED.iter().any(|r| r.eq_ignore_ascii_case(key));
    if plain { key.to_string() } else { quote(key) }
}

/// Single-quoted YAML scalar, or a double-quoted one when the text holds
/// control characters.
fn quote(s: &str) -> String {
    if s.chars().any(char::is_control) {
        return serde_json::to_string(s).unwrap_or_else(|_| format!("'{}'", s.replace('\'', "''")));
    }
    format!("'{}'", s.replace('\'', "''"))
}

fn word_wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    lines.push(current);
    lines
}

fn strip_trailing_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        match line.strip_suffix('\n') {
            Some(body) => {
                out.push_str(body.trim_end_matches([' ', '\r']));
                out.push('\n');
            }
            None => out.push_str(line.trim_end_matches([' ', '\r'])),
        }
    }
    out
}

struct RenderVisitor<'r> {
    tree: &'r mut Section,
    app_name: &'r str,
    naming_key: &'r str,
    descriptions: &'r dyn DescriptionProvider,
}

impl RenderVisitor<'_> {
    fn add(&mut self, path: &FieldPath, field: &Field, value: Value, env: Option<String>) {
        let entry = Section {
            name: path.last().unwrap_or_default().to_string(),
            value: Some(value),
            description: self.descriptions.describe(path, Some(field)),
            env,
            children: Vec::new(),
        };
        self.tree.section_mut(&path.parent()).add(entry);
    }
}

impl Visitor for RenderVisitor<'_> {
    fn enter(&mut self, path: &FieldPath, _node: &mut dyn Config) -> Result<(), StrataError> {
        self.tree.section_mut(path);
        Ok(())
    }

    fn leaf(
        &mut self,
        path: &FieldPath,
        field: &Field,
        leaf: &mut dyn Leaf,
    ) -> Result<(), StrataError> {
        let value = leaf_value(path, leaf);
        let env = env_var_name(self.app_name, path);
        self.add(path, field, value, Some(env));
        Ok(())
    }

    fn collection(
        &mut self,
        path: &FieldPath,
        field: &Field,
        items: &mut dyn NodeCollection,
    ) -> Result<bool, StrataError> {
        let value = collection_value(self.naming_key, items)?;
        self.add(path, field, value, None);
        Ok(false)
    }
}

/// Mapping keys come back sorted, so hash maps render the same way every time.
fn leaf_value(path: &FieldPath, leaf: &dyn Leaf) -> Value {
    let value = leaf.to_value().unwrap_or_else(|err| {
        warn!(%path, %err, "field value cannot be rendered");
        Value::Null
    });
    sort_keys(value)
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Every element of a struct collection as a plain value.
fn collection_value(naming_key: &str, items: &mut dyn NodeCollection) -> Result<Value, StrataError> {
    let is_map = items.is_map();
    let mut list = Vec::new();
    let mut map = Table::new();
    for (key, node) in items.nodes_mut() {
        let mut snapshot = Snapshot {
            naming_key,
            table: Table::new(),
        };
        Fields::walk(&mut snapshot, naming_key, FieldPath::root(), node)?;
        let element = Value::Object(snapshot.table);
        if is_map {
            map.insert(key, element);
        } else {
            list.push(element);
        }
    }
    Ok(if is_map { Value::Object(map) } else { Value::Array(list) })
}

/// Collects a node's leaves into a nested table.
struct Snapshot<'s> {
    naming_key: &'s str,
    table: Table,
}

impl Visitor for Snapshot<'_> {
    fn leaf(
        &mut self,
        path: &FieldPath,
        _field: &Field,
        leaf: &mut dyn Leaf,
    ) -> Result<(), StrataError> {
        set_nested(&mut self.table, path, leaf_value(path, leaf));
        Ok(())
    }

    fn collection(
        &mut self,
        path: &FieldPath,
        _field: &Field,
        items: &mut dyn NodeCollection,
    ) -> Result<bool, StrataError> {
        let value = collection_value(self.naming_key, items)?;
        set_nested(&mut self.table, path, value);
        Ok(false)
    }
}
