use std::borrow::Cow;
use std::fmt;

/// Canonical, segmented identifier of a configuration field.
///
/// Segments are the (possibly renamed) field names from the root down to the
/// field. Sequence and map elements use their index or key as a segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn root() -> Self {
        FieldPath(Vec::new())
    }

    /// Parse a dotted key such as `"server.port"`. The empty string is the root.
    pub fn parse(dotted: &str) -> Self {
        if dotted.is_empty() {
            return FieldPath::root();
        }
        FieldPath(dotted.split('.').map(str::to_string).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn parent(&self) -> FieldPath {
        let mut parent = self.clone();
        parent.0.pop();
        parent
    }

    pub fn child(&self, segment: impl Into<String>) -> FieldPath {
        let mut child = self.clone();
        child.0.push(segment.into());
        child
    }

    pub fn join(&self, other: &FieldPath) -> FieldPath {
        let mut joined = self.clone();
        joined.0.extend(other.0.iter().cloned());
        joined
    }

    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// The remainder of `self` below `prefix`, if `prefix` is a prefix.
    pub fn strip_prefix(&self, prefix: &FieldPath) -> Option<FieldPath> {
        self.0
            .strip_prefix(prefix.0.as_slice())
            .map(|rest| FieldPath(rest.to_vec()))
    }

    pub(crate) fn push(&mut self, segment: &str) {
        self.0.push(segment.to_string());
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(dotted: &str) -> Self {
        FieldPath::parse(dotted)
    }
}

impl From<String> for FieldPath {
    fn from(dotted: String) -> Self {
        FieldPath::parse(&dotted)
    }
}

impl From<&FieldPath> for FieldPath {
    fn from(path: &FieldPath) -> Self {
        path.clone()
    }
}

/// How a field contributes to the path of what lies beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// The field is not part of the configuration.
    Skip,
    /// The field's own fields are grafted onto the parent's path.
    Inline,
    /// The field opens a new path segment with this name.
    Named(&'a str),
}

/// Declaration of one field of a [`Config`](crate::Config) node.
///
/// A plain `&'static str` converts into a `Field` with no directives, so
/// most fields are declared by name only:
///
/// ```
/// # use strata::{Config, Field, Fields};
/// # #[derive(Default)]
/// # struct Server { host: String, port: u16, token: String }
/// impl Config for Server {
///     fn fields(&mut self, f: &mut Fields<'_>) {
///         f.leaf("host", &mut self.host);
///         f.leaf(Field::new("port").describe("TCP port to listen on"), &mut self.port);
///         f.leaf(Field::new("token").skip(), &mut self.token);
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: Cow<'static, str>,
    rename: Option<Cow<'static, str>>,
    rename_for: Vec<(Cow<'static, str>, Cow<'static, str>)>,
    skip: bool,
    skip_for: Vec<Cow<'static, str>>,
    squash: bool,
    description: Option<Cow<'static, str>>,
}

impl Field {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            rename: None,
            rename_for: Vec::new(),
            skip: false,
            skip_for: Vec::new(),
            squash: false,
            description: None,
        }
    }

    /// Use `name` as the segment under every naming key.
    pub fn rename(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.rename = Some(name.into());
        self
    }

    /// Use `name` as the segment when `naming_key` is active.
    /// Takes precedence over [`rename`](Self::rename).
    pub fn rename_for(
        mut self,
        naming_key: impl Into<Cow<'static, str>>,
        name: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.rename_for.push((naming_key.into(), name.into()));
        self
    }

    pub fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    /// Skip the field only when `naming_key` is active.
    pub fn skip_for(mut self, naming_key: impl Into<Cow<'static, str>>) -> Self {
        self.skip_for.push(naming_key.into());
        self
    }

    /// Graft a struct field's sub-fields onto the parent's path.
    pub fn squash(mut self) -> Self {
        self.squash = true;
        self
    }

    pub fn describe(mut self, text: impl Into<Cow<'static, str>>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_squash(&self) -> bool {
        self.squash
    }

    /// Resolve the directives for the active naming key.
    pub fn segment(&self, naming_key: &str) -> Segment<'_> {
        if self.skip || self.skip_for.iter().any(|k| k == naming_key) {
            return Segment::Skip;
        }
        if self.squash {
            return Segment::Inline;
        }
        if let Some((_, name)) = self.rename_for.iter().find(|(k, _)| k == naming_key) {
            return Segment::Named(name);
        }
        Segment::Named(self.rename.as_deref().unwrap_or(&self.name))
    }
}

impl From<&'static str> for Field {
    fn from(name: &'static str) -> Self {
        Field::new(name)
    }
}

impl From<String> for Field {
    fn from(name: String) -> Self {
        Field::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        let path = FieldPath::parse("server.tls.cert");
        assert_eq!(path.segments(), ["server", "tls", "cert"]);
        assert_eq!(path.to_string(), "server.tls.cert");
    }

    #[test]
    fn empty_string_is_root() {
        assert!(FieldPath::parse("").is_root());
        assert_eq!(FieldPath::root().to_string(), "");
    }

    #[test]
    fn child_parent_and_prefix() {
        let sub = FieldPath::parse("sub");
        let leaf = sub.child("value");
        assert_eq!(leaf.parent(), sub);
        assert!(leaf.starts_with(&sub));
        assert_eq!(leaf.strip_prefix(&sub), Some(FieldPath::parse("value")));
        assert_eq!(sub.strip_prefix(&leaf), None);
        assert_eq!(leaf.last(), Some("value"));
    }

    #[test]
    fn plain_field_uses_declared_name() {
        let field = Field::from("port");
        assert_eq!(field.segment("config"), Segment::Named("port"));
    }

    #[test]
    fn rename_for_active_key_wins_over_rename() {
        let field = Field::new("Port").rename("port").rename_for("env", "PORT");
        assert_eq!(field.segment("env"), Segment::Named("PORT"));
        assert_eq!(field.segment("config"), Segment::Named("port"));
    }

    #[test]
    fn skip_for_only_applies_to_its_key() {
        let field = Field::new("secret").skip_for("docs");
        assert_eq!(field.segment("docs"), Segment::Skip);
        assert_eq!(field.segment("config"), Segment::Named("secret"));
        assert_eq!(Field::new("x").skip().segment("config"), Segment::Skip);
    }

    #[test]
    fn squash_contributes_no_segment() {
        let field = Field::new("common").squash().rename("ignored");
        assert_eq!(field.segment("config"), Segment::Inline);
    }
}
