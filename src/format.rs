use std::path::Path;

use serde_json::Value;

use crate::error::FormatError;
use crate::merge::Table;

/// A supported configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
    Toml,
}

impl Format {
    /// Every format, in the order their extensions are probed.
    pub const ALL: [Format; 3] = [Format::Yaml, Format::Json, Format::Toml];

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Format::Yaml => &["yaml", "yml"],
            Format::Json => &["json"],
            Format::Toml => &["toml"],
        }
    }

    /// `yaml`, `yml`, `json`, `toml`.
    pub fn all_extensions() -> impl Iterator<Item = &'static str> {
        Format::ALL.into_iter().flat_map(|f| f.extensions().iter().copied())
    }

    pub fn from_extension(ext: &str) -> Option<Format> {
        Format::ALL
            .into_iter()
            .find(|f| f.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    pub fn from_path(path: &Path) -> Result<Format, FormatError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Format::from_extension(ext).ok_or_else(|| FormatError::UnsupportedExtension(ext.to_string()))
    }

    /// Decode a document whose top level is a mapping. An empty document
    /// decodes to an empty mapping.
    pub fn decode(self, content: &str) -> Result<Table, FormatError> {
        if content.trim().is_empty() {
            return Ok(Table::new());
        }
        let value: Value = match self {
            Format::Yaml => serde_yaml::from_str(content)?,
            Format::Json => serde_json::from_str(content)?,
            Format::Toml => Value::Object(toml::from_str::<Table>(content)?),
        };
        match value {
            Value::Object(table) => Ok(table),
            Value::Null => Ok(Table::new()),
            _ => Err(FormatError::NotAMapping),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_order() {
        let exts: Vec<&str> = Format::all_extensions().collect();
        assert_eq!(exts, ["yaml", "yml", "json", "toml"]);
    }

    #[test]
    fn format_from_path() {
        assert_eq!(Format::from_path(Path::new("a/b.yml")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("b.JSON")).unwrap(), Format::Json);
        assert_eq!(Format::from_path(Path::new("c.toml")).unwrap(), Format::Toml);
        assert!(matches!(
            Format::from_path(Path::new("d.ini")),
            Err(FormatError::UnsupportedExtension(e)) if e == "ini"
        ));
    }

    #[test]
    fn decode_yaml() {
        let t = Format::Yaml
            .decode("sub:\n  v: a\nlist:\n  - 1\n  - 2\nempty:\n")
            .unwrap();
        assert_eq!(t["sub"]["v"], "a");
        assert_eq!(t["list"][1], 2);
        assert!(t["empty"].is_null());
    }

    #[test]
    fn decode_yaml_ignores_comments() {
        let t = Format::Yaml.decode("# (env: APP_V)\nv: 'x'\n").unwrap();
        assert_eq!(t["v"], "x");
    }

    #[test]
    fn decode_json() {
        let t = Format::Json.decode(r#"{"port": 3000}"#).unwrap();
        assert_eq!(t["port"], 3000);
    }

    #[test]
    fn decode_toml() {
        let t = Format::Toml.decode("[database]\nurl = \"pg://\"\n").unwrap();
        assert_eq!(t["database"]["url"], "pg://");
    }

    #[test]
    fn empty_document_is_empty_mapping() {
        assert!(Format::Yaml.decode("").unwrap().is_empty());
        assert!(Format::Toml.decode("  \n").unwrap().is_empty());
        assert!(Format::Json.decode("null").unwrap().is_empty());
    }

    #[test]
    fn scalar_document_is_rejected() {
        assert!(matches!(Format::Json.decode("42"), Err(FormatError::NotAMapping)));
    }

    #[test]
    fn invalid_syntax_is_an_error() {
        assert!(matches!(Format::Yaml.decode("a: [1"), Err(FormatError::Yaml(_))));
        assert!(matches!(Format::Toml.decode("[[["), Err(FormatError::Toml(_))));
    }
}
