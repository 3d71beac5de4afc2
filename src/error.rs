use std::path::PathBuf;

use thiserror::Error;

use crate::types::SourceLayer;

/// Error type returned by finalize hooks. Propagated to the caller unchanged.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum StrataError {
    #[error("App name is required; call .app_name() on the builder")]
    AppNameRequired,

    #[error("Invalid configuration usage: {reason}")]
    Usage { reason: String },

    #[error("Failed to parse {path}: {source}")]
    ParseError { path: PathBuf, source: FormatError },

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid value for '{path}' from {origin}: {reason}")]
    Coercion {
        path: String,
        origin: SourceLayer,
        reason: String,
    },

    #[error("{0}")]
    Hook(BoxError),
}

impl StrataError {
    pub(crate) fn usage(reason: impl Into<String>) -> Self {
        StrataError::Usage {
            reason: reason.into(),
        }
    }
}

/// Decoder failures for the supported file formats.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("unsupported file extension '{0}'")]
    UnsupportedExtension(String),

    #[error("top level of the document must be a mapping")]
    NotAMapping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coercion_formats_path_and_origin() {
        let err = StrataError::Coercion {
            path: "sub.port".into(),
            origin: SourceLayer::File("/etc/app/config.yaml".into()),
            reason: "invalid type: string \"abc\", expected u16".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("sub.port"));
        assert!(msg.contains("/etc/app/config.yaml"));
        assert!(msg.contains("expected u16"));
    }

    #[test]
    fn hook_error_is_verbatim() {
        let err = StrataError::Hook("scope 'nope' is not recognised".into());
        assert_eq!(err.to_string(), "scope 'nope' is not recognised");
    }

    #[test]
    fn parse_error_names_file() {
        let source: FormatError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        let err = StrataError::ParseError {
            path: "/tmp/app.json".into(),
            source,
        };
        assert!(err.to_string().contains("/tmp/app.json"));
    }

    #[test]
    fn app_name_required_formats() {
        let err = StrataError::AppNameRequired;
        assert!(err.to_string().contains("app_name"));
    }
}
