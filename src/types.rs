use std::fmt;
use std::path::PathBuf;

/// A strategy for locating configuration files, given the application name.
///
/// Finders are consulted in chain order. `{ext}` below ranges over
/// `yaml`, `yml`, `json` and `toml`, in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finder {
    /// The explicit file list (`--config`, [`StrataBuilder::file`](crate::StrataBuilder::file)).
    Direct,
    /// `./config.yaml`. Off by default; kept for applications that shipped
    /// with an unprefixed file in the working directory.
    ConfigYamlInCwd,
    /// `./.{app}.{ext}`
    Cwd,
    /// `./.{app}/config.{ext}`
    AppNameSubdir,
    /// `~/.{app}.{ext}`
    Home,
    /// `{xdg_config_home}/{app}/config.{ext}`, then every
    /// `{xdg_config_dir}/{app}/config.{ext}`.
    Xdg,
    /// `{dir}/config.{ext}` for an explicit directory.
    Path(PathBuf),
}

impl Finder {
    /// The chain used when the builder is not given one.
    pub fn default_chain() -> Vec<Finder> {
        vec![
            Finder::Direct,
            Finder::Cwd,
            Finder::AppNameSubdir,
            Finder::Home,
            Finder::Xdg,
        ]
    }
}

/// How the finder chain output is turned into a file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Use the files from the first finder that produced any.
    #[default]
    FirstMatch,
    /// Use every finder's files. Earlier finders take precedence.
    Merge,
}

/// The layer a leaf value was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLayer {
    /// Set programmatically through [`StrataBuilder::set`](crate::StrataBuilder::set).
    Override,
    /// A command-line flag that was explicitly given.
    Flag(String),
    /// An environment variable.
    Env(String),
    /// A configuration file.
    File(PathBuf),
    /// The value the leaf held before loading.
    Default,
}

impl fmt::Display for SourceLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLayer::Override => write!(f, "override"),
            SourceLayer::Flag(name) => write!(f, "flag --{name}"),
            SourceLayer::Env(name) => write!(f, "env {name}"),
            SourceLayer::File(path) => write!(f, "file {}", path.display()),
            SourceLayer::Default => write!(f, "default"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chain_starts_with_direct() {
        let chain = Finder::default_chain();
        assert_eq!(chain.first(), Some(&Finder::Direct));
        assert_eq!(chain.last(), Some(&Finder::Xdg));
        assert!(!chain.contains(&Finder::ConfigYamlInCwd));
    }

    #[test]
    fn search_mode_defaults_to_first_match() {
        assert_eq!(SearchMode::default(), SearchMode::FirstMatch);
    }

    #[test]
    fn source_layer_display() {
        assert_eq!(SourceLayer::Flag("port".into()).to_string(), "flag --port");
        assert_eq!(SourceLayer::Env("APP_PORT".into()).to_string(), "env APP_PORT");
        assert_eq!(
            SourceLayer::File("/etc/app.yaml".into()).to_string(),
            "file /etc/app.yaml"
        );
        assert_eq!(SourceLayer::Default.to_string(), "default");
    }
}
