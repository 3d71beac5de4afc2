//! File discovery and loading for config files.
//!
//! # Discovery
//!
//! Each [`Finder`] expands to an ordered list of candidate paths, one per
//! supported extension (`yaml`, `yml`, `json`, `toml`) and location. A
//! finder yields the first candidate that exists, except
//! [`Finder::Direct`], which yields every explicit file that exists.
//!
//! # Resolution
//!
//! - [`SearchMode::FirstMatch`]: the files of the first finder that found
//!   anything are the sole result.
//! - [`SearchMode::Merge`]: every finder's files, chain order.
//!
//! Either way the result is in precedence order: the first file wins for
//! any key it defines. Missing files are skipped. Only actual I/O errors
//! (permissions, etc.) and parse failures are propagated.
//!
//! # Profiles
//!
//! A profile `name` is a file `name.{ext}` next to the primary files, or,
//! when no primary file was found, in the directories the chain searches.

use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::error::StrataError;
use crate::format::Format;
use crate::merge::Table;
use crate::types::{Finder, SearchMode};

/// Filesystem anchors the finders expand against.
///
/// [`Locations::from_env`] reads them from the running system; tests build
/// one by hand so they never touch the real home directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locations {
    /// Base for the working-directory finders. `None` keeps paths relative.
    pub cwd: Option<PathBuf>,
    pub home: Option<PathBuf>,
    /// `$XDG_CONFIG_HOME` or the platform's equivalent.
    pub config_home: Option<PathBuf>,
    /// `$XDG_CONFIG_DIRS`, falling back to `/etc/xdg`.
    pub config_dirs: Vec<PathBuf>,
}

impl Locations {
    pub fn from_env() -> Self {
        let base = directories::BaseDirs::new();
        let config_dirs = match std::env::var_os("XDG_CONFIG_DIRS") {
            Some(raw) if !raw.is_empty() => std::env::split_paths(&raw)
                .filter(|p| !p.as_os_str().is_empty())
                .collect(),
            _ => vec![PathBuf::from("/etc/xdg")],
        };
        Self {
            cwd: None,
            home: base.as_ref().map(|b| b.home_dir().to_path_buf()),
            config_home: base.as_ref().map(|b| b.config_dir().to_path_buf()),
            config_dirs,
        }
    }

    fn cwd(&self) -> PathBuf {
        self.cwd.clone().unwrap_or_default()
    }

    /// Expand a leading `~` against the home directory.
    fn expand_home(&self, path: &Path) -> PathBuf {
        match (path.strip_prefix("~"), &self.home) {
            (Ok(rest), Some(home)) => home.join(rest),
            _ => path.to_path_buf(),
        }
    }
}

/// Everything a finder needs to produce candidates.
#[derive(Debug, Clone, Copy)]
pub struct FinderContext<'a> {
    pub app_name: &'a str,
    pub files: &'a [PathBuf],
    pub locations: &'a Locations,
}

/// A decoded configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub table: Table,
}

fn with_extensions(dir: &Path, stem: &str) -> Vec<PathBuf> {
    Format::all_extensions()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .collect()
}

/// Every path `finder` probes, in order, whether or not it exists.
pub fn candidates(finder: &Finder, ctx: &FinderContext<'_>) -> Vec<PathBuf> {
    let app = ctx.app_name;
    let loc = ctx.locations;
    match finder {
        Finder::Direct => ctx.files.iter().map(|f| loc.expand_home(f)).collect(),
        Finder::ConfigYamlInCwd => vec![loc.cwd().join("config.yaml")],
        Finder::Cwd => with_extensions(&loc.cwd(), &format!(".{app}")),
        Finder::AppNameSubdir => with_extensions(&loc.cwd().join(format!(".{app}")), "config"),
        Finder::Home => match &loc.home {
            Some(home) => with_extensions(home, &format!(".{app}")),
            None => Vec::new(),
        },
        Finder::Xdg => loc
            .config_home
            .iter()
            .chain(loc.config_dirs.iter())
            .flat_map(|dir| with_extensions(&dir.join(app), "config"))
            .collect(),
        Finder::Path(dir) => with_extensions(&loc.expand_home(dir), "config"),
    }
}

/// The existing files `finder` yields.
pub fn found_by(finder: &Finder, ctx: &FinderContext<'_>) -> Vec<PathBuf> {
    let candidates = candidates(finder, ctx);
    if *finder == Finder::Direct {
        return candidates
            .into_iter()
            .filter(|path| {
                let exists = path.is_file();
                if !exists {
                    warn!(path = %path.display(), "explicit config file not found");
                }
                exists
            })
            .collect();
    }
    for path in candidates {
        trace!(path = %path.display(), "probing config file");
        if path.is_file() {
            if *finder == Finder::ConfigYamlInCwd {
                warn!(
                    path = %path.display(),
                    "using ./config.yaml; consider renaming it to .{}.yaml",
                    ctx.app_name
                );
            }
            return vec![path];
        }
    }
    Vec::new()
}

/// Run the finder chain. The result is in precedence order.
pub fn discover(finders: &[Finder], ctx: &FinderContext<'_>, mode: SearchMode) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for finder in finders {
        let files = found_by(finder, ctx);
        if files.is_empty() {
            continue;
        }
        debug!(?finder, count = files.len(), "config files found");
        for path in files {
            if !found.contains(&path) {
                found.push(path);
            }
        }
        if mode == SearchMode::FirstMatch {
            break;
        }
    }
    if found.is_empty() {
        debug!(app = ctx.app_name, "no config file found, using defaults");
    }
    found
}

/// Directories the chain searches, in chain order, without duplicates.
pub fn search_dirs(finders: &[Finder], ctx: &FinderContext<'_>) -> Vec<PathBuf> {
    let loc = ctx.locations;
    let mut dirs: Vec<PathBuf> = Vec::new();
    for finder in finders {
        let found: Vec<PathBuf> = match finder {
            Finder::Direct => candidates(finder, ctx)
                .iter()
                .map(|f| f.parent().map(Path::to_path_buf).unwrap_or_default())
                .collect(),
            Finder::ConfigYamlInCwd | Finder::Cwd => vec![loc.cwd()],
            Finder::AppNameSubdir => vec![loc.cwd().join(format!(".{}", ctx.app_name))],
            Finder::Home => loc.home.iter().cloned().collect(),
            Finder::Xdg => loc
                .config_home
                .iter()
                .chain(loc.config_dirs.iter())
                .map(|d| d.join(ctx.app_name))
                .collect(),
            Finder::Path(dir) => vec![loc.expand_home(dir)],
        };
        for dir in found {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
    }
    dirs
}

/// Locate the file for `profile`. Returns `None` when there is none; an
/// absent profile is not an error.
pub fn find_profile(
    profile: &str,
    primary: &[PathBuf],
    finders: &[Finder],
    ctx: &FinderContext<'_>,
) -> Option<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for path in primary {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    if dirs.is_empty() {
        dirs = search_dirs(finders, ctx);
    }
    let found = dirs
        .iter()
        .flat_map(|dir| with_extensions(dir, profile))
        .find(|path| path.is_file());
    match &found {
        Some(path) => debug!(profile, path = %path.display(), "profile file found"),
        None => debug!(profile, "no profile file found"),
    }
    found
}

/// Read and decode one file. A file that vanished since discovery is
/// skipped; I/O errors are propagated.
pub fn load_file(path: &Path) -> Result<Option<LoadedFile>, StrataError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StrataError::IoError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    let table = Format::from_path(path)
        .and_then(|format| format.decode(&content))
        .map_err(|source| StrataError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Some(LoadedFile {
        path: path.to_path_buf(),
        table,
    }))
}

pub fn load_files<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) -> Result<Vec<LoadedFile>, StrataError> {
    let mut loaded = Vec::new();
    for path in paths {
        if let Some(file) = load_file(path)? {
            loaded.push(file);
        }
    }
    Ok(loaded)
}
