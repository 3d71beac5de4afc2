use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, trace};

use crate::env;
use crate::error::StrataError;
use crate::file::{self, FinderContext, Locations};
use crate::flags::FlagSet;
use crate::hooks;
use crate::path::FieldPath;
use crate::resolve::{Binder, ResolveInput};
use crate::summarize::Summarizer;
use crate::types::{Finder, SearchMode};
use crate::walk::Config;

const DEFAULT_NAMING_KEY: &str = "config";
const DEFAULT_PROFILE_KEY: &str = "profiles";

/// Where leaf values may come from in the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum EnvSource {
    /// Snapshot the process environment at load time.
    Process,
    /// A fixed map, for tests and embedding.
    Fixed(HashMap<String, String>),
    Disabled,
}

/// A configured configuration space: where files are found, which layers
/// take part, and which flags are bound.
///
/// Built once with [`Strata::builder`] and then used to load any number of
/// roots. Each load reads the files and environment afresh.
#[derive(Debug, Clone)]
pub struct Strata {
    app_name: String,
    naming_key: String,
    finders: Vec<Finder>,
    search_mode: SearchMode,
    files: Vec<PathBuf>,
    profiles: Vec<String>,
    profile_key: Option<String>,
    env: EnvSource,
    locations: Locations,
    flags: FlagSet,
    overrides: Vec<(FieldPath, Value)>,
}

impl Strata {
    pub fn builder() -> StrataBuilder {
        StrataBuilder::new()
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn naming_key(&self) -> &str {
        &self.naming_key
    }

    pub fn finders(&self) -> &[Finder] {
        &self.finders
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    /// Mutable access to the flag set, e.g. to record parsed values after
    /// the space has been built.
    pub fn flags_mut(&mut self) -> &mut FlagSet {
        &mut self.flags
    }

    /// Environment variable that feeds the field at `path` (a dotted path).
    pub fn env_var(&self, path: &str) -> String {
        env::env_var_name(&self.app_name, &FieldPath::parse(path))
    }

    fn finder_context(&self) -> FinderContext<'_> {
        FinderContext {
            app_name: &self.app_name,
            files: &self.files,
            locations: &self.locations,
        }
    }

    /// Every path the finder chain would probe, in chain order, whether or
    /// not it exists. Meant for help output.
    pub fn locations(&self) -> Vec<PathBuf> {
        let ctx = self.finder_context();
        let mut all: Vec<PathBuf> = Vec::new();
        for finder in &self.finders {
            for path in file::candidates(finder, &ctx) {
                if !all.contains(&path) {
                    all.push(path);
                }
            }
        }
        all
    }

    /// The configuration files a load would read, highest precedence first.
    pub fn config_files(&self) -> Vec<PathBuf> {
        file::discover(&self.finders, &self.finder_context(), self.search_mode)
    }

    /// Gather every layer from disk, the environment and the flag set.
    fn build_input(&self) -> Result<ResolveInput, StrataError> {
        let ctx = self.finder_context();
        let mut found = file::discover(&self.finders, &ctx, self.search_mode);
        let profile_paths: Vec<PathBuf> = self
            .profiles
            .iter()
            .filter_map(|profile| file::find_profile(profile, &found, &self.finders, &ctx))
            .collect();

        // binding wants lowest precedence first
        found.reverse();
        let files = file::load_files(&found)?;
        let profile_files = file::load_files(&profile_paths)?;

        let env_vars = match &self.env {
            EnvSource::Process => Some(env::snapshot()),
            EnvSource::Fixed(vars) => Some(vars.clone()),
            EnvSource::Disabled => None,
        };

        Ok(ResolveInput {
            app_name: self.app_name.clone(),
            naming_key: self.naming_key.clone(),
            files,
            profile_files,
            profiles: self.profiles.clone(),
            profile_key: self.profile_key.clone(),
            env_vars,
            flags: self.flags.changed_values(),
            overrides: self.overrides.clone(),
        })
    }

    /// Bind `root` from every layer, then run its finalize hooks.
    pub fn load<C: Config>(&self, root: &mut C) -> Result<(), StrataError> {
        self.load_mounted(&mut [(FieldPath::root(), root as &mut dyn Config)])
    }

    /// Like [`load`](Self::load) with `root` mounted under `prefix`: the
    /// field `port` of the root is found at `{prefix}.port` in files and
    /// feeds from `{APP}_{PREFIX}_PORT`.
    pub fn load_at<C: Config>(
        &self,
        prefix: impl Into<FieldPath>,
        root: &mut C,
    ) -> Result<(), StrataError> {
        self.load_mounted(&mut [(prefix.into(), root as &mut dyn Config)])
    }

    /// Load several roots against the same layers. Their paths share one
    /// namespace, so two roots declaring the same leaf is a usage error.
    pub fn load_all(&self, roots: &mut [&mut dyn Config]) -> Result<(), StrataError> {
        let mut mounted: Vec<(FieldPath, &mut dyn Config)> = roots
            .iter_mut()
            .map(|root| (FieldPath::root(), &mut **root as &mut dyn Config))
            .collect();
        self.load_mounted(&mut mounted)
    }

    /// Load several roots, each under its own prefix.
    pub fn load_mounted(&self, roots: &mut [(FieldPath, &mut dyn Config)]) -> Result<(), StrataError> {
        let input = self.build_input()?;
        let mut binder = Binder::new(&input);
        for (prefix, root) in roots.iter_mut() {
            binder.bind(prefix.clone(), &mut **root)?;
        }
        let bound = binder.finish()?;
        trace!(leaves = bound.len(), "configuration bound");

        for (prefix, root) in roots.iter_mut() {
            hooks::post_load(&self.naming_key, prefix.clone(), &mut **root)?;
        }
        debug!(app = %self.app_name, roots = roots.len(), "configuration loaded");
        Ok(())
    }

    /// A document renderer preset with this space's names and flags.
    pub fn summarizer(&self) -> Summarizer<'_> {
        Summarizer::new(&self.app_name, &self.naming_key).flags(&self.flags)
    }

    /// Render `root` as an annotated document.
    pub fn summarize<C: Config + Clone>(&self, root: &C) -> Result<String, StrataError> {
        self.summarizer().root(root).render()
    }

    /// Render `root` with every scalar passed through `filter`.
    pub fn summarize_with<C: Config + Clone>(
        &self,
        root: &C,
        filter: impl Fn(&str) -> String,
    ) -> Result<String, StrataError> {
        self.summarizer().root(root).filter(filter).render()
    }
}

/// Builder for [`Strata`].
///
/// Controls three independent axes:
///
/// - **Discovery**: [`finders()`](Self::finders), [`file()`](Self::file) and
///   [`search_mode()`](Self::search_mode) decide which files are read.
/// - **Layers**: [`profile()`](Self::profile), [`no_env()`](Self::no_env),
///   [`flags()`](Self::flags) and [`set()`](Self::set) add or remove sources.
/// - **Naming**: [`app_name()`](Self::app_name) prefixes environment
///   variables and file names; [`naming_key()`](Self::naming_key) selects
///   per-key renames and skips.
#[derive(Debug, Clone)]
pub struct StrataBuilder {
    app_name: Option<String>,
    naming_key: String,
    finders: Option<Vec<Finder>>,
    search_mode: SearchMode,
    files: Vec<PathBuf>,
    profiles: Vec<String>,
    profile_key: Option<String>,
    env: EnvSource,
    locations: Option<Locations>,
    flags: FlagSet,
    overrides: Vec<(FieldPath, Value)>,
    config_env_var: bool,
}

impl Default for StrataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StrataBuilder {
    fn new() -> Self {
        Self {
            app_name: None,
            naming_key: DEFAULT_NAMING_KEY.to_string(),
            finders: None,
            search_mode: SearchMode::default(),
            files: Vec::new(),
            profiles: Vec::new(),
            profile_key: Some(DEFAULT_PROFILE_KEY.to_string()),
            env: EnvSource::Process,
            locations: None,
            flags: FlagSet::new(),
            overrides: Vec::new(),
            config_env_var: false,
        }
    }

    /// Set the application name. Required; it prefixes environment
    /// variables and names the files the finders look for.
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }

    /// Select per-key renames and skips (default: `"config"`).
    pub fn naming_key(mut self, key: &str) -> Self {
        self.naming_key = key.to_string();
        self
    }

    /// Replace the finder chain (default: [`Finder::default_chain`]).
    /// Finders are listed highest precedence first.
    pub fn finders(mut self, finders: Vec<Finder>) -> Self {
        self.finders = Some(finders);
        self
    }

    /// Append a finder. If no chain has been set yet, starts from the
    /// default chain.
    pub fn add_finder(mut self, finder: Finder) -> Self {
        self.finders
            .get_or_insert_with(Finder::default_chain)
            .push(finder);
        self
    }

    /// Set the search mode (default: [`SearchMode::FirstMatch`]).
    pub fn search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    /// Add an explicit configuration file, read by [`Finder::Direct`].
    /// Earlier files take precedence over later ones.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    pub fn files<P: Into<PathBuf>>(mut self, paths: impl IntoIterator<Item = P>) -> Self {
        self.files.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Select a profile. Later profiles override earlier ones.
    pub fn profile(mut self, name: &str) -> Self {
        self.profiles.push(name.to_string());
        self
    }

    pub fn profiles<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.profiles.extend(names.into_iter().map(Into::into));
        self
    }

    /// Key of the table holding in-file profile sections (default:
    /// `"profiles"`). `None` disables in-file profiles.
    pub fn profile_key(mut self, key: Option<&str>) -> Self {
        self.profile_key = key.map(str::to_string);
        self
    }

    /// Disable environment variable loading entirely.
    pub fn no_env(mut self) -> Self {
        self.env = EnvSource::Disabled;
        self
    }

    /// Read environment variables from `vars` instead of the process
    /// environment.
    pub fn env_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env = EnvSource::Fixed(env::collect(
            vars.into_iter().map(|(k, v)| (k.into(), v.into())),
        ));
        self
    }

    /// Anchor the finders somewhere other than the running system's
    /// directories.
    pub fn locations(mut self, locations: Locations) -> Self {
        self.locations = Some(locations);
        self
    }

    /// Flags bound to fields. Only flags recorded as changed take part.
    pub fn flags(mut self, flags: FlagSet) -> Self {
        self.flags = flags;
        self
    }

    /// Set the field at `key` (a dotted path) explicitly. Overrides beat
    /// every other layer; later calls win. An override that matches no
    /// field is a usage error at load time.
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.overrides.push((FieldPath::parse(key), value.into()));
        self
    }

    /// When no explicit file was given, read a comma-separated list from
    /// `{APP}_CONFIG`.
    pub fn config_env_var(mut self) -> Self {
        self.config_env_var = true;
        self
    }

    pub fn build(self) -> Result<Strata, StrataError> {
        let app_name = self.app_name.ok_or(StrataError::AppNameRequired)?;
        if app_name.is_empty() {
            return Err(StrataError::AppNameRequired);
        }

        let mut files = self.files;
        if self.config_env_var && files.is_empty() {
            let name = env::env_var_name(&app_name, &FieldPath::parse("config"));
            let raw = match &self.env {
                EnvSource::Fixed(vars) => vars.get(&name).cloned(),
                _ => std::env::var(&name).ok(),
            };
            if let Some(raw) = raw {
                debug!(var = %name, "config files from environment");
                files.extend(
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(PathBuf::from),
                );
            }
        }

        Ok(Strata {
            app_name,
            naming_key: self.naming_key,
            finders: self.finders.unwrap_or_else(Finder::default_chain),
            search_mode: self.search_mode,
            files,
            profiles: self.profiles,
            profile_key: self.profile_key,
            env: self.env,
            locations: self.locations.unwrap_or_else(Locations::from_env),
            flags: self.flags,
            overrides: self.overrides,
        })
    }
}
