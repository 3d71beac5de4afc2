//! Layered configuration for command-line applications. Describe your
//! struct once, point at your files, and go.
//!
//! Strata binds every field of a caller-defined struct graph from five
//! layers: explicit overrides, command-line flags, environment variables,
//! one or more configuration files (optionally overlaid by named profiles),
//! and the values the struct already holds. The same description of the
//! graph renders an annotated YAML document listing every field with its
//! value, its description and the environment variable that feeds it.
//!
//! ```ignore
//! let strata = Strata::builder().app_name("myapp").build()?;
//! let mut config = AppConfig::default();
//! strata.load(&mut config)?;
//! ```
//!
//! That call looks for `.myapp.{yaml,yml,json,toml}` in the working
//! directory, `.myapp/config.*`, `~/.myapp.*` and the XDG config
//! directories, reads `MYAPP_*` environment variables, and writes the
//! result into `config`.
//!
//! # Describing a graph
//!
//! A node implements [`Config`]. Its one required method declares the
//! fields, in order, through a [`Fields`] registrar:
//!
//! ```ignore
//! impl Config for AppConfig {
//!     fn fields(&mut self, f: &mut Fields<'_>) {
//!         f.leaf(Field::new("port").describe("port to listen on"), &mut self.port)
//!             .nested("database", &mut self.database)
//!             .optional("tls", &mut self.tls)
//!             .seq("routes", &mut self.routes)
//!             .nested(Field::new("common").squash(), &mut self.common);
//!     }
//! }
//! ```
//!
//! - **Leaves** are any `Serialize + DeserializeOwned` value: scalars,
//!   `Option<T>`, sequences and maps of scalars.
//! - **Nested** nodes open a path segment; **squashed** nodes add their
//!   fields to the parent's namespace.
//! - **Optional** nodes (`Option<C>`) are instantiated with `C::default()`
//!   when walked, so after a load they are always `Some`.
//! - **Sequences and maps of nodes** are rebuilt from the override or file
//!   value as a whole. Their elements are not bound from the environment.
//!
//! [`Field`] carries the per-field directives: `rename`, `skip`, `squash`,
//! and their per-naming-key variants `rename_for` and `skip_for`. The
//! builder's [`naming_key`](StrataBuilder::naming_key) selects which
//! variants apply.
//!
//! The other [`Config`] methods are optional capabilities: `post_load` is a
//! finalize hook run parents first after binding, `describe_fields`
//! registers descriptions and `add_flags` declares command-line flags. Each
//! type owns its capabilities, so a squashed node's hook runs once for the
//! inner value and once for the outer one.
//!
//! # Layer precedence
//!
//! ```text
//! Existing values       whatever the struct holds before the load
//!        ↑ overridden by
//! Config files          finder chain output, then in-file profile
//!                       sections, then profile files
//!        ↑ overridden by
//! Environment vars      MYAPP_DATABASE_URL
//!        ↑ overridden by
//! Changed flags         only flags the user actually gave
//!        ↑ overridden by
//! Overrides             .set("database.url", ..)
//! ```
//!
//! Every layer is sparse: unset keys fall through to the layer below.
//! Values are weakly coerced, so `"8080"` from the environment fills a
//! `u16` and `"a,b"` fills a `Vec<String>`.
//!
//! # Finding files
//!
//! The [`Finder`] chain is consulted in order. Explicit files
//! ([`StrataBuilder::file`], `--config`) come first, followed by the
//! working directory, the app subdirectory, home and the XDG directories.
//! With [`SearchMode::FirstMatch`] (the default) the first finder that finds
//! anything supplies every file; with [`SearchMode::Merge`] all of them are
//! overlaid, earlier finders winning key by key.
//!
//! A profile `dev` is a file `dev.{ext}` next to the primary files, or in
//! the directories the chain searches when there is none. A file may also
//! carry in-file profiles under a `profiles` table.
//!
//! # Environment variables
//!
//! The variable for a field is the app name and every path segment joined
//! with `_`, uppercased, with every other character folded to `_`:
//!
//! | App | Path | Variable |
//! |-----|------|----------|
//! | `my-app` | `sub.value` | `MY_APP_SUB_VALUE` |
//! | `app` | `top.sub-field` | `APP_TOP_SUB_FIELD` |
//!
//! # Documents
//!
//! [`Strata::summarize`] renders a graph as YAML, a comment above each
//! field:
//!
//! ```text
//! # port to listen on (env: MYAPP_PORT)
//! port: 8080
//! ```
//!
//! The rendered document of an untouched graph is itself a valid
//! configuration file that loads back to the same values.
//!
//! # Command-line flags
//!
//! A [`FlagSet`] maps flag names to field paths and records which flags
//! were explicitly given. It is independent of any argument parser; with
//! the `clap` feature (on by default) [`ConfigArgs`] adds `-c/--config` and
//! `--config-profile`, and [`FlagSet::augment_command`] /
//! [`FlagSet::update_from_matches`] connect bound flags to a `clap::Command`.
//!
//! # Error handling
//!
//! All fallible operations return [`StrataError`]. Missing files and
//! profiles are not errors; a file that fails to parse, a value that
//! cannot be coerced and a failing hook are, and name the file, path or
//! layer involved. Diagnostics go through `tracing`.

pub mod error;
pub mod types;

mod builder;
#[cfg(feature = "clap")]
mod cli;
mod coerce;
mod describe;
mod env;
mod file;
mod flags;
mod format;
mod hooks;
pub(crate) mod merge;
mod overrides;
mod path;
mod resolve;
mod summarize;
mod walk;

#[cfg(test)]
mod fixtures;

pub use builder::{Strata, StrataBuilder};
#[cfg(feature = "clap")]
pub use cli::ConfigArgs;
pub use describe::{
    DescriptionChain, DescriptionProvider, DescriptionScope, FieldDescriptions, FieldText,
    FlagUsage,
};
pub use env::env_var_name;
pub use error::{BoxError, FormatError, StrataError};
pub use file::{LoadedFile, Locations};
pub use flags::{FlagArity, FlagBinding, FlagScope, FlagSet, FlagValue};
pub use format::Format;
pub use merge::Table;
pub use path::{Field, FieldPath, Segment};
pub use resolve::{Binder, ResolveInput, resolve};
pub use summarize::Summarizer;
pub use types::{Finder, SearchMode, SourceLayer};
pub use walk::{Config, Fields, NodeCollection};
