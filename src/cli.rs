//! Clap adapter for strata.
//!
//! This module is the **optional integration layer** between strata's
//! parser-agnostic core and the [clap](https://docs.rs/clap) CLI parser.
//! It is compiled only when the `clap` Cargo feature is enabled (on by
//! default).
//!
//! It provides:
//!
//! - [`ConfigArgs`], a derive type to flatten into your `#[derive(Parser)]`
//!   struct for `-c/--config` and `--config-profile`;
//! - [`FlagSet::augment_command`], which adds an argument per flag binding;
//! - [`FlagSet::update_from_matches`], which records the flags the user
//!   actually typed. A flag filled from a clap default is not "changed" and
//!   does not mask the environment or a file.
//!
//! If you use a different CLI parser, skip this module and call
//! [`FlagSet::set`] directly.

use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Args, Command};

use crate::builder::StrataBuilder;
use crate::error::StrataError;
use crate::flags::{FlagArity, FlagSet};

/// Clap-derived args selecting configuration files and profiles.
///
/// Embed this into your app's clap derive:
/// ```ignore
/// #[derive(Parser)]
/// struct Cli {
///     #[command(flatten)]
///     config: ConfigArgs,
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct ConfigArgs {
    /// Configuration file to read. Repeatable; earlier files take precedence.
    #[arg(short = 'c', long = "config", value_name = "PATH", global = true)]
    pub config: Vec<PathBuf>,

    /// Configuration profile to apply on top of the files. Repeatable;
    /// later profiles win.
    #[arg(long = "config-profile", value_name = "NAME", global = true)]
    pub profiles: Vec<String>,
}

impl ConfigArgs {
    /// Hand the parsed files and profiles to `builder`.
    pub fn apply(&self, builder: StrataBuilder) -> StrataBuilder {
        builder
            .files(self.config.iter().cloned())
            .profiles(self.profiles.iter().cloned())
    }
}

impl FlagSet {
    /// Add one argument per binding to `cmd`.
    pub fn augment_command(&self, mut cmd: Command) -> Command {
        for binding in self.bindings() {
            let mut arg = Arg::new(binding.name().to_string())
                .long(binding.name().to_string())
                .help(binding.usage().to_string());
            if let Some(short) = binding.short_name() {
                arg = arg.short(short);
            }
            arg = match binding.arity() {
                FlagArity::Switch => arg.action(ArgAction::SetTrue),
                FlagArity::Multiple => arg.action(ArgAction::Append),
                FlagArity::Single => arg.action(ArgAction::Set),
            };
            cmd = cmd.arg(arg);
        }
        cmd
    }

    /// Record every bound flag given on the command line.
    pub fn update_from_matches(&mut self, matches: &ArgMatches) -> Result<(), StrataError> {
        let flags: Vec<(String, FlagArity)> = self
            .bindings()
            .iter()
            .map(|b| (b.name().to_string(), b.arity()))
            .collect();

        for (name, arity) in flags {
            if !matches.ids().any(|id| id.as_str() == name) {
                continue;
            }
            if matches.value_source(&name) != Some(ValueSource::CommandLine) {
                continue;
            }
            match arity {
                FlagArity::Switch => {
                    if matches.get_flag(&name) {
                        self.set(&name, "")?;
                    }
                }
                FlagArity::Single | FlagArity::Multiple => {
                    let Some(raw) = matches.get_raw(&name) else {
                        continue;
                    };
                    for value in raw {
                        self.set(&name, value.to_string_lossy())?;
                    }
                }
            }
        }
        Ok(())
    }
}
