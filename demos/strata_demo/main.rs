//! # strata demo application
//!
//! A sample CLI tool that shows how to wire strata into a real application.
//! It exists purely to demonstrate and manually verify strata's features.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example strata_demo -- echo
//! cargo run --example strata_demo -- summary
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature              | How to exercise it                                                   |
//! |----------------------|----------------------------------------------------------------------|
//! | Existing values      | `cargo run --example strata_demo -- echo`                            |
//! | Config file (cwd)    | Create `.strata-demo.yaml` in cwd, then run `echo`                   |
//! | Explicit file        | `cargo run --example strata_demo -- -c demo.toml echo`               |
//! | Files from env       | `STRATA_DEMO_CONFIG=a.yaml,b.json cargo run --example strata_demo -- echo` |
//! | Profile              | Create `dev.yaml` next to the config, add `--config-profile dev`     |
//! | Env var              | `STRATA_DEMO_SERVER_PORT=9999 cargo run --example strata_demo -- echo` |
//! | Flag                 | `cargo run --example strata_demo -- --color blue -p 9000 echo`        |
//! | Repeated flag        | `cargo run --example strata_demo -- --tag a --tag b echo`             |
//! | Annotated document   | `cargo run --example strata_demo -- summary`                         |
//! | Candidate files      | `cargo run --example strata_demo -- locations`                       |
//! | Diagnostics          | `RUST_LOG=strata=trace cargo run --example strata_demo -- echo`       |

mod config;

use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use strata::{ConfigArgs, FlagSet, Strata, StrataError};

use config::DemoConfig;

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// strata demo, a sample CLI app for showcasing strata integration.
#[derive(Parser, Debug)]
#[command(name = "strata-demo")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resolved configuration (colored by display.color).
    Echo,
    /// Print the annotated configuration document.
    Summary {
        /// Print the api token instead of redacting it.
        #[arg(long)]
        show_secrets: bool,
    },
    /// List every file the finder chain would probe.
    Locations,
    /// List the configuration files that were found.
    Files,
}

// ---------------------------------------------------------------------------
// ANSI color helpers
// ---------------------------------------------------------------------------

fn ansi_color_code(name: &str) -> &str {
    match name {
        "red" => "\x1b[31m",
        "green" => "\x1b[32m",
        "yellow" => "\x1b[33m",
        "blue" => "\x1b[34m",
        "magenta" => "\x1b[35m",
        "cyan" => "\x1b[36m",
        _ => "\x1b[0m",
    }
}

const RESET: &str = "\x1b[0m";

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    // RUST_LOG takes precedence; otherwise only warnings are shown.
    let filter = EnvFilter::from_default_env().add_directive(Level::WARN.into());
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), StrataError> {
    let mut flags = FlagSet::new();
    flags.register("config", &mut DemoConfig::default())?;

    let matches = flags.augment_command(Cli::command()).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    flags.update_from_matches(&matches)?;

    let builder = Strata::builder()
        .app_name("strata-demo")
        .config_env_var()
        .flags(flags);
    let strata = cli.config.apply(builder).build()?;

    match cli.command {
        Commands::Echo => {
            let mut config = DemoConfig::default();
            strata.load(&mut config)?;
            let color = ansi_color_code(&config.display.color);
            println!("{color}server   {}:{}{RESET}", config.server.host, config.server.port);
            println!("{color}verbose  {}{RESET}", config.verbose);
            println!("{color}tags     {}{RESET}", config.tags.join(", "));
            if let Some(tls) = &config.tls {
                if !tls.cert.is_empty() {
                    println!("{color}tls      {} / {}{RESET}", tls.cert, tls.key);
                }
            }
            for upstream in &config.upstreams {
                println!("{color}upstream {} -> {}{RESET}", upstream.name, upstream.url);
            }
        }
        Commands::Summary { show_secrets } => {
            let mut config = DemoConfig::default();
            strata.load(&mut config)?;
            let token = config.api_token.clone();
            let text = strata.summarize_with(&config, |value| {
                if !show_secrets && !token.is_empty() && value == token {
                    "<redacted>".to_string()
                } else {
                    value.to_string()
                }
            })?;
            print!("{text}");
        }
        Commands::Locations => {
            for path in strata.locations() {
                println!("{}", path.display());
            }
        }
        Commands::Files => {
            for path in strata.config_files() {
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}
