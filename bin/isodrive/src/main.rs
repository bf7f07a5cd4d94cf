//! isodrive - run one ISOTROPY display from the command line
//!
//! Opens a session with the requested values, shows and settings, runs
//! `DISPLAY <NAME>` and prints the records as JSON.

use std::env;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{debug, error, info, warn};

use isodrive::{ConfigLoader, Session, SessionOptions};

/// Command-line arguments
#[derive(Debug, Default)]
struct AppArgs {
    /// Configuration file path
    config_path: Option<PathBuf>,
    /// Enable debug logging
    debug: bool,
    /// `KEY=VALUE` pairs sent with `VALUE`
    values: Vec<(String, String)>,
    /// Fields sent with `SHOW`
    shows: Vec<String>,
    /// Settings sent with `SETTING`
    settings: Vec<String>,
    /// Pause after `DISPLAY` before reading
    delay: Option<Duration>,
    /// Print raw lines instead of JSON records
    raw: bool,
    /// What to display
    display: Option<String>,
}

impl AppArgs {
    /// Parse command line arguments
    fn parse() -> Result<Self> {
        Self::parse_from(env::args().skip(1))
    }

    fn parse_from(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let args: Vec<String> = args.into_iter().collect();
        let mut app_args = AppArgs::default();
        let mut display: Vec<String> = Vec::new();

        let mut i = 0;
        let next = |i: &mut usize, flag: &str| -> Result<String> {
            *i += 1;
            match args.get(*i) {
                Some(value) => Ok(value.clone()),
                None => bail!("Missing value for {}", flag),
            }
        };
        while i < args.len() {
            match args[i].as_str() {
                "--config" | "-c" => {
                    app_args.config_path = Some(PathBuf::from(next(&mut i, "--config")?));
                }
                "--debug" | "-d" => {
                    app_args.debug = true;
                }
                "--value" | "-V" => {
                    let pair = next(&mut i, "--value")?;
                    let Some((key, value)) = pair.split_once('=') else {
                        bail!("Expected KEY=VALUE, got '{}'", pair);
                    };
                    app_args
                        .values
                        .push((key.trim().to_string(), value.trim().to_string()));
                }
                "--show" | "-s" => {
                    app_args.shows.push(next(&mut i, "--show")?);
                }
                "--setting" => {
                    app_args.settings.push(next(&mut i, "--setting")?);
                }
                "--delay" => {
                    let secs = next(&mut i, "--delay")?;
                    let secs: f64 = secs
                        .parse()
                        .with_context(|| format!("Invalid delay '{}'", secs))?;
                    if !secs.is_finite() || secs < 0.0 {
                        bail!("Delay must be a non-negative number of seconds");
                    }
                    app_args.delay = Some(Duration::from_secs_f64(secs));
                }
                "--raw" => {
                    app_args.raw = true;
                }
                "--help" | "-h" => {
                    print_help();
                    process::exit(0);
                }
                "--version" | "-v" => {
                    println!("isodrive v{}", isodrive::VERSION);
                    process::exit(0);
                }
                arg if arg.starts_with('-') => {
                    bail!("Unknown option: {}", arg);
                }
                arg => display.push(arg.to_string()),
            }
            i += 1;
        }

        if !display.is_empty() {
            app_args.display = Some(display.join(" "));
        }
        Ok(app_args)
    }
}

/// Print help information
fn print_help() {
    println!("isodrive - run ISOTROPY displays and print structured results");
    println!();
    println!("USAGE:");
    println!("    isodrive [OPTIONS] <DISPLAY>...");
    println!();
    println!("EXAMPLE:");
    println!("    isodrive -V PARENT=221 -s IRREP IRREP");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <PATH>       Path to configuration file");
    println!("    -d, --debug               Enable debug logging (shows console traffic)");
    println!("    -V, --value <KEY=VALUE>   Set an ISOTROPY value (repeatable)");
    println!("    -s, --show <NAME>         Show a field (repeatable)");
    println!("        --setting <NAME>      Apply a setting (repeatable)");
    println!("        --delay <SECS>        Wait after DISPLAY before reading");
    println!("        --raw                 Print raw output lines instead of JSON");
    println!("    -h, --help                Print this help message");
    println!("    -v, --version             Print version information");
    println!();
    println!("CONFIGURATION:");
    println!("    isodrive looks for configuration files in the following order:");
    println!("    1. Path specified with --config or ISODRIVE_CONFIG");
    println!("    2. ./.isodrive.toml");
    println!("    3. $XDG_CONFIG_HOME/isodrive/config.toml");
    println!("    4. ~/.isodrive.toml");
    println!("    5. Built-in defaults");
    println!();
    println!("ENVIRONMENT:");
    println!("    ISOLOCATION       Directory containing the iso executable");
    println!("    ISODRIVE_CONFIG   Path to configuration file");
    println!("    ISODRIVE_DEBUG    Enable debug logging (1 or true)");
    println!("    RUST_LOG          Set logging level (error, warn, info, debug, trace)");
}

fn load_configuration(args: &AppArgs) -> Result<isodrive::Config> {
    let config_path = args
        .config_path
        .clone()
        .or_else(|| env::var("ISODRIVE_CONFIG").ok().map(PathBuf::from));

    match &config_path {
        Some(path) => {
            debug!("Loading config from: {}", path.display());
            ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => Ok(isodrive::load_config()),
    }
}

async fn run_display(
    session: &mut Session<isodrive::ProcessLauncher>,
    display: &str,
    args: &AppArgs,
) -> Result<String> {
    if args.raw {
        let lines = session.display_raw(display, args.delay).await?;
        return Ok(lines.join("\n"));
    }
    let records = session.display(display, args.delay).await?;
    info!("{} records", records.len());
    Ok(serde_json::to_string_pretty(&records)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = AppArgs::parse().unwrap_or_else(|e| {
        eprintln!("Failed to parse arguments: {}", e);
        print_help();
        process::exit(1);
    });

    let log_level = if args.debug
        || env::var("ISODRIVE_DEBUG").is_ok_and(|v| v == "1" || v.to_lowercase() == "true")
    {
        "debug"
    } else {
        "info"
    };
    let env_filter = env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .with_writer(std::io::stderr)
        .with_target(args.debug)
        .compact()
        .init();

    let Some(display_cmd) = args.display.clone() else {
        print_help();
        process::exit(1);
    };

    let config = load_configuration(&args)?;
    let options = SessionOptions::new()
        .values(args.values.iter().cloned())
        .shows(args.shows.iter().cloned());
    let options = args
        .settings
        .iter()
        .fold(options, |options, setting| options.setting(setting.as_str()));

    let mut session = Session::open_with_config(&config, options)
        .await
        .context("Failed to start ISOTROPY")?;

    let outcome = run_display(&mut session, &display_cmd, &args).await;
    if let Err(e) = session.close().await {
        warn!("Failed to close ISOTROPY cleanly: {}", e);
    }

    match outcome {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            error!("DISPLAY {} failed: {}", display_cmd, e);
            Err(e)
        }
    }
}
