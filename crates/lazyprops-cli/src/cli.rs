//! lazyprops CLI - inspect lazily processed properties
//!
//! Usage:
//!   lazyprops get app.properties cryptomator.logDir
//!   lazyprops dump app.properties --format json
//!   lazyprops process '@{userhome}/vaults' -D user.home=/home/alice
//!   lazyprops check app.properties

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use lazyprops_core::{
    parse_entry, placeholder, PropertyProcessor, PropertyStore, Source, Substitutions, Token,
    DEFAULT_NAMESPACE,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// lazyprops - Lazily processed configuration properties
#[derive(Parser)]
#[command(name = "lazyprops")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Define or override a property (e.g. -D user.home=/home/alice)
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE", global = true)]
    defines: Vec<String>,

    /// Override an environment variable used for substitution (e.g. -e APPDIR=/opt/app)
    #[arg(short, long = "env", value_name = "NAME=VALUE", global = true)]
    envs: Vec<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get a single property, processed if it is in the cryptomator. namespace
    Get {
        /// Properties file
        file: PathBuf,

        /// Property key (e.g., cryptomator.logDir)
        key: String,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Default value if key not found
        #[arg(short, long)]
        default: Option<String>,
    },

    /// Expand placeholders in a value
    Process {
        /// Value to expand (e.g., '@{appdir}/plugins')
        value: String,

        /// Properties file providing user.home and other properties
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Print all properties
    Dump {
        /// Properties file
        file: PathBuf,

        /// Print values as stored, without processing
        #[arg(long)]
        raw: bool,

        /// Output format: properties, json, yaml
        #[arg(short, long, default_value = "properties")]
        format: String,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check properties files for syntax errors and unknown placeholders
    ///
    /// -D and -e apply, so placeholders left without a value are reported too.
    Check {
        /// Properties file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Run the CLI with the process arguments
pub fn run() -> ExitCode {
    run_from(std::env::args_os())
}

/// Run the CLI with the given arguments (the first one is the binary name)
pub fn run_from<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    run_with_output(args, &mut std::io::stdout().lock())
}

/// Run the CLI, writing command output to `out`
///
/// Diagnostics still go to stderr.
pub fn run_with_output<I, T>(args: I, out: &mut dyn Write) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    setup_logging(cli.verbose);

    let overrides = Overrides {
        defines: cli.defines,
        envs: cli.envs,
    };

    match cli.command {
        Commands::Get {
            file,
            key,
            format,
            default,
        } => cmd_get(&file, &key, &format, default, &overrides, out),
        Commands::Process { value, file } => {
            cmd_process(&value, file.as_deref(), &overrides, out)
        }
        Commands::Dump {
            file,
            raw,
            format,
            output,
        } => cmd_dump(&file, raw, &format, output, &overrides, out),
        Commands::Check { files } => cmd_check(&files, &overrides, out),
    }
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    // A subscriber may already be installed when run_from is called repeatedly
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

/// Command-line `-D` and `-e` entries
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `KEY=VALUE` entries added to the property store
    pub defines: Vec<String>,
    /// `NAME=VALUE` entries added to the substitution table
    pub envs: Vec<String>,
}

/// Read and parse a properties file
pub fn load_store(path: &Path) -> Result<PropertyStore, String> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path)
        .map_err(|e| lazyprops_core::Error::io(display.clone(), &e).to_string())?;
    PropertyStore::parse(&content).map_err(|e| {
        e.in_file(display)
            .with_help("Write backslashes as \\\\ and escapes as \\uXXXX (four hex digits)")
            .to_string()
    })
}

/// Build a processor from a store and the command-line overrides
///
/// `-D` entries replace store entries; `user.home` falls back to `home` when
/// neither the file nor `-D` sets it. The substitution table is a snapshot of
/// the process environment with `-e` entries on top.
pub fn build_processor(
    mut store: PropertyStore,
    overrides: &Overrides,
    home: Option<PathBuf>,
) -> Result<PropertyProcessor, String> {
    for define in &overrides.defines {
        let (key, value) = parse_entry(define).map_err(|e| e.to_string())?;
        store.insert(key, value);
    }
    if let Some(home) = home {
        store.insert_default("user.home", home.display().to_string());
    }

    let mut substitutions = Substitutions::from_env();
    for env in &overrides.envs {
        let (name, value) = parse_entry(env).map_err(|e| e.to_string())?;
        substitutions.insert(name, value);
    }

    tracing::debug!(
        properties = store.len(),
        substitutions = substitutions.len(),
        "Built property processor"
    );
    Ok(PropertyProcessor::new(store, substitutions))
}

/// The current user's home directory
pub fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Render a store in the given output format
pub fn render_store(store: &PropertyStore, format: &str) -> Result<String, String> {
    match format {
        "properties" => Ok(store.to_properties_string()),
        "json" => serde_json::to_string_pretty(store)
            .map(|s| s + "\n")
            .map_err(|e| e.to_string()),
        "yaml" | "yml" => serde_yaml::to_string(store).map_err(|e| e.to_string()),
        _ => Err(format!(
            "Unsupported format: {}. Use properties, json, or yaml.",
            format
        )),
    }
}

/// Render a single property as printed by `get`
pub fn render_property(key: &str, value: &str, format: &str) -> Result<String, String> {
    match format {
        "text" => Ok(format!("{}\n", value)),
        "json" => Ok(format!(
            "{}\n",
            serde_json::json!({ "key": key, "value": value })
        )),
        _ => Err(format!("Unsupported format: {}. Use text or json.", format)),
    }
}

/// Placeholders with unrecognized names in namespaced properties,
/// as `(key, placeholder)` pairs
pub fn unknown_placeholders(store: &PropertyStore) -> Vec<(String, String)> {
    store
        .iter()
        .filter(|(key, value)| {
            key.starts_with(DEFAULT_NAMESPACE) && placeholder::contains_placeholder(value)
        })
        .flat_map(|(key, value)| {
            placeholder::placeholders(value)
                .filter(|p| p.token().is_none())
                .map(move |p| (key.to_string(), value[p.span].to_string()))
        })
        .collect()
}

/// Recognized placeholders in namespaced properties whose source has no
/// value, as `(key, placeholder)` pairs. These expand to the empty string.
pub fn unresolved_placeholders(processor: &PropertyProcessor) -> Vec<(String, String)> {
    let store = processor.store();
    let namespace = processor.options().namespace.as_str();

    store
        .iter()
        .filter(|(key, value)| {
            key.starts_with(namespace) && placeholder::contains_placeholder(value)
        })
        .flat_map(|(key, value)| {
            placeholder::placeholders(value)
                .filter(move |p| match p.token().map(Token::source) {
                    Some(Source::Environment(name)) => {
                        processor.substitutions().get(name).is_none()
                    }
                    Some(Source::Property(name)) => store.get(name).is_none(),
                    None => false,
                })
                .map(move |p| (key.to_string(), value[p.span].to_string()))
        })
        .collect()
}

fn load_processor(file: Option<&Path>, overrides: &Overrides) -> Result<PropertyProcessor, String> {
    let store = match file {
        Some(path) => load_store(path)?,
        None => PropertyStore::new(),
    };
    build_processor(store, overrides, home_dir())
}

fn emit(out: &mut dyn Write, content: &str) -> ExitCode {
    match out.write_all(content.as_bytes()).and_then(|_| out.flush()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "Error writing output".red(), e);
            ExitCode::from(2)
        }
    }
}

fn cmd_get(
    file: &Path,
    key: &str,
    format: &str,
    default: Option<String>,
    overrides: &Overrides,
    out: &mut dyn Write,
) -> ExitCode {
    let processor = match load_processor(Some(file), overrides) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let value = match processor.get_property(key).or(default) {
        Some(v) => v,
        None => {
            eprintln!("{}: Property '{}' not found", "Error".red(), key);
            return ExitCode::from(1);
        }
    };

    match render_property(key, &value, format) {
        Ok(content) => emit(out, &content),
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_process(
    value: &str,
    file: Option<&Path>,
    overrides: &Overrides,
    out: &mut dyn Write,
) -> ExitCode {
    match load_processor(file, overrides) {
        Ok(processor) => emit(out, &format!("{}\n", processor.process(value))),
        Err(e) => {
            eprintln!("{}", e.red());
            ExitCode::from(2)
        }
    }
}

fn cmd_dump(
    file: &Path,
    raw: bool,
    format: &str,
    output: Option<PathBuf>,
    overrides: &Overrides,
    out: &mut dyn Write,
) -> ExitCode {
    let processor = match load_processor(Some(file), overrides) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let store = if raw {
        processor.store().clone()
    } else {
        processor.resolve_all()
    };

    let content = match render_store(&store, format) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            return ExitCode::from(1);
        }
    };

    if let Some(output_path) = output {
        if let Err(e) = std::fs::write(&output_path, &content) {
            eprintln!("{}: {}", "Error writing file".red(), e);
            return ExitCode::from(2);
        }
        eprintln!("{} Wrote to {}", "✓".green(), output_path.display());
        ExitCode::SUCCESS
    } else {
        emit(out, &content)
    }
}

fn cmd_check(files: &[PathBuf], overrides: &Overrides, out: &mut dyn Write) -> ExitCode {
    let mut all_valid = true;
    let mut report = String::new();

    for file in files {
        let processor = match load_processor(Some(file), overrides) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                all_valid = false;
                continue;
            }
        };

        for (key, placeholder) in unresolved_placeholders(&processor) {
            eprintln!(
                "{} {}: {} uses {} which has no value and expands to an empty string",
                "!".yellow(),
                file.display(),
                key,
                placeholder
            );
        }

        let unknown = unknown_placeholders(processor.store());
        if unknown.is_empty() {
            report.push_str(&format!(
                "{} {}: {} properties\n",
                "✓".green(),
                file.display(),
                processor.store().len()
            ));
        } else {
            all_valid = false;
            for (key, placeholder) in unknown {
                eprintln!(
                    "{} {}: {} uses unknown placeholder {}",
                    "✗".red(),
                    file.display(),
                    key,
                    placeholder
                );
            }
        }
    }

    let code = emit(out, &report);
    if code != ExitCode::SUCCESS {
        return code;
    }
    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
