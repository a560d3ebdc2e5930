//! Logging System
//!
//! Structured logging using the `tracing` crate: configurable levels, text or
//! json output, and stdout / stderr / file destinations. The library emits
//! events either way; `init_logging` is for binaries and tests that want them
//! recorded.

use crate::component::path::canonicalize_location;
use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Resolve the log file path with precedence: explicit argument,
/// PRODREG_LOG_FILE env, config file, default.
///
/// The default lives in the `ProjectDirs` state directory, under a segment per
/// alternate root when one is given so image installs log apart from the host.
pub fn resolve_log_file_path(
    explicit: Option<PathBuf>,
    config_file: Option<PathBuf>,
    alternate_root: Option<&Path>,
) -> Result<PathBuf, RegistryError> {
    if let Some(p) = explicit {
        if !p.as_os_str().is_empty() {
            return Ok(p);
        }
    }
    if let Ok(env_path) = std::env::var("PRODREG_LOG_FILE") {
        if !env_path.is_empty() {
            return Ok(PathBuf::from(env_path));
        }
    }
    if let Some(p) = config_file {
        if !p.as_os_str().is_empty() {
            return Ok(p);
        }
    }
    default_log_file_path(alternate_root)
}

fn default_log_file_path(alternate_root: Option<&Path>) -> Result<PathBuf, RegistryError> {
    let project_dirs = directories::ProjectDirs::from("", "prodreg", "prodreg").ok_or_else(|| {
        RegistryError::Config(
            "Could not determine platform state directory for log file".to_string(),
        )
    })?;
    let state_dir = project_dirs
        .state_dir()
        .ok_or_else(|| {
            RegistryError::Config(
                "Platform state directory not available for log file".to_string(),
            )
        })?
        .to_path_buf();
    let dir = match alternate_root {
        Some(root) => {
            let canonical = canonicalize_location(root);
            let mut path = state_dir;
            for component in canonical.components() {
                match component {
                    std::path::Component::RootDir
                    | std::path::Component::Prefix(_)
                    | std::path::Component::CurDir
                    | std::path::Component::ParentDir => {}
                    std::path::Component::Normal(name) => {
                        path = path.join(name);
                    }
                }
            }
            path
        }
        None => state_dir,
    };
    Ok(dir.join("prodreg.log"))
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether logging is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, file, file+stderr, both
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output includes file; None means use runtime default
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Enable colored output (text format only, stdout/stderr only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "file".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

/// Initialize the global subscriber
///
/// Priority order (highest to lowest):
/// 1. Environment variables (PRODREG_LOG, PRODREG_LOG_FORMAT, etc.)
/// 2. Configuration
/// 3. Defaults
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), RegistryError> {
    if config.is_some_and(|c| !c.enabled) {
        return Registry::default()
            .with(EnvFilter::new("off"))
            .with(fmt::layer().with_writer(std::io::sink))
            .try_init()
            .map_err(already_set);
    }

    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let output = determine_output(config)?;
    let use_color = config.map(|c| c.color).unwrap_or(true);

    let log_file_path = config
        .and_then(|c| c.file.clone())
        .or_else(|| resolve_log_file_path(None, None, None).ok());
    let open_log_file = || -> Result<std::fs::File, RegistryError> {
        let log_file = log_file_path.clone().ok_or_else(|| {
            RegistryError::Config("Log file path not set and default resolution failed".to_string())
        })?;
        if let Some(parent) = log_file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RegistryError::Config(format!("Failed to create log directory: {}", e))
            })?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .map_err(|e| {
                RegistryError::Config(format!("Failed to open log file {:?}: {}", log_file, e))
            })
    };

    let writer = match (output.file, output.stdout, output.stderr) {
        (true, _, true) => BoxMakeWriter::new(open_log_file()?.and(std::io::stderr)),
        (true, _, false) => BoxMakeWriter::new(open_log_file()?),
        (false, true, true) => BoxMakeWriter::new(std::io::stdout.and(std::io::stderr)),
        (false, false, true) => BoxMakeWriter::new(std::io::stderr),
        _ => BoxMakeWriter::new(std::io::stdout),
    };

    let base_subscriber = Registry::default().with(filter);
    if format == "json" {
        base_subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init()
            .map_err(already_set)
    } else {
        // No escape codes in files.
        base_subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(use_color && !output.file)
                    .with_writer(writer),
            )
            .try_init()
            .map_err(already_set)
    }
}

fn already_set(e: tracing_subscriber::util::TryInitError) -> RegistryError {
    RegistryError::Config(format!("Logging already initialized: {}", e))
}

/// `PRODREG_LOG` wins outright; otherwise the configured level plus module
/// directives from config and `PRODREG_LOG_MODULES` (`target=level,...`).
fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, RegistryError> {
    if let Ok(filter) = EnvFilter::try_from_env("PRODREG_LOG") {
        return Ok(filter);
    }

    let level = config.map(|c| c.level.as_str()).unwrap_or("info");
    if level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut directives: Vec<String> = config
        .map(|c| {
            c.modules
                .iter()
                .map(|(module, module_level)| format!("{}={}", module, module_level))
                .collect()
        })
        .unwrap_or_default();
    if let Ok(modules) = std::env::var("PRODREG_LOG_MODULES") {
        directives.extend(modules.split(',').filter_map(|entry| {
            let (module, module_level) = entry.split_once('=')?;
            Some(format!("{}={}", module.trim(), module_level.trim()))
        }));
    }

    let mut filter = EnvFilter::new(level);
    for directive in directives {
        filter = filter.add_directive(directive.parse().map_err(|e| {
            RegistryError::Config(format!("Invalid log directive {}: {}", directive, e))
        })?);
    }
    Ok(filter)
}

/// Determine output format from config or environment
fn determine_format(config: Option<&LoggingConfig>) -> Result<String, RegistryError> {
    if let Ok(format) = std::env::var("PRODREG_LOG_FORMAT") {
        if format == "json" || format == "text" {
            return Ok(format);
        }
    }

    match config.map(|c| c.format.as_str()).unwrap_or("text") {
        format @ ("json" | "text") => Ok(format.to_string()),
        other => Err(RegistryError::Config(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            other
        ))),
    }
}

/// Output destinations
#[derive(Debug, PartialEq, Eq)]
struct OutputDestinations {
    stdout: bool,
    stderr: bool,
    file: bool,
}

/// Determine output destinations from config or environment
fn determine_output(config: Option<&LoggingConfig>) -> Result<OutputDestinations, RegistryError> {
    if let Ok(output) = std::env::var("PRODREG_LOG_OUTPUT") {
        return parse_output_destinations(&output);
    }
    parse_output_destinations(config.map(|c| c.output.as_str()).unwrap_or("file"))
}

fn parse_output_destinations(output: &str) -> Result<OutputDestinations, RegistryError> {
    let (stdout, stderr, file) = match output {
        "stdout" => (true, false, false),
        "stderr" => (false, true, false),
        "file" => (false, false, true),
        "file+stderr" => (false, true, true),
        "both" => (true, true, false),
        _ => {
            return Err(RegistryError::Config(format!(
                "Invalid log output: {} (must be 'stdout', 'stderr', 'file', 'file+stderr', or 'both')",
                output
            )))
        }
    };
    Ok(OutputDestinations {
        stdout,
        stderr,
        file,
    })
}
