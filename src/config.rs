//! Option resolution for reportpoll.
//!
//! Options arrive as loose `key=value` strings from three places: an optional
//! TOML file, the environment, and the command line. They are collected into
//! an [`Options`] map keyed by lower-cased names and then resolved into a
//! typed [`RunConfig`]. Resolution performs every check up front so that a
//! missing tenant or build id fails before any network activity.
//!
//! # Precedence
//!
//! Later sources override earlier ones:
//!
//! 1. `[options]` table of the config file
//! 2. `REPORTPOLL_<KEY>` environment variables
//! 3. Command line arguments

pub mod schema;

pub use schema::*;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::session::Identity;

/// Errors raised while resolving options.
///
/// All of these are fatal and are reported before the first remote call.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required option: {0}")]
    Missing(String),

    #[error("Invalid value {value:?} for option {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Malformed argument {0:?}, expected key=value")]
    Malformed(String),
}

/// A map of option values keyed by lower-cased option name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    values: BTreeMap<String, String>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option, lower-casing the key.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.values
            .insert(key.as_ref().trim().to_lowercase(), value.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns a non-empty option value.
    ///
    /// Keys are matched case-insensitively. Blank values count as absent.
    pub fn optional(&self, key: &str) -> Option<&str> {
        self.values
            .get(&key.to_lowercase())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Returns an option value or [`ConfigError::Missing`].
    pub fn required(&self, key: &str) -> Result<&str, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::Missing(key.to_lowercase()))
    }

    /// Overlays `other` on top of `self`. Values in `other` win.
    pub fn merge(&mut self, other: Options) {
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parses command line style arguments.
    ///
    /// Accepts `key=value`, `-key=value` and `--key=value`. A bare `-flag` or
    /// `flag` is shorthand for `flag=true`, but only for the keys in
    /// [`FLAG_KEYS`]; any other bare word is [`ConfigError::Malformed`].
    ///
    /// # Example
    ///
    /// ```
    /// use reportpoll::config::Options;
    ///
    /// let options = Options::from_args(["-titleId=6195", "--verbose"]).unwrap();
    /// assert_eq!(options.optional("titleid"), Some("6195"));
    /// assert_eq!(options.optional("verbose"), Some("true"));
    /// ```
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Options::new();
        for arg in args {
            let arg = arg.as_ref();
            let stripped = arg.trim_start_matches('-');
            let (key, value) = match stripped.split_once('=') {
                Some((key, value)) => (key, value),
                None if is_flag(stripped) => (stripped, "true"),
                None => return Err(ConfigError::Malformed(arg.to_string())),
            };
            if key.trim().is_empty() {
                return Err(ConfigError::Malformed(arg.to_string()));
            }
            options.insert(key, value);
        }
        Ok(options)
    }

    /// Reads known keys from the environment through `lookup`.
    ///
    /// `lookup` receives the full variable name, e.g. `REPORTPOLL_TITLEID`.
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Options::new();
        for key in KNOWN_KEYS {
            let var = format!("{}{}", ENV_PREFIX, key.to_uppercase());
            if let Some(value) = lookup(&var) {
                options.insert(key, value);
            }
        }
        options
    }

    /// Reads known keys from the process environment.
    pub fn from_env() -> Self {
        Self::from_env_with(|var| std::env::var(var).ok())
    }

    /// Collects the `[options]` table of a config file.
    pub fn from_file_config(config: &FileConfig) -> Self {
        let mut options = Options::new();
        for (key, value) in config.string_options() {
            options.insert(key, value);
        }
        options
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Remote tenant the session is scoped to.
    pub title_id: String,

    /// Correlation key. Used as the client identity and as the report lookup key.
    pub build_identifier: String,

    /// Directory the JUnit file is written to.
    pub workspace: PathBuf,

    /// How long to wait for the report to become available.
    ///
    /// Zero is valid and means "check nothing, time out immediately".
    pub timeout: Duration,

    /// Pause between readiness checks.
    pub poll_interval: Duration,

    /// Log every raw response body.
    pub verbose: bool,

    /// Backend base URL with `{titleid}` already substituted.
    pub base_url: String,
}

impl RunConfig {
    /// Resolves and validates options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `titleid` or `buildidentifier` is
    /// absent and [`ConfigError::Invalid`] if a numeric or boolean option
    /// cannot be parsed.
    ///
    /// # Example
    ///
    /// ```
    /// use reportpoll::config::{Options, RunConfig};
    /// use std::time::Duration;
    ///
    /// let options = Options::new()
    ///     .with("titleId", "6195")
    ///     .with("buildIdentifier", "jenkins-42");
    /// let config = RunConfig::from_options(&options)?;
    ///
    /// assert_eq!(config.timeout, Duration::from_secs(30));
    /// assert_eq!(config.poll_interval, Duration::from_millis(4500));
    /// assert_eq!(config.base_url, "https://6195.playfabapi.com");
    /// # Ok::<(), reportpoll::config::ConfigError>(())
    /// ```
    pub fn from_options(options: &Options) -> Result<Self, ConfigError> {
        let title_id = options.required(KEY_TITLE_ID)?.to_string();
        let build_identifier = options.required(KEY_BUILD_IDENTIFIER)?.to_string();

        let workspace = match options.optional(KEY_WORKSPACE_PATH) {
            Some(path) => PathBuf::from(shellexpand::tilde(path).into_owned()),
            None => std::env::temp_dir().join(DEFAULT_WORKSPACE_DIR),
        };

        let timeout_secs = parse_u64(options, KEY_TIMEOUT, DEFAULT_TIMEOUT_SECS)?;
        let poll_interval_ms = parse_u64(options, KEY_POLL_INTERVAL_MS, DEFAULT_POLL_INTERVAL_MS)?;
        let verbose = parse_bool(options, KEY_VERBOSE, false)?;

        let base_url = options
            .optional(KEY_BASE_URL)
            .unwrap_or(DEFAULT_BASE_URL)
            .replace("{titleid}", &title_id)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            title_id,
            build_identifier,
            workspace,
            timeout: Duration::from_secs(timeout_secs),
            poll_interval: Duration::from_millis(poll_interval_ms),
            verbose,
            base_url,
        })
    }

    /// The session identity for this run.
    pub fn identity(&self) -> Identity {
        Identity::new(&self.title_id, &self.build_identifier)
    }

    /// Destination of the JUnit file: `<workspace>/<buildIdentifier>.xml`.
    pub fn report_path(&self) -> PathBuf {
        report_path(&self.workspace, &self.build_identifier)
    }
}

fn is_flag(key: &str) -> bool {
    FLAG_KEYS.iter().any(|flag| flag.eq_ignore_ascii_case(key.trim()))
}

/// Builds `<workspace>/<build_identifier>.xml`.
pub fn report_path(workspace: &Path, build_identifier: &str) -> PathBuf {
    workspace.join(format!("{}.xml", build_identifier))
}

fn parse_u64(options: &Options, key: &str, default: u64) -> Result<u64, ConfigError> {
    match options.optional(key) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::Invalid {
                key: key.to_string(),
                value: value.to_string(),
                reason: e.to_string(),
            }
        }),
    }
}

fn parse_bool(options: &Options, key: &str, default: bool) -> Result<bool, ConfigError> {
    match options.optional(key) {
        None => Ok(default),
        Some(value) => match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key: key.to_string(),
                value: value.to_string(),
                reason: "expected true or false".to_string(),
            }),
        },
    }
}

/// Loads a reportpoll config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Loads a reportpoll config from a TOML string.
pub fn load_config_str(content: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(content).context("Failed to parse config")?;

    Ok(config)
}
