//! Option keys, defaults and the TOML file schema for reportpoll.
//!
//! Every option is addressed by a lower-cased key. The same keys are used on
//! the command line (`titleid=ABC`), in the `[options]` table of a config
//! file, and (upper-cased, prefixed with [`ENV_PREFIX`]) in the environment.
//!
//! # Schema Overview
//!
//! ```text
//! FileConfig (root)
//! └── options                - Table of key = value pairs
//!     ├── titleid            - Remote tenant (required)
//!     ├── buildidentifier    - Correlation key for this build (required)
//!     ├── workspacepath      - Directory the JUnit file is written to
//!     ├── timeout            - Seconds to wait for the report
//!     ├── pollintervalms     - Milliseconds between readiness checks
//!     ├── verbose            - Log every raw response
//!     └── baseurl            - Backend URL template
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Remote tenant identifier.
pub const KEY_TITLE_ID: &str = "titleid";
/// Per-build correlation key.
pub const KEY_BUILD_IDENTIFIER: &str = "buildidentifier";
pub const KEY_WORKSPACE_PATH: &str = "workspacepath";
pub const KEY_TIMEOUT: &str = "timeout";
pub const KEY_POLL_INTERVAL_MS: &str = "pollintervalms";
pub const KEY_VERBOSE: &str = "verbose";
pub const KEY_BASE_URL: &str = "baseurl";

/// All option keys understood by reportpoll.
pub const KNOWN_KEYS: &[&str] = &[
    KEY_TITLE_ID,
    KEY_BUILD_IDENTIFIER,
    KEY_WORKSPACE_PATH,
    KEY_TIMEOUT,
    KEY_POLL_INTERVAL_MS,
    KEY_VERBOSE,
    KEY_BASE_URL,
];

/// Prefix for environment variables, e.g. `REPORTPOLL_TITLEID`.
/// Keys that may be given as a bare flag (`verbose` or `-verbose`).
pub const FLAG_KEYS: &[&str] = &[KEY_VERBOSE];

pub const ENV_PREFIX: &str = "REPORTPOLL_";

/// Seconds to wait for the report when `timeout` is not given.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Milliseconds between readiness checks.
///
/// Shorter intervals get rejected by the backend's rate limiter.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 4500;

/// Backend URL template. `{titleid}` is replaced with the tenant id.
pub const DEFAULT_BASE_URL: &str = "https://{titleid}.playfabapi.com";

/// Directory name used under the system temp dir when no workspace is given.
pub const DEFAULT_WORKSPACE_DIR: &str = "reportpoll";

/// Root structure of a reportpoll TOML config file.
///
/// # Example
///
/// ```
/// use reportpoll::config::FileConfig;
///
/// let config: FileConfig = toml::from_str(r#"
///     [options]
///     titleid = "6195"
///     timeout = 120
///     verbose = true
/// "#).unwrap();
///
/// assert_eq!(config.options.len(), 3);
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileConfig {
    /// Option values. Keys are matched case-insensitively.
    ///
    /// Values may be written as strings, integers or booleans.
    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
}

impl FileConfig {
    /// Returns the options as plain strings.
    ///
    /// Strings are taken verbatim; any other TOML value uses its TOML
    /// rendering (`120`, `true`).
    pub fn string_options(&self) -> impl Iterator<Item = (&str, String)> {
        self.options.iter().map(|(key, value)| {
            let text = match value {
                toml::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.as_str(), text)
        })
    }
}
