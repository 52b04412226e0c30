//! Application configuration for syncreport.
//!
//! User config lives at `~/.syncreport/syncreport.toml`.
//! CLI flags override environment values, which override config file values,
//! which override defaults.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SyncReportError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "syncreport.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".syncreport";

/// CI-style input variable for the controller address (checked first).
pub const INPUT_SERVER_VAR: &str = "INPUT_ARGOCD_SERVER";

/// Plain environment variable for the controller address.
pub const SERVER_VAR: &str = "ARGOCD_SERVER";

/// CI-style input variable for the controller token (checked first).
pub const INPUT_TOKEN_VAR: &str = "INPUT_ARGOCD_TOKEN";

// ---------------------------------------------------------------------------
// Enumerated settings
// ---------------------------------------------------------------------------

/// Where application records come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// The controller's REST API.
    #[default]
    Api,
    /// The controller's companion command-line tool.
    Cli,
    /// A saved JSON listing on disk.
    File,
}

/// Which revision field wins when both are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionPreference {
    /// `status.sync.revision`, falling back to `spec.source.targetRevision`.
    #[default]
    Synced,
    /// `spec.source.targetRevision`, falling back to `status.sync.revision`.
    Target,
}

/// What to do with an identifier that cannot be classified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierPolicy {
    /// Abort the run.
    #[default]
    Strict,
    /// Skip the record and log a warning.
    Lenient,
}

/// How the rendered report is placed into the target document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Replace (or append) the marked section, keep everything else.
    #[default]
    Merge,
    /// Replace the whole document with the report.
    Overwrite,
}

macro_rules! keyword_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Lowercase keyword used in config files and flags.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = SyncReportError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(SyncReportError::config(format!(
                        "invalid {} '{other}': expected one of {}",
                        stringify!($ty),
                        [$($text),+].join(", ")
                    ))),
                }
            }
        }
    };
}

keyword_enum!(SourceKind { Api => "api", Cli => "cli", File => "file" });
keyword_enum!(RevisionPreference { Synced => "synced", Target => "target" });
keyword_enum!(IdentifierPolicy { Strict => "strict", Lenient => "lenient" });
keyword_enum!(WriteMode { Merge => "merge", Overwrite => "overwrite" });

// ---------------------------------------------------------------------------
// Config structs (matching syncreport.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Controller connection settings.
    #[serde(default)]
    pub controller: ControllerConfig,

    /// Report and target document settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// `[controller]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Controller address. Usually supplied through the environment instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Name of the env var holding the token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Record source.
    #[serde(default)]
    pub source: SourceKind,

    /// Companion CLI executable.
    #[serde(default = "default_cli_path")]
    pub cli_path: String,

    /// Extra arguments appended to the companion CLI invocation.
    #[serde(default)]
    pub cli_args: Vec<String>,

    /// HTTP / subprocess timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Revision field precedence.
    #[serde(default)]
    pub revision: RevisionPreference,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            server: None,
            token_env: default_token_env(),
            source: SourceKind::default(),
            cli_path: default_cli_path(),
            cli_args: Vec::new(),
            timeout_secs: default_timeout_secs(),
            revision: RevisionPreference::default(),
        }
    }
}

fn default_token_env() -> String {
    "ARGOCD_TOKEN".into()
}
fn default_cli_path() -> String {
    "argocd".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[report]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Target document path.
    #[serde(default = "default_document")]
    pub document: String,

    /// Heading line that delimits the generated section.
    #[serde(default = "default_marker")]
    pub marker: String,

    /// Malformed identifier handling.
    #[serde(default)]
    pub identifiers: IdentifierPolicy,

    /// Section merge or whole-document overwrite.
    #[serde(default)]
    pub mode: WriteMode,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            document: default_document(),
            marker: default_marker(),
            identifiers: IdentifierPolicy::default(),
            mode: WriteMode::default(),
        }
    }
}

fn default_document() -> String {
    "README.md".into()
}
fn default_marker() -> String {
    "## Example Output".into()
}

// ---------------------------------------------------------------------------
// Controller settings (runtime, merged from config + env + CLI flags)
// ---------------------------------------------------------------------------

/// Resolved controller settings handed to the fetch collaborators.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub source: SourceKind,
    /// Controller address as given (may lack a scheme for the CLI source).
    pub server: Option<String>,
    pub token: Option<String>,
    /// Saved listing for [`SourceKind::File`].
    pub input_file: Option<PathBuf>,
    pub cli_path: String,
    pub cli_args: Vec<String>,
    pub timeout_secs: u64,
    pub revision: RevisionPreference,
}

/// Values supplied directly on the command line.
#[derive(Debug, Clone, Default)]
pub struct ControllerOverrides {
    pub source: Option<SourceKind>,
    pub server: Option<String>,
    pub token: Option<String>,
    pub input_file: Option<PathBuf>,
}

impl ControllerSettings {
    /// Merge flags, environment, and the config file.
    ///
    /// `lookup` reads an environment variable; pass `|k| std::env::var(k).ok()`
    /// in production. Empty values count as absent. Fails with
    /// [`SyncReportError::ConfigurationMissing`] when the selected source
    /// lacks what it needs.
    pub fn resolve<F>(
        config: &ControllerConfig,
        overrides: &ControllerOverrides,
        lookup: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let source = overrides.source.unwrap_or(config.source);

        let server = present(overrides.server.clone())
            .or_else(|| present(lookup(INPUT_SERVER_VAR)))
            .or_else(|| present(lookup(SERVER_VAR)))
            .or_else(|| present(config.server.clone()));

        let token = present(overrides.token.clone())
            .or_else(|| present(lookup(INPUT_TOKEN_VAR)))
            .or_else(|| present(lookup(config.token_env.as_str())));

        match source {
            SourceKind::Api | SourceKind::Cli => {
                if server.is_none() {
                    return Err(SyncReportError::missing(format!(
                        "controller server address (set {SERVER_VAR} or pass --server)"
                    )));
                }
                if token.is_none() {
                    return Err(SyncReportError::missing(format!(
                        "controller token (set {} or pass --token)",
                        config.token_env
                    )));
                }
            }
            SourceKind::File => {
                if overrides.input_file.is_none() {
                    return Err(SyncReportError::missing(
                        "input file for the file source (pass --from-file)",
                    ));
                }
            }
        }

        Ok(Self {
            source,
            server,
            token,
            input_file: overrides.input_file.clone(),
            cli_path: config.cli_path.clone(),
            cli_args: config.cli_args.clone(),
            timeout_secs: config.timeout_secs,
            revision: config.revision,
        })
    }

    /// Base URL for the REST API; `https://` is assumed when no scheme is given.
    pub fn api_base_url(&self) -> Result<Url> {
        let server = self
            .server
            .as_deref()
            .ok_or_else(|| SyncReportError::missing("controller server address"))?;

        let with_scheme = if server.contains("://") {
            server.to_string()
        } else {
            format!("https://{server}")
        };

        Url::parse(&with_scheme)
            .map_err(|e| SyncReportError::config(format!("invalid server address '{server}': {e}")))
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.syncreport/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SyncReportError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.syncreport/syncreport.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SyncReportError::config(format!("failed to read {}: {e}", path.display()))
    })?;

    toml::from_str(&content)
        .map_err(|e| SyncReportError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir)
        .map_err(|e| SyncReportError::config(format!("failed to create {}: {e}", dir.display())))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| SyncReportError::config(e.to_string()))?;

    std::fs::write(&path, content)
        .map_err(|e| SyncReportError::config(format!("failed to write {}: {e}", path.display())))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
