//! Application record feeds from a GitOps controller.
//!
//! Three interchangeable sources produce the same ordered list of
//! [`AppRecord`]s:
//! - the controller's REST API (`GET /api/v1/applications`)
//! - the companion CLI (`argocd app list -o json`)
//! - a saved JSON listing produced by either of the above

mod cli;
mod payload;

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use syncreport_shared::{
    AppRecord, ControllerSettings, Result, RevisionPreference, SourceKind, SyncReportError,
};
use tracing::{debug, info, instrument};
use url::Url;

pub use cli::CliSource;
pub use payload::parse_listing;

/// Path of the application listing endpoint, relative to the server root.
const APPLICATIONS_PATH: &str = "api/v1/applications";

/// User-Agent string for controller requests.
const USER_AGENT: &str = concat!("syncreport/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// A configured record feed.
#[derive(Debug, Clone)]
pub enum Source {
    Api(ApiSource),
    Cli(CliSource),
    File(FileSource),
}

impl Source {
    /// Build the source selected in `settings`.
    pub fn from_settings(settings: &ControllerSettings) -> Result<Self> {
        match settings.source {
            SourceKind::Api => Ok(Self::Api(ApiSource::from_settings(settings)?)),
            SourceKind::Cli => Ok(Self::Cli(CliSource::from_settings(settings)?)),
            SourceKind::File => {
                let path = settings.input_file.clone().ok_or_else(|| {
                    SyncReportError::missing("input file for the file source (pass --from-file)")
                })?;
                Ok(Self::File(FileSource::new(path, settings.revision)))
            }
        }
    }

    /// Retrieve all application records, in controller order.
    pub async fn fetch(&self) -> Result<Vec<AppRecord>> {
        match self {
            Self::Api(source) => source.fetch().await,
            Self::Cli(source) => source.fetch().await,
            Self::File(source) => source.fetch().await,
        }
    }

    /// Short human-readable description for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Api(source) => format!("api {}", source.endpoint),
            Self::Cli(source) => format!("cli {}", source.program()),
            Self::File(source) => format!("file {}", source.path.display()),
        }
    }
}

// ---------------------------------------------------------------------------
// REST API
// ---------------------------------------------------------------------------

/// Fetches the listing over HTTP with a bearer token.
#[derive(Debug, Clone)]
pub struct ApiSource {
    endpoint: Url,
    token: String,
    timeout: Duration,
    revision: RevisionPreference,
}

impl ApiSource {
    pub fn from_settings(settings: &ControllerSettings) -> Result<Self> {
        let base = settings.api_base_url()?;
        let token = settings
            .token
            .clone()
            .ok_or_else(|| SyncReportError::missing("controller token"))?;

        Ok(Self {
            endpoint: applications_url(&base)?,
            token,
            timeout: Duration::from_secs(settings.timeout_secs),
            revision: settings.revision,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    pub async fn fetch(&self) -> Result<Vec<AppRecord>> {
        let client = build_client(self.timeout)?;
        let url = self.endpoint.as_str();

        info!("requesting application list");

        let response = client
            .get(self.endpoint.clone())
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| SyncReportError::fetch(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncReportError::fetch(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SyncReportError::fetch(format!("{url}: failed to read body: {e}")))?;

        debug!(bytes = body.len(), "application list received");

        let records = payload::parse_listing(&body, self.revision)?;
        info!(count = records.len(), "applications fetched");
        Ok(records)
    }
}

/// `{base}/api/v1/applications`, keeping any path prefix on `base`.
fn applications_url(base: &Url) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(APPLICATIONS_PATH)
        .map_err(|e| SyncReportError::config(format!("invalid server address '{base}': {e}")))
}

/// Build a reqwest client with appropriate settings.
fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| SyncReportError::fetch(format!("failed to build HTTP client: {e}")))
}

// ---------------------------------------------------------------------------
// Saved listing
// ---------------------------------------------------------------------------

/// Reads a listing previously saved to disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    revision: RevisionPreference,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, revision: RevisionPreference) -> Self {
        Self {
            path: path.into(),
            revision,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn fetch(&self) -> Result<Vec<AppRecord>> {
        let body = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SyncReportError::fetch(format!("cannot read {}: {e}", self.path.display()))
        })?;
        let records = payload::parse_listing(&body, self.revision)?;
        info!(path = %self.path.display(), count = records.len(), "applications loaded");
        Ok(records)
    }
}
