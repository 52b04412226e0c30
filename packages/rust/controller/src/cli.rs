//! Companion CLI source: `argocd app list -o json`.

use std::process::Stdio;
use std::time::Duration;

use syncreport_shared::{AppRecord, ControllerSettings, Result, RevisionPreference, SyncReportError};
use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::payload;

/// Runs the controller's command-line tool and decodes its JSON output.
#[derive(Debug, Clone)]
pub struct CliSource {
    program: String,
    server: String,
    token: String,
    extra_args: Vec<String>,
    timeout: Duration,
    revision: RevisionPreference,
}

impl CliSource {
    pub fn from_settings(settings: &ControllerSettings) -> Result<Self> {
        let server = settings
            .server
            .clone()
            .ok_or_else(|| SyncReportError::missing("controller server address"))?;
        let token = settings
            .token
            .clone()
            .ok_or_else(|| SyncReportError::missing("controller token"))?;

        Ok(Self {
            program: settings.cli_path.clone(),
            server,
            token,
            extra_args: settings.cli_args.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            revision: settings.revision,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the program. The token is included, so never log these.
    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "app".to_string(),
            "list".to_string(),
            "--server".to_string(),
            self.server.clone(),
            "--auth-token".to_string(),
            self.token.clone(),
            "-o".to_string(),
            "json".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    #[instrument(skip_all, fields(program = %self.program, server = %self.server))]
    pub async fn fetch(&self) -> Result<Vec<AppRecord>> {
        info!("running controller CLI");

        let child = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SyncReportError::fetch(format!(
                    "failed to spawn `{}`: {e}. Is it installed and on PATH?",
                    self.program
                ))
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                SyncReportError::fetch(format!(
                    "`{}` did not finish within {}s",
                    self.program,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| SyncReportError::fetch(format!("failed to wait for `{}`: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SyncReportError::fetch(format!(
                "`{}` exited with status {}: {}",
                self.program,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(bytes = stdout.len(), "CLI output received");

        let records = payload::parse_listing(&stdout, self.revision)?;
        info!(count = records.len(), "applications fetched");
        Ok(records)
    }
}
