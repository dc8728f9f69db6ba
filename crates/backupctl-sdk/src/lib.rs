//! # backupctl SDK
//!
//! Client for the platform backup-control service ("backupctl") used by the
//! MySQL pods to find their latest backup and ask for it to be migrated
//! back into the running instance.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use backupctl_sdk::{restore_latest, BackupCtlClient, BackupKind, RestoreOutcome};
//!
//! # async fn example() -> Result<(), backupctl_sdk::SdkError> {
//! let client = BackupCtlClient::new("http://backupctl.lain.local", "mysql-service", "mysql-server-1")?;
//!
//! match restore_latest(&client, BackupKind::Full, "1").await? {
//!     RestoreOutcome::NotFound(kind) => println!("No {kind} backup files found"),
//!     RestoreOutcome::Migrated { response, .. } => println!("{response}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Endpoints
//!
//! | Call | Method | Path |
//! |------|--------|------|
//! | list | GET | `/api/v1/backup/json/app/{app}/proc/{pod}/?volume={volume}` |
//! | full restore | POST | `/api/v1/backup/migrate/app/{app}/proc/{pod}/file/{name}` |
//! | incremental restore | POST | `/api/v1/backup/migrate/increment/app/{app}/proc/{pod}/dir/{name}` |

use async_trait::async_trait;
use mysql_ops_common::{OpsError, PodEnv};
use reqwest::{header, redirect, Client};
use thiserror::Error;
use tracing::debug;

mod restore;
mod types;

pub use restore::{restore_latest, select_latest, BackupCatalog};
pub use types::*;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Unknown backup mode: {0:?}")]
    InvalidMode(String),
    #[error(transparent)]
    Ops(#[from] OpsError),
}

pub type Result<T> = std::result::Result<T, SdkError>;

/// HTTP client bound to one app/pod on the backup-control service.
///
/// Redirects are never followed: the migrate endpoint answers with a
/// redirect to the job it started, and that answer is what callers report.
#[derive(Debug, Clone)]
pub struct BackupCtlClient {
    client: Client,
    base_url: String,
    app: String,
    pod: String,
}

impl BackupCtlClient {
    pub fn new(
        base_url: impl Into<String>,
        app: impl Into<String>,
        pod: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app: app.into(),
            pod: pod.into(),
        })
    }

    /// Addresses the pod described by `LAIN_APPNAME` / `DEPLOYD_POD_NAME`.
    pub fn from_env(env: &PodEnv) -> Result<Self> {
        Self::new(
            env.backupctl_base_url()?,
            env.require_app_name()?,
            env.require_pod_name()?,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/api/v1/backup/{method}/app/{app}/proc/{pod}/{extra}`
    pub fn endpoint(&self, method: &str, extra: &str) -> String {
        format!(
            "{}/api/v1/backup/{}/app/{}/proc/{}/{}",
            self.base_url, method, self.app, self.pod, extra
        )
    }
}

#[async_trait]
impl BackupCatalog for BackupCtlClient {
    async fn list_artifacts(&self, kind: BackupKind) -> Result<Vec<BackupArtifact>> {
        let url = self.endpoint("json", "");
        debug!(%url, volume = kind.listing_volume(), "Listing backups");

        let response = self
            .client
            .get(&url)
            .query(&[("volume", kind.listing_volume())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SdkError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn migrate(
        &self,
        kind: BackupKind,
        artifact: &BackupArtifact,
        request: &RestoreRequest,
    ) -> Result<MigrateResponse> {
        let url = self.endpoint(kind.migrate_method(), &kind.migrate_target(&artifact.name));
        debug!(%url, ?request, "Requesting migration");

        let response = self.client.post(&url).form(request).send().await?;

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        if status.is_client_error() || status.is_server_error() {
            return Err(SdkError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(MigrateResponse {
            status: status.as_u16(),
            location,
            body,
        })
    }
}
