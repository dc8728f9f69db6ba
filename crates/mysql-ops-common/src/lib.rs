// Shared pieces of the MySQL pod tooling: error type, pod environment, logging setup

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub const ENV_INSTANCE_NO: &str = "DEPLOYD_POD_INSTANCE_NO";
pub const ENV_POD_NAME: &str = "DEPLOYD_POD_NAME";
pub const ENV_DOMAIN: &str = "LAIN_DOMAIN";
pub const ENV_APP_NAME: &str = "LAIN_APPNAME";
pub const ENV_BACKUPCTL_URL: &str = "BACKUPCTL_URL";
pub const ENV_MYCNF_TEMPLATE: &str = "MYCNF_TEMPLATE";
pub const ENV_MYCNF_OUTPUT: &str = "MYCNF_OUTPUT";

#[derive(Error, Debug)]
pub enum OpsError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OpsError>;

/// Deployment identifiers injected into the pod by the platform.
///
/// Every field is optional here; each tool asks for the ones it needs with
/// the `require_*` accessors so a missing variable is reported by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodEnv {
    pub instance_no: Option<String>,
    pub pod_name: Option<String>,
    pub domain: Option<String>,
    pub app_name: Option<String>,
    pub backupctl_url: Option<String>,
    pub mycnf_template: Option<String>,
    pub mycnf_output: Option<String>,
}

impl PodEnv {
    /// Reads the process environment once.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the environment from an arbitrary lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            instance_no: get(ENV_INSTANCE_NO),
            pod_name: get(ENV_POD_NAME),
            domain: get(ENV_DOMAIN),
            app_name: get(ENV_APP_NAME),
            backupctl_url: get(ENV_BACKUPCTL_URL),
            mycnf_template: get(ENV_MYCNF_TEMPLATE),
            mycnf_output: get(ENV_MYCNF_OUTPUT),
        }
    }

    pub fn require_instance_no(&self) -> Result<&str> {
        require(&self.instance_no, ENV_INSTANCE_NO)
    }

    pub fn require_pod_name(&self) -> Result<&str> {
        require(&self.pod_name, ENV_POD_NAME)
    }

    pub fn require_domain(&self) -> Result<&str> {
        require(&self.domain, ENV_DOMAIN)
    }

    pub fn require_app_name(&self) -> Result<&str> {
        require(&self.app_name, ENV_APP_NAME)
    }

    /// Base URL of the backup-control service, `http://backupctl.<domain>` unless overridden.
    pub fn backupctl_base_url(&self) -> Result<String> {
        if let Some(url) = &self.backupctl_url {
            return Ok(url.trim_end_matches('/').to_string());
        }
        Ok(format!("http://backupctl.{}", self.require_domain()?))
    }
}

impl Display for PodEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PodEnv(app: {:?}, pod: {:?}, instance: {:?}, domain: {:?})",
            self.app_name, self.pod_name, self.instance_no, self.domain
        )
    }
}

fn require<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| OpsError::Config(format!("environment variable {key} is not set")))
}

/// Installs the stdout fmt subscriber. `RUST_LOG` wins, otherwise `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second init (e.g. from tests) is not an error worth surfacing.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
