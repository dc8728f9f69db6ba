use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SdkError;

pub const FULL_BACKUP_VOLUME: &str = "/var/lib/mysql_backup";
pub const BINLOG_VOLUME: &str = "/var/lib/mysql_log_bin";

/// Which backup series to restore from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    /// Complete data-volume snapshot
    Full,
    /// Binlog delta since the last full backup
    Increment,
}

impl BackupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupKind::Full => "full",
            BackupKind::Increment => "increment",
        }
    }

    /// Parses the CLI mode. Anything but exactly `full` or `increment` is rejected.
    pub fn from_mode(mode: Option<&str>) -> Option<Self> {
        mode.and_then(|m| m.parse().ok())
    }

    /// Volume queried when listing artifacts of this kind.
    pub fn listing_volume(&self) -> &'static str {
        match self {
            BackupKind::Full => FULL_BACKUP_VOLUME,
            BackupKind::Increment => BINLOG_VOLUME,
        }
    }

    pub fn migrate_method(&self) -> &'static str {
        match self {
            BackupKind::Full => "migrate",
            BackupKind::Increment => "migrate/increment",
        }
    }

    /// Path segment addressing one artifact on the migrate endpoint.
    pub fn migrate_target(&self, name: &str) -> String {
        match self {
            BackupKind::Full => format!("file/{name}"),
            BackupKind::Increment => format!("dir/{name}"),
        }
    }

    /// Form posted to the migrate endpoint for `artifact`.
    ///
    /// Incremental restores always land in the full-backup volume and copy
    /// every file of the binlog directory.
    pub fn restore_request(&self, artifact: &BackupArtifact, to_instance: &str) -> RestoreRequest {
        match self {
            BackupKind::Full => RestoreRequest {
                volume: artifact.volume.clone(),
                from: artifact.instance_no.clone(),
                to: to_instance.to_string(),
                files: None,
            },
            BackupKind::Increment => RestoreRequest {
                volume: FULL_BACKUP_VOLUME.to_string(),
                from: artifact.instance_no.clone(),
                to: to_instance.to_string(),
                files: Some("*".to_string()),
            },
        }
    }
}

impl Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupKind {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(BackupKind::Full),
            "increment" => Ok(BackupKind::Increment),
            other => Err(SdkError::InvalidMode(other.to_string())),
        }
    }
}

/// One backup as listed by backupctl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupArtifact {
    pub name: String,
    #[serde(deserialize_with = "de::timestamp")]
    pub created: DateTime<Utc>,
    pub volume: String,
    #[serde(deserialize_with = "de::string_or_number")]
    pub instance_no: String,
}

/// Orders newest first. Equal timestamps keep their listing order.
pub fn sort_newest_first(artifacts: &mut [BackupArtifact]) {
    artifacts.sort_by(|a, b| b.created.cmp(&a.created));
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreRequest {
    pub volume: String,
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<String>,
}

/// Raw answer of the migrate endpoint. Redirects are not followed, so a 3xx
/// status is reported as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: String,
}

impl Display for MigrateResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Response [{}]>", self.status)?;
        if let Some(location) = &self.location {
            write!(f, " location: {location}")?;
        }
        if !self.body.trim().is_empty() {
            write!(f, "\n{}", self.body.trim_end())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The catalog holds no artifact of this kind; nothing was posted.
    NotFound(BackupKind),
    Migrated {
        artifact: BackupArtifact,
        response: MigrateResponse,
    },
}

mod de {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Seconds(i64),
        Fractional(f64),
        Text(String),
    }

    /// Unix seconds (integer or fractional) or an RFC 3339 string.
    pub fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawTimestamp::deserialize(deserializer)? {
            RawTimestamp::Seconds(secs) => Utc
                .timestamp_opt(secs, 0)
                .single()
                .ok_or_else(|| D::Error::custom(format!("timestamp {secs} out of range"))),
            RawTimestamp::Fractional(value) => {
                let secs = value.floor();
                let nanos = ((value - secs) * 1e9) as u32;
                Utc.timestamp_opt(secs as i64, nanos)
                    .single()
                    .ok_or_else(|| D::Error::custom(format!("timestamp {value} out of range")))
            }
            RawTimestamp::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| D::Error::custom(format!("invalid timestamp {text:?}: {e}"))),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => text,
            RawId::Number(n) => n.to_string(),
        })
    }
}
