use async_trait::async_trait;
use tracing::info;

use crate::{
    sort_newest_first, BackupArtifact, BackupKind, MigrateResponse, RestoreOutcome,
    RestoreRequest, Result,
};

/// Source of backup artifacts and target of migrate requests.
#[async_trait]
pub trait BackupCatalog: Send + Sync {
    async fn list_artifacts(&self, kind: BackupKind) -> Result<Vec<BackupArtifact>>;

    async fn migrate(
        &self,
        kind: BackupKind,
        artifact: &BackupArtifact,
        request: &RestoreRequest,
    ) -> Result<MigrateResponse>;
}

pub fn select_latest(mut artifacts: Vec<BackupArtifact>) -> Option<BackupArtifact> {
    sort_newest_first(&mut artifacts);
    artifacts.into_iter().next()
}

/// Finds the newest artifact of `kind` and asks for it to be migrated into
/// instance `to_instance`. Failures are returned as-is, without retry.
pub async fn restore_latest<C>(
    catalog: &C,
    kind: BackupKind,
    to_instance: &str,
) -> Result<RestoreOutcome>
where
    C: BackupCatalog + ?Sized,
{
    let artifacts = catalog.list_artifacts(kind).await?;
    let count = artifacts.len();

    let Some(artifact) = select_latest(artifacts) else {
        return Ok(RestoreOutcome::NotFound(kind));
    };
    info!(
        candidates = count,
        created = %artifact.created,
        "Find the latest {kind} backup file: {}",
        artifact.name
    );

    let request = kind.restore_request(&artifact, to_instance);
    let response = catalog.migrate(kind, &artifact, &request).await?;
    Ok(RestoreOutcome::Migrated { artifact, response })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SdkError;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCatalog {
        artifacts: Vec<BackupArtifact>,
        listed: Mutex<Vec<BackupKind>>,
        migrated: Mutex<Vec<(BackupKind, String, RestoreRequest)>>,
        fail_listing: bool,
    }

    #[async_trait]
    impl BackupCatalog for RecordingCatalog {
        async fn list_artifacts(&self, kind: BackupKind) -> Result<Vec<BackupArtifact>> {
            self.listed.lock().unwrap().push(kind);
            if self.fail_listing {
                return Err(SdkError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            Ok(self.artifacts.clone())
        }

        async fn migrate(
            &self,
            kind: BackupKind,
            artifact: &BackupArtifact,
            request: &RestoreRequest,
        ) -> Result<MigrateResponse> {
            self.migrated
                .lock()
                .unwrap()
                .push((kind, artifact.name.clone(), request.clone()));
            Ok(MigrateResponse {
                status: 302,
                location: None,
                body: String::new(),
            })
        }
    }

    fn artifact(name: &str, created: i64, instance_no: &str) -> BackupArtifact {
        BackupArtifact {
            name: name.to_string(),
            created: Utc.timestamp_opt(created, 0).unwrap(),
            volume: "/var/lib/mysql_backup".to_string(),
            instance_no: instance_no.to_string(),
        }
    }

    #[test]
    fn test_select_latest() {
        let latest = select_latest(vec![
            artifact("one", 1, "1"),
            artifact("five", 5, "1"),
            artifact("three", 3, "1"),
        ])
        .unwrap();
        assert_eq!(latest.name, "five");
        assert_eq!(latest.created.timestamp(), 5);
        assert!(select_latest(Vec::new()).is_none());
    }

    #[tokio::test]
    async fn test_restore_latest_migrates_newest() {
        let catalog = RecordingCatalog {
            artifacts: vec![
                artifact("one", 1, "2"),
                artifact("five", 5, "3"),
                artifact("three", 3, "2"),
            ],
            ..Default::default()
        };

        let outcome = restore_latest(&catalog, BackupKind::Full, "1").await.unwrap();
        match outcome {
            RestoreOutcome::Migrated { artifact, response } => {
                assert_eq!(artifact.name, "five");
                assert_eq!(response.status, 302);
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let migrated = catalog.migrated.lock().unwrap();
        assert_eq!(migrated.len(), 1);
        let (kind, name, request) = &migrated[0];
        assert_eq!(*kind, BackupKind::Full);
        assert_eq!(name, "five");
        assert_eq!(request.from, "3");
        assert_eq!(request.to, "1");
    }

    #[tokio::test]
    async fn test_empty_catalog_posts_nothing() {
        let catalog = RecordingCatalog::default();

        let outcome = restore_latest(&catalog, BackupKind::Increment, "1")
            .await
            .unwrap();
        assert_eq!(outcome, RestoreOutcome::NotFound(BackupKind::Increment));
        assert_eq!(*catalog.listed.lock().unwrap(), vec![BackupKind::Increment]);
        assert!(catalog.migrated.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_failure_is_surfaced() {
        let catalog = RecordingCatalog {
            artifacts: vec![artifact("one", 1, "1")],
            fail_listing: true,
            ..Default::default()
        };

        let err = restore_latest(&catalog, BackupKind::Full, "1")
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Api { status: 503, .. }));
        assert!(catalog.migrated.lock().unwrap().is_empty());
        // One attempt only.
        assert_eq!(catalog.listed.lock().unwrap().len(), 1);
    }
}
