use std::path::Path;

use crate::remote::RemoteFileService;
use crate::CleanupWarning;

/// Delete the local file and the remote file, best effort.
///
/// Both deletions are always attempted. Failures come back as warnings and are logged;
/// nothing here aborts the caller.
pub async fn cleanup(
    local: Option<&Path>,
    remote_id: Option<&str>,
    service: &dyn RemoteFileService,
) -> Vec<CleanupWarning> {
    let mut warnings = Vec::new();

    if let Some(path) = local {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!("Deleted local file: {}", path.display()),
            Err(e) => warnings.push(CleanupWarning::LocalFile {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    if let Some(id) = remote_id {
        match service.delete(id).await {
            Ok(()) => tracing::debug!("Deleted remote file: {}", id),
            Err(e) => warnings.push(CleanupWarning::RemoteFile {
                id: id.to_string(),
                message: e.to_string(),
            }),
        }
    }

    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MockRemoteFileService, RemoteError};

    #[tokio::test]
    async fn test_remote_failure_still_deletes_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file_20240101_000000.mp3");
        fs_err::write(&path, b"media").unwrap();

        let mut service = MockRemoteFileService::new();
        service
            .expect_delete()
            .withf(|id| id == "files/abc")
            .times(1)
            .returning(|_| {
                Err(RemoteError::Api {
                    status: 500,
                    message: "internal".to_string(),
                })
            });

        let warnings = cleanup(Some(path.as_path()), Some("files/abc"), &service).await;

        assert!(!path.exists());
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            CleanupWarning::RemoteFile { id, message } if id == "files/abc" && message.contains("internal")
        ));
    }

    #[tokio::test]
    async fn test_missing_local_file_still_deletes_remote() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.mp4");

        let mut service = MockRemoteFileService::new();
        service.expect_delete().times(1).returning(|_| Ok(()));

        let warnings = cleanup(Some(path.as_path()), Some("files/abc"), &service).await;

        assert_eq!(warnings.len(), 1);
        assert!(matches!(&warnings[0], CleanupWarning::LocalFile { path: p, .. } if p == &path));
    }

    #[tokio::test]
    async fn test_clean_run_has_no_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.mp3");
        fs_err::write(&path, b"media").unwrap();

        let mut service = MockRemoteFileService::new();
        service.expect_delete().times(1).returning(|_| Ok(()));

        assert!(cleanup(Some(path.as_path()), Some("files/abc"), &service).await.is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_nothing_to_clean() {
        let mut service = MockRemoteFileService::new();
        service.expect_delete().never();

        assert!(cleanup(None, None, &service).await.is_empty());
    }
}
