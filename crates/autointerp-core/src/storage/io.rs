use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{StoreError, StoreResult};

pub(crate) const TEMP_SUFFIX: &str = "tmp";

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Unique sibling of `path` for staging a write.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.{}", name, uuid::Uuid::new_v4(), TEMP_SUFFIX))
}

/// Write `content` to `path` so that readers observe either the previous
/// file or the complete new one, never a partial write.
///
/// The temp file lives in the same directory so the rename stays on one
/// filesystem.
pub(crate) async fn write_atomic(path: &Path, content: &[u8]) -> StoreResult<()> {
    let temp_path = temp_path_for(path);

    if let Err(e) = fs::write(&temp_path, content).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(io_error(&temp_path)(e));
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(io_error(path)(e));
    }

    Ok(())
}

pub(crate) async fn read(path: &Path) -> StoreResult<Vec<u8>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(io_error(path)(e)),
    }
}

pub(crate) async fn ensure_dir(dir: &Path) -> StoreResult<()> {
    fs::create_dir_all(dir).await.map_err(io_error(dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn write_atomic_replaces_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");

        write_atomic(&path, b"first").await.unwrap();
        write_atomic(&path, b"second").await.unwrap();

        assert_eq!(read(&path).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn write_atomic_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");

        write_atomic(&path, b"{}").await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["doc.json".to_string()]);
    }

    #[tokio::test]
    async fn write_into_missing_directory_fails_cleanly() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("doc.json");

        let err = write_atomic(&path, b"{}").await.unwrap_err();

        assert!(matches!(err, StoreError::Io { .. }));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn read_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let err = read(&dir.path().join("nope.json")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn temp_paths_are_unique_siblings() {
        let path = Path::new("/data/layer0_feature1.json");
        let a = temp_path_for(path);
        let b = temp_path_for(path);
        assert_ne!(a, b);
        assert_eq!(a.parent(), path.parent());
        assert!(a.to_string_lossy().ends_with(".tmp"));
    }
}
