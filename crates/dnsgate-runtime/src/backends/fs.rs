//! Filesystem-backed stores, for running against fixtures on disk.
//!
//! Layout:
//! - objects: `<root>/<bucket>/<key>`
//! - log streams: `<root>/<stream>.jsonl`, one payload per non-empty line;
//!   a leading `/` in the stream name is ignored

use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};

use dnsgate_core::ObjectLocator;

use super::{BackendError, LogStore, ObjectStore};

/// Object store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, locator: &ObjectLocator) -> Result<PathBuf, BackendError> {
        let bucket = relative_path(&locator.bucket)?;
        let key = relative_path(&locator.key)?;
        Ok(self.root.join(bucket).join(key))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get_object(&self, locator: &ObjectLocator) -> Result<Vec<u8>, BackendError> {
        let path = self.path_for(locator)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| map_io_error(e, &locator.to_string()))
    }

    fn name(&self) -> &str {
        "fs"
    }
}

/// Log store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsLogStore {
    root: PathBuf,
}

impl FsLogStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, stream: &str) -> Result<PathBuf, BackendError> {
        let relative = relative_path(stream.trim_start_matches('/'))?;
        let mut path = self.root.join(relative);
        let file_name = match path.file_name() {
            Some(name) => format!("{}.jsonl", name.to_string_lossy()),
            None => {
                return Err(BackendError::InvalidRequest(format!(
                    "invalid stream name '{}'",
                    stream
                )))
            }
        };
        path.set_file_name(file_name);
        Ok(path)
    }
}

#[async_trait]
impl LogStore for FsLogStore {
    async fn list_events(&self, stream: &str) -> Result<Vec<String>, BackendError> {
        let path = self.path_for(stream)?;
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| map_io_error(e, &format!("log stream '{}'", stream)))?;

        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn name(&self) -> &str {
        "fs"
    }
}

/// Accept only plain relative paths so requests stay under the root.
fn relative_path(raw: &str) -> Result<&Path, BackendError> {
    let path = Path::new(raw);
    let plain = !raw.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

    if plain {
        Ok(path)
    } else {
        Err(BackendError::InvalidRequest(format!(
            "path '{}' escapes the backend root",
            raw
        )))
    }
}

fn map_io_error(err: io::Error, what: &str) -> BackendError {
    match err.kind() {
        io::ErrorKind::NotFound => BackendError::NotFound(what.to_string()),
        io::ErrorKind::PermissionDenied => {
            BackendError::AccessDenied(format!("{}: {}", what, err))
        }
        _ => BackendError::Unavailable(format!("{}: {}", what, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static NEXT_DIR: AtomicU32 = AtomicU32::new(0);

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "dnsgate-fs-test-{}-{}",
            std::process::id(),
            NEXT_DIR.fetch_add(1, Ordering::SeqCst)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_read_object() {
        let root = scratch_dir();
        std::fs::create_dir_all(root.join("bucket")).unwrap();
        std::fs::write(root.join("bucket").join("done.txt"), "done\n").unwrap();

        let store = FsObjectStore::new(&root);
        let content = store
            .get_object(&ObjectLocator::new("bucket", "done.txt"))
            .await
            .unwrap();
        assert_eq!(content, b"done\n".to_vec());

        let missing = store
            .get_object(&ObjectLocator::new("bucket", "absent.txt"))
            .await;
        assert!(matches!(missing, Err(BackendError::NotFound(_))));

        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn test_escaping_key_is_invalid_request() {
        let store = FsObjectStore::new(scratch_dir());
        let result = store
            .get_object(&ObjectLocator::new("bucket", "../../etc/passwd"))
            .await;
        assert!(matches!(result, Err(BackendError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_read_log_stream() {
        let root = scratch_dir();
        std::fs::create_dir_all(root.join("vpc")).unwrap();
        std::fs::write(
            root.join("vpc").join("dns.jsonl"),
            "{\"name\":\"a\",\"answers\":[]}\n\n  \n{\"name\":\"b\",\"answers\":[]}\n",
        )
        .unwrap();

        let store = FsLogStore::new(&root);
        let events = store.list_events("/vpc/dns").await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[1].contains("\"b\""));

        let missing = store.list_events("vpc/other").await;
        assert!(matches!(missing, Err(BackendError::NotFound(_))));

        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_relative_path_rules() {
        assert!(relative_path("a/b.txt").is_ok());
        assert!(relative_path("").is_err());
        assert!(relative_path("/abs").is_err());
        assert!(relative_path("a/../../b").is_err());
        assert!(relative_path("./a").is_err());
    }
}
