// src/document.rs
//! Target document I/O. Reads happen in full; writes land in a temp file
//! beside the target and are renamed over it, so readers never see half a page.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read(&self) -> io::Result<String>;
    async fn write(&self, content: &str) -> io::Result<()>;
    /// Human-readable location for logs and diagnostics.
    fn location(&self) -> String;
}

/// The page on local disk.
#[derive(Debug, Clone)]
pub struct FsDocument {
    path: PathBuf,
}

impl FsDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl DocumentStore for FsDocument {
    async fn read(&self) -> io::Result<String> {
        tokio::fs::read_to_string(&self.path).await
    }

    async fn write(&self, content: &str) -> io::Result<()> {
        let path = self.path.clone();
        let content = content.to_string();
        tokio::task::spawn_blocking(move || write_atomic(&path, &content)).await?
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    // Write through a symlinked page instead of replacing the link.
    let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let file_name = target
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "document path has no file name"))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp = target.with_file_name(tmp_name);

    let result = (|| {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(content.as_bytes())?;
        f.sync_all()?;
        if let Ok(meta) = fs::metadata(&target) {
            fs::set_permissions(&tmp, meta.permissions())?;
        }
        fs::rename(&tmp, &target)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp); // best-effort
    }
    result
}

/// Reads the real page but only logs what would be written.
#[derive(Debug)]
pub struct DryRunDocument {
    inner: FsDocument,
    last_write: Mutex<Option<String>>,
}

impl DryRunDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: FsDocument::new(path),
            last_write: Mutex::new(None),
        }
    }

    pub fn would_have_written(&self) -> Option<String> {
        self.last_write.lock().ok().and_then(|g| g.clone())
    }
}

#[async_trait::async_trait]
impl DocumentStore for DryRunDocument {
    async fn read(&self) -> io::Result<String> {
        self.inner.read().await
    }

    async fn write(&self, content: &str) -> io::Result<()> {
        tracing::info!(
            target: "document",
            path = %self.inner.location(),
            bytes = content.len(),
            "dry run: document not written"
        );
        if let Ok(mut g) = self.last_write.lock() {
            *g = Some(content.to_string());
        }
        Ok(())
    }

    fn location(&self) -> String {
        format!("{} (dry run)", self.inner.location())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_replaces_content_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("index.html");
        fs::write(&p, "old").unwrap();

        let doc = FsDocument::new(&p);
        assert_eq!(doc.read().await.unwrap(), "old");
        doc.write("new").await.unwrap();
        assert_eq!(fs::read_to_string(&p).unwrap(), "new");
        assert!(!dir.path().join("index.html.tmp").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn write_keeps_mode_and_symlink() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("site.html");
        fs::write(&real, "old").unwrap();
        fs::set_permissions(&real, fs::Permissions::from_mode(0o640)).unwrap();
        let link = dir.path().join("index.html");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        FsDocument::new(&link).write("new").await.unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&real).unwrap(), "new");
        let mode = fs::metadata(&real).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let doc = FsDocument::new(dir.path().join("absent.html"));
        let err = doc.read().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn dry_run_never_touches_disk() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("index.html");
        fs::write(&p, "keep").unwrap();

        let doc = DryRunDocument::new(&p);
        doc.write("changed").await.unwrap();
        assert_eq!(fs::read_to_string(&p).unwrap(), "keep");
        assert_eq!(doc.would_have_written().as_deref(), Some("changed"));
    }
}
