use crate::error::Result;
use crate::manifest::GeneratedDocument;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// A crash mid-write never leaves a truncated manifest behind.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Write a file only if it does not already exist. Returns true if written.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    atomic_write(path, data)?;
    Ok(true)
}

/// Join `relative` onto `base`, folding `..` lexically so that
/// `k8s/../PERSONA.md` is reported as `PERSONA.md`.
pub fn resolve_relative(base: &Path, relative: &str) -> PathBuf {
    let mut out = base.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::ParentDir => {
                if matches!(
                    out.components().next_back(),
                    None | Some(Component::ParentDir)
                ) {
                    out.push("..");
                } else {
                    out.pop();
                }
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Write every document under `base`, creating parent directories as
/// needed. Returns the written paths in document order.
pub fn write_documents(base: &Path, documents: &[GeneratedDocument]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(documents.len());
    for doc in documents {
        let path = resolve_relative(base, &doc.path);
        atomic_write(&path, doc.content.as_bytes())?;
        tracing::debug!(path = %path.display(), "wrote document");
        written.push(path);
    }
    Ok(written)
}
