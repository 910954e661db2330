//! File capabilities: text loading, résumé loading (text or PDF), and file writing.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::capabilities::CapabilityError;

/// Absolute paths are used as-is; relative paths are joined onto `base`.
pub fn resolve_against(base: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

/// Resolves `path` against the process working directory.
pub fn resolve_path(path: &str) -> Result<PathBuf, CapabilityError> {
    let cwd = std::env::current_dir().map_err(|source| CapabilityError::Read {
        path: PathBuf::from("."),
        source,
    })?;
    Ok(resolve_against(&cwd, path))
}

/// Reads a UTF-8 text file.
pub async fn load_text(path: &str) -> Result<String, CapabilityError> {
    let resolved = resolve_path(path)?;
    let content = read_utf8(&resolved).await?;
    info!(
        "Loaded {} chars from {}",
        content.len(),
        resolved.display()
    );
    Ok(content)
}

/// Reads a résumé. PDFs are text-extracted; anything else is read as UTF-8.
pub async fn load_resume(path: &str) -> Result<String, CapabilityError> {
    let resolved = resolve_path(path)?;
    let is_pdf = resolved
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    let content = if is_pdf {
        extract_pdf_text(resolved.clone()).await?
    } else {
        read_utf8(&resolved).await?
    };

    info!(
        "Loaded résumé from {} ({} chars, pdf={})",
        resolved.display(),
        content.len(),
        is_pdf
    );
    Ok(content)
}

/// Writes `content` to `path`, creating intermediate directories as needed.
pub async fn write_file(path: &str, content: &str) -> Result<PathBuf, CapabilityError> {
    let resolved = resolve_path(path)?;
    let write_err = |source| CapabilityError::Write {
        path: resolved.clone(),
        source,
    };

    if let Some(parent) = resolved.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    tokio::fs::write(&resolved, content).await.map_err(write_err)?;

    info!("Wrote {} bytes to {}", content.len(), resolved.display());
    Ok(resolved)
}

async fn read_utf8(path: &Path) -> Result<String, CapabilityError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| match source.kind() {
            ErrorKind::NotFound => CapabilityError::NotFound {
                path: path.to_path_buf(),
            },
            _ => CapabilityError::Read {
                path: path.to_path_buf(),
                source,
            },
        })
}

async fn extract_pdf_text(path: PathBuf) -> Result<String, CapabilityError> {
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(CapabilityError::NotFound { path });
    }

    // pdf-extract is synchronous and CPU-bound
    let task_path = path.clone();
    tokio::task::spawn_blocking(move || pdf_extract::extract_text(&task_path))
        .await
        .map_err(|e| CapabilityError::Pdf {
            path: path.clone(),
            reason: e.to_string(),
        })?
        .map_err(|e| CapabilityError::Pdf {
            path,
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_against_keeps_absolute_paths() {
        let base = Path::new("/work");
        let absolute = std::env::temp_dir().join("resume.txt");
        let absolute_str = absolute.to_str().unwrap();
        assert_eq!(resolve_against(base, absolute_str), absolute);
    }

    #[test]
    fn test_resolve_against_joins_relative_paths() {
        let base = Path::new("/work");
        assert_eq!(
            resolve_against(base, "data/jd.txt"),
            PathBuf::from("/work/data/jd.txt")
        );
    }

    #[tokio::test]
    async fn test_load_text_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jd.txt");
        std::fs::write(&path, "Seeking a Senior Python Developer").unwrap();

        let text = load_text(path.to_str().unwrap()).await.unwrap();
        assert_eq!(text, "Seeking a Senior Python Developer");
    }

    #[tokio::test]
    async fn test_load_text_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");

        let err = load_text(path.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, CapabilityError::NotFound { path: p } if p == path));
    }

    #[tokio::test]
    async fn test_load_resume_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.TXT");
        std::fs::write(&path, "Jane Doe\nPython, SQL").unwrap();

        let text = load_resume(path.to_str().unwrap()).await.unwrap();
        assert!(text.contains("Python, SQL"));
    }

    #[tokio::test]
    async fn test_load_resume_missing_pdf_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.pdf");

        let err = load_resume(path.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, CapabilityError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_load_resume_rejects_invalid_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.pdf");
        std::fs::write(&path, "definitely not a pdf").unwrap();

        let err = load_resume(path.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, CapabilityError::Pdf { .. }));
    }

    #[tokio::test]
    async fn test_write_file_creates_intermediate_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/letters/acme.txt");

        let written = write_file(path.to_str().unwrap(), "Dear Acme,").await.unwrap();
        assert_eq!(written, path);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Dear Acme,");
    }

    #[tokio::test]
    async fn test_write_file_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, "old").unwrap();

        write_file(path.to_str().unwrap(), "new").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }
}
