//! tar.gz compression of a backup working directory (spec §4.H: "compress
//! `<path>` into `<path>.tar.gz`"). `tar`/`flate2` are blocking, so the
//! actual archiving runs on a `spawn_blocking` worker.

use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use snafu::ResultExt;
use tar::Builder;

use crate::error::{self, Result};

/// Archives every entry under `source_dir` into `<source_dir>.tar.gz`, using
/// paths relative to `source_dir` inside the archive. Returns the archive's
/// path and its on-disk size in bytes.
pub async fn compress_dir(source_dir: &Path) -> Result<(PathBuf, i64)> {
    let source_dir = source_dir.to_path_buf();
    let archive_path = archive_path_for(&source_dir);

    let archive_path_for_blocking = archive_path.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let file = std::fs::File::create(&archive_path_for_blocking).with_context(|_| error::IoSnafu {
            path: archive_path_for_blocking.display().to_string(),
        })?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = Builder::new(encoder);
        builder.append_dir_all(".", &source_dir).with_context(|_| error::IoSnafu {
            path: source_dir.display().to_string(),
        })?;
        builder.finish().with_context(|_| error::IoSnafu {
            path: archive_path_for_blocking.display().to_string(),
        })?;
        Ok(())
    })
    .await
    .expect("archive task panicked")?;

    let size = tokio::fs::metadata(&archive_path)
        .await
        .with_context(|_| error::IoSnafu {
            path: archive_path.display().to_string(),
        })?
        .len() as i64;

    Ok((archive_path, size))
}

fn archive_path_for(source_dir: &Path) -> PathBuf {
    let mut archive_name = source_dir.as_os_str().to_os_string();
    archive_name.push(".tar.gz");
    PathBuf::from(archive_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn compresses_directory_tree_and_reports_nonzero_size() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("resources").join("configmaps");
        tokio::fs::create_dir_all(&nested).await.expect("mkdir");
        tokio::fs::write(nested.join("default-app.yaml"), b"apiVersion: v1\nkind: ConfigMap\n")
            .await
            .expect("write");

        let (archive_path, size) = compress_dir(dir.path()).await.expect("compress");
        assert!(archive_path.to_string_lossy().ends_with(".tar.gz"));
        assert!(size > 0);
        assert!(tokio::fs::metadata(&archive_path).await.is_ok());

        tokio::fs::remove_file(&archive_path).await.expect("cleanup");
    }
}
