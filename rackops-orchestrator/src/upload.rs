use crate::console::Console;
use rackops_common::RackopsError;
use rackops_providers::ObjectStore;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq)]
pub struct LocalFile {
    pub path: PathBuf,
    /// Path relative to the scanned root, `/`-separated.
    pub object_name: String,
    pub size: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DirScan {
    pub files: Vec<LocalFile>,
    pub total_bytes: u64,
}

/// Recursively list the regular files under `dir`, sorted by object name.
pub fn scan_directory(dir: &Path) -> Result<DirScan, RackopsError> {
    if !dir.is_dir() {
        return Err(RackopsError::InvalidInput(format!(
            "directory '{}' not found",
            dir.display()
        )));
    }
    let mut scan = DirScan::default();
    walk(dir, dir, &mut scan)?;
    scan.files.sort_by(|a, b| a.object_name.cmp(&b.object_name));
    Ok(scan)
}

fn walk(root: &Path, dir: &Path, scan: &mut DirScan) -> Result<(), RackopsError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk(root, &path, scan)?;
            continue;
        }
        // Symlinks count only when they point at a file.
        let meta = fs::metadata(&path)?;
        if !meta.is_file() {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(&path);
        let object_name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        scan.total_bytes += meta.len();
        scan.files.push(LocalFile {
            path,
            object_name,
            size: meta.len(),
        });
    }
    Ok(())
}

/// Upload every file under `dir` into `container`; returns the container's object count afterwards.
pub async fn upload_directory(
    store: &dyn ObjectStore,
    container: &str,
    dir: &Path,
    console: &mut Console,
) -> Result<usize, RackopsError> {
    let scan = scan_directory(dir)?;
    console.line(format!(
        "Total upload size: {} bytes ({:.2} MB)",
        scan.total_bytes,
        scan.total_bytes as f64 / (1024.0 * 1024.0)
    ));

    let mut uploaded = 0u64;
    console.progress_bar(uploaded, scan.total_bytes);
    for file in &scan.files {
        let body = tokio::fs::read(&file.path).await?;
        let content_type = mime_guess::from_path(&file.path).first_or_octet_stream();
        tracing::debug!(
            "uploading {} ({} bytes, {}) to {}",
            file.object_name,
            file.size,
            content_type,
            container
        );
        store
            .put_object(container, &file.object_name, body, content_type.essence_str())
            .await?;
        uploaded += file.size;
        console.progress_bar(uploaded, scan.total_bytes);
    }
    console.end_progress();

    let objects = store.list_object_names(container).await?;
    tracing::info!(
        "uploaded {} file(s) to {}, container now holds {} object(s)",
        scan.files.len(),
        container,
        objects.len()
    );
    Ok(objects.len())
}
