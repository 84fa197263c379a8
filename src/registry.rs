//! Converted-file registry: the output directory, listed newest first.
//!
//! There is no index file. Each query re-reads the directory, so files
//! added or removed by hand show up on the next request.

use std::path::Path;
use std::time::SystemTime;
use tracing::warn;

/// Names of the `count` most recently modified regular files in `dir`.
///
/// A missing directory yields an empty list. Symlinks are followed the way
/// a plain `stat` would. Entries whose metadata cannot be read are skipped
/// with a warning. Dot-files are hidden, which also covers documents still
/// being written. Files with equal mtimes keep directory enumeration order.
pub async fn list_recent(dir: &Path, count: usize) -> Vec<String> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!("Cannot list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut files: Vec<(SystemTime, String)> = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Error reading {}: {}", dir.display(), e);
                break;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        let meta = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if !meta.is_file() {
            continue;
        }
        let modified = match meta.modified() {
            Ok(t) => t,
            Err(e) => {
                warn!("Skipping {}: no mtime: {}", path.display(), e);
                continue;
            }
        };

        files.push((modified, name));
    }

    // `sort_by` is stable.
    files.sort_by(|a, b| b.0.cmp(&a.0));
    files.truncate(count);
    files.into_iter().map(|(_, name)| name).collect()
}
