//! Folder selection: discover playable videos under a directory.

use std::cmp::Ordering;
use std::path::Path;

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::Error;
use crate::item::Item;

/// Options controlling folder selection.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional extension allow-list (lowercase, without dot). `None` means
    /// anything whose guessed MIME type is `video/*`.
    pub extensions: Option<Vec<String>>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            extensions: None,
        }
    }
}

/// Return `true` if `path` looks like a playable video.
#[must_use]
pub fn is_supported_video(path: &Path, extensions: Option<&[String]>) -> bool {
    match extensions {
        Some(allowed) => path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_ascii_lowercase();
                allowed.iter().any(|e| *e == ext)
            }),
        None => mime_guess::from_path(path)
            .iter()
            .any(|mime| mime.type_() == mime_guess::mime::VIDEO),
    }
}

/// Select every eligible video under `root`, ordered by display name.
///
/// Every returned item carries a fresh id.
///
/// # Errors
/// [`Error::BadFolder`] if `root` is not a directory, [`Error::EmptySelection`]
/// if nothing eligible was found.
pub fn select_folder(root: &Path, opts: &ScanOptions) -> Result<Vec<Item>, Error> {
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(Error::BadFolder(root.to_path_buf())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::BadFolder(root.to_path_buf()));
        }
        Err(err) => return Err(err.into()),
    }

    let mut wd = WalkDir::new(root).follow_links(true);
    if !opts.recursive {
        wd = wd.max_depth(1);
    }

    let mut items = Vec::new();
    for entry in wd
        .into_iter()
        .filter_entry(|e| !should_skip_dir(e))
        .flatten()
    {
        let path = entry.path();
        if entry.file_type().is_file() && is_supported_video(path, opts.extensions.as_deref()) {
            items.push(Item::new(path));
        } else {
            debug!(path = %path.display(), "scan: skipped");
        }
    }

    if items.is_empty() {
        return Err(Error::EmptySelection(root.to_path_buf()));
    }
    items.sort_by(|a, b| by_display_name(&a.name, &b.name));
    Ok(items)
}

fn by_display_name(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn should_skip_dir(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 {
        return false;
    }
    if !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}
