//! Controller folder discovery.
//!
//! A controller folder is any directory below the controllers root that contains the
//! marker file (`controller.rs` by default). The folder's path relative to the root
//! becomes the URL prefix, and the leaf folder name selects the controller:
//!
//! ```text
//! controllers/
//! ├── users/controller.rs              → /users               UsersController
//! ├── admin/
//! │   └── UserProfiles/controller.rs   → /admin/user-profiles UserProfilesController
//! └── _shared/helpers.rs               (skipped)
//! ```

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::convention;
use crate::error::BuildError;

/// One discovered controller folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerFolder {
    /// Absolute or root-relative directory path as walked.
    pub dir: PathBuf,
    /// URL segments, already kebab-cased, e.g. `["admin", "user-profiles"]`.
    pub segments: Vec<String>,
    /// Joined URL prefix, e.g. `/admin/user-profiles`.
    pub url_prefix: String,
    /// Controller expected in this folder, e.g. `UserProfilesController`.
    pub controller_name: String,
}

// `.git`, `_shared` and friends are never controller folders, nor is anything below them.
fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || name.starts_with('_'))
}

/// Walks `root` and returns every controller folder, sorted by path.
///
/// # Errors
///
/// Returns [`BuildError::ControllersDir`] when `root` or one of its subdirectories
/// cannot be read.
pub fn discover(root: &Path, controller_file: &str) -> Result<Vec<ControllerFolder>, BuildError> {
    let mut folders = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(0)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e));

    for entry in walker {
        let entry = entry.map_err(|source| BuildError::ControllersDir {
            path: root.to_path_buf(),
            source,
        })?;

        if entry.depth() == 0 || !entry.file_type().is_dir() {
            continue;
        }
        if !entry.path().join(controller_file).is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .map(convention::url_segment)
            .filter(|s| !s.is_empty())
            .collect();
        let Some(leaf) = relative.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let folder = ControllerFolder {
            dir: entry.path().to_path_buf(),
            url_prefix: convention::join_path(
                &segments.iter().map(String::as_str).collect::<Vec<_>>(),
            ),
            controller_name: convention::controller_name(leaf),
            segments,
        };
        tracing::debug!(
            dir = %folder.dir.display(),
            prefix = %folder.url_prefix,
            controller = %folder.controller_name,
            "controller folder discovered"
        );
        folders.push(folder);
    }

    Ok(folders)
}
