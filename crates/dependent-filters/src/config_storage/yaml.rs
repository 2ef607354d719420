//! YAML-backed storage for gather views.
//!
//! Each view lives in its own file named `gather_view.{view_id}.yml`.
//! Dependent filter options are stored inline with the filters they
//! configure, so saving a view persists its dependency configuration.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{DependentFilterError, Result};
use crate::gather::{FilterHandlerRegistry, GatherView, validate_definition};

/// Filename prefix of view config files.
const VIEW_FILE_PREFIX: &str = "gather_view";

/// Maximum config file size (10 MB). Larger files are skipped on load.
const MAX_CONFIG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Characters that are invalid in filenames on Windows/NTFS.
const WINDOWS_INVALID_CHARS: &[char] = &[':', '*', '?', '"', '<', '>', '|'];

/// Views read from a directory, plus anything that was skipped.
#[derive(Debug, Default)]
pub struct LoadedViews {
    /// Views sorted by id.
    pub views: Vec<GatherView>,
    pub warnings: Vec<String>,
}

/// Config filename of a view.
pub fn view_filename(view_id: &str) -> String {
    format!("{VIEW_FILE_PREFIX}.{view_id}.yml")
}

/// Reject view ids that are unsafe or unportable as filenames.
pub fn validate_view_id(view_id: &str) -> Result<()> {
    let reason = if view_id.is_empty() {
        Some("view ID is empty".to_string())
    } else if view_id.contains('/') || view_id.contains('\\') || view_id.contains('\0') {
        Some("contains path separator or null byte".to_string())
    } else if view_id.contains("..") {
        Some("contains '..'".to_string())
    } else if let Some(c) = view_id.chars().find(|c| WINDOWS_INVALID_CHARS.contains(c)) {
        Some(format!("contains character '{c}' invalid on Windows"))
    } else if view_id.starts_with('.') || view_id.ends_with('.') {
        Some("must not start or end with '.'".to_string())
    } else if view_id != view_id.trim() {
        Some("has leading/trailing whitespace".to_string())
    } else {
        None
    };

    match reason {
        Some(reason) => Err(DependentFilterError::InvalidViewId {
            view: view_id.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Extract the view id from a config filename.
fn parse_view_filename(filename: &str) -> Option<&str> {
    let stem = filename
        .strip_suffix(".yml")
        .or_else(|| filename.strip_suffix(".yaml"))?;
    let id = stem.strip_prefix(VIEW_FILE_PREFIX)?.strip_prefix('.')?;
    if id.is_empty() { None } else { Some(id) }
}

fn config_error(path: &Path, details: impl std::fmt::Display) -> DependentFilterError {
    DependentFilterError::ConfigFile {
        path: path.display().to_string(),
        details: details.to_string(),
    }
}

/// Parse one view file.
pub fn read_view_file(path: &Path) -> Result<GatherView> {
    let content = fs::read_to_string(path).map_err(|e| config_error(path, e))?;
    serde_yml::from_str(&content).map_err(|e| config_error(path, format!("invalid YAML: {e}")))
}

/// Load every view in `dir`.
///
/// Unreadable, oversized, symlinked or unparsable files are skipped and
/// reported as warnings. Only a missing or unreadable directory is an error.
pub fn load_views(dir: &Path) -> Result<LoadedViews> {
    let entries = fs::read_dir(dir).map_err(|e| config_error(dir, e))?;
    let mut loaded = LoadedViews::default();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                loaded.warnings.push(format!("failed to read entry: {e}"));
                continue;
            }
        };
        let path = entry.path();

        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            loaded
                .warnings
                .push(format!("skipping file with non-UTF-8 name: {}", path.display()));
            continue;
        };
        if filename.starts_with('.') {
            continue;
        }
        let Some(filename_id) = parse_view_filename(filename) else {
            continue;
        };

        let metadata = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                loaded
                    .warnings
                    .push(format!("failed to read metadata for {filename}: {e}"));
                continue;
            }
        };
        if metadata.file_type().is_symlink() {
            loaded.warnings.push(format!("skipping symlink: {filename}"));
            continue;
        }
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            loaded.warnings.push(format!(
                "skipping {filename}: file size {} bytes exceeds limit of {MAX_CONFIG_FILE_SIZE} bytes",
                metadata.len()
            ));
            continue;
        }

        let view = match read_view_file(&path) {
            Ok(view) => view,
            Err(e) => {
                loaded.warnings.push(e.to_string());
                continue;
            }
        };

        if view.view_id != filename_id {
            loaded.warnings.push(format!(
                "{filename}: filename ID '{filename_id}' does not match content ID '{}'",
                view.view_id
            ));
        }
        loaded.views.push(view);
    }

    loaded.views.sort_by(|a, b| a.view_id.cmp(&b.view_id));
    let before = loaded.views.len();
    loaded.views.dedup_by(|b, a| a.view_id == b.view_id);
    if loaded.views.len() != before {
        loaded
            .warnings
            .push("duplicate view IDs found; later files skipped".to_string());
    }

    for warning in &loaded.warnings {
        warn!(dir = %dir.display(), "{warning}");
    }
    debug!(dir = %dir.display(), views = loaded.views.len(), "loaded gather views");

    Ok(loaded)
}

/// Load a single view by id.
pub fn load_view(dir: &Path, view_id: &str) -> Result<GatherView> {
    validate_view_id(view_id)?;
    let path = dir.join(view_filename(view_id));
    if !path.is_file() {
        return Err(DependentFilterError::UnknownView {
            view: view_id.to_string(),
            dir: dir.display().to_string(),
        });
    }
    read_view_file(&path)
}

/// Write a view to `dir`, replacing any previous file. Returns the path written.
pub fn save_view(dir: &Path, view: &GatherView) -> Result<PathBuf> {
    validate_view_id(&view.view_id)?;
    fs::create_dir_all(dir).map_err(|e| config_error(dir, e))?;

    let path = dir.join(view_filename(&view.view_id));
    let yaml = serde_yml::to_string(view).map_err(|e| config_error(&path, e))?;
    fs::write(&path, yaml).map_err(|e| config_error(&path, e))?;

    info!(view = %view.view_id, path = %path.display(), "saved gather view");
    Ok(path)
}

/// Check a view before it is saved or served.
///
/// Returns warnings prefixed with the view id; an empty list means the
/// view is valid.
pub fn validate_view(view: &GatherView, handlers: &FilterHandlerRegistry) -> Vec<String> {
    let mut problems = Vec::new();
    if let Err(e) = validate_view_id(&view.view_id) {
        problems.push(e.to_string());
    }
    problems.extend(validate_definition(handlers, &view.definition));
    problems
        .into_iter()
        .map(|p| format!("{}: {p}", view.view_id))
        .collect()
}
