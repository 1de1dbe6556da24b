//! Resolution of configured file patterns.

use std::fs::File;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{Result, TrainingError};

/// Expands each glob pattern into the files it matches, in pattern order and
/// sorted within a pattern.
///
/// # Errors
///
/// Fails on an invalid pattern, on a pattern without any match, and on a
/// matched file that cannot be opened for reading.
pub fn resolve_paths<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let entries = glob::glob(pattern).map_err(|source| TrainingError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let before = paths.len();
        for entry in entries {
            let path = entry.map_err(|e| TrainingError::Io {
                path: e.path().to_path_buf(),
                source: e.into_error(),
            })?;
            File::open(&path).map_err(|source| TrainingError::Io {
                path: path.clone(),
                source,
            })?;
            paths.push(path);
        }
        if paths.len() == before {
            return Err(TrainingError::NoMatch {
                pattern: pattern.to_string(),
            });
        }
        debug!(pattern, files = paths.len() - before, "Resolved path pattern");
    }
    Ok(paths)
}
