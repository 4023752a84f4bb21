//! Glob-based input matching: expands `input_filepattern` (spec.md §6)
//! into the sorted list of shard files a map worker reads sequentially.

use std::io;
use std::path::PathBuf;

/// Expands a glob pattern into the paths it matches, sorted so a worker's
/// input shards are visited in a stable, reproducible order.
pub fn expand(pattern: &str) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let entries = glob::glob(pattern).map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;
    for entry in entries {
        paths.push(entry.map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?);
    }
    paths.sort();
    Ok(paths)
}
