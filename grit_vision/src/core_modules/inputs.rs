// THEORY:
// The `inputs` module turns the raw `--input` entries into the flat, ordered
// list of image paths the driver walks. Three kinds of entry are understood:
// a file is taken as is, a directory contributes its image files (one level,
// sorted by name) and anything else is treated as a glob pattern.
//
// Every entry must contribute at least one image, and a path reached through
// two entries is kept only once, at its first position. One path means one
// output artifact.

use crate::core_modules::error::{GritError, GritResult};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// True when the extension names a format the decoder can open.
pub fn is_image_file(path: &Path) -> bool {
    image::ImageFormat::from_path(path).is_ok()
}

/// Regular image files directly inside `dir`, sorted by file name.
pub fn find_image_files(dir: &Path) -> GritResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| GritError::io(dir, e))? {
        let path = entry.map_err(|e| GritError::io(dir, e))?.path();
        if path.is_file() && is_image_file(&path) {
            files.push(path);
        } else {
            debug!(path = %path.display(), "skipping non-image entry");
        }
    }
    files.sort();
    Ok(files)
}

/// Expands `--input` entries: files are taken as is, directories are listed,
/// anything else is treated as a glob pattern. Order follows the entries;
/// repeated paths are dropped.
pub fn collect_inputs<S: AsRef<str>>(sources: &[S]) -> GritResult<Vec<PathBuf>> {
    let mut all = Vec::new();
    let mut seen = HashSet::new();
    for source in sources {
        let source = source.as_ref();
        for path in expand_entry(source)? {
            if seen.insert(path.clone()) {
                all.push(path);
            } else {
                debug!(path = %path.display(), "dropping repeated input");
            }
        }
    }
    Ok(all)
}

fn expand_entry(source: &str) -> GritResult<Vec<PathBuf>> {
    let path = Path::new(source);
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if path.is_dir() {
        let files = find_image_files(path)?;
        if files.is_empty() {
            return Err(GritError::input(format!("no image files in {source}")));
        }
        return Ok(files);
    }

    let paths = glob::glob(source)
        .map_err(|e| GritError::input(format!("{source} is neither a path nor a valid glob pattern: {e}")))?;
    let mut matched = Vec::new();
    for entry in paths {
        match entry {
            Ok(p) if p.is_file() && is_image_file(&p) => matched.push(p),
            Ok(_) => {}
            Err(e) => warn!(pattern = source, error = %e, "unreadable glob match"),
        }
    }
    if matched.is_empty() {
        return Err(GritError::input(format!("no image files match {source}")));
    }
    Ok(matched)
}
