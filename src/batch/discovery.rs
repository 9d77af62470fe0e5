use crate::error::OcrError;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Image extensions picked up from the input directory (matched case-insensitively)
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff"];

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// List the supported images directly inside `input_dir`, sorted by path.
///
/// Subdirectories are not descended into. A missing input directory is fatal.
pub fn discover_images(input_dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
    if !input_dir.is_dir() {
        return Err(OcrError::InputDirectoryMissing(input_dir.to_path_buf()));
    }

    let entries = std::fs::read_dir(input_dir)
        .map_err(|_| OcrError::InputDirectoryMissing(input_dir.to_path_buf()))?;

    let mut images = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(dir = %input_dir.display(), error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && is_supported_image(&path) {
            images.push(path);
        }
    }

    images.sort();
    Ok(images)
}

/// Create the output directory; succeeds if it already exists
pub fn ensure_output_dir(output_dir: &Path) -> Result<(), OcrError> {
    std::fs::create_dir_all(output_dir).map_err(|e| {
        OcrError::OutputDirectory(format!("{}: {}", output_dir.display(), e))
    })
}

/// `<output_dir>/<source stem>.txt`
pub fn output_path_for(source: &Path, output_dir: &Path) -> PathBuf {
    let mut name: OsString = source
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_default();
    name.push(".txt");
    output_dir.join(name)
}

/// `<output_dir>/<source file name>.txt`, e.g. `a.png.txt`
fn full_name_output_path(source: &Path, output_dir: &Path) -> PathBuf {
    let mut name: OsString = source
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".txt");
    output_dir.join(name)
}

/// One distinct output path per source, in the order of `sources`.
///
/// Sources get `<stem>.txt` unless another source claims the same path, e.g.
/// `a.jpg` and `a.png`; every source in such a group keeps its extension
/// instead (`a.jpg.txt`, `a.png.txt`). Full file names are unique within a
/// directory, so the result only depends on the set of sources.
pub fn assign_output_paths(sources: &[PathBuf], output_dir: &Path) -> Vec<PathBuf> {
    let mut outputs: Vec<PathBuf> = sources
        .iter()
        .map(|source| output_path_for(source, output_dir))
        .collect();
    let mut full_name = vec![false; sources.len()];

    // A renamed source can collide with another stem (`a.png.jpg`), so repeat
    // until stable; each pass only ever switches stem names to full names.
    loop {
        let mut claims: BTreeMap<&PathBuf, usize> = BTreeMap::new();
        for output in &outputs {
            *claims.entry(output).or_default() += 1;
        }
        let clashing: Vec<usize> = (0..sources.len())
            .filter(|&i| !full_name[i] && claims[&outputs[i]] > 1)
            .collect();
        if clashing.is_empty() {
            return outputs;
        }
        for i in clashing {
            full_name[i] = true;
            outputs[i] = full_name_output_path(&sources[i], output_dir);
        }
    }
}

/// Output paths claimed by more than one source image, e.g. `a.jpg` and `a.png`
pub fn output_collisions(sources: &[PathBuf], output_dir: &Path) -> Vec<(PathBuf, Vec<PathBuf>)> {
    let mut claimed: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for source in sources {
        claimed
            .entry(output_path_for(source, output_dir))
            .or_default()
            .push(source.clone());
    }
    claimed
        .into_iter()
        .filter(|(_, sources)| sources.len() > 1)
        .collect()
}
