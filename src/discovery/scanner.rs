//! Input discovery and output naming

use crate::error::{MasterError, Result};
use crate::types::{InputFormat, OutputFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Suffix appended to the input stem when naming outputs
pub const OUTPUT_SUFFIX: &str = "Mastered";

/// Discovered audio file with basic metadata
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub format: InputFormat,
    pub size_bytes: u64,
}

/// List the supported audio files directly inside `input_dir`
///
/// The scan is not recursive and only regular files are considered. Results
/// are ordered by file name so a batch always sees the same job order.
pub fn scan(input_dir: &Path, ignore_case: bool) -> Result<Vec<DiscoveredFile>> {
    if !input_dir.is_dir() {
        return Err(MasterError::resource_error(
            input_dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "input directory does not exist"),
        ));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", input_dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(file) = try_discover_file(entry.path(), ignore_case) {
            debug!("Discovered: {}", file.path.display());
            files.push(file);
        }
    }

    info!("Discovered {} audio files", files.len());

    if files.is_empty() {
        warn!("No supported audio files found in {}", input_dir.display());
    }

    Ok(files)
}

/// Try to create a DiscoveredFile if the path is a supported audio format
fn try_discover_file(path: &Path, ignore_case: bool) -> Option<DiscoveredFile> {
    let ext = path.extension()?.to_str()?;
    let format = InputFormat::from_extension(ext, ignore_case)?;

    let metadata = std::fs::metadata(path).ok()?;

    Some(DiscoveredFile {
        path: path.to_path_buf(),
        format,
        size_bytes: metadata.len(),
    })
}

/// Output path for an input: `<output_dir>/<stem>Mastered.<ext>`
pub fn output_path_for(input: &Path, output_dir: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{}{}.{}", stem, OUTPUT_SUFFIX, format.extension()))
}
