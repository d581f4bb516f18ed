/// Artifact writer: puts generated files on disk, creating parent
/// directories as needed. Existing files are overwritten.

use std::fs;

use anyhow::{Context, Result};
use tracing::debug;

use crate::GeneratedFile;

/// Write every file and return how many were written.
pub fn write_all(files: &[GeneratedFile]) -> Result<usize> {
    for file in files {
        if let Some(parent) = file.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        fs::write(&file.path, &file.content)
            .with_context(|| format!("writing {}", file.path.display()))?;
        debug!("wrote {} ({} bytes)", file.path.display(), file.content.len());
    }
    Ok(files.len())
}
