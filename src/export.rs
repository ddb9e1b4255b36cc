//! Processed-clip export.
//!
//! A one-way materialization of the processed artifact to disk under a fixed
//! suggested filename.  Not part of the workflow state machine: exporting
//! changes nothing and can be repeated.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::source::AudioArtifact;

/// Suggested filename for an exported processed clip.
pub const SUGGESTED_FILENAME: &str = "voice_changed_audio.wav";

/// Failures while materializing a clip.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write exported clip: {0}")]
    Io(#[from] std::io::Error),
}

/// Write `clip` into `dir` as [`SUGGESTED_FILENAME`], creating the directory
/// if needed.  Returns the full path of the written file.
pub fn write_clip(clip: &AudioArtifact, dir: &Path) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(SUGGESTED_FILENAME);
    std::fs::write(&path, clip.data())?;
    log::info!("export: wrote {} bytes to {}", clip.len(), path.display());
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_the_payload_under_the_suggested_name() {
        let dir = tempfile::tempdir().unwrap();
        let clip = AudioArtifact::new(vec![1u8, 2, 3], "audio/wav");

        let path = write_clip(&clip, dir.path()).unwrap();

        assert!(path.ends_with(SUGGESTED_FILENAME));
        assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out").join("clips");
        let clip = AudioArtifact::new(vec![9u8], "audio/wav");

        let path = write_clip(&clip, &nested).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn export_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let clip = AudioArtifact::new(vec![1u8], "audio/wav");

        write_clip(&clip, dir.path()).unwrap();
        let path = write_clip(&clip, dir.path()).unwrap();

        assert_eq!(std::fs::read(path).unwrap(), vec![1]);
    }
}
