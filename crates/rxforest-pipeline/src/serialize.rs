//! Pipeline artifact save and load via bincode.
//!
//! The artifact starts with an eight-byte tag and a format version, then
//! the pipeline as plain data. Loading rejects files without the tag
//! before decoding anything, and checks the decoded pipeline's structure
//! before handing it out.

use std::path::Path;

use bincode::Options;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::PipelineError;
use crate::pipeline::Pipeline;

/// Tag identifying files written by [`Pipeline::save`].
const MAGIC: [u8; 8] = *b"RXFOREST";

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    magic: [u8; 8],
    format_version: u32,
    pipeline: &'a Pipeline,
}

#[derive(Deserialize)]
struct Header {
    magic: [u8; 8],
    format_version: u32,
}

#[derive(Deserialize)]
struct Envelope {
    #[allow(dead_code)]
    magic: [u8; 8],
    #[allow(dead_code)]
    format_version: u32,
    pipeline: Pipeline,
}

/// Fixed-width integers, so the tag and version sit at fixed offsets.
fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

impl Pipeline {
    /// Save the pipeline to a binary file, replacing any existing one.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`PipelineError::OutputDirMissing`] | The parent directory does not exist |
    /// | [`PipelineError::SerializeArtifact`] | bincode encoding failed |
    /// | [`PipelineError::WriteArtifact`] | file write failed |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.is_dir()
        {
            return Err(PipelineError::OutputDirMissing {
                path: parent.to_path_buf(),
            });
        }

        let envelope = EnvelopeRef {
            magic: MAGIC,
            format_version: FORMAT_VERSION,
            pipeline: self,
        };
        let bytes = codec()
            .serialize(&envelope)
            .map_err(|e| PipelineError::SerializeArtifact { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| PipelineError::WriteArtifact {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(size_bytes = bytes.len(), n_trees = self.n_trees(), "pipeline saved");
        Ok(())
    }

    /// Load a pipeline saved by [`Pipeline::save`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`PipelineError::ReadArtifact`] | file read failed |
    /// | [`PipelineError::UntrustedArtifact`] | the file lacks the artifact tag |
    /// | [`PipelineError::IncompatibleArtifactVersion`] | format version mismatch |
    /// | [`PipelineError::DeserializeArtifact`] | bincode decoding failed |
    /// | [`PipelineError::CorruptArtifact`] | decoded pipeline fails its integrity check |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| PipelineError::ReadArtifact {
            path: path.to_path_buf(),
            source: e,
        })?;

        if !bytes.starts_with(&MAGIC) {
            return Err(PipelineError::UntrustedArtifact {
                path: path.to_path_buf(),
            });
        }

        let limit = bytes.len() as u64;
        let decode_error = |e| PipelineError::DeserializeArtifact {
            path: path.to_path_buf(),
            source: e,
        };

        let header: Header = codec().with_limit(limit).deserialize(&bytes).map_err(decode_error)?;
        debug_assert_eq!(header.magic, MAGIC);
        if header.format_version != FORMAT_VERSION {
            return Err(PipelineError::IncompatibleArtifactVersion {
                path: path.to_path_buf(),
                expected: FORMAT_VERSION,
                found: header.format_version,
            });
        }

        let envelope: Envelope = codec().with_limit(limit).deserialize(&bytes).map_err(decode_error)?;
        let pipeline = envelope.pipeline;
        pipeline
            .check_integrity()
            .map_err(|reason| PipelineError::CorruptArtifact {
                path: path.to_path_buf(),
                reason,
            })?;

        debug!(
            n_trees = pipeline.n_trees(),
            n_classes = pipeline.classes().len(),
            "pipeline loaded"
        );
        Ok(pipeline)
    }
}
