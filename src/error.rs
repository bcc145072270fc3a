//! Error taxonomy for the publish pipeline.
//!
//! Each stage of the pipeline has its own error type so that failures can be
//! attributed to the stage that produced them. Stage-local errors (generation,
//! synthesis, upload) fail a single identifier; store errors (metadata, feed,
//! dedup) indicate storage-layer problems and are surfaced distinctly.

use thiserror::Error;

/// Script generation failed (quota, auth, network, or unusable response).
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("source document unavailable: {0}")]
    SourceUnavailable(String),
    #[error("generation request failed: {0}")]
    Request(String),
    #[error("generation response contained no text")]
    EmptyResponse,
}

/// Speech synthesis failed, either for a single request or, after retries
/// were exhausted, for one chunk of a larger script.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("empty script: nothing to synthesize")]
    EmptyScript,
    #[error("synthesis request failed: {0}")]
    Request(String),
    #[error("synthesis of chunk {index}/{total} failed after {attempts} attempts: {source}")]
    ChunkFailed {
        index: usize,
        total: usize,
        attempts: u32,
        source: Box<SynthesisError>,
    },
}

/// Upload to the object store failed.
#[derive(Debug, Error)]
#[error("upload of {key} failed: {reason}")]
pub struct UploadError {
    pub key: String,
    pub reason: String,
}

/// The episode metadata document could not be read or atomically replaced.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata io: {0}")]
    Io(#[from] std::io::Error),
    #[error("metadata document is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The feed document could not be written or published.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed io: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// The dedup log could not be appended to.
#[derive(Debug, Error)]
#[error("dedup log {path}: {source}")]
pub struct DedupStoreError {
    pub path: String,
    #[source]
    pub source: std::io::Error,
}

/// Fatal: raised before any pipeline work starts.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("required environment variable {0} is not set")]
    MissingEnv(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Any error produced by a single pipeline stage, used by the coordinator to
/// tag failures with the stage that raised them.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Dedup(#[from] DedupStoreError),
}

impl StageError {
    /// Store errors indicate storage-layer problems likely to affect other
    /// identifiers too, and are reported with more urgency than per-item ones.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            StageError::Metadata(_) | StageError::Feed(_) | StageError::Dedup(_)
        )
    }
}
