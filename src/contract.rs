//! Collaborator contracts for the publish pipeline.
//!
//! The pipeline treats document fetching, script generation, speech synthesis
//! and blob storage as external collaborators behind async traits. Concrete
//! clients live in their own modules ([`crate::documents`], [`crate::gemini`],
//! [`crate::tts`], [`crate::object_store`]); tests drive the coordinator with
//! the `mockall` mocks generated here.

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{GenerationError, SynthesisError, UploadError};

/// The extracted content of one source document.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub title: String,
    pub description: String,
    pub text: String,
}

/// Resolves a source identifier to its extracted text and display metadata.
///
/// Extraction itself (PDF parsing, image filtering) happens upstream; this
/// trait only retrieves the result.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<SourceDocument, GenerationError>;
}

/// Turns extracted paper text into a narration script.
///
/// Implementations must bound the amount of source text they send to the
/// model at `max_source_chars`.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(
        &self,
        source_text: &str,
        max_source_chars: usize,
    ) -> Result<String, GenerationError>;
}

/// Synthesizes one bounded text chunk into audio bytes.
///
/// Chunking and reassembly are the chunk orchestrator's concern; one call
/// here maps to exactly one synthesis request.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize_chunk(&self, text: &str) -> Result<Vec<u8>, SynthesisError>;
}

/// Put/get blob store with public URLs (e.g. an S3-compatible bucket).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `bytes` under `key` and return the public URL of the object.
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, UploadError>;
}
