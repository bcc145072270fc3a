//! File-backed document source.
//!
//! Text extraction runs upstream of this pipeline and drops one plain-text
//! file per identifier into the documents directory: first line is the paper
//! title, an optional second line starting with `>` is the episode
//! description, the rest is the extracted body text.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::contract::{DocumentSource, SourceDocument};
use crate::error::GenerationError;

const DEFAULT_DESCRIPTION: &str = "Audio narration of the research paper.";

pub struct FileDocumentSource {
    dir: PathBuf,
}

impl FileDocumentSource {
    pub fn new(dir: &Path) -> Self {
        FileDocumentSource {
            dir: dir.to_path_buf(),
        }
    }
}

#[async_trait]
impl DocumentSource for FileDocumentSource {
    async fn fetch(&self, id: &str) -> Result<SourceDocument, GenerationError> {
        let path = self.dir.join(format!("{id}.txt"));
        debug!(id, path = %path.display(), "reading extracted document");
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            GenerationError::SourceUnavailable(format!("{}: {e}", path.display()))
        })?;

        let mut lines = content.lines();
        let title = lines
            .next()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                GenerationError::SourceUnavailable(format!("{}: empty document", path.display()))
            })?
            .to_owned();

        let rest: Vec<&str> = lines.collect();
        let (description, body_start) = match rest.first() {
            Some(line) if line.trim_start().starts_with('>') => (
                line.trim_start().trim_start_matches('>').trim().to_owned(),
                1,
            ),
            _ => (DEFAULT_DESCRIPTION.to_owned(), 0),
        };
        let text = rest[body_start..].join("\n").trim().to_owned();

        Ok(SourceDocument {
            title,
            description,
            text,
        })
    }
}
