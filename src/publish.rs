//! Publish coordinator: the per-identifier state machine that sequences
//! script generation → synthesis → upload → metadata write → feed
//! regeneration → dedup commit.
//!
//! One logical worker drives one identifier to completion before starting the
//! next, so stages never interleave across identifiers. Every persisted
//! artifact (metadata, feed, dedup log) is written through an atomic
//! discipline, so an interrupted run leaves the identifier uncommitted and
//! retryable rather than half-published. The dedup commit is the last step;
//! only a fully successful chain makes an identifier skip-eligible.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::chunker::ChunkOrchestrator;
use crate::config::Config;
use crate::contract::{DocumentSource, ObjectStore, ScriptGenerator, SpeechSynthesizer};
use crate::dedup::DedupTracker;
use crate::episodes::{Episode, EpisodeStore};
use crate::error::{FeedError, StageError, UploadError};
use crate::feed;
use crate::source_list::{self, slugify};

/// Pipeline stages, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Script,
    Audio,
    Upload,
    Metadata,
    Feed,
    Commit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Script => "script",
            Stage::Audio => "audio",
            Stage::Upload => "upload",
            Stage::Metadata => "metadata",
            Stage::Feed => "feed",
            Stage::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// States an identifier moves through. The chain is linear and `Committed`
/// is terminal; no stage is reentered after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    New,
    ScriptReady,
    AudioReady,
    Uploaded,
    MetadataWritten,
    FeedUpdated,
    Committed,
}

/// Sanctioned manual re-entry points after a partially failed earlier run.
/// Every remaining downstream stage still executes: a resumed publish never
/// skips feed regeneration or the dedup commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePoint {
    /// Enter at `AudioReady`: a local audio artifact already exists, redo the
    /// upload and everything after it without resynthesizing.
    Upload,
    /// Enter at `Uploaded`: the episode record already carries a public URL,
    /// redo the metadata write and everything after it.
    Metadata,
}

impl ResumePoint {
    fn entry_state(self) -> State {
        match self {
            ResumePoint::Upload => State::AudioReady,
            ResumePoint::Metadata => State::Uploaded,
        }
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("{id} is already committed; reprocessing a committed identifier is unsupported")]
    AlreadyCommitted { id: String },
    #[error("no local audio artifact at {path}; cannot resume at upload")]
    MissingArtifact { path: String },
    #[error("no episode record for {id}; cannot resume at metadata")]
    MissingEpisode { id: String },
    #[error("stage {stage} failed: {source}")]
    Stage { stage: Stage, source: StageError },
}

impl PublishError {
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            PublishError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    fn at<E: Into<StageError>>(stage: Stage) -> impl FnOnce(E) -> PublishError {
        move |e| PublishError::Stage {
            stage,
            source: e.into(),
        }
    }
}

/// Outcome of one successful publish run.
#[derive(Debug)]
pub struct PublishReport {
    pub id: String,
    pub entered_at: State,
    pub final_state: State,
}

/// Outcome of a batch run over the input list.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub skipped: usize,
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, PublishError)>,
}

impl BatchReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The coordinator. Collaborators are injected behind their contracts;
/// stores own the process-wide mutable files.
pub struct Publisher<'a> {
    docs: &'a dyn DocumentSource,
    generator: &'a dyn ScriptGenerator,
    synthesizer: &'a dyn SpeechSynthesizer,
    store: &'a dyn ObjectStore,
    episodes: EpisodeStore,
    dedup: DedupTracker,
    config: &'a Config,
}

impl<'a> Publisher<'a> {
    pub fn new(
        docs: &'a dyn DocumentSource,
        generator: &'a dyn ScriptGenerator,
        synthesizer: &'a dyn SpeechSynthesizer,
        store: &'a dyn ObjectStore,
        episodes: EpisodeStore,
        dedup: DedupTracker,
        config: &'a Config,
    ) -> Self {
        Publisher {
            docs,
            generator,
            synthesizer,
            store,
            episodes,
            dedup,
            config,
        }
    }

    /// Process every not-yet-committed identifier from the input list, one
    /// attempt each. Failures leave the identifier uncommitted for the next
    /// run; the batch keeps going.
    pub async fn run_batch(&mut self, references: &[String]) -> BatchReport {
        let mut report = BatchReport::default();
        for reference in references {
            let id = source_list::source_id(reference);
            if self.dedup.is_processed(&id) {
                debug!(id, "already committed; skipping");
                report.skipped += 1;
                continue;
            }
            match self.publish(&id, None).await {
                Ok(_) => {
                    info!(id, "episode published");
                    report.succeeded.push(id);
                }
                Err(e) => {
                    let storage = matches!(&e, PublishError::Stage { source, .. } if source.is_storage());
                    if storage {
                        error!(
                            id,
                            error = %e,
                            "storage-layer failure; other identifiers are likely affected"
                        );
                    } else {
                        error!(id, error = %e, "publish failed; continuing with next identifier");
                    }
                    report.failed.push((id, e));
                }
            }
        }
        report
    }

    /// Run the state machine for one identifier, optionally entering at a
    /// manual resume point.
    pub async fn publish(
        &mut self,
        id: &str,
        resume: Option<ResumePoint>,
    ) -> Result<PublishReport, PublishError> {
        if self.dedup.is_processed(id) && resume.is_none() {
            return Err(PublishError::AlreadyCommitted { id: id.to_owned() });
        }
        let entered_at = resume.map_or(State::New, ResumePoint::entry_state);
        info!(id, state = ?entered_at, "publish starting");

        let artifact_path = self.artifact_path(id);
        match resume {
            None => {
                let (doc, script) = self.stage_script(id).await?;
                self.stage_audio(id, &script, &artifact_path).await?;
                let (audio_url, size_bytes) =
                    self.stage_upload(&doc.title, &artifact_path).await?;
                self.stage_metadata(id, &doc.title, &doc.description, audio_url, size_bytes)?;
            }
            Some(ResumePoint::Upload) => {
                if !artifact_path.exists() {
                    return Err(PublishError::MissingArtifact {
                        path: artifact_path.display().to_string(),
                    });
                }
                let (title, description) = self.display_metadata(id).await?;
                let (audio_url, size_bytes) =
                    self.stage_upload(&title, &artifact_path).await?;
                self.stage_metadata(id, &title, &description, audio_url, size_bytes)?;
            }
            Some(ResumePoint::Metadata) => {
                let existing = self
                    .episodes
                    .get(id)
                    .map_err(PublishError::at(Stage::Metadata))?
                    .ok_or_else(|| PublishError::MissingEpisode { id: id.to_owned() })?;
                self.stage_metadata(
                    id,
                    &existing.title,
                    &existing.description,
                    existing.audio_url,
                    existing.size_bytes,
                )?;
            }
        }

        self.stage_feed().await?;
        self.dedup
            .mark_processed(id)
            .map_err(PublishError::at(Stage::Commit))?;
        info!(id, "identifier committed");

        Ok(PublishReport {
            id: id.to_owned(),
            entered_at,
            final_state: State::Committed,
        })
    }

    fn artifact_path(&self, id: &str) -> PathBuf {
        self.config.paths.audio_dir.join(format!("{id}.mp3"))
    }

    /// Display metadata for a resumed publish: the existing record wins, a
    /// fresh document fetch is the fallback. Neither path regenerates the
    /// script.
    async fn display_metadata(&self, id: &str) -> Result<(String, String), PublishError> {
        if let Some(existing) = self
            .episodes
            .get(id)
            .map_err(PublishError::at(Stage::Metadata))?
        {
            return Ok((existing.title, existing.description));
        }
        let doc = self
            .docs
            .fetch(id)
            .await
            .map_err(PublishError::at(Stage::Script))?;
        Ok((doc.title, doc.description))
    }

    async fn stage_script(
        &self,
        id: &str,
    ) -> Result<(crate::contract::SourceDocument, String), PublishError> {
        let doc = self
            .docs
            .fetch(id)
            .await
            .map_err(PublishError::at(Stage::Script))?;
        let retry = self.config.retry_policy();
        let script = retry
            .run("generate_script", || {
                self.generator
                    .generate(&doc.text, self.config.generation.max_source_chars)
            })
            .await
            .map_err(PublishError::at(Stage::Script))?;
        info!(id, script_chars = script.len(), "script ready");
        Ok((doc, script))
    }

    /// Synthesize and retain the artifact locally, so a failed upload can be
    /// resumed without resynthesizing.
    async fn stage_audio(
        &self,
        id: &str,
        script: &str,
        artifact_path: &Path,
    ) -> Result<(), PublishError> {
        let orchestrator = ChunkOrchestrator::new(
            self.synthesizer,
            self.config.retry_policy(),
            self.config.pipeline.max_chunk_chars,
            self.config.pipeline.boundary_tolerance,
        );
        let artifact = orchestrator
            .synthesize(script)
            .await
            .map_err(PublishError::at(Stage::Audio))?;

        let write = || -> std::io::Result<()> {
            if let Some(parent) = artifact_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(artifact_path, &artifact.bytes)
        };
        write().map_err(|e| PublishError::Stage {
            stage: Stage::Audio,
            source: StageError::Upload(UploadError {
                key: artifact_path.display().to_string(),
                reason: format!("could not retain local artifact: {e}"),
            }),
        })?;
        info!(
            id,
            chunks = artifact.chunk_count,
            bytes = artifact.bytes.len(),
            path = %artifact_path.display(),
            "audio ready"
        );
        Ok(())
    }

    async fn stage_upload(
        &self,
        title: &str,
        artifact_path: &Path,
    ) -> Result<(String, u64), PublishError> {
        let key = format!(
            "{}/{}.mp3",
            self.config.storage.audio_prefix,
            slugify(title, 120)
        );
        let bytes = fs::read(artifact_path).map_err(|e| PublishError::Stage {
            stage: Stage::Upload,
            source: StageError::Upload(UploadError {
                key: key.clone(),
                reason: format!("could not read local artifact: {e}"),
            }),
        })?;
        let retry = self.config.retry_policy();
        let audio_url = retry
            .run("upload_audio", || {
                self.store.put(&key, &bytes, "audio/mpeg")
            })
            .await
            .map_err(PublishError::at(Stage::Upload))?;
        info!(key, url = %audio_url, "audio uploaded");
        Ok((audio_url, bytes.len() as u64))
    }

    fn stage_metadata(
        &self,
        id: &str,
        title: &str,
        description: &str,
        audio_url: String,
        size_bytes: u64,
    ) -> Result<Episode, PublishError> {
        let episode = Episode {
            id: id.to_owned(),
            title: title.to_owned(),
            description: description.to_owned(),
            published_at: Utc::now(),
            audio_url,
            duration_seconds: size_bytes * 8 / self.config.pipeline.mp3_bitrate_bps,
            size_bytes,
            guid: format!("papercast-{id}"),
        };
        self.episodes
            .upsert(episode)
            .map_err(PublishError::at(Stage::Metadata))
    }

    /// Regenerate the feed from the full episode history, replace the local
    /// document atomically and publish it to the object store.
    async fn stage_feed(&self) -> Result<(), PublishError> {
        let episodes = self
            .episodes
            .list_all()
            .map_err(PublishError::at(Stage::Metadata))?;
        let xml = feed::render(
            &self.config.channel,
            &episodes,
            self.config.pipeline.retention,
        );
        feed::write_atomic(&self.config.paths.feed, &xml)
            .map_err(PublishError::at(Stage::Feed))?;

        let retry = self.config.retry_policy();
        retry
            .run("upload_feed", || {
                self.store.put(
                    &self.config.storage.feed_key,
                    xml.as_bytes(),
                    "text/xml; charset=utf-8",
                )
            })
            .await
            .map_err(|e| PublishError::Stage {
                stage: Stage::Feed,
                source: StageError::Feed(FeedError::Upload(e)),
            })?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("another run holds the lock at {0}")]
    Held(String),
    #[error("could not create lock file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Advisory lock file serializing pipeline runs. Only one run may hold write
/// access to the dedup log, episode store and feed document at a time.
/// Released on drop.
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| LockError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
        }
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                let _ = write!(file, "{}", std::process::id());
                debug!(path = %path.display(), "run lock acquired");
                Ok(RunLock {
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(LockError::Held(path.display().to_string()))
            }
            Err(e) => Err(LockError::Io {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lock_is_exclusive_and_released_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("papercast.lock");

        let lock = RunLock::acquire(&path).unwrap();
        assert!(matches!(RunLock::acquire(&path), Err(LockError::Held(_))));
        drop(lock);
        assert!(RunLock::acquire(&path).is_ok());
    }

    #[test]
    fn stage_names_match_failure_labels() {
        assert_eq!(Stage::Script.to_string(), "script");
        assert_eq!(Stage::Commit.to_string(), "commit");
    }
}
