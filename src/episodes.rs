//! Episode metadata store: the durable record of every published episode.
//!
//! Backed by a single JSON document that is read fully and rewritten through
//! a write-new-then-rename discipline, so a crash mid-write leaves the prior
//! valid document in place. Republishing an identifier updates derived fields
//! only; `published_at` and `guid` never change once written.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::MetadataError;

/// Persisted record of one published episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    pub title: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub audio_url: String,
    pub duration_seconds: u64,
    pub size_bytes: u64,
    pub guid: String,
}

pub struct EpisodeStore {
    path: PathBuf,
}

impl EpisodeStore {
    pub fn new(path: &Path) -> Self {
        EpisodeStore {
            path: path.to_path_buf(),
        }
    }

    pub fn get(&self, id: &str) -> Result<Option<Episode>, MetadataError> {
        Ok(self.read_all()?.into_iter().find(|e| e.id == id))
    }

    /// All episodes, ordered by `published_at` descending.
    pub fn list_all(&self) -> Result<Vec<Episode>, MetadataError> {
        let mut episodes = self.read_all()?;
        episodes.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(episodes)
    }

    /// Insert or update one episode and atomically rewrite the document.
    ///
    /// For an existing id the stored `published_at` and `guid` win over the
    /// incoming record; every other field is replaced. Returns the record as
    /// stored.
    pub fn upsert(&self, episode: Episode) -> Result<Episode, MetadataError> {
        let mut episodes = self.read_all()?;
        let stored = match episodes.iter().position(|e| e.id == episode.id) {
            Some(i) => {
                let updated = Episode {
                    published_at: episodes[i].published_at,
                    guid: episodes[i].guid.clone(),
                    ..episode
                };
                episodes[i] = updated.clone();
                debug!(id = %updated.id, "updated existing episode record");
                updated
            }
            None => {
                episodes.push(episode.clone());
                debug!(id = %episode.id, "inserted new episode record");
                episode
            }
        };
        episodes.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        self.replace_all(&episodes)?;
        info!(
            id = %stored.id,
            total = episodes.len(),
            path = %self.path.display(),
            "episode metadata written"
        );
        Ok(stored)
    }

    fn read_all(&self) -> Result<Vec<Episode>, MetadataError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the full document to a temp file in the same directory, then
    /// rename over the real path. Readers never observe a partial document.
    fn replace_all(&self, episodes: &[Episode]) -> Result<(), MetadataError> {
        let parent = self.path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(parent)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        serde_json::to_writer_pretty(&mut tmp, episodes)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn episode(id: &str, published_at: DateTime<Utc>) -> Episode {
        Episode {
            id: id.to_owned(),
            title: format!("Paper {id}"),
            description: "Audio narration of the research paper.".to_owned(),
            published_at,
            audio_url: format!("https://cdn.example/podcasts/{id}.mp3"),
            duration_seconds: 600,
            size_bytes: 2_400_000,
            guid: format!("papercast-{id}"),
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn get_returns_not_found_for_unknown_id() {
        let dir = tempdir().unwrap();
        let store = EpisodeStore::new(&dir.path().join("episodes.json"));
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn list_all_orders_by_published_at_descending() {
        let dir = tempdir().unwrap();
        let store = EpisodeStore::new(&dir.path().join("episodes.json"));
        store.upsert(episode("a", at(1))).unwrap();
        store.upsert(episode("c", at(3))).unwrap();
        store.upsert(episode("b", at(2))).unwrap();

        let ids: Vec<String> = store.list_all().unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn republish_preserves_published_at_and_guid() {
        let dir = tempdir().unwrap();
        let store = EpisodeStore::new(&dir.path().join("episodes.json"));
        let original = store.upsert(episode("a", at(1))).unwrap();

        let mut replacement = episode("a", at(9));
        replacement.guid = "something-else".to_owned();
        replacement.audio_url = "https://cdn.example/podcasts/a-v2.mp3".to_owned();
        let stored = store.upsert(replacement).unwrap();

        assert_eq!(stored.published_at, original.published_at);
        assert_eq!(stored.guid, original.guid);
        assert_eq!(stored.audio_url, "https://cdn.example/podcasts/a-v2.mp3");
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[test]
    fn interrupted_write_leaves_prior_document_readable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("episodes.json");
        let store = EpisodeStore::new(&path);
        store.upsert(episode("a", at(1))).unwrap();

        // A crash between temp-write and rename leaves a stray temp file and
        // an untouched document.
        fs::write(dir.path().join(".tmpXYZ"), b"[{\"id\": \"trunc").unwrap();

        let episodes = store.list_all().unwrap();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].id, "a");
    }
}
