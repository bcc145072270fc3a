//! Static configuration for a pipeline run.
//!
//! Everything here comes from the YAML config file; secrets (API keys, store
//! credentials) come from the environment and live in [`Secrets`], merged by
//! [`crate::load_config`].

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::feed::ChannelConfig;
use crate::retry::RetryPolicy;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub paths: PathsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub channel: ChannelConfig,
}

impl Config {
    pub fn trace_loaded(&self) {
        info!(
            input_list = %self.paths.input_list.display(),
            episodes = %self.paths.episodes.display(),
            feed = %self.paths.feed.display(),
            retention = self.pipeline.retention,
            max_chunk_chars = self.pipeline.max_chunk_chars,
            "loaded config"
        );
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }
}

/// Locations of the process-wide mutable files and local artifacts.
#[derive(Debug, Deserialize)]
pub struct PathsConfig {
    /// Newline-delimited source references, one per line.
    pub input_list: PathBuf,
    /// Append-only dedup log of committed identifiers.
    pub dedup_log: PathBuf,
    /// Episode metadata document (JSON).
    pub episodes: PathBuf,
    /// Local copy of the rendered feed document.
    pub feed: PathBuf,
    /// Directory holding local audio artifacts, one per identifier.
    pub audio_dir: PathBuf,
    /// Directory holding pre-extracted document texts, one per identifier.
    pub documents_dir: PathBuf,
    /// Advisory lock file serializing concurrent runs.
    #[serde(default = "default_lock_path")]
    pub lock: PathBuf,
}

fn default_lock_path() -> PathBuf {
    PathBuf::from("papercast.lock")
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum characters per synthesis chunk.
    pub max_chunk_chars: usize,
    /// How close to the chunk limit a sentence end must fall to still be
    /// used as the split point.
    pub boundary_tolerance: usize,
    /// Maximum number of episodes exposed in the rendered feed.
    pub retention: usize,
    /// Bitrate used to estimate episode duration from artifact size.
    pub mp3_bitrate_bps: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            max_chunk_chars: 4500,
            boundary_tolerance: 500,
            retention: 30,
            mp3_bitrate_bps: 32_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            base_delay_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    /// Upper bound on the source text sent to the model.
    pub max_source_chars: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            model: "gemini-2.5-flash".to_owned(),
            max_source_chars: 30_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub voice: String,
    pub language_code: String,
    pub speaking_rate: f64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        SynthesisConfig {
            voice: "en-US-Studio-O".to_owned(),
            language_code: "en-US".to_owned(),
            speaking_rate: 1.0,
        }
    }
}

/// Object-store key layout. Endpoint and credentials come from the
/// environment, see [`Secrets`].
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub audio_prefix: String,
    pub feed_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            audio_prefix: "podcasts".to_owned(),
            feed_key: "feed.xml".to_owned(),
        }
    }
}

/// Environment-provided credentials and endpoints, never written to disk.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub generation_api_key: String,
    pub synthesis_api_key: String,
    pub store_endpoint: String,
    pub store_public_base: String,
    pub store_token: String,
}
