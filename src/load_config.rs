//! Loads the static YAML config file (no secrets) and injects required
//! environment variables for credentials. Any failure here is a fatal
//! [`ConfigurationError`], raised before the pipeline touches any state.

use std::fs;
use std::path::Path;

use tracing::{error, info};

use crate::config::{Config, Secrets};
use crate::error::ConfigurationError;

pub const ENV_GENERATION_API_KEY: &str = "GENERATION_API_KEY";
pub const ENV_SYNTHESIS_API_KEY: &str = "SYNTHESIS_API_KEY";
pub const ENV_STORE_ENDPOINT: &str = "STORE_ENDPOINT";
pub const ENV_STORE_PUBLIC_BASE: &str = "STORE_PUBLIC_BASE";
pub const ENV_STORE_TOKEN: &str = "STORE_TOKEN";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<(Config, Secrets), ConfigurationError> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "loading configuration");

    let content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "failed to read config file");
        ConfigurationError::Read {
            path: path_ref.display().to_string(),
            source: e,
        }
    })?;

    let config: Config = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "failed to parse config YAML");
        ConfigurationError::Parse {
            path: path_ref.display().to_string(),
            source: e,
        }
    })?;

    validate(&config)?;

    let secrets = Secrets {
        generation_api_key: require_env(ENV_GENERATION_API_KEY)?,
        synthesis_api_key: require_env(ENV_SYNTHESIS_API_KEY)?,
        store_endpoint: require_env(ENV_STORE_ENDPOINT)?,
        store_public_base: require_env(ENV_STORE_PUBLIC_BASE)?,
        store_token: require_env(ENV_STORE_TOKEN)?,
    };

    config.trace_loaded();
    Ok((config, secrets))
}

fn validate(config: &Config) -> Result<(), ConfigurationError> {
    if config.pipeline.max_chunk_chars == 0 {
        return Err(ConfigurationError::Invalid(
            "pipeline.max_chunk_chars must be positive".to_owned(),
        ));
    }
    if config.pipeline.boundary_tolerance >= config.pipeline.max_chunk_chars {
        return Err(ConfigurationError::Invalid(
            "pipeline.boundary_tolerance must be smaller than max_chunk_chars".to_owned(),
        ));
    }
    if config.retry.max_attempts == 0 {
        return Err(ConfigurationError::Invalid(
            "retry.max_attempts must be at least 1".to_owned(),
        ));
    }
    if config.pipeline.mp3_bitrate_bps == 0 {
        return Err(ConfigurationError::Invalid(
            "pipeline.mp3_bitrate_bps must be positive".to_owned(),
        ));
    }
    Ok(())
}

fn require_env(name: &'static str) -> Result<String, ConfigurationError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => {
            error!(var = name, "required environment variable not set");
            Err(ConfigurationError::MissingEnv(name))
        }
    }
}
