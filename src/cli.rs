//! CLI entry points: the batch command over the input list and the manual
//! publish/resume command for a single identifier.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use crate::config::{Config, Secrets};
use crate::dedup::DedupTracker;
use crate::documents::FileDocumentSource;
use crate::episodes::EpisodeStore;
use crate::gemini::GeminiGenerator;
use crate::load_config::load_config;
use crate::object_store::HttpObjectStore;
use crate::publish::{Publisher, ResumePoint, RunLock};
use crate::source_list::{read_references, source_id};
use crate::tts::GoogleSynthesizer;

/// CLI for papercast: publish research papers as podcast episodes.
#[derive(Parser)]
#[clap(
    name = "papercast",
    version,
    about = "Generate narration scripts for research papers, synthesize audio and publish them to a podcast feed"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process every not-yet-committed identifier from the input list
    Run {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Publish (or resume publishing) one explicit identifier
    Publish {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Source identifier, e.g. an arXiv id like 2412.14689
        #[clap(long)]
        id: String,
        /// Re-enter the pipeline at a later stage, reusing artifacts from an
        /// earlier partially failed run
        #[clap(long, value_enum)]
        resume_from: Option<ResumeArg>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ResumeArg {
    /// Local audio exists; redo the upload and everything after it
    Upload,
    /// Audio is already uploaded; redo the metadata write and everything after
    Metadata,
}

impl From<ResumeArg> for ResumePoint {
    fn from(arg: ResumeArg) -> Self {
        match arg {
            ResumeArg::Upload => ResumePoint::Upload,
            ResumeArg::Metadata => ResumePoint::Metadata,
        }
    }
}

/// What a run amounted to. `main` maps this onto the process exit status:
/// success, partial failure and nothing-to-do are distinguishable.
#[derive(Debug)]
pub enum RunOutcome {
    NothingToDo,
    Completed { succeeded: usize, failed: usize },
}

/// Async CLI logic, extracted so integration tests can drive it directly.
/// Errors returned here are fatal (configuration or lock contention) and
/// happen before any pipeline work.
pub async fn run(cli: Cli) -> Result<RunOutcome> {
    match cli.command {
        Commands::Run { config } => run_batch(&config).await,
        Commands::Publish {
            config,
            id,
            resume_from,
        } => run_publish(&config, &id, resume_from).await,
    }
}

struct Collaborators {
    docs: FileDocumentSource,
    generator: GeminiGenerator,
    synthesizer: GoogleSynthesizer,
    store: HttpObjectStore,
}

fn build_collaborators(config: &Config, secrets: &Secrets) -> Collaborators {
    Collaborators {
        docs: FileDocumentSource::new(&config.paths.documents_dir),
        generator: GeminiGenerator::new(
            secrets.generation_api_key.clone(),
            config.generation.model.clone(),
        ),
        synthesizer: GoogleSynthesizer::new(secrets.synthesis_api_key.clone(), &config.synthesis),
        store: HttpObjectStore::new(
            secrets.store_endpoint.clone(),
            secrets.store_public_base.clone(),
            secrets.store_token.clone(),
        ),
    }
}

async fn run_batch(config_path: &PathBuf) -> Result<RunOutcome> {
    let (config, secrets) = load_config(config_path)?;
    let references = read_references(&config.paths.input_list)?;
    let dedup = DedupTracker::load(&config.paths.dedup_log);

    let pending = references
        .iter()
        .filter(|r| !dedup.is_processed(&source_id(r)))
        .count();
    if pending == 0 {
        println!("Nothing to do: every listed identifier is already committed.");
        return Ok(RunOutcome::NothingToDo);
    }
    info!(pending, total = references.len(), "starting batch run");

    let _lock = RunLock::acquire(&config.paths.lock)?;
    let c = build_collaborators(&config, &secrets);
    let episodes = EpisodeStore::new(&config.paths.episodes);
    let mut publisher = Publisher::new(
        &c.docs,
        &c.generator,
        &c.synthesizer,
        &c.store,
        episodes,
        dedup,
        &config,
    );

    let report = publisher.run_batch(&references).await;
    println!(
        "Batch complete: {} published, {} failed, {} skipped.",
        report.succeeded.len(),
        report.failed.len(),
        report.skipped
    );
    for id in &report.succeeded {
        println!("  ok    {id}");
    }
    for (id, e) in &report.failed {
        println!("  fail  {id}: {e}");
    }
    Ok(RunOutcome::Completed {
        succeeded: report.succeeded.len(),
        failed: report.failed.len(),
    })
}

async fn run_publish(
    config_path: &PathBuf,
    id: &str,
    resume_from: Option<ResumeArg>,
) -> Result<RunOutcome> {
    let (config, secrets) = load_config(config_path)?;
    let dedup = DedupTracker::load(&config.paths.dedup_log);

    let _lock = RunLock::acquire(&config.paths.lock)?;
    let c = build_collaborators(&config, &secrets);
    let episodes = EpisodeStore::new(&config.paths.episodes);
    let mut publisher = Publisher::new(
        &c.docs,
        &c.generator,
        &c.synthesizer,
        &c.store,
        episodes,
        dedup,
        &config,
    );

    match publisher.publish(id, resume_from.map(Into::into)).await {
        Ok(report) => {
            println!(
                "Published {}: entered at {:?}, reached {:?}.",
                report.id, report.entered_at, report.final_state
            );
            Ok(RunOutcome::Completed {
                succeeded: 1,
                failed: 0,
            })
        }
        Err(e) => {
            eprintln!("[ERROR] Publish failed for {id}: {e}");
            Ok(RunOutcome::Completed {
                succeeded: 0,
                failed: 1,
            })
        }
    }
}
