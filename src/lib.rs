#![doc = "papercast: pipeline for publishing research papers as podcast episodes."]

//! The core of papercast is the publish pipeline: a per-identifier state
//! machine ([`publish::Publisher`]) that sequences script generation, chunked
//! speech synthesis, object-store upload, episode metadata persistence, feed
//! regeneration and the final dedup commit. External collaborators sit behind
//! the traits in [`contract`]; the stores ([`dedup`], [`episodes`], [`feed`])
//! own the process-wide mutable files and write them atomically.

pub mod chunker;
pub mod cli;
pub mod config;
pub mod contract;
pub mod dedup;
pub mod documents;
pub mod episodes;
pub mod error;
pub mod feed;
pub mod gemini;
pub mod load_config;
pub mod object_store;
pub mod publish;
pub mod retry;
pub mod source_list;
pub mod tts;

pub use cli::{run, Cli, Commands, RunOutcome};
