//! Configuration, the document extraction pipeline, reporting, catalogue
//! seeding, progress monitoring and conversation grouping.

pub mod config;
pub mod conversations;
pub mod error;
pub mod extraction;
pub mod monitor;
pub mod pipeline;
pub mod report;
pub mod secret;
pub mod seed;

pub use config::Config;
pub use conversations::{Conversation, group_conversations};
pub use error::{ExtractionError, PipelineError};
pub use monitor::ProgressMonitor;
pub use pipeline::{
    DocumentOutcome, ExtractionMode, ExtractionPipeline, MappingRow, RunOptions, RunSummary,
};
pub use seed::{Catalogue, SeedSummary, seed_catalogue};
