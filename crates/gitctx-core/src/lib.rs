//! gitctx core: configuration, secrets, the ingestion pipeline, and the
//! service that ingests repositories and answers queries over them.

pub mod bootstrap;
pub mod config;
pub mod pipeline;
pub mod report;
pub mod service;
pub mod vault;

pub use config::Config;
pub use report::{IngestReport, format_repository_report};
pub use service::{RepoContextService, ServiceError};
