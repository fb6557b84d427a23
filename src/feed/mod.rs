//! Feed module: transport and the ingestion loop

mod client;
mod ingest;

pub use client::FeedClient;
pub use ingest::{IngestSettings, IngestSummary, Ingestor};
