// Resume evaluation pipeline:
// extract text → build prompt → invoke model → parse/validate → aggregate.
// All model calls go through llm_client; no direct HTTP calls here.

pub mod aggregator;
pub mod bulk;
pub mod extractor;
pub mod handlers;
pub mod models;
pub mod parser;
pub mod prompts;
pub mod service;
