//! # rustpubmed
//!
//! PubMed affiliation pipeline: finds authors affiliated with pharmaceutical
//! or biotech companies and exports them to CSV.
//!
//! ## Modules
//!
//! - [`pubmed`] - NCBI E-utilities client (ESearch / EFetch)
//! - [`parser`] - EFetch XML parsing
//! - [`classifier`] - Affiliation classification (LLM and keyword)
//! - [`export`] - CSV output
//! - [`pipeline`] - End-to-end run
//! - [`config`] - Credentials and endpoints
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustpubmed::classifier::KeywordClassifier;
//! use rustpubmed::config::EutilsConfig;
//! use rustpubmed::pipeline::{Pipeline, PipelineOptions};
//! use rustpubmed::pubmed::PubmedClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pubmed = PubmedClient::new(EutilsConfig::default())?;
//!     let classifier = KeywordClassifier::default();
//!     let pipeline = Pipeline::new(&pubmed, &classifier, PipelineOptions::default());
//!     let report = pipeline.run("mRNA vaccine", "output.csv".as_ref()).await?;
//!     println!("Wrote {} rows", report.rows);
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod pubmed;

pub use error::{PubmedError, Result};
