//! rustpubmed - PubMed affiliation pipeline
//!
//! Searches PubMed, asks an LLM which author affiliations name a
//! pharmaceutical or biotech company, and writes the result as CSV.
//!
//! ## Usage
//!
//! ```bash
//! GEMINI_API_KEY=... rustpubmed "CRISPR cancer therapy" -o crispr.csv
//! rustpubmed "mRNA vaccine" --classifier keyword --companies-only
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rustpubmed::classifier::{AffiliationClassifier, KeywordClassifier, LlmClassifier};
use rustpubmed::config::{self, EutilsConfig, LlmConfig};
use rustpubmed::pipeline::{Pipeline, PipelineOptions};
use rustpubmed::pubmed::PubmedClient;
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Fetch PubMed papers for a topic and extract pharmaceutical/biotech affiliations
#[derive(Parser, Debug)]
#[command(name = "rustpubmed")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Search term for PubMed (e.g., "mRNA vaccine")
    query: String,

    /// Output CSV file
    #[arg(short, long, visible_alias = "file", default_value = "output.csv")]
    output: PathBuf,

    /// Maximum number of PMIDs to fetch
    #[arg(short = 'm', long = "max", default_value_t = 100)]
    max_results: u32,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// How affiliations are classified
    #[arg(long, value_enum, default_value_t = ClassifierKind::Llm)]
    classifier: ClassifierKind,

    /// LLM API base URL (OpenAI-compatible)
    #[arg(long, default_value = config::DEFAULT_LLM_BASE_URL)]
    llm_base_url: String,

    /// LLM model name
    #[arg(long, default_value = config::DEFAULT_LLM_MODEL)]
    llm_model: String,

    /// NCBI E-utilities base URL
    #[arg(long, default_value = config::DEFAULT_EUTILS_URL)]
    eutils_url: String,

    /// Classification requests in flight at once
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=32))]
    concurrency: u16,

    /// Only write authors with a detected company
    #[arg(long)]
    companies_only: bool,

    /// Extra dotenv file to load before reading the environment
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ClassifierKind {
    /// Hosted language model (needs GEMINI_API_KEY)
    Llm,
    /// Offline keyword heuristic
    Keyword,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    debug!(args = ?cli, "Arguments");

    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    // Configuration is resolved before any network call
    let loaded = config::load_env_files(cli.env_file.as_deref())?;
    debug!(files = ?loaded, "Loaded env files");

    let (classifier, classifier_label): (Box<dyn AffiliationClassifier>, String) = match cli.classifier {
        ClassifierKind::Llm => {
            let llm_config = LlmConfig::from_env(&cli.llm_base_url, &cli.llm_model)
                .context("LLM classifier is not configured")?;
            let llm = LlmClassifier::new(llm_config)?;
            let label = format!("{} ({})", llm.name(), llm.model());
            (Box::new(llm), label)
        }
        ClassifierKind::Keyword => {
            let keyword = KeywordClassifier::default();
            let label = keyword.name().to_string();
            (Box::new(keyword), label)
        }
    };

    let eutils = EutilsConfig::from_env(&cli.eutils_url, cli.max_results)?;
    let pubmed = PubmedClient::new(eutils)?;

    let options = PipelineOptions {
        concurrency: usize::from(cli.concurrency),
        companies_only: cli.companies_only,
    };
    let pipeline = Pipeline::new(&pubmed, classifier.as_ref(), options);

    println!("\nSearching PubMed for: {}", cli.query);
    println!("Classifier: {}", classifier_label);
    println!("Max results: {}", pubmed.config().max_results);

    let report = pipeline
        .run(&cli.query, &cli.output)
        .await
        .with_context(|| format!("Pipeline failed for query {:?}", cli.query))?;

    println!("PMIDs found: {}", report.pmids);
    println!("Articles parsed: {}", report.articles);
    println!(
        "Authors: {} ({} classified, {} with a company, {} failed)",
        report.authors, report.classified, report.companies, report.failures
    );
    if let Some(usage) = report.token_usage.filter(|u| u.total_tokens > 0) {
        println!(
            "Token usage: {} prompt + {} completion = {} total",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        );
    }
    println!("\n✓ Saved {} rows to {}", report.rows, cli.output.display());

    Ok(())
}
