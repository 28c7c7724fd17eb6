//! Search → fetch → classify → export.
//!
//! Every fatal error returns before the CSV is opened, so a failed run never
//! creates or truncates the output file.

use crate::classifier::{AffiliationClassifier, TokenUsage};
use crate::error::Result;
use crate::export;
use crate::models::Article;
use crate::pubmed::PubmedClient;
use futures::stream::{self, StreamExt};
use std::path::Path;
use tracing::{debug, info, warn};

/// Pipeline options
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Classification requests in flight at once (1 = strictly sequential)
    pub concurrency: usize,
    /// Only write authors with a detected company
    pub companies_only: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            companies_only: false,
        }
    }
}

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub pmids: usize,
    pub articles: usize,
    pub authors: usize,
    /// Classifier calls made (authors with non-empty affiliation)
    pub classified: usize,
    /// Authors with a company
    pub companies: usize,
    /// Classifier calls that failed
    pub failures: usize,
    /// Data rows written to the CSV
    pub rows: usize,
    pub token_usage: Option<TokenUsage>,
}

/// Outcome of the classification step
#[derive(Debug, Default)]
struct ClassifyStats {
    classified: usize,
    companies: usize,
    failures: usize,
}

pub struct Pipeline<'a> {
    pubmed: &'a PubmedClient,
    classifier: &'a dyn AffiliationClassifier,
    options: PipelineOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        pubmed: &'a PubmedClient,
        classifier: &'a dyn AffiliationClassifier,
        options: PipelineOptions,
    ) -> Self {
        Self {
            pubmed,
            classifier,
            options,
        }
    }

    /// Run search, fetch and classification, returning the resolved articles.
    pub async fn collect(&self, query: &str) -> Result<(Vec<Article>, PipelineReport)> {
        let pmids = self.pubmed.search(query).await?;
        let mut articles = self.pubmed.fetch(&pmids).await?;

        let stats = self.classify_authors(&mut articles).await;

        let report = PipelineReport {
            pmids: pmids.len(),
            articles: articles.len(),
            authors: articles.iter().map(|a| a.authors.len()).sum(),
            classified: stats.classified,
            companies: stats.companies,
            failures: stats.failures,
            rows: 0,
            token_usage: self.classifier.usage(),
        };
        Ok((articles, report))
    }

    /// Full run: collect, then write the CSV to `output`.
    pub async fn run(&self, query: &str, output: &Path) -> Result<PipelineReport> {
        let (articles, mut report) = self.collect(query).await?;
        report.rows = export::write_csv(output, &articles, self.options.companies_only)?;
        Ok(report)
    }

    /// Fill `Author::company` for every author with affiliation text.
    ///
    /// Failures are logged and leave the company empty. Results are applied
    /// in author order regardless of concurrency.
    async fn classify_authors(&self, articles: &mut [Article]) -> ClassifyStats {
        let jobs: Vec<(usize, usize, String)> = articles
            .iter()
            .enumerate()
            .flat_map(|(ai, article)| {
                article.authors.iter().enumerate().filter_map(move |(au, author)| {
                    author
                        .classifiable_affiliation()
                        .map(|text| (ai, au, text.to_string()))
                })
            })
            .collect();

        if jobs.is_empty() {
            return ClassifyStats::default();
        }

        info!(
            count = jobs.len(),
            classifier = self.classifier.name(),
            concurrency = self.options.concurrency,
            "Classifying affiliations"
        );

        let classifier = self.classifier;
        let results: Vec<_> = stream::iter(jobs)
            .map(|(ai, au, text)| async move {
                let result = classifier.classify(&text).await;
                (ai, au, result)
            })
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut stats = ClassifyStats::default();
        for (ai, au, result) in results {
            stats.classified += 1;
            let article = &mut articles[ai];
            match result {
                Ok(company) => {
                    debug!(pmid = %article.pmid, author = %article.authors[au].name, company = ?company, "Classified");
                    if company.is_some() {
                        stats.companies += 1;
                    }
                    article.authors[au].company = company;
                }
                Err(e) => {
                    stats.failures += 1;
                    warn!(
                        pmid = %article.pmid,
                        author = %article.authors[au].name,
                        error = %e,
                        "Classification failed, leaving company empty"
                    );
                }
            }
        }

        info!(
            classified = stats.classified,
            companies = stats.companies,
            failures = stats.failures,
            "Classification complete"
        );
        stats
    }
}
