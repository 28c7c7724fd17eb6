//! NCBI E-utilities client.
//!
//! Two calls are used:
//! - ESearch (`esearch.fcgi`, JSON) returns the PMIDs matching a query
//! - EFetch (`efetch.fcgi`, XML) returns the article records for a PMID batch
//!
//! Neither call is retried; failures go straight back to the caller.

use crate::config::EutilsConfig;
use crate::error::{PubmedError, Result};
use crate::models::Article;
use crate::parser;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Tool name reported to NCBI
const TOOL_NAME: &str = "rustpubmed";

/// PubMed client bound to one E-utilities endpoint
pub struct PubmedClient {
    client: reqwest::Client,
    config: EutilsConfig,
}

impl PubmedClient {
    /// Create a new PubmedClient
    pub fn new(config: EutilsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("{}/{}", TOOL_NAME, env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| PubmedError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &EutilsConfig {
        &self.config
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), name)
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("db", "pubmed".to_string()), ("tool", TOOL_NAME.to_string())];
        if let Some(key) = &self.config.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    /// Search PubMed and return matching PMIDs, newest first.
    #[instrument(skip(self), fields(retmax = self.config.max_results))]
    pub async fn search(&self, query: &str) -> Result<Vec<String>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PubmedError::Validation("search query is empty".to_string()));
        }

        let mut params = self.base_params();
        params.push(("term", query.to_string()));
        params.push(("retmax", self.config.max_results.to_string()));
        params.push(("retmode", "json".to_string()));
        params.push(("sort", "date".to_string()));

        let response = self
            .client
            .get(self.endpoint("esearch.fcgi"))
            .query(&params)
            .send()
            .await?;

        debug!(url = %response.url(), status = %response.status(), "ESearch response");

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PubmedError::Api {
                code: status.as_u16() as i32,
                message: format!("ESearch failed: {} - {}", status, error_text.trim()),
            });
        }

        let body = response.text().await?;
        let ids = parse_esearch(&body)?;

        info!(count = ids.len(), "ESearch returned PMIDs");
        Ok(ids)
    }

    /// Fetch the raw EFetch XML for a batch of PMIDs.
    ///
    /// Returns `None` for an empty batch without touching the network.
    #[instrument(skip(self, pmids), fields(count = pmids.len()))]
    pub async fn fetch_xml(&self, pmids: &[String]) -> Result<Option<String>> {
        if pmids.is_empty() {
            return Ok(None);
        }

        let mut params = self.base_params();
        params.push(("id", pmids.join(",")));
        params.push(("retmode", "xml".to_string()));

        let response = self
            .client
            .get(self.endpoint("efetch.fcgi"))
            .query(&params)
            .send()
            .await?;

        debug!(url = %response.url(), status = %response.status(), "EFetch response");

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PubmedError::Api {
                code: status.as_u16() as i32,
                message: format!("EFetch failed: {} - {}", status, error_text.trim()),
            });
        }

        Ok(Some(response.text().await?))
    }

    /// Fetch and parse articles for a batch of PMIDs.
    ///
    /// An empty batch yields an empty list. Articles the parser cannot make
    /// sense of are skipped; an undecodable document is an error.
    pub async fn fetch(&self, pmids: &[String]) -> Result<Vec<Article>> {
        match self.fetch_xml(pmids).await? {
            Some(xml) => parser::parse_articles(&xml),
            None => Ok(Vec::new()),
        }
    }
}

// === ESearch Response Types ===

#[derive(Debug, Deserialize)]
struct EsearchResponse {
    #[serde(default)]
    esearchresult: Option<EsearchResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(rename = "ERROR", default)]
    error: Option<String>,
}

/// Extract the id list from an ESearch JSON body.
fn parse_esearch(body: &str) -> Result<Vec<String>> {
    let data: EsearchResponse = serde_json::from_str(body)
        .map_err(|e| PubmedError::Parse(format!("Invalid ESearch response: {}", e)))?;

    if let Some(message) = data
        .error
        .or_else(|| data.esearchresult.as_ref().and_then(|r| r.error.clone()))
    {
        return Err(PubmedError::Api { code: 0, message });
    }

    data.esearchresult
        .map(|r| r.idlist)
        .ok_or_else(|| PubmedError::Parse("ESearch response has no esearchresult".to_string()))
}
