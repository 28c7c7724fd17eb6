//! Shared fixtures for the mocked integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use rustpubmed::classifier::AffiliationClassifier;
use rustpubmed::config::EutilsConfig;
use rustpubmed::pubmed::PubmedClient;
use rustpubmed::{PubmedError, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CRISPR_QUERY: &str = "CRISPR cancer therapy";

pub const CRISPR_ESEARCH: &str = r#"{"header":{"type":"esearch","version":"0.3"},"esearchresult":{"count":"2","retmax":"2","retstart":"0","idlist":["111","222"]}}"#;

pub const EMPTY_ESEARCH: &str = r#"{"esearchresult":{"count":"0","retmax":"0","idlist":[]}}"#;

pub const CRISPR_EFETCH: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2025//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_250101.dtd">
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">111</PMID>
      <Article PubModel="Print-Electronic">
        <Journal>
          <JournalIssue CitedMedium="Internet">
            <PubDate><Year>2024</Year><Month>Jun</Month></PubDate>
          </JournalIssue>
          <Title>Nature biotechnology</Title>
        </Journal>
        <ArticleTitle>CRISPR advances</ArticleTitle>
        <ELocationID EIdType="doi" ValidYN="Y">10.1038/crispr.111</ELocationID>
        <AuthorList CompleteYN="Y">
          <Author ValidYN="Y">
            <LastName>Doe</LastName>
            <ForeName>Jane</ForeName>
            <AffiliationInfo>
              <Affiliation>Moderna Inc., Cambridge, MA, USA.</Affiliation>
            </AffiliationInfo>
          </Author>
          <Author ValidYN="Y">
            <LastName>Roe</LastName>
            <ForeName>Rick</ForeName>
          </Author>
        </AuthorList>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">222</PMID>
      <Article PubModel="Print">
        <Journal>
          <JournalIssue>
            <PubDate><Year>2023</Year></PubDate>
          </JournalIssue>
        </Journal>
        <ArticleTitle>Resistance mechanisms</ArticleTitle>
        <AuthorList CompleteYN="Y">
          <Author ValidYN="Y">
            <LastName>Smith</LastName>
            <ForeName>Ann</ForeName>
            <AffiliationInfo>
              <Affiliation>University Lab</Affiliation>
            </AffiliationInfo>
          </Author>
        </AuthorList>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

pub const CRISPR_CSV: &str = "Title,Author,Affiliation,Company,Publication Date,DOI\n\
CRISPR advances,Jane Doe,\"Moderna Inc., Cambridge, MA, USA.\",Moderna,2024-06,10.1038/crispr.111\n\
CRISPR advances,Rick Roe,,,2024-06,10.1038/crispr.111\n\
Resistance mechanisms,Ann Smith,University Lab,,2023,\n";

/// Mount ESearch and EFetch responses on `server`.
pub async fn mount_eutils(server: &MockServer, esearch: &str, efetch: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("db", "pubmed"))
        .and(query_param("retmode", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("retmode", "xml"))
        .respond_with(efetch)
        .mount(server)
        .await;
}

pub fn pubmed_client(server: &MockServer) -> PubmedClient {
    PubmedClient::new(EutilsConfig {
        base_url: server.uri(),
        ..Default::default()
    })
    .expect("client")
}

/// Deterministic classifier that records every affiliation it sees.
///
/// Affiliations containing "FAIL" produce an error.
#[derive(Default)]
pub struct StubClassifier {
    answers: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl StubClassifier {
    pub fn with_answers(answers: &[(&str, &str)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn crispr() -> Self {
        Self::with_answers(&[("Moderna", "Moderna")])
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AffiliationClassifier for StubClassifier {
    async fn classify(&self, affiliation: &str) -> Result<Option<String>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(affiliation.to_string());
        }
        if affiliation.contains("FAIL") {
            return Err(PubmedError::Api {
                code: 429,
                message: "quota exceeded".to_string(),
            });
        }
        Ok(self
            .answers
            .iter()
            .find(|(needle, _)| affiliation.contains(needle.as_str()))
            .map(|(_, company)| company.clone()))
    }

    fn name(&self) -> &str {
        "stub"
    }
}
