//! PubMed EFetch XML parsing.
//!
//! The document is deserialized with quick-xml's serde support into a thin
//! mirror of the `PubmedArticleSet` schema, then converted article by article.
//! Conversion is lenient: missing leaf fields fall back to defaults, and an
//! article without a PMID or `<Article>` element is skipped with a warning.
//! Only a document that cannot be decoded at all is an error.

use crate::error::{OptionExt, PubmedError, Result};
use crate::models::{Article, Author};
use chrono::{Month, NaiveDate};
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::{debug, info, instrument, warn};

/// Title used when an article has none
pub const NO_TITLE: &str = "No Title";

/// Date used when no PubDate can be read
pub const UNKNOWN_DATE: &str = "Unknown Date";

/// Parse every article in an EFetch response.
///
/// If the whole set fails to deserialize, each `<PubmedArticle>` is retried on
/// its own so one unreadable record does not take the batch down with it.
#[instrument(skip(xml), fields(xml_size = xml.len()))]
pub fn parse_articles(xml: &str) -> Result<Vec<Article>> {
    let cleaned = strip_inline_tags(&strip_affiliation_markers(xml));

    let set = match from_str::<PubmedArticleSet>(&cleaned) {
        Ok(set) => set,
        Err(e) => {
            let err = PubmedError::Parse(format!("Failed to deserialize EFetch XML: {}", e));
            parse_each_article(&cleaned).ok_or(err)?
        }
    };

    let total = set.articles.len();
    let articles: Vec<Article> = set
        .articles
        .into_iter()
        .enumerate()
        .filter_map(|(idx, xml_article)| match xml_article.into_article() {
            Ok(article) => Some(article),
            Err(e) => {
                warn!(idx = idx, error = %e, "Skipping malformed article");
                None
            }
        })
        .collect();

    info!(parsed = articles.len(), skipped = total - articles.len(), "Parsed EFetch XML");
    Ok(articles)
}

/// Deserialize `<PubmedArticle>` elements one at a time.
///
/// Returns `None` when no element could be read, leaving the caller's error in place.
fn parse_each_article(xml: &str) -> Option<PubmedArticleSet> {
    static ARTICLE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = ARTICLE
        .get_or_init(|| Regex::new(r"(?s)<PubmedArticle(?:\s[^>]*)?>.*?</PubmedArticle>").ok())
        .as_ref()?;

    let mut articles = Vec::new();
    for (idx, chunk) in re.find_iter(xml).enumerate() {
        let wrapped = format!("<PubmedArticleSet>{}</PubmedArticleSet>", chunk.as_str());
        match from_str::<PubmedArticleSet>(&wrapped) {
            Ok(set) => articles.extend(set.articles),
            Err(e) => warn!(idx = idx, error = %e, "Skipping undecodable article"),
        }
    }

    (!articles.is_empty()).then_some(PubmedArticleSet { articles })
}

/// Remove inline formatting and MathML tags, keeping their text.
fn strip_inline_tags(xml: &str) -> String {
    static INLINE_TAG: OnceLock<Option<Regex>> = OnceLock::new();
    let re = INLINE_TAG.get_or_init(|| {
        Regex::new(
            r"</?(?:i|b|u|sup|sub|em|strong|italic|bold|sc|math|[A-Za-z][\w.-]*:[\w.-]+)(?:\s[^>]*)?/?>",
        )
        .ok()
    });

    match re {
        Some(re) => {
            let cleaned = re.replace_all(xml, "");
            if cleaned.len() != xml.len() {
                debug!(removed = xml.len() - cleaned.len(), "Stripped inline tags");
            }
            cleaned.into_owned()
        }
        None => xml.to_string(),
    }
}

/// Drop `<sup>` footnote markers (with their content) inside `<Affiliation>`.
fn strip_affiliation_markers(xml: &str) -> String {
    static AFFILIATION: OnceLock<Option<(Regex, Regex)>> = OnceLock::new();
    let pair = AFFILIATION.get_or_init(|| {
        let block = Regex::new(r"(?s)<Affiliation>.*?</Affiliation>").ok()?;
        let marker = Regex::new(r"(?s)<sup(?:\s[^>]*)?>.*?</sup>").ok()?;
        Some((block, marker))
    });

    match pair {
        Some((block, marker)) => block
            .replace_all(xml, |caps: &regex::Captures<'_>| marker.replace_all(&caps[0], " ").into_owned())
            .into_owned(),
        None => xml.to_string(),
    }
}

/// Collapse runs of whitespace (titles and affiliations often wrap lines).
fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(text: Option<&str>) -> Option<String> {
    text.map(normalize_text).filter(|t| !t.is_empty())
}

// === EFetch XML Types ===

#[derive(Debug, Deserialize)]
struct PubmedArticleSet {
    #[serde(rename = "PubmedArticle", default)]
    articles: Vec<PubmedArticleXml>,
}

#[derive(Debug, Deserialize)]
struct PubmedArticleXml {
    #[serde(rename = "MedlineCitation")]
    medline_citation: Option<MedlineCitation>,
    #[serde(rename = "PubmedData")]
    pubmed_data: Option<PubmedData>,
}

#[derive(Debug, Deserialize)]
struct MedlineCitation {
    #[serde(rename = "PMID")]
    pmid: Option<Pmid>,
    #[serde(rename = "Article")]
    article: Option<ArticleXml>,
}

#[derive(Debug, Deserialize)]
struct Pmid {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct ArticleXml {
    #[serde(rename = "Journal")]
    journal: Option<Journal>,
    #[serde(rename = "ArticleTitle")]
    title: Option<String>,
    #[serde(rename = "ELocationID", default)]
    elocation_ids: Vec<TypedId>,
    #[serde(rename = "AuthorList")]
    author_list: Option<AuthorList>,
}

#[derive(Debug, Deserialize)]
struct Journal {
    #[serde(rename = "JournalIssue")]
    issue: Option<JournalIssue>,
}

#[derive(Debug, Deserialize)]
struct JournalIssue {
    #[serde(rename = "PubDate")]
    pub_date: Option<PubDate>,
}

#[derive(Debug, Default, Deserialize)]
struct PubDate {
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Month")]
    month: Option<String>,
    #[serde(rename = "Day")]
    day: Option<String>,
    #[serde(rename = "MedlineDate")]
    medline_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorList {
    #[serde(rename = "Author", default)]
    authors: Vec<AuthorXml>,
}

#[derive(Debug, Deserialize)]
struct AuthorXml {
    #[serde(rename = "LastName")]
    last_name: Option<String>,
    #[serde(rename = "ForeName")]
    fore_name: Option<String>,
    #[serde(rename = "CollectiveName")]
    collective_name: Option<String>,
    #[serde(rename = "AffiliationInfo", default)]
    affiliation_info: Vec<AffiliationInfo>,
}

#[derive(Debug, Deserialize)]
struct AffiliationInfo {
    #[serde(rename = "Affiliation")]
    affiliation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PubmedData {
    #[serde(rename = "ArticleIdList")]
    article_id_list: Option<ArticleIdList>,
}

#[derive(Debug, Deserialize)]
struct ArticleIdList {
    #[serde(rename = "ArticleId", default)]
    ids: Vec<TypedId>,
}

/// `<ELocationID EIdType="doi">` and `<ArticleId IdType="doi">` share a shape
#[derive(Debug, Deserialize)]
struct TypedId {
    #[serde(rename = "@EIdType")]
    eid_type: Option<String>,
    #[serde(rename = "@IdType")]
    id_type: Option<String>,
    #[serde(rename = "$text", default)]
    value: String,
}

impl TypedId {
    fn is_doi(&self) -> bool {
        self.eid_type
            .as_deref()
            .or(self.id_type.as_deref())
            .is_some_and(|t| t.eq_ignore_ascii_case("doi"))
    }
}

fn first_doi(ids: &[TypedId]) -> Option<String> {
    ids.iter()
        .filter(|id| id.is_doi())
        .find_map(|id| non_empty(Some(id.value.as_str())))
}

impl PubmedArticleXml {
    fn into_article(self) -> Result<Article> {
        let citation = self.medline_citation.ok_or_parse("article without MedlineCitation")?;
        let pmid = citation
            .pmid
            .and_then(|p| non_empty(Some(p.value.as_str())))
            .ok_or_parse("article without PMID")?;
        let article = citation
            .article
            .ok_or_else(|| PubmedError::Parse(format!("PMID {} has no Article element", pmid)))?;

        let title = non_empty(article.title.as_deref()).unwrap_or_else(|| NO_TITLE.to_string());

        let pub_date = article
            .journal
            .and_then(|j| j.issue)
            .and_then(|i| i.pub_date);
        let publication_date = format_pub_date(pub_date.as_ref());

        let doi = first_doi(&article.elocation_ids).or_else(|| {
            self.pubmed_data
                .and_then(|d| d.article_id_list)
                .and_then(|l| first_doi(&l.ids))
        });

        let authors = article
            .author_list
            .map(|list| list.authors.into_iter().map(convert_author).collect())
            .unwrap_or_default();

        Ok(Article {
            pmid,
            title,
            publication_date,
            doi,
            authors,
        })
    }
}

fn convert_author(author: AuthorXml) -> Author {
    let personal = [author.fore_name.as_deref(), author.last_name.as_deref()]
        .iter()
        .filter_map(|part| non_empty(*part))
        .collect::<Vec<_>>()
        .join(" ");

    let name = if personal.is_empty() {
        non_empty(author.collective_name.as_deref()).unwrap_or_default()
    } else {
        personal
    };

    let affiliations: Vec<String> = author
        .affiliation_info
        .iter()
        .filter_map(|info| non_empty(info.affiliation.as_deref()))
        .collect();

    Author {
        name,
        affiliation: (!affiliations.is_empty()).then(|| affiliations.join("; ")),
        company: None,
    }
}

/// Render a PubDate as `YYYY-MM-DD`, `YYYY-MM`, `YYYY`, the first MedlineDate
/// token, or [`UNKNOWN_DATE`].
fn format_pub_date(date: Option<&PubDate>) -> String {
    let Some(date) = date else {
        return UNKNOWN_DATE.to_string();
    };

    if let Some(year) = non_empty(date.year.as_deref()) {
        let Ok(year_num) = year.parse::<i32>() else {
            return year;
        };
        let Some(month) = date.month.as_deref().and_then(parse_month) else {
            return year;
        };

        let day = date.day.as_deref().and_then(|d| d.trim().parse::<u32>().ok());
        return match day.and_then(|d| NaiveDate::from_ymd_opt(year_num, month, d)) {
            Some(full) => full.format("%Y-%m-%d").to_string(),
            None => format!("{:04}-{:02}", year_num, month),
        };
    }

    date.medline_date
        .as_deref()
        .and_then(|m| m.split_whitespace().next())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_DATE.to_string())
}

/// Month as 1-12 from "3", "03", "Mar" or "March".
fn parse_month(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    raw.parse::<Month>().ok().map(|m| m.number_from_month())
}
