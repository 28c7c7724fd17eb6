//! Affiliation classification.
//!
//! A classifier takes one affiliation string and returns the pharmaceutical
//! or biotech company it names, if any. [`LlmClassifier`] asks a hosted model
//! through an OpenAI-compatible chat endpoint; [`KeywordClassifier`] is an
//! offline keyword heuristic. Model output is free text, so
//! [`extract_company`] cleans it up on a best-effort basis.

use crate::config::LlmConfig;
use crate::error::{PubmedError, Result};
use crate::prompts::company_extraction::{build_user_prompt, NO_COMPANY_ANSWER, SYSTEM_PROMPT};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, instrument};

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Longest answer still treated as a company name
const MAX_COMPANY_LEN: usize = 120;

/// Keywords that mark an affiliation as commercial
pub const COMPANY_KEYWORDS: &[&str] = &[
    "Pharmaceutical",
    "Biotech",
    "Biotechnology",
    "Therapeutics",
    "Pharma",
    "BioPharma",
    "Life Sciences",
    "Biosciences",
    "Drug Development",
    "Medicines",
    "Inc.",
    "Ltd.",
    "Corp.",
    "GmbH",
    "S.A.",
    "S.p.A.",
    "LLC",
];

/// Segments containing these words are academic or clinical, not companies
const ACADEMIC_MARKERS: &[&str] = &[
    "university",
    "universit",
    "college",
    "school",
    "hospital",
    "institute",
    "faculty",
    "department",
    "center for",
    "centre for",
];

/// Maps an affiliation string to a company name.
#[async_trait]
pub trait AffiliationClassifier: Send + Sync {
    /// Company named by `affiliation`, or `None`.
    ///
    /// Callers skip empty affiliations; implementations may assume non-empty input.
    async fn classify(&self, affiliation: &str) -> Result<Option<String>>;

    /// Short name for logs
    fn name(&self) -> &str;

    /// Tokens spent so far, for classifiers backed by a metered API
    fn usage(&self) -> Option<TokenUsage> {
        None
    }
}

/// Token usage tracking
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Accumulated token usage with atomic counters
#[derive(Default)]
struct AtomicTokenUsage {
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    total_tokens: AtomicU64,
}

impl AtomicTokenUsage {
    fn add(&self, usage: &TokenUsage) {
        self.prompt_tokens.fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.completion_tokens.fetch_add(usage.completion_tokens, Ordering::Relaxed);
        self.total_tokens.fetch_add(usage.total_tokens, Ordering::Relaxed);
    }

    fn get(&self) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
            total_tokens: self.total_tokens.load(Ordering::Relaxed),
        }
    }
}

// === LLM classifier ===

/// OpenAI-compatible API response structures
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

/// Classifier backed by a hosted chat-completion model
pub struct LlmClassifier {
    client: reqwest::Client,
    config: LlmConfig,
    usage: AtomicTokenUsage,
}

impl LlmClassifier {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| PubmedError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            usage: AtomicTokenUsage::default(),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl AffiliationClassifier for LlmClassifier {
    #[instrument(skip(self, affiliation), fields(model = %self.config.model))]
    async fn classify(&self, affiliation: &str) -> Result<Option<String>> {
        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_user_prompt(affiliation)}
            ],
            "temperature": 0.0,
            "max_tokens": 64
        });

        let api_url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(PubmedError::Network)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PubmedError::Api {
                code: status.as_u16() as i32,
                message: format!("LLM API error: {} - {}", status, error_text.trim()),
            });
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| PubmedError::Parse(format!("Failed to parse LLM response: {}", e)))?;

        if let Some(u) = api_response.usage {
            self.usage.add(&TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });
        }

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PubmedError::Parse("LLM response has no message content".to_string()))?;

        // Answers the affiliation does not contain are not companies
        let company = extract_company(&content).and_then(|c| named_in_affiliation(c, affiliation));
        debug!(raw = %preview(&content), company = ?company, "Affiliation classified");
        Ok(company)
    }

    fn name(&self) -> &str {
        "llm"
    }

    fn usage(&self) -> Option<TokenUsage> {
        Some(self.usage.get())
    }
}

fn preview(content: &str) -> String {
    content.chars().take(80).collect()
}

// === Response cleanup ===

fn answer_prefix() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:the\s+)?(?:answer|result|company(?:\s+name)?)\s*(?::|\s+is\b)\s*").ok()
    })
    .as_ref()
}

fn corporate_suffix() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:\b(?:inc|ltd|corp|co|llc|plc|gmbh|ag|bv|nv|pty|kk)|\bs\.a|\bs\.p\.a|\bb\.v|\bn\.v|\bk\.k)\.$")
            .ok()
    })
    .as_ref()
}

fn none_answer() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)^(?:{}\b.*|no|n/?a|null|nil|unknown|not\s+applicable|not\s+found|no\s+company\b.*|no\s+(?:pharmaceutical|biotech).*|there\s+is\s+no\b.*|this\s+affiliation\s+does\s+not\b.*)$",
            regex::escape(NO_COMPANY_ANSWER)
        ))
        .ok()
    })
    .as_ref()
}

/// Sentences that deny a company rather than name one
fn negation() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\bno\b.*\bcompan|\b(?:does|do|did|could|can|is|are)\s*(?:not|n't)\b|\bcannot\b|^not\s+(?:a|an|any)\b|\bnot\s+(?:a|an|any)\s+(?:[\w-]+\s+)?(?:compan|pharma|biotech)",
        )
        .ok()
    })
    .as_ref()
}

/// Fold to lowercase alphanumerics so "Genentech, Inc." matches "Genentech Inc"
fn fold(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Keep `company` only if the affiliation actually names it.
pub fn named_in_affiliation(company: String, affiliation: &str) -> Option<String> {
    let needle = fold(&company);
    (!needle.is_empty() && fold(affiliation).contains(&needle)).then_some(company)
}

/// Strip a markdown code fence, keeping its body.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let body = trimmed.trim_start_matches('`');
    // Drop the info string (e.g. "text") on the opening line
    let body = body.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    body.trim_end().trim_end_matches('`').trim()
}

/// Drop a sentence-ending period unless it belongs to "Inc.", "Ltd." etc.
fn strip_trailing_period(text: &str) -> &str {
    if !text.ends_with('.') {
        return text;
    }
    match corporate_suffix() {
        Some(re) if re.is_match(text) => text,
        _ => text.trim_end_matches('.').trim_end(),
    }
}

fn is_noise(c: char) -> bool {
    c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '*' | '_' | '•' | '“' | '”' | '‘' | '’')
}

/// Best-effort company name from a model reply.
///
/// Takes the first non-empty line, removes fences, bullets, quotes and
/// "Company:"-style prefixes, and maps "none"-style answers to `None`.
pub fn extract_company(content: &str) -> Option<String> {
    let body = strip_code_fence(content);
    let line = body.lines().map(str::trim).find(|l| !l.is_empty())?;

    let line = line
        .trim_start_matches(|c: char| is_noise(c) || c == '-')
        .trim_end_matches(is_noise);
    let line = match answer_prefix() {
        Some(re) => re.replace(line, "").into_owned(),
        None => line.to_string(),
    };
    let cleaned = strip_trailing_period(line.trim_matches(is_noise)).trim_matches(is_noise);

    if cleaned.is_empty() || cleaned.chars().count() > MAX_COMPANY_LEN {
        return None;
    }
    if none_answer().is_some_and(|re| re.is_match(cleaned))
        || negation().is_some_and(|re| re.is_match(cleaned))
    {
        return None;
    }

    Some(cleaned.to_string())
}

// === Keyword classifier ===

/// Offline classifier matching [`COMPANY_KEYWORDS`] against affiliation segments
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(COMPANY_KEYWORDS.iter().copied())
    }
}

impl KeywordClassifier {
    pub fn new<'a>(keywords: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            keywords: keywords.into_iter().map(str::to_lowercase).collect(),
        }
    }

    fn is_commercial(&self, segment: &str) -> bool {
        let lower = segment.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
            && !ACADEMIC_MARKERS.iter().any(|m| lower.contains(m))
    }

    /// Segment of the affiliation that names the company.
    pub fn find_company(&self, affiliation: &str) -> Option<String> {
        // Affiliations may list several institutions separated by ";"
        for institution in affiliation.split(';') {
            let segments: Vec<&str> = institution.split(',').map(str::trim).collect();

            for (idx, segment) in segments.iter().enumerate() {
                if segment.is_empty() || !self.is_commercial(segment) {
                    continue;
                }
                // "Merck & Co., Inc." splits into a name and a bare suffix
                let is_bare_suffix = self
                    .keywords
                    .iter()
                    .any(|k| segment.trim_end_matches('.').eq_ignore_ascii_case(k.trim_end_matches('.')));
                let name = if is_bare_suffix && idx > 0 {
                    format!("{}, {}", segments[idx - 1], segment)
                } else {
                    segment.to_string()
                };
                let name = strip_trailing_period(&name).to_string();
                if !name.is_empty() {
                    return Some(name);
                }
            }
        }
        None
    }
}

#[async_trait]
impl AffiliationClassifier for KeywordClassifier {
    async fn classify(&self, affiliation: &str) -> Result<Option<String>> {
        Ok(self.find_company(affiliation))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
