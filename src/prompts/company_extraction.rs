//! Company extraction prompts for author affiliation classification.
//!
//! Contains system and user prompt templates for asking an LLM whether an
//! affiliation string names a pharmaceutical or biotech company.

/// Literal answer the model is told to give when no company is present
pub const NO_COMPANY_ANSWER: &str = "NONE";

/// System prompt for company extraction
pub const SYSTEM_PROMPT: &str = r#"You extract company names from author affiliations listed on biomedical papers.

Rules you MUST follow:
- Only report pharmaceutical, biotechnology, diagnostics, medical device or other life-science companies.
- Universities, hospitals, medical schools, research institutes, government agencies, foundations and non-profits are NOT companies.
- Use only the affiliation text; do not guess or add companies that are not named.
- If several companies are named, report the first one.
- Reply with the company name exactly as written in the affiliation, without address, department or country.
- If no such company is named, reply with NONE.

Output format: a single line containing only the company name or NONE. No explanation, no quotes, no markdown."#;

/// User prompt template for one affiliation
/// Placeholders: {affiliation}
pub const USER_PROMPT_TEMPLATE: &str = r#"Affiliation:
{affiliation}

Which pharmaceutical or biotech company, if any, does this affiliation name? Answer with the company name only, or NONE."#;

/// Build user prompt for an affiliation
pub fn build_user_prompt(affiliation: &str) -> String {
    USER_PROMPT_TEMPLATE.replace("{affiliation}", affiliation.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_user_prompt() {
        let prompt = build_user_prompt("  Moderna Inc., Cambridge, MA ");
        assert!(prompt.contains("Affiliation:\nModerna Inc., Cambridge, MA\n"));
        assert!(!prompt.contains("{affiliation}"));
    }

    #[test]
    fn test_system_prompt_names_sentinel() {
        assert!(SYSTEM_PROMPT.contains(NO_COMPANY_ANSWER));
    }
}
