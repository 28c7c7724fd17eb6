//! Article and author records produced by the parser.

use serde::Serialize;

/// One PubMed article with the metadata written to the output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Article {
    /// PubMed identifier
    pub pmid: String,
    pub title: String,
    /// `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, a MedlineDate token or "Unknown Date"
    pub publication_date: String,
    pub doi: Option<String>,
    pub authors: Vec<Author>,
}

/// An author entry, owned by its article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    /// All affiliation strings for this author, joined with "; "
    pub affiliation: Option<String>,
    /// Company name set by the classification step
    pub company: Option<String>,
}

impl Author {
    /// Affiliation text worth sending to a classifier, if any.
    pub fn classifiable_affiliation(&self) -> Option<&str> {
        self.affiliation
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

/// Flattened article x author pair, only alive while writing the CSV.
#[derive(Debug, Serialize)]
pub struct OutputRow<'a> {
    #[serde(rename = "Title")]
    pub title: &'a str,
    #[serde(rename = "Author")]
    pub author: &'a str,
    #[serde(rename = "Affiliation")]
    pub affiliation: &'a str,
    #[serde(rename = "Company")]
    pub company: &'a str,
    #[serde(rename = "Publication Date")]
    pub publication_date: &'a str,
    #[serde(rename = "DOI")]
    pub doi: &'a str,
}

impl<'a> OutputRow<'a> {
    pub fn new(article: &'a Article, author: &'a Author) -> Self {
        Self {
            title: &article.title,
            author: &author.name,
            affiliation: author.affiliation.as_deref().unwrap_or_default(),
            company: author.company.as_deref().unwrap_or_default(),
            publication_date: &article.publication_date,
            doi: article.doi.as_deref().unwrap_or_default(),
        }
    }
}

/// Iterate the output rows of a batch of articles in retrieval order.
pub fn output_rows(articles: &[Article]) -> impl Iterator<Item = OutputRow<'_>> {
    articles
        .iter()
        .flat_map(|article| article.authors.iter().map(move |a| OutputRow::new(article, a)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(name: &str, affiliation: Option<&str>) -> Author {
        Author {
            name: name.to_string(),
            affiliation: affiliation.map(String::from),
            company: None,
        }
    }

    #[test]
    fn test_classifiable_affiliation() {
        assert_eq!(author("A", None).classifiable_affiliation(), None);
        assert_eq!(author("A", Some("   ")).classifiable_affiliation(), None);
        assert_eq!(
            author("A", Some(" Pfizer Inc. ")).classifiable_affiliation(),
            Some("Pfizer Inc.")
        );
    }

    #[test]
    fn test_output_rows_flatten_in_order() {
        let articles = vec![
            Article {
                pmid: "1".into(),
                title: "First".into(),
                publication_date: "2024".into(),
                doi: Some("10.1/x".into()),
                authors: vec![author("A", Some("Lab")), author("B", None)],
            },
            Article {
                pmid: "2".into(),
                title: "Empty".into(),
                publication_date: "2023".into(),
                doi: None,
                authors: vec![],
            },
            Article {
                pmid: "3".into(),
                title: "Third".into(),
                publication_date: "2022".into(),
                doi: None,
                authors: vec![author("C", None)],
            },
        ];

        let rows: Vec<_> = output_rows(&articles).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].author, "A");
        assert_eq!(rows[1].author, "B");
        assert_eq!(rows[1].title, rows[0].title);
        assert_eq!(rows[1].doi, "10.1/x");
        assert_eq!(rows[2].title, "Third");
        assert_eq!(rows[2].doi, "");
    }
}
