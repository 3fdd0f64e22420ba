//! Citation formatting.
//!
//! Renders APA, MLA and BibTeX strings for a cached paper record. Every
//! citation points at the arXiv preprint, so the identifier passed in is the
//! one the caller asked for, versioned or not.

use crate::models::{CitationBundle, Citations, PaperRecord};

/// BibTeX `primaryClass` used for every entry.
pub const BIBTEX_PRIMARY_CLASS: &str = "cs.AI";

/// Short author string used by APA.
///
/// One author gives the full name, two give `"A & B"`, three or more give
/// `"First et al."`. Returns `None` when the list is empty.
pub fn author_string(authors: &[String]) -> Option<String> {
    match authors {
        [] => None,
        [only] => Some(only.clone()),
        [first, second] => Some(format!("{} & {}", first, second)),
        [first, ..] => Some(format!("{} et al.", first)),
    }
}

/// `{authors} ({year}). {title}. arXiv preprint arXiv:{id}.`
pub fn apa(paper_id: &str, record: &PaperRecord) -> String {
    let body = format!(
        "({}). {}. arXiv preprint arXiv:{}.",
        record.year(),
        record.title,
        paper_id
    );
    match author_string(&record.authors) {
        Some(authors) => format!("{} {}", authors, body),
        None => body,
    }
}

/// `"{title}." arXiv preprint arXiv:{id}, {published}.`
pub fn mla(paper_id: &str, record: &PaperRecord) -> String {
    format!(
        "\"{}.\" arXiv preprint arXiv:{}, {}.",
        record.title, paper_id, record.published
    )
}

/// Citation key: the identifier with every `.` and `v` removed.
///
/// # Example
/// ```
/// use mcp_paper_cache::citation::bibtex_key;
///
/// assert_eq!(bibtex_key("2301.00001v2"), "230100001");
/// ```
pub fn bibtex_key(paper_id: &str) -> String {
    paper_id.chars().filter(|c| *c != '.' && *c != 'v').collect()
}

pub fn bibtex(paper_id: &str, record: &PaperRecord) -> String {
    format!(
        "@misc{{{key},\n    title={{{title}}},\n    author={{{authors}}},\n    year={{{year}}},\n    eprint={{{id}}},\n    archivePrefix={{arXiv}},\n    primaryClass={{{class}}}\n}}",
        key = bibtex_key(paper_id),
        title = record.title,
        authors = record.authors.join(" and "),
        year = record.year(),
        id = paper_id,
        class = BIBTEX_PRIMARY_CLASS,
    )
}

/// Build the full citation bundle for `paper_id`.
pub fn bundle(paper_id: &str, record: &PaperRecord) -> CitationBundle {
    CitationBundle {
        paper_id: paper_id.to_string(),
        title: record.title.clone(),
        authors: record.authors.clone(),
        published: record.published.clone(),
        citations: Citations {
            apa: apa(paper_id, record),
            mla: mla(paper_id, record),
            bibtex: bibtex(paper_id, record),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(authors: &[&str]) -> PaperRecord {
        PaperRecord {
            id: "2301.00001".to_string(),
            title: "T".to_string(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            summary: "S".to_string(),
            pdf_url: "http://arxiv.org/pdf/2301.00001".to_string(),
            published: "2023-01-15".to_string(),
        }
    }

    #[test]
    fn test_author_string_rule() {
        let names = |list: &[&str]| list.iter().map(|a| a.to_string()).collect::<Vec<_>>();
        assert_eq!(author_string(&names(&["Alice Smith"])).unwrap(), "Alice Smith");
        assert_eq!(author_string(&names(&["A", "B"])).unwrap(), "A & B");
        assert_eq!(author_string(&names(&["A", "B", "C"])).unwrap(), "A et al.");
        assert_eq!(author_string(&names(&["A", "B", "C", "D"])).unwrap(), "A et al.");
        assert_eq!(author_string(&[]), None);
    }

    #[test]
    fn test_single_author_citations() {
        let record = sample(&["Alice Smith"]);
        assert_eq!(
            apa("2301.00001", &record),
            "Alice Smith (2023). T. arXiv preprint arXiv:2301.00001."
        );
        assert_eq!(
            mla("2301.00001", &record),
            "\"T.\" arXiv preprint arXiv:2301.00001, 2023-01-15."
        );
        assert_eq!(
            bibtex("2301.00001", &record),
            "@misc{230100001,\n    title={T},\n    author={Alice Smith},\n    year={2023},\n    eprint={2301.00001},\n    archivePrefix={arXiv},\n    primaryClass={cs.AI}\n}"
        );
    }

    #[test]
    fn test_two_author_citations() {
        let record = sample(&["A", "B"]);
        assert_eq!(
            apa("2301.00001", &record),
            "A & B (2023). T. arXiv preprint arXiv:2301.00001."
        );
        assert_eq!(
            mla("2301.00001", &record),
            "\"T.\" arXiv preprint arXiv:2301.00001, 2023-01-15."
        );
        assert!(bibtex("2301.00001", &record).contains("    author={A and B},\n"));
    }

    #[test]
    fn test_three_author_citations() {
        let record = sample(&["A", "B", "C"]);
        assert_eq!(
            apa("2301.00001", &record),
            "A et al. (2023). T. arXiv preprint arXiv:2301.00001."
        );
        assert_eq!(
            mla("2301.00001", &record),
            "\"T.\" arXiv preprint arXiv:2301.00001, 2023-01-15."
        );
        let entry = bibtex("2301.00001", &record);
        assert!(entry.contains("    author={A and B and C},\n"));
        assert!(entry.contains("    year={2023},\n"));
    }

    #[test]
    fn test_no_authors_drops_author_part() {
        let record = sample(&[]);
        assert_eq!(
            apa("2301.00001", &record),
            "(2023). T. arXiv preprint arXiv:2301.00001."
        );
        assert!(bibtex("2301.00001", &record).contains("    author={},\n"));
    }

    #[test]
    fn test_bibtex_key() {
        assert_eq!(bibtex_key("2301.00001v2"), "230100001");
        assert_eq!(bibtex_key("2301.00001"), "230100001");
        // Every 'v' goes, not only the version marker.
        assert_eq!(bibtex_key("solv-int/9901001v1"), "sol-int/99010011");
    }

    #[test]
    fn test_bundle_uses_requested_id() {
        let record = sample(&["A"]);
        let bundle = bundle("2301.00001v2", &record);
        assert_eq!(bundle.paper_id, "2301.00001v2");
        assert_eq!(bundle.title, "T");
        assert_eq!(bundle.published, "2023-01-15");
        assert!(bundle.citations.apa.ends_with("arXiv:2301.00001v2."));
        assert!(bundle.citations.bibtex.starts_with("@misc{230100001,"));

        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["citations"]["MLA"], bundle.citations.mla);
    }
}
