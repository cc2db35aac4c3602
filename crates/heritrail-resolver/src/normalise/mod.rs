//! Normalisation of provider output into comparable citations.
//!
//! - `identifiers`: DOI and ISBN canonical forms
//! - `text`: titles, author names, years, markup cleanup

pub mod identifiers;
pub mod text;

pub use identifiers::{find_doi, isbn10_to_13, isbn13_to_10, normalise_doi, normalise_isbn};
pub use text::{clean_text, collapse_whitespace, extract_year, normalise_author, normalise_title, parse_issued};

use chrono::Datelike;
use heritrail_common::{Author, Citation};

/// Resolver-side operations on the shared citation type.
pub trait CitationExt {
    /// Canonical form: identifiers normalised, markup stripped, blanks as `None`.
    fn normalised(self) -> Citation;

    /// `doi:…`, else `isbn:…` (smallest ISBN-13), else `title:…|year`.
    fn dedup_key(&self) -> String;
}

impl CitationExt for Citation {
    fn normalised(self) -> Citation {
        let Citation {
            kind, title, subtitle, authors, year, issued, container_title, publisher,
            publisher_place, volume, issue, pages, doi, isbns, url, language, abstract_text,
        } = self;

        let mut isbns: Vec<String> = isbns.iter().filter_map(|i| normalise_isbn(i)).collect();
        isbns.sort();
        isbns.dedup();

        let authors: Vec<Author> = authors
            .into_iter()
            .map(clean_author)
            .filter(|a| !a.is_empty())
            .collect();

        let year = year
            .filter(|y| (1000..=2100).contains(y))
            .or_else(|| issued.map(|d| d.year()));

        Citation {
            kind,
            title: cleaned(title),
            subtitle: cleaned(subtitle),
            authors,
            year,
            issued,
            container_title: cleaned(container_title),
            publisher: cleaned(publisher),
            publisher_place: cleaned(publisher_place),
            volume: cleaned(volume),
            issue: cleaned(issue),
            pages: cleaned(pages).map(|p| p.replace(|c: char| c == '–' || c == '—', "-")),
            doi: doi.as_deref().and_then(normalise_doi),
            isbns,
            url: trimmed(url),
            language: trimmed(language).map(|l| l.to_lowercase()),
            abstract_text: cleaned(abstract_text),
        }
    }

    fn dedup_key(&self) -> String {
        if let Some(doi) = &self.doi {
            return format!("doi:{doi}");
        }
        if let Some(isbn) = self.primary_isbn() {
            return format!("isbn:{isbn}");
        }
        let title = self.title.as_deref().map(normalise_title).unwrap_or_default();
        let year = self.year.map(|y| y.to_string()).unwrap_or_default();
        format!("title:{title}|{year}")
    }
}

fn cleaned(value: Option<String>) -> Option<String> {
    value.map(|v| clean_text(&v)).filter(|v| !v.is_empty())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn clean_author(author: Author) -> Author {
    Author {
        given: cleaned(author.given),
        family: cleaned(author.family),
        literal: cleaned(author.literal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use heritrail_common::CitationKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalised_cleans_every_field() {
        let raw = Citation {
            kind: CitationKind::Book,
            title: Some("  The <i>Roman</i> Forum ".into()),
            subtitle: Some("   ".into()),
            authors: vec![
                Author { given: Some(" Filippo ".into()), family: Some("Coarelli".into()), literal: None },
                Author::default(),
            ],
            issued: NaiveDate::from_ymd_opt(2007, 3, 1),
            pages: Some("12–40".into()),
            doi: Some("https://doi.org/10.1525/California/9780520079618.001.0001".into()),
            isbns: vec!["0-520-07961-2".into(), "9780520079618".into(), "bogus".into()],
            language: Some(" EN ".into()),
            ..Default::default()
        };
        let c = raw.normalised();
        assert_eq!(c.title.as_deref(), Some("The Roman Forum"));
        assert_eq!(c.subtitle, None);
        assert_eq!(c.authors.len(), 1);
        assert_eq!(c.authors[0].given.as_deref(), Some("Filippo"));
        assert_eq!(c.year, Some(2007));
        assert_eq!(c.pages.as_deref(), Some("12-40"));
        assert_eq!(c.doi.as_deref(), Some("10.1525/california/9780520079618.001.0001"));
        assert_eq!(c.isbns, vec!["9780520079618".to_string()]);
        assert_eq!(c.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_dedup_key_precedence() {
        let mut c = Citation {
            title: Some("Hadrian's Wall".into()),
            year: Some(1976),
            isbns: vec!["9780500051788".into(), "9780140136968".into()],
            doi: Some("10.1234/wall".into()),
            ..Default::default()
        };
        assert_eq!(c.dedup_key(), "doi:10.1234/wall");
        c.doi = None;
        assert_eq!(c.dedup_key(), "isbn:9780140136968");
        c.isbns.clear();
        assert_eq!(c.dedup_key(), "title:hadrian s wall|1976");
        c.year = None;
        assert_eq!(c.dedup_key(), "title:hadrian s wall|");
    }
}
