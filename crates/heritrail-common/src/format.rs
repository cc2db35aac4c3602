//! Display formatting for citations (APA-like reference entries).
//!
//! The admin bibliography list and the public heritage page show this string;
//! the structured citation stays the source of truth.

use crate::entities::{Author, Citation, CitationKind};

impl Citation {
    /// Render a single-line reference entry.
    pub fn formatted(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        let authors = format_authors(&self.authors);
        if !authors.is_empty() {
            parts.push(sentence(&authors));
        }

        match self.year {
            Some(y) => parts.push(format!("({y}).")),
            None if !authors.is_empty() => parts.push("(n.d.).".to_string()),
            None => {}
        }

        if let Some(title) = self.full_title() {
            parts.push(sentence(&title));
        }

        match self.kind {
            CitationKind::Article => {
                if let Some(source) = self.article_source() {
                    parts.push(sentence(&source));
                }
            }
            CitationKind::Chapter => {
                if let Some(book) = &self.container_title {
                    let mut s = format!("In {book}");
                    if let Some(p) = &self.pages {
                        s.push_str(&format!(" (pp. {p})"));
                    }
                    parts.push(sentence(&s));
                }
                if let Some(p) = &self.publisher {
                    parts.push(sentence(p));
                }
            }
            CitationKind::Webpage => {
                if let Some(site) = &self.container_title {
                    parts.push(sentence(site));
                }
            }
            _ => {
                if let Some(p) = &self.publisher {
                    parts.push(sentence(p));
                } else if let Some(c) = &self.container_title {
                    parts.push(sentence(c));
                }
            }
        }

        if let Some(doi) = &self.doi {
            parts.push(format!("https://doi.org/{doi}"));
        } else if let Some(url) = &self.url {
            parts.push(url.clone());
        }

        parts.join(" ")
    }

    /// "Journal, 12(3), 45-67" with whichever pieces are present.
    fn article_source(&self) -> Option<String> {
        let journal = self.container_title.as_ref()?;
        let mut s = journal.clone();
        match (&self.volume, &self.issue) {
            (Some(v), Some(i)) => s.push_str(&format!(", {v}({i})")),
            (Some(v), None)    => s.push_str(&format!(", {v}")),
            (None, Some(i))    => s.push_str(&format!(", ({i})")),
            (None, None)       => {}
        }
        if let Some(p) = &self.pages {
            s.push_str(&format!(", {p}"));
        }
        Some(s)
    }
}

fn format_authors(authors: &[Author]) -> String {
    let names: Vec<String> = authors
        .iter()
        .filter(|a| !a.is_empty())
        .map(format_author)
        .collect();

    match names.len() {
        0 => String::new(),
        1 => names[0].clone(),
        2 => format!("{}, & {}", names[0], names[1]),
        n => format!("{}, & {}", names[..n - 1].join(", "), names[n - 1]),
    }
}

fn format_author(author: &Author) -> String {
    match (&author.family, &author.given) {
        (Some(family), Some(given)) => {
            let initials: Vec<String> = given
                .split_whitespace()
                .filter_map(|g| g.chars().next())
                .map(|c| format!("{c}."))
                .collect();
            if initials.is_empty() {
                family.clone()
            } else {
                format!("{family}, {}", initials.join(" "))
            }
        }
        _ => author.display_name(),
    }
}

/// Terminate with a period unless the text already ends a sentence.
fn sentence(text: &str) -> String {
    let t = text.trim();
    if t.ends_with('.') || t.ends_with('?') || t.ends_with('!') {
        t.to_string()
    } else {
        format!("{t}.")
    }
}
