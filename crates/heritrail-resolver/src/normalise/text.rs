//! Titles, names, dates and markup cleanup.

use chrono::{Datelike, NaiveDate};
use heritrail_common::Author;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TAG: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref YEAR: Regex = Regex::new(r"(?:^|[^0-9])(1[0-9]{3}|20[0-9]{2})(?:[^0-9]|$)").unwrap();
}

/// Name particles that belong to the family name ("van Gogh", "de la Cruz").
const PARTICLES: &[&str] = &[
    "van", "von", "der", "den", "de", "del", "della", "di", "da", "du", "la", "le", "dos", "das", "bin", "al",
];

/// Key used for title comparison: lowercase, punctuation dropped, whitespace collapsed.
pub fn normalise_title(title: &str) -> String {
    let lowered = clean_text(title).to_lowercase();
    let spaced: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    collapse_whitespace(&spaced)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip JATS/HTML tags, decode the common entities and collapse whitespace.
pub fn clean_text(text: &str) -> String {
    let untagged = TAG.replace_all(text, " ");
    let decoded = untagged
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&");
    collapse_whitespace(&decoded)
}

/// Split a personal name in "Family, Given" or "Given Family" order.
/// Single-token names are kept whole as a literal.
pub fn normalise_author(raw: &str) -> Author {
    let name = collapse_whitespace(&clean_text(raw));
    let name = name.trim_matches(|c: char| c == ',' || c == ';' || c.is_whitespace());

    if let Some((family, given)) = name.split_once(',') {
        let family = family.trim();
        let given = given.trim();
        if !family.is_empty() && !given.is_empty() {
            return Author { given: Some(given.to_string()), family: Some(family.to_string()), literal: None };
        }
    }

    let tokens: Vec<&str> = name.split_whitespace().collect();
    if tokens.len() < 2 {
        return Author {
            literal: (!name.is_empty()).then(|| name.to_string()),
            ..Default::default()
        };
    }

    // Family name starts at the first particle after the first given name, or is the last token.
    let mut split = tokens.len() - 1;
    for (i, t) in tokens.iter().enumerate().skip(1) {
        if PARTICLES.contains(&t.to_lowercase().as_str()) && i < tokens.len() - 1 {
            split = i;
            break;
        }
    }

    Author {
        given: Some(tokens[..split].join(" ")),
        family: Some(tokens[split..].join(" ")),
        literal: None,
    }
}

/// First plausible four-digit year in a date string ("2019-05-01", "May 2019", "c1999").
pub fn extract_year(text: &str) -> Option<i32> {
    YEAR.captures(text)?.get(1)?.as_str().parse().ok()
}

/// Full or partial ISO date; partial dates fall on the first of the month/year.
pub fn parse_issued(text: &str) -> Option<NaiveDate> {
    let t = text.trim();
    let t = t.get(..10.min(t.len())).unwrap_or(t);
    NaiveDate::parse_from_str(t, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{t}-01"), "%Y-%m-%d"))
        .ok()
        .filter(|d| d.year() >= 1000)
}
