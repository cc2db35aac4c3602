//! Input classification: DOI, ISBN, URL or free-text title.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::error::{ResolverError, Result};
use crate::models::{ClassifiedInput, InputKind};
use crate::normalise::{collapse_whitespace, find_doi, isbn13_to_10, normalise_doi, normalise_isbn};

pub const DEFAULT_MAX_INPUT_LEN: usize = 2_000;

lazy_static! {
    static ref ISBN_INPUT: Regex = Regex::new(
        r"(?i)^(?:isbn(?:-1[03])?\s*:?\s*)?([0-9][0-9\-\s]{8,15}[0-9x])$"
    ).unwrap();
}

pub fn classify(input: &str) -> Result<ClassifiedInput> {
    classify_with_limit(input, DEFAULT_MAX_INPUT_LEN)
}

pub fn classify_with_limit(input: &str, max_len: usize) -> Result<ClassifiedInput> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err(ResolverError::EmptyInput);
    }
    let len = raw.chars().count();
    if len > max_len {
        return Err(ResolverError::InputTooLong { len, max: max_len });
    }

    let base = ClassifiedInput {
        raw: raw.to_string(),
        kind: InputKind::Title,
        doi: None,
        isbn13: None,
        isbn10: None,
        url: None,
        text: collapse_whitespace(raw),
    };

    if let Some(url) = as_url(raw) {
        let host = url.host_str().unwrap_or("").to_lowercase();
        if host == "doi.org" || host == "dx.doi.org" {
            if let Some(doi) = normalise_doi(url.as_str()) {
                return Ok(ClassifiedInput { kind: InputKind::Doi, doi: Some(doi), ..base });
            }
        }
        let doi = find_doi(url.path());
        return Ok(ClassifiedInput {
            kind: InputKind::Url,
            doi,
            url: Some(url.to_string()),
            ..base
        });
    }

    if let Some(doi) = normalise_doi(raw) {
        return Ok(ClassifiedInput { kind: InputKind::Doi, doi: Some(doi), ..base });
    }

    if let Some(caps) = ISBN_INPUT.captures(raw) {
        let digits = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        if let Some(isbn13) = normalise_isbn(digits) {
            let isbn10 = isbn13_to_10(&isbn13);
            return Ok(ClassifiedInput {
                kind: InputKind::Isbn,
                isbn13: Some(isbn13),
                isbn10,
                ..base
            });
        }
    }

    Ok(base)
}

/// `http(s)://…` or `www.…` parsed into an absolute URL.
fn as_url(raw: &str) -> Option<Url> {
    if raw.contains(char::is_whitespace) {
        return None;
    }
    let lower = raw.to_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        raw.to_string()
    } else if lower.starts_with("www.") {
        format!("https://{raw}")
    } else {
        return None;
    };
    let url = Url::parse(&candidate).ok()?;
    url.host_str()?;
    Some(url)
}
