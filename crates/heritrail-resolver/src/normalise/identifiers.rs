//! DOI and ISBN normalisation.
//!
//! DOIs are compared lowercase without any resolver prefix.
//! ISBNs are compared as ISBN-13; ISBN-10 input is converted with the 978 prefix.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DOI_BARE: Regex = Regex::new(r"^10\.\d{4,9}/\S+$").unwrap();
    static ref DOI_ANYWHERE: Regex = Regex::new(r"(?i)\b(10\.\d{4,9}/[^\s?#&]+)").unwrap();
    static ref DOI_PREFIX: Regex = Regex::new(
        r"(?i)^(?:doi:\s*|https?://(?:dx\.)?doi\.org/|(?:dx\.)?doi\.org/)"
    ).unwrap();
}

/// Lowercase, prefix-free DOI, or `None` if `raw` is not a DOI.
pub fn normalise_doi(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let stripped = DOI_PREFIX.replace(trimmed, "");
    let doi = strip_trailing_punctuation(stripped.trim()).to_lowercase();
    if DOI_BARE.is_match(&doi) {
        Some(doi)
    } else {
        None
    }
}

/// Find a DOI inside arbitrary text, such as a URL path.
pub fn find_doi(text: &str) -> Option<String> {
    let decoded = text.replace("%2F", "/").replace("%2f", "/");
    let m = DOI_ANYWHERE.captures(&decoded)?.get(1)?;
    normalise_doi(m.as_str())
}

/// Drop sentence punctuation that trails a pasted DOI. A closing parenthesis is
/// kept when the DOI itself opened one, as in `10.1002/(SICI)1097-...`.
fn strip_trailing_punctuation(doi: &str) -> &str {
    let mut s = doi;
    loop {
        let Some(last) = s.chars().last() else { return s };
        let drop = match last {
            '.' | ',' | ';' | ':' | '"' | '\'' => true,
            ')' => s.matches('(').count() < s.matches(')').count(),
            _ => false,
        };
        if !drop {
            return s;
        }
        s = &s[..s.len() - last.len_utf8()];
    }
}

/// Digits (and a trailing X) of an ISBN-looking string.
fn isbn_chars(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == 'x' || *c == 'X')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

pub fn is_valid_isbn10(isbn: &str) -> bool {
    let chars: Vec<char> = isbn.chars().collect();
    if chars.len() != 10 {
        return false;
    }
    let mut sum = 0u32;
    for (i, c) in chars.iter().enumerate() {
        let v = match *c {
            'X' if i == 9 => 10,
            d if d.is_ascii_digit() => d.to_digit(10).unwrap_or(0),
            _ => return false,
        };
        sum += v * (10 - i as u32);
    }
    sum % 11 == 0
}

pub fn is_valid_isbn13(isbn: &str) -> bool {
    if isbn.len() != 13 || !isbn.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if !(isbn.starts_with("978") || isbn.starts_with("979")) {
        return false;
    }
    let sum: u32 = isbn
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d } else { d * 3 })
        .sum();
    sum % 10 == 0
}

pub fn isbn10_to_13(isbn10: &str) -> Option<String> {
    if !is_valid_isbn10(isbn10) {
        return None;
    }
    let body = format!("978{}", &isbn10[..9]);
    let sum: u32 = body
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d } else { d * 3 })
        .sum();
    let check = (10 - sum % 10) % 10;
    Some(format!("{body}{check}"))
}

/// Only 978-prefixed ISBN-13s have an ISBN-10 form.
pub fn isbn13_to_10(isbn13: &str) -> Option<String> {
    if !is_valid_isbn13(isbn13) || !isbn13.starts_with("978") {
        return None;
    }
    let body = &isbn13[3..12];
    let sum: u32 = body
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| d * (10 - i as u32))
        .sum();
    let check = (11 - sum % 11) % 11;
    let check = if check == 10 { "X".to_string() } else { check.to_string() };
    Some(format!("{body}{check}"))
}

/// ISBN-13 for any valid ISBN-10 or ISBN-13 spelling; `None` on bad checksums.
pub fn normalise_isbn(raw: &str) -> Option<String> {
    let chars = isbn_chars(raw);
    match chars.len() {
        10 => isbn10_to_13(&chars),
        13 if is_valid_isbn13(&chars) => Some(chars),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doi_prefixes_are_stripped() {
        let expected = Some("10.1017/s0003598x00064640".to_string());
        assert_eq!(normalise_doi("10.1017/S0003598X00064640"), expected);
        assert_eq!(normalise_doi("doi:10.1017/S0003598X00064640"), expected);
        assert_eq!(normalise_doi("https://doi.org/10.1017/S0003598X00064640"), expected);
        assert_eq!(normalise_doi("http://dx.doi.org/10.1017/S0003598X00064640."), expected);
    }

    #[test]
    fn test_doi_keeps_balanced_parentheses() {
        assert_eq!(
            normalise_doi("10.1002/(SICI)1097-4571(199806)49:8<693::AID-ASI4>3.0.CO;2-0"),
            Some("10.1002/(sici)1097-4571(199806)49:8<693::aid-asi4>3.0.co;2-0".to_string())
        );
        assert_eq!(normalise_doi("(see 10.1234/abc)"), None);
        assert_eq!(normalise_doi("10.1234/abc)."), Some("10.1234/abc".to_string()));
    }

    #[test]
    fn test_not_a_doi() {
        assert_eq!(normalise_doi("10.12/short-registrant"), None);
        assert_eq!(normalise_doi("Stonehenge"), None);
        assert_eq!(normalise_doi(""), None);
    }

    #[test]
    fn test_find_doi_in_url() {
        assert_eq!(
            find_doi("https://www.cambridge.org/core/journals/antiquity/article/10.1017/S0003598X00064640?x=1"),
            Some("10.1017/s0003598x00064640".to_string())
        );
        assert_eq!(find_doi("https://example.org/10.1234%2Fabc.def"), Some("10.1234/abc.def".to_string()));
        assert_eq!(find_doi("https://example.org/page"), None);
    }

    #[test]
    fn test_isbn10_conversion() {
        assert_eq!(normalise_isbn("0-521-45498-0"), Some("9780521454988".to_string()));
        assert_eq!(normalise_isbn("0-521-45498-2"), None);
        assert_eq!(isbn13_to_10("9780521454988"), Some("0521454980".to_string()));
    }

    #[test]
    fn test_isbn10_with_x_check_digit() {
        assert!(is_valid_isbn10("080442957X"));
        assert_eq!(normalise_isbn("0-8044-2957-x"), Some("9780804429573".to_string()));
        assert_eq!(isbn13_to_10("9780804429573"), Some("080442957X".to_string()));
    }

    #[test]
    fn test_isbn13_checksum() {
        assert_eq!(normalise_isbn("978-0-500-05178-8"), Some("9780500051788".to_string()));
        assert_eq!(normalise_isbn("978-0-500-05178-9"), None);
        assert_eq!(normalise_isbn("12345"), None);
        assert!(isbn13_to_10("9791032300824").is_none());
    }
}
