//! Smoke tests against the real metadata providers.
//!
//! Run with: cargo test --package heritrail-resolver --test test_live_providers -- --ignored --nocapture

use heritrail_common::SourceKind;
use heritrail_config::Config;
use heritrail_resolver::Resolver;

#[tokio::test]
#[ignore] // Requires network access
async fn test_live_doi_resolution() {
    let resolver = Resolver::from_config(&Config::default()).expect("resolver");
    let res = resolver.resolve("10.1038/nature14539").await.expect("resolution failed");

    for p in &res.providers {
        println!("{:<20} {:?} hits={} {}ms", p.source.as_str(), p.outcome, p.hits, p.elapsed_ms);
    }
    for c in &res.candidates {
        println!("{:.3}  {}", c.score, c.formatted);
    }

    let top = res.candidates.first().expect("at least one candidate");
    assert!(top.has_source(SourceKind::DoiRegistry));
    assert_eq!(top.citation.doi.as_deref(), Some("10.1038/nature14539"));
}

#[tokio::test]
#[ignore] // Requires network access
async fn test_live_isbn_resolution() {
    let resolver = Resolver::from_config(&Config::default()).expect("resolver");
    let res = resolver.resolve("978-0-500-05178-8").await.expect("resolution failed");

    for c in &res.candidates {
        println!("{:.3}  {:?}  {}", c.score, c.sources(), c.formatted);
    }
    assert!(!res.candidates.is_empty(), "Should find the book");
}
