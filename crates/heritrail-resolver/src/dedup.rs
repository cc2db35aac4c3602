//! Candidate deduplication.
//!
//! Stage 1: candidates sharing any normalised DOI or ISBN are merged (union-find,
//!          so merges are transitive).
//! Stage 2: remaining groups whose normalised titles are near-identical
//!          (Jaro-Winkler ≥ threshold), whose years agree or are missing, and whose
//!          DOIs do not conflict are merged. Both checks look at whole groups, so an
//!          undated record cannot bridge two editions.
//!
//! After both stages no two output candidates share a DOI or an ISBN.

use std::collections::{BTreeSet, HashMap};

use heritrail_common::{Candidate, Citation, CitationKind};
use strsim::jaro_winkler;

use crate::normalise::{normalise_title, CitationExt};

pub const DEFAULT_TITLE_THRESHOLD: f64 = 0.95;

/// Disjoint-set forest over candidate indices.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// The smaller root wins, so group identity follows input order.
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (keep, drop) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[drop] = keep;
        }
    }
}

/// Merge duplicate candidates. Each input candidate is expected to hold one
/// provider hit and a normalised citation; output order follows the first
/// member of each group, and every output candidate has its `key` set.
pub fn deduplicate(candidates: Vec<Candidate>, title_threshold: f64) -> Vec<Candidate> {
    let n = candidates.len();
    let mut uf = UnionFind::new(n);

    // Stage 1: shared identifiers
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (i, c) in candidates.iter().enumerate() {
        let ids = c
            .citation
            .doi
            .iter()
            .map(|d| format!("doi:{d}"))
            .chain(c.citation.isbns.iter().map(|isbn| format!("isbn:{isbn}")));
        for id in ids {
            match seen.get(&id) {
                Some(&j) => uf.union(i, j),
                None => {
                    seen.insert(id, i);
                }
            }
        }
    }

    // Stage 2: near-identical titles
    let titles: Vec<String> = candidates
        .iter()
        .map(|c| c.citation.title.as_deref().map(normalise_title).unwrap_or_default())
        .collect();

    for i in 0..n {
        if titles[i].is_empty() {
            continue;
        }
        for j in (i + 1)..n {
            if titles[j].is_empty() || uf.find(i) == uf.find(j) {
                continue;
            }
            if jaro_winkler(&titles[i], &titles[j]) < title_threshold {
                continue;
            }
            let (gi, gj) = (GroupFacts::of(&mut uf, &candidates, i), GroupFacts::of(&mut uf, &candidates, j));
            if !gi.compatible(&gj) {
                continue;
            }
            uf.union(i, j);
        }
    }

    // Collect groups in order of their first member
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of_root: HashMap<usize, usize> = HashMap::new();
    for i in 0..n {
        let root = uf.find(i);
        let g = *group_of_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[g].push(i);
    }

    let mut slots: Vec<Option<Candidate>> = candidates.into_iter().map(Some).collect();
    groups
        .into_iter()
        .filter_map(|members| {
            let group: Vec<Candidate> = members.iter().filter_map(|&i| slots[i].take()).collect();
            merge_group(group)
        })
        .collect()
}

/// Identifiers and years seen across one union-find group.
struct GroupFacts {
    dois: BTreeSet<String>,
    years: BTreeSet<i32>,
}

impl GroupFacts {
    fn of(uf: &mut UnionFind, candidates: &[Candidate], member: usize) -> Self {
        let root = uf.find(member);
        let mut facts = Self { dois: BTreeSet::new(), years: BTreeSet::new() };
        for (i, c) in candidates.iter().enumerate() {
            if uf.find(i) != root {
                continue;
            }
            if let Some(doi) = &c.citation.doi {
                facts.dois.insert(doi.clone());
            }
            if let Some(year) = c.citation.year {
                facts.years.insert(year);
            }
        }
        facts
    }

    /// Two groups may merge on title when they carry no competing DOIs and at
    /// most one publication year between them.
    fn compatible(&self, other: &GroupFacts) -> bool {
        if !self.dois.is_empty() && !other.dois.is_empty() && self.dois.is_disjoint(&other.dois) {
            return false;
        }
        self.years.union(&other.years).nth(1).is_none()
    }
}

/// Fold a group into one candidate. Fields come from the highest-precedence
/// source that has them; ISBNs are unioned; hits keep precedence order.
fn merge_group(mut group: Vec<Candidate>) -> Option<Candidate> {
    // Stable: ties keep input order
    group.sort_by_key(|c| c.primary_source().map(|s| s.precedence()).unwrap_or(u8::MAX));

    let mut members = group.into_iter();
    let mut merged = members.next()?;
    for other in members {
        fill_gaps(&mut merged.citation, &other.citation);
        merged.hits.extend(other.hits);
    }
    merged.key = merged.citation.dedup_key();
    Some(merged)
}

fn fill_gaps(base: &mut Citation, other: &Citation) {
    fn take(slot: &mut Option<String>, from: &Option<String>) {
        if slot.is_none() {
            slot.clone_from(from);
        }
    }

    if base.kind == CitationKind::Other {
        base.kind = other.kind;
    }
    take(&mut base.title, &other.title);
    take(&mut base.subtitle, &other.subtitle);
    if base.authors.is_empty() {
        base.authors = other.authors.clone();
    }
    if base.year.is_none() {
        base.year = other.year;
    }
    if base.issued.is_none() {
        base.issued = other.issued;
    }
    take(&mut base.container_title, &other.container_title);
    take(&mut base.publisher, &other.publisher);
    take(&mut base.publisher_place, &other.publisher_place);
    take(&mut base.volume, &other.volume);
    take(&mut base.issue, &other.issue);
    take(&mut base.pages, &other.pages);
    take(&mut base.doi, &other.doi);
    take(&mut base.url, &other.url);
    take(&mut base.language, &other.language);
    take(&mut base.abstract_text, &other.abstract_text);

    for isbn in &other.isbns {
        if !base.isbns.contains(isbn) {
            base.isbns.push(isbn.clone());
        }
    }
    base.isbns.sort();
}
