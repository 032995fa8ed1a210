//! Matchers: find the next concept in a normalised byte buffer.
//!
//! All matchers report byte offsets into the buffer they are given. The
//! pipeline hands them text that is already normalised and surrounded by
//! single spaces, which the dictionary automaton relies on for word
//! boundaries.

use std::collections::BTreeMap;
use std::sync::Arc;

use regex::bytes::Regex;

use crate::dfa::Dfa;
use crate::graph::{Concept, Edge, FUZZY_URL};
use crate::resource::DictEntry;

/// A match: `buffer[begin..end]` denotes `concept`.
#[derive(Debug, Clone)]
pub struct MatchPos {
    pub concept: Arc<Concept>,
    pub begin: usize,
    pub end: usize,
}

/// The matcher variants.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Longest exact dictionary match.
    Exact(Arc<Dfa>),
    /// Approximate dictionary match with at most `k` edits.
    Fuzzy { dfa: Arc<Dfa>, k: u8 },
    /// First match of a regular expression, denoting a fixed concept.
    Regex { re: Regex, concept: Arc<Concept> },
}

impl Matcher {
    /// The first match in `buffer`, if any.
    pub fn find(&self, buffer: &[u8]) -> Option<MatchPos> {
        match self {
            Matcher::Exact(dfa) => exact(dfa, buffer),
            Matcher::Fuzzy { dfa, k } => fuzzy(dfa, *k, buffer),
            Matcher::Regex { re, concept } => re.find(buffer).map(|m| MatchPos {
                concept: Arc::clone(concept),
                begin: m.start(),
                end: m.end(),
            }),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Matcher::Exact(_) => "exact".into(),
            Matcher::Fuzzy { k, .. } => format!("fuzzy({k})"),
            Matcher::Regex { re, .. } => format!("regex({})", re.as_str()),
        }
    }
}

/// Next scan origin: the recorded skip position, or the next space.
fn next_origin(i: usize, skip: usize, buffer: &[u8]) -> usize {
    if skip > 0 {
        return i + skip;
    }
    buffer[i + 1..]
        .iter()
        .position(|&b| b == b' ')
        .map(|p| i + 1 + p)
        .unwrap_or(buffer.len())
}

fn exact(dfa: &Dfa, buffer: &[u8]) -> Option<MatchPos> {
    let mut i = 0;
    while i < buffer.len() {
        let mut state = dfa.initial();
        let mut found = None;
        // index of the last byte of the longest match, or of the first
        // space after the origin while nothing matched yet
        let mut pos = 0;
        for (j, &byte) in buffer[i..].iter().enumerate() {
            let Some(next) = dfa.delta(state, byte) else {
                break;
            };
            state = next;
            if let Some(concept) = dfa.final_concept(state) {
                found = Some(concept);
                pos = j;
            }
            if pos == 0 && byte == b' ' {
                pos = j;
            }
        }
        if let Some(concept) = found {
            return Some(MatchPos {
                concept,
                begin: i + 1,
                end: i + pos,
            });
        }
        i = next_origin(i, pos, buffer);
    }
    None
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    errors: u8,
    end: usize,
    on_space: bool,
}

impl Candidate {
    /// Prefer fewer errors, then a match ending on a space, then the
    /// longer match.
    fn better(self, other: Candidate) -> Candidate {
        if other.errors != self.errors {
            return if other.errors < self.errors { other } else { self };
        }
        if other.end == self.end {
            return self;
        }
        if self.on_space != other.on_space {
            return if other.on_space { other } else { self };
        }
        if other.end > self.end { other } else { self }
    }
}

/// Short approximate matches are noise.
fn is_garbage(errors: u8, consumed: usize) -> bool {
    (consumed as isize - 2) < 3 * errors as isize
}

fn fuzzy(dfa: &Dfa, k: u8, buffer: &[u8]) -> Option<MatchPos> {
    let mut i = 0;
    while i < buffer.len() {
        let mut candidates: BTreeMap<DictEntry, Candidate> = BTreeMap::new();
        let mut skip = 0;
        dfa.fuzzy(&buffer[i..], k, |errors, consumed, entry| {
            if consumed == 0 || is_garbage(errors, consumed) {
                return;
            }
            let last = consumed - 1;
            let on_space = buffer[i + last] == b' ';
            if skip == 0 && on_space {
                skip = last;
            }
            let candidate = Candidate {
                errors,
                end: i + last,
                on_space,
            };
            candidates
                .entry(entry)
                .and_modify(|old| *old = old.better(candidate))
                .or_insert(candidate);
        });
        if let Some(pos) = select(dfa, i, buffer, &candidates) {
            return Some(pos);
        }
        i = next_origin(i, skip, buffer);
    }
    None
}

/// Combine the winners that share the longest end position.
fn select(
    dfa: &Dfa,
    origin: usize,
    buffer: &[u8],
    candidates: &BTreeMap<DictEntry, Candidate>,
) -> Option<MatchPos> {
    let longest = candidates.values().map(|c| c.end).max()?;
    let winners: Vec<(Arc<Concept>, u8)> = candidates
        .iter()
        .filter(|(_, c)| c.end == longest)
        .filter_map(|(entry, c)| dfa.concept(*entry).map(|concept| (concept, c.errors)))
        .collect();
    let begin = char_floor(buffer, origin + 1);
    let end = char_floor(buffer, longest).max(begin);
    match winners.as_slice() {
        [] => None,
        [(concept, 0)] => Some(MatchPos {
            concept: Arc::clone(concept),
            begin,
            end,
        }),
        _ => {
            let graph = dfa.graph();
            let fuzzy = graph.id_of(FUZZY_URL)?;
            let mut urls: Vec<&str> = winners.iter().map(|(c, _)| c.url()).collect();
            urls.sort_unstable();
            urls.dedup();
            let edges = winners
                .iter()
                .filter_map(|(c, errors)| c.id().map(|o| Edge::with_distance(fuzzy, o, *errors)))
                .collect();
            let concept = Concept::synthetic(urls.join("-"), None, None, edges, true);
            Some(MatchPos {
                concept: Arc::new(concept),
                begin,
                end,
            })
        }
    }
}

/// Largest char boundary at or below `i`, treating the buffer as UTF-8.
fn char_floor(buffer: &[u8], mut i: usize) -> usize {
    i = i.min(buffer.len());
    while i > 0 && i < buffer.len() && (buffer[i] & 0xC0) == 0x80 {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kb::Triples;
    use crate::resource::Resource;
    use crate::text::normalize;
    use crate::traits::{Trait, Traits};

    fn resource(labels: &[(&str, &str)]) -> Resource {
        let mut triples = Triples::new();
        for (url, label) in labels {
            triples = triples.add(url, "label", label);
        }
        let traits = Traits::new().with(Trait::Distinct, ["label"]);
        Resource::build(&mut triples, &traits).unwrap()
    }

    fn find(m: &Matcher, text: &str) -> Option<(String, String)> {
        let input = normalize(text, true);
        m.find(input.as_bytes())
            .map(|p| (p.concept.url().to_string(), input[p.begin..p.end].to_string()))
    }

    #[test]
    fn every_key_matches_itself() {
        let r = resource(&[("A", "alpha"), ("B", "beta gamma"), ("C", "über")]);
        let m = Matcher::Exact(r.dfa());
        for key in r.dictionary().keys() {
            let input = format!(" {key} ");
            let pos = m.find(input.as_bytes()).unwrap();
            assert_eq!((pos.begin, pos.end), (1, 1 + key.len()));
            let entry = r.dictionary()[key];
            assert_eq!(pos.concept.id(), Some(entry.id));
        }
    }

    #[test]
    fn no_key_no_match() {
        let r = resource(&[("A", "alpha")]);
        let m = Matcher::Exact(r.dfa());
        assert!(find(&m, "nothing to see here").is_none());
        assert!(find(&m, "alphabet").is_none());
        assert!(find(&m, "").is_none());
    }

    #[test]
    fn longest_match_at_earliest_position() {
        let r = resource(&[("A", "new"), ("B", "new york"), ("C", "york city")]);
        let m = Matcher::Exact(r.dfa());
        assert_eq!(find(&m, "in new york city"), Some(("B".into(), "new york".into())));
        assert_eq!(find(&m, "a new day"), Some(("A".into(), "new".into())));
        assert_eq!(find(&m, "old york city"), Some(("C".into(), "york city".into())));
    }

    #[test]
    fn matches_after_unmatched_words() {
        let r = resource(&[("A", "a"), ("B", "b")]);
        let m = Matcher::Exact(r.dfa());
        let input = normalize("x y b", true);
        let pos = m.find(input.as_bytes()).unwrap();
        assert_eq!(pos.concept.url(), "B");
        assert_eq!(&input[pos.begin..pos.end], "b");
    }

    #[test]
    fn fuzzy_exact_hit_returns_concept() {
        let r = resource(&[("A", "hello world")]);
        let m = Matcher::Fuzzy { dfa: r.dfa(), k: 1 };
        let (url, text) = find(&m, "say hello world now").unwrap();
        assert_eq!(url, "A");
        assert_eq!(text, "hello world");
    }

    #[test]
    fn fuzzy_match_yields_ambiguous_candidates() {
        let r = resource(&[("A", "hello world"), ("B", "hello word")]);
        let m = Matcher::Fuzzy { dfa: r.dfa(), k: 1 };
        let input = normalize("hello worle", true);
        let pos = m.find(input.as_bytes()).unwrap();
        assert!(pos.concept.is_ambiguous());
        let graph = r.graph();
        for e in pos.concept.edges() {
            assert_eq!(graph.url_of(e.p), FUZZY_URL);
            assert!(e.distance <= 1);
        }
        let objects: Vec<&str> = pos.concept.edges().iter().map(|e| graph.url_of(e.o)).collect();
        assert!(objects.contains(&"A"));
    }

    #[test]
    fn fuzzy_skips_short_garbage() {
        let r = resource(&[("A", "ab")]);
        let m = Matcher::Fuzzy { dfa: r.dfa(), k: 1 };
        assert!(find(&m, "xb").is_none());
        assert_eq!(find(&m, "ab").map(|(u, _)| u), Some("A".to_string()));
    }

    #[test]
    fn candidate_tie_break() {
        let a = Candidate { errors: 1, end: 5, on_space: false };
        let b = Candidate { errors: 0, end: 3, on_space: false };
        assert_eq!(a.better(b).errors, 0);
        let c = Candidate { errors: 1, end: 7, on_space: false };
        let d = Candidate { errors: 1, end: 6, on_space: true };
        assert_eq!(c.better(d).end, 6);
        assert_eq!(d.better(c).end, 6);
        let e = Candidate { errors: 1, end: 9, on_space: true };
        assert_eq!(d.better(e).end, 9);
    }

    #[test]
    fn regex_matcher_reports_fixed_concept() {
        let concept = Arc::new(Concept::synthetic("urn:year", None, None, Vec::new(), false));
        let m = Matcher::Regex {
            re: Regex::new(r"\b\d{4}\b").unwrap(),
            concept,
        };
        let pos = m.find(b" in 1999 ").unwrap();
        assert_eq!((pos.begin, pos.end), (4, 8));
        assert_eq!(pos.concept.url(), "urn:year");
    }
}
