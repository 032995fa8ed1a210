//! The inverted index: concept URL to the places where it occurs.
//!
//! Every matched token yields a *direct* entry under its concept and one
//! *indirect* entry under the object of each of the concept's edges, tagged
//! with the edge's predicate. An ambiguous concept contributes the entries
//! of each of its candidates, flagged as ambiguous.

pub mod actor;
pub mod record;
pub mod register;
pub mod storage;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::graph::{Concept, Graph};
use crate::stream::Token;

pub use actor::{DEFAULT_BUFFER_SIZE, Index};
pub use register::Register;

/// Result type for index operations.
pub type IndexResult<T> = std::result::Result<T, IndexError>;

/// A public index entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "ConceptURL")]
    pub concept_url: String,
    /// Empty for direct entries.
    #[serde(rename = "RelationURL")]
    pub relation_url: String,
    /// URL of the concept that was matched in the text.
    #[serde(rename = "OriginURL")]
    pub origin_url: String,
    #[serde(rename = "Token")]
    pub token: String,
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Begin")]
    pub begin: usize,
    #[serde(rename = "End")]
    pub end: usize,
    #[serde(rename = "L")]
    pub distance: u8,
    #[serde(rename = "Ambiguous")]
    pub ambiguous: bool,
}

impl Entry {
    pub fn is_direct(&self) -> bool {
        self.relation_url.is_empty()
    }
}

/// The entries a concept token contributes to the index.
pub fn entries(token: &Token, graph: &Graph) -> Vec<Entry> {
    let Some(concept) = &token.concept else {
        return Vec::new();
    };
    let mut out = Vec::new();
    if concept.is_ambiguous() {
        for edge in concept.edges() {
            if let Some(candidate) = graph.get(edge.o) {
                push_entries(&mut out, token, graph, candidate, concept.url(), edge.distance, true);
            }
        }
    } else {
        push_entries(&mut out, token, graph, concept, concept.url(), 0, false);
    }
    out
}

fn push_entries(
    out: &mut Vec<Entry>,
    token: &Token,
    graph: &Graph,
    concept: &Concept,
    origin: &str,
    distance: u8,
    ambiguous: bool,
) {
    let entry = |concept_url: &str, relation_url: &str| Entry {
        concept_url: concept_url.to_string(),
        relation_url: relation_url.to_string(),
        origin_url: origin.to_string(),
        token: token.token.clone(),
        path: token.path.clone(),
        begin: token.begin,
        end: token.end,
        distance,
        ambiguous,
    };
    out.push(entry(concept.url(), ""));
    for edge in concept.edges() {
        out.push(entry(graph.url_of(edge.o), graph.url_of(edge.p)));
    }
}

/// A window around a match in a normalised document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Before")]
    pub before: String,
    #[serde(rename = "Match")]
    pub matched: String,
    #[serde(rename = "After")]
    pub after: String,
    #[serde(rename = "Begin")]
    pub begin: usize,
    #[serde(rename = "End")]
    pub end: usize,
    #[serde(rename = "Len")]
    pub len: usize,
}

/// The match `text[begin..end]` of the document `url` with up to `n` bytes
/// of context on either side.
pub fn context(url: &str, text: &str, begin: usize, end: usize, n: usize) -> IndexResult<Context> {
    let invalid = || IndexError::Context {
        begin,
        end,
        len: text.len(),
    };
    if begin > end || begin >= text.len() || end >= text.len() {
        return Err(invalid());
    }
    let cs = begin.saturating_sub(n);
    let ce = end.saturating_add(n).min(text.len());
    let slice = |a: usize, b: usize| text.get(a..b).map(str::to_string).ok_or_else(invalid);
    Ok(Context {
        url: url.to_string(),
        before: slice(cs, begin)?,
        matched: slice(begin, end)?,
        after: slice(end, ce)?,
        begin,
        end,
        len: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kb::Triples;
    use crate::resource::Resource;
    use crate::traits::{Trait, Traits};
    use std::sync::Arc;

    fn token(concept: Option<Arc<Concept>>) -> Token {
        Token {
            token: "a".into(),
            path: "doc".into(),
            begin: 1,
            end: 2,
            concept,
        }
    }

    #[test]
    fn direct_and_indirect_entries() {
        let mut triples = Triples::new()
            .add("A", "p", "B")
            .add("A", "q", "C")
            .add("A", "label", "a");
        let traits = Traits::new().with(Trait::Distinct, ["label"]);
        let r = Resource::build(&mut triples, &traits).unwrap();
        let es = entries(&token(r.lookup("a")), r.graph());
        let mut got: Vec<(&str, &str)> = es
            .iter()
            .map(|e| (e.concept_url.as_str(), e.relation_url.as_str()))
            .collect();
        got.sort_unstable();
        assert_eq!(got, vec![("A", ""), ("B", "p"), ("C", "q")]);
        assert!(es.iter().all(|e| e.origin_url == "A" && !e.ambiguous));
        assert!(es[0].is_direct());
    }

    #[test]
    fn ambiguous_concepts_index_every_candidate() {
        let mut triples = Triples::new()
            .add("A", "label", "x")
            .add("B", "label", "x")
            .add("B", "p", "C");
        let traits = Traits::new().with(Trait::Distinct, ["label"]);
        let r = Resource::build(&mut triples, &traits).unwrap();
        let es = entries(&token(r.lookup("x")), r.graph());
        let mut got: Vec<(&str, &str)> = es
            .iter()
            .map(|e| (e.concept_url.as_str(), e.relation_url.as_str()))
            .collect();
        got.sort_unstable();
        assert_eq!(got, vec![("A", ""), ("B", ""), ("C", "p")]);
        assert!(es.iter().all(|e| e.ambiguous && e.origin_url == "A-B"));
    }

    #[test]
    fn tokens_without_concept_yield_nothing() {
        let g = Graph::new();
        assert!(entries(&token(None), &g).is_empty());
    }

    #[test]
    fn context_windows() {
        let text = " the quick brown fox ";
        let c = context("u", text, 5, 10, 4).unwrap();
        assert_eq!((c.before.as_str(), c.matched.as_str(), c.after.as_str()), ("the ", "quick", " bro"));
        let c = context("u", text, 1, 4, 100).unwrap();
        assert_eq!((c.before.as_str(), c.after.as_str()), (" ", " quick brown fox "));
        assert!(context("u", text, 5, 4, 1).is_err());
        assert!(context("u", text, 1, text.len(), 1).is_err());
        assert!(matches!(context("u", " ü ", 2, 2, 0), Err(IndexError::Context { .. })));
    }

    #[test]
    fn entries_serialize_with_capitalised_names() {
        let e = Entry {
            concept_url: "c".into(),
            relation_url: String::new(),
            origin_url: "c".into(),
            token: "t".into(),
            path: "p".into(),
            begin: 0,
            end: 1,
            distance: 0,
            ambiguous: false,
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["ConceptURL"], "c");
        assert_eq!(json["L"], 0);
    }
}
