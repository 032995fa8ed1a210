//! Concept search over a compiled resource.
//!
//! Used by the CLI, the REST daemon and as the identifier resolver of
//! queries.

use std::collections::HashSet;
use std::sync::Arc;

use crate::dfa;
use crate::error::QueryError;
use crate::graph::{Concept, Graph};
use crate::query::QueryResult;
use crate::resource::{Dictionary, Resource};
use crate::text::normalize;

/// Searches the graph and the dictionary of a resource.
#[derive(Debug, Clone, Copy)]
pub struct Searcher<'r> {
    graph: &'r Graph,
    dictionary: &'r Dictionary,
}

impl<'r> Searcher<'r> {
    pub fn new(resource: &'r Resource) -> Self {
        Self {
            graph: resource.graph(),
            dictionary: resource.dictionary(),
        }
    }

    pub fn find(&self, url: &str) -> Option<Arc<Concept>> {
        self.graph.find(url).cloned()
    }

    pub fn find_id(&self, id: u32) -> Option<Arc<Concept>> {
        self.graph.get_raw(id).cloned()
    }

    /// A concept by URL, or by numeric id if `key` is one.
    pub fn lookup(&self, key: &str) -> Option<Arc<Concept>> {
        self.find(key)
            .or_else(|| key.parse().ok().and_then(|id| self.find_id(id)))
    }

    /// Concepts matching `q`, at most `limit` of them.
    ///
    /// An exact URL or an exact dictionary entry yields that concept alone.
    /// Otherwise every concept whose URL or name contains `q` is returned,
    /// followed by the concepts of the dictionary entries containing `q`.
    pub fn search(&self, q: &str, limit: Option<usize>) -> Vec<Arc<Concept>> {
        if limit == Some(0) {
            return Vec::new();
        }
        if let Some(c) = self.find(q) {
            return vec![c];
        }
        if let Some(c) = self.entry(q) {
            return vec![c];
        }
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let done = |out: &Vec<Arc<Concept>>| limit.is_some_and(|n| out.len() >= n);
        for c in self.graph.iter() {
            if done(&out) {
                return out;
            }
            if (c.url().contains(q) || c.name().is_some_and(|n| n.contains(q))) && seen.insert(c.url().to_string()) {
                out.push(Arc::clone(c));
            }
        }
        for (key, entry) in self.dictionary {
            if done(&out) {
                break;
            }
            if !key.contains(q) {
                continue;
            }
            if let Some(c) = self.graph.get(entry.id) {
                if seen.insert(c.url().to_string()) {
                    out.push(Arc::clone(c));
                }
            }
        }
        out
    }

    /// Predicate concepts whose URL or name contains `q`; all of them for
    /// an empty `q`.
    pub fn predicates(&self, q: &str) -> Vec<Arc<Concept>> {
        self.graph
            .predicates()
            .into_iter()
            .filter(|c| q.is_empty() || c.url().contains(q) || c.name().is_some_and(|n| n.contains(q)))
            .collect()
    }

    /// Concepts with an outgoing edge to the concept `url`.
    pub fn parents(&self, url: &str) -> Vec<Arc<Concept>> {
        match self.graph.id_of(url) {
            Some(id) => self.graph.parents(id),
            None => Vec::new(),
        }
    }

    /// Dictionary entries that refer to the concept `url`.
    pub fn dictionary_entries(&self, url: &str) -> Vec<String> {
        let Some(id) = self.graph.id_of(url) else {
            return Vec::new();
        };
        self.dictionary
            .iter()
            .filter(|(_, e)| e.id == id)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Map a query identifier to concept URLs: an exact URL, the concepts of
    /// a dictionary entry (every candidate of an ambiguous one), or the
    /// first search hit.
    pub fn resolve_ident(&self, ident: &str) -> QueryResult<Vec<String>> {
        if let Some(c) = self.find(ident) {
            return Ok(vec![c.url().to_string()]);
        }
        if let Some(c) = self.entry(ident) {
            if c.is_ambiguous() {
                return Ok(self.graph.objects(&c).map(|o| o.url().to_string()).collect());
            }
            return Ok(vec![c.url().to_string()]);
        }
        match self.search(ident, Some(1)).first() {
            Some(c) => Ok(vec![c.url().to_string()]),
            None => Err(QueryError::Resolve {
                ident: ident.to_string(),
                message: "no matching concept".into(),
            }),
        }
    }

    fn entry(&self, q: &str) -> Option<Arc<Concept>> {
        let entry = self
            .dictionary
            .get(q)
            .or_else(|| self.dictionary.get(&normalize(q, false)))?;
        dfa::resolve_entry(self.graph, *entry)
    }
}
