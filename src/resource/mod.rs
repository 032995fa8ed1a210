//! The compiled knowledge base: graph, dictionary, rules and automaton.
//!
//! A [`Resource`] is built once from a triple source and a trait table and
//! is immutable afterwards; every pipeline stage shares it. The whole
//! resource can be cached on disk with bincode; the automaton and the rule
//! byte code are rebuilt on load.

pub mod ambiguity;
pub(crate) mod builder;
pub mod closure;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dfa::{self, Dfa};
use crate::error::{ResourceError, SemixResult};
use crate::graph::{Concept, ConceptId, Graph, ResourceResult};
use crate::kb::TripleSource;
use crate::rule::{Rule, Rules};
use crate::text::normalize;
use crate::traits::Traits;

pub use closure::Relation;

/// A dictionary value: the concept of a surface form and whether the form
/// is ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DictEntry {
    pub id: ConceptId,
    pub ambiguous: bool,
}

impl DictEntry {
    pub fn distinct(id: ConceptId) -> Self {
        Self { id, ambiguous: false }
    }

    pub fn ambiguous(id: ConceptId) -> Self {
        Self { id, ambiguous: true }
    }

    /// Signed form used as automaton final data: negative when ambiguous.
    pub fn encode(self) -> i32 {
        let id = self.id.get() as i32;
        if self.ambiguous { -id } else { id }
    }

    pub fn decode(data: i32) -> Option<Self> {
        ConceptId::new(data.unsigned_abs()).map(|id| Self {
            id,
            ambiguous: data < 0,
        })
    }
}

/// Normalised surface form to dictionary entry.
pub type Dictionary = BTreeMap<String, DictEntry>;

/// An immutable knowledge-base bundle.
#[derive(Debug, Clone)]
pub struct Resource {
    graph: Arc<Graph>,
    dictionary: Dictionary,
    rules: Arc<Rules>,
    dfa: Arc<Dfa>,
}

#[derive(Serialize, Deserialize)]
struct ResourceData {
    graph: Graph,
    dictionary: Dictionary,
    rules: BTreeMap<String, String>,
}

impl Resource {
    /// Parse `source` and compile it under `traits`.
    pub fn build<S: TripleSource + ?Sized>(source: &mut S, traits: &Traits) -> SemixResult<Self> {
        let mut builder = builder::Builder::new(traits);
        builder.read(source)?;
        builder.finish()
    }

    /// Compile the rules and the automaton of a finished graph and dictionary.
    pub(crate) fn assemble(
        graph: Arc<Graph>,
        dictionary: Dictionary,
        sources: BTreeMap<String, String>,
    ) -> ResourceResult<Self> {
        let mut rules = Rules::new();
        for (url, source) in sources {
            let lookup = |name: &str| rule_lookup(&graph, &dictionary, name);
            let rule = Rule::compile(&source, &lookup).map_err(|e| ResourceError::InvalidRule {
                url: url.clone(),
                message: e.to_string(),
            })?;
            rules.insert(url, rule);
        }
        let dfa = Arc::new(Dfa::new(&dictionary, Arc::clone(&graph)));
        Ok(Self {
            graph,
            dictionary,
            rules: Arc::new(rules),
            dfa,
        })
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn rules(&self) -> &Arc<Rules> {
        &self.rules
    }

    /// The compiled rule of the concept `url`.
    pub fn rule(&self, url: &str) -> Option<&Rule> {
        self.rules.get(url)
    }

    pub fn dfa(&self) -> Arc<Dfa> {
        Arc::clone(&self.dfa)
    }

    /// The concept of a surface form, normalising it first.
    pub fn lookup(&self, surface: &str) -> Option<Arc<Concept>> {
        let entry = self.dictionary.get(&normalize(surface, false))?;
        dfa::resolve_entry(&self.graph, *entry)
    }

    /// Surface forms that refer to the concept `id`.
    pub fn entries_of(&self, id: ConceptId) -> Vec<(&str, bool)> {
        self.dictionary
            .iter()
            .filter(|(_, e)| e.id == id)
            .map(|(k, e)| (k.as_str(), e.ambiguous))
            .collect()
    }

    /// Write the resource to a bincode cache file.
    pub fn write_cache(&self, path: &Path) -> ResourceResult<()> {
        let data = ResourceData {
            graph: Graph::clone(&self.graph),
            dictionary: self.dictionary.clone(),
            rules: self
                .rules
                .iter()
                .map(|(url, rule)| (url.clone(), rule.source().to_string()))
                .collect(),
        };
        let file = File::create(path).map_err(|source| ResourceError::Io { source })?;
        bincode::serialize_into(BufWriter::new(file), &data).map_err(|e| ResourceError::Encode {
            message: e.to_string(),
        })?;
        tracing::info!(path = %path.display(), "wrote resource cache");
        Ok(())
    }

    /// Read a resource from a bincode cache file.
    pub fn read_cache(path: &Path) -> ResourceResult<Self> {
        let file = File::open(path).map_err(|source| ResourceError::Io { source })?;
        let data: ResourceData =
            bincode::deserialize_from(BufReader::new(file)).map_err(|e| ResourceError::Decode {
                message: e.to_string(),
            })?;
        tracing::info!(path = %path.display(), concepts = data.graph.len(), "read resource cache");
        Self::assemble(Arc::new(data.graph), data.dictionary, data.rules)
    }
}

/// Map a rule identifier to a concept id: a graph URL, or an unambiguous
/// surface form.
fn rule_lookup(graph: &Graph, dictionary: &Dictionary, name: &str) -> Option<u32> {
    if let Some(id) = graph.id_of(name) {
        return Some(id.get());
    }
    dictionary
        .get(&normalize(name, false))
        .filter(|e| !e.ambiguous)
        .map(|e| e.id.get())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kb::Triples;
    use crate::traits::Trait;
    use tempfile::TempDir;

    fn resource() -> Resource {
        let mut triples = Triples::new()
            .add("A", "p", "B")
            .add("A", "label", "alpha")
            .add("B", "label", "beta")
            .add("C", "label", "beta")
            .add("A", "rule", "(c(\"alpha\") = 0) * (c(\"B\") = 0)");
        let traits = Traits::new()
            .with(Trait::Distinct, ["label"])
            .with(Trait::Rule, ["rule"]);
        Resource::build(&mut triples, &traits).unwrap()
    }

    #[test]
    fn dict_entry_sign_encoding() {
        let id = ConceptId::new(42).unwrap();
        assert_eq!(DictEntry::distinct(id).encode(), 42);
        assert_eq!(DictEntry::ambiguous(id).encode(), -42);
        assert_eq!(DictEntry::decode(-42), Some(DictEntry::ambiguous(id)));
        assert_eq!(DictEntry::decode(42), Some(DictEntry::distinct(id)));
        assert_eq!(DictEntry::decode(0), None);
    }

    #[test]
    fn lookup_normalises() {
        let r = resource();
        assert_eq!(r.lookup("  alpha!").unwrap().url(), "A");
        assert!(r.lookup("ALPHA").is_none());
        assert_eq!(r.lookup("beta").unwrap().url(), "B-C");
        assert!(r.lookup("gamma").is_none());
    }

    #[test]
    fn entries_of_concept() {
        let r = resource();
        let a = r.graph().id_of("A").unwrap();
        assert_eq!(r.entries_of(a), vec![("alpha", false)]);
    }

    #[test]
    fn cache_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.cache");
        let r = resource();
        r.write_cache(&path).unwrap();
        let back = Resource::read_cache(&path).unwrap();
        assert_eq!(back.graph().len(), r.graph().len());
        assert_eq!(back.dictionary(), r.dictionary());
        assert_eq!(back.rules().len(), 1);
        assert_eq!(back.rule("A").unwrap().to_string(), r.rule("A").unwrap().to_string());
        assert_eq!(back.dfa().len(), r.dfa().len());
    }

    #[test]
    fn missing_cache_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let err = Resource::read_cache(&dir.path().join("none")).unwrap_err();
        assert!(matches!(err, ResourceError::Io { .. }));
    }
}
