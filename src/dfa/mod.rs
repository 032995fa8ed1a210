//! Matching automata compiled from the dictionary.
//!
//! [`Dfa`] wraps the [`SparseDfa`] and resolves final-state data to concepts
//! of the graph. Keys are stored surrounded by one space on each side, so
//! word boundaries are part of the automaton.

pub mod fuzzy;
pub mod sparse;

use std::sync::Arc;

use crate::graph::{Concept, ConceptId, Edge, Graph, SPLIT_URL};
use crate::resource::{DictEntry, Dictionary};

pub use fuzzy::FuzzyHit;
pub use sparse::{SparseDfa, State};

/// The dictionary automaton together with the graph its ids refer to.
#[derive(Debug, Clone)]
pub struct Dfa {
    table: SparseDfa,
    graph: Arc<Graph>,
}

impl Dfa {
    /// Compile the dictionary. Each key is stored as `" " + key + " "`.
    pub fn new(dictionary: &Dictionary, graph: Arc<Graph>) -> Self {
        let keys: Vec<(Vec<u8>, i32)> = dictionary
            .iter()
            .map(|(key, entry)| (format!(" {key} ").into_bytes(), entry.encode()))
            .collect();
        let table = SparseDfa::build(keys.iter().map(|(k, d)| (k.as_slice(), *d)));
        tracing::debug!(states = table.len(), cells = table.table_size(), "compiled dictionary automaton");
        Self { table, graph }
    }

    pub fn initial(&self) -> State {
        self.table.initial()
    }

    pub fn delta(&self, state: State, byte: u8) -> Option<State> {
        self.table.delta(state, byte)
    }

    /// The dictionary entry of a final state.
    pub fn final_entry(&self, state: State) -> Option<DictEntry> {
        self.table.final_data(state).and_then(DictEntry::decode)
    }

    /// The concept of a final state.
    pub fn final_concept(&self, state: State) -> Option<Arc<Concept>> {
        self.final_entry(state).and_then(|e| self.concept(e))
    }

    /// Resolve a dictionary entry to its concept.
    ///
    /// An ambiguous entry whose concept is not itself ambiguous is wrapped
    /// into a one-candidate split concept.
    pub fn concept(&self, entry: DictEntry) -> Option<Arc<Concept>> {
        resolve_entry(&self.graph, entry)
    }

    /// Run the fuzzy search with at most `k` edits from the start of `input`.
    pub fn fuzzy<F>(&self, input: &[u8], k: u8, mut f: F)
    where
        F: FnMut(u8, usize, DictEntry),
    {
        fuzzy::search(&self.table, input, k, |hit| {
            if let Some(entry) = DictEntry::decode(hit.data) {
                f(hit.errors, hit.consumed, entry);
            }
        });
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// Number of automaton states.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

pub(crate) fn resolve_entry(graph: &Graph, entry: DictEntry) -> Option<Arc<Concept>> {
    let concept = graph.get(entry.id)?;
    if !entry.ambiguous || concept.is_ambiguous() {
        return Some(Arc::clone(concept));
    }
    let split: ConceptId = graph.id_of(SPLIT_URL)?;
    Some(Arc::new(Concept::synthetic(
        concept.url(),
        concept.name().map(str::to_string),
        concept.id(),
        vec![Edge::new(split, entry.id)],
        true,
    )))
}
