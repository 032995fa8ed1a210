//! Concept graph: an arena of [`Concept`]s indexed by URL and by id.
//!
//! Ids are dense and 1-based; registering a known URL returns the existing
//! concept. Concepts are stored behind `Arc` so that matched tokens can hold
//! a cheap handle to them once the graph is frozen inside a resource.

pub mod concept;
pub mod dot;
pub mod json;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ResourceError;

pub use concept::{Concept, ConceptId, Edge};
pub use json::{ConceptJson, ConceptRefJson, EdgeJson};

/// Predicate linking a split concept to its candidate meanings.
pub const SPLIT_URL: &str = "http://semix.org/predicates/split";

/// Predicate linking a fuzzy match to its approximate candidates.
pub const FUZZY_URL: &str = "http://semix.org/predicates/fuzzy";

/// Result type for graph and resource operations.
pub type ResourceResult<T> = std::result::Result<T, ResourceError>;

/// The concept graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Arc<Concept>>", into = "Vec<Arc<Concept>>")]
pub struct Graph {
    concepts: Vec<Arc<Concept>>,
    by_url: HashMap<String, ConceptId>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a URL and return its id. Idempotent.
    pub fn register(&mut self, url: &str) -> ConceptId {
        if let Some(id) = self.by_url.get(url) {
            return *id;
        }
        let id = ConceptId::from_index(self.concepts.len());
        self.concepts.push(Arc::new(Concept::new(url, id)));
        self.by_url.insert(url.to_string(), id);
        id
    }

    /// Register the three URLs of a triple and link subject to object.
    /// Returns the subject's id.
    pub fn add(&mut self, s: &str, p: &str, o: &str) -> ResourceResult<ConceptId> {
        for (part, value) in [("subject", s), ("predicate", p), ("object", o)] {
            if value.is_empty() {
                return Err(ResourceError::EmptyTriple {
                    part,
                    subject: s.to_string(),
                    predicate: p.to_string(),
                    object: o.to_string(),
                });
            }
        }
        let sid = self.register(s);
        let pid = self.register(p);
        let oid = self.register(o);
        self.concept_mut(sid).push_edge(Edge::new(pid, oid));
        Ok(sid)
    }

    /// Append an edge to a member concept.
    pub(crate) fn add_edge(&mut self, id: ConceptId, edge: Edge) {
        self.concept_mut(id).push_edge(edge);
    }

    pub(crate) fn set_name(&mut self, id: ConceptId, name: &str) {
        self.concept_mut(id).set_name(name);
    }

    pub(crate) fn set_ambiguous(&mut self, id: ConceptId, ambiguous: bool) {
        self.concept_mut(id).set_ambiguous(ambiguous);
    }

    fn concept_mut(&mut self, id: ConceptId) -> &mut Concept {
        Arc::make_mut(&mut self.concepts[id.index()])
    }

    /// Look up a concept by id.
    pub fn get(&self, id: ConceptId) -> Option<&Arc<Concept>> {
        self.concepts.get(id.index())
    }

    /// Look up a concept by raw id.
    pub fn get_raw(&self, raw: u32) -> Option<&Arc<Concept>> {
        ConceptId::new(raw).and_then(|id| self.get(id))
    }

    /// Look up a concept by URL.
    pub fn find(&self, url: &str) -> Option<&Arc<Concept>> {
        self.by_url.get(url).and_then(|id| self.get(*id))
    }

    /// Look up the id of a URL.
    pub fn id_of(&self, url: &str) -> Option<ConceptId> {
        self.by_url.get(url).copied()
    }

    /// URL of a member concept, empty if unknown.
    pub fn url_of(&self, id: ConceptId) -> &str {
        self.get(id).map(|c| c.url()).unwrap_or("")
    }

    /// Number of concepts.
    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Iterate over all concepts in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Concept>> {
        self.concepts.iter()
    }

    /// Objects of the edges of `concept` that are graph members.
    pub fn objects<'a>(&'a self, concept: &'a Concept) -> impl Iterator<Item = &'a Arc<Concept>> + 'a {
        concept.edges().iter().filter_map(|e| self.get(e.o))
    }

    /// Concepts with an outgoing edge whose object is `id`.
    pub fn parents(&self, id: ConceptId) -> Vec<Arc<Concept>> {
        self.concepts
            .iter()
            .filter(|c| c.edges().iter().any(|e| e.o == id))
            .cloned()
            .collect()
    }

    /// Concepts that appear as the predicate of some edge.
    pub fn predicates(&self) -> Vec<Arc<Concept>> {
        let mut ids: Vec<ConceptId> = self
            .concepts
            .iter()
            .flat_map(|c| c.edges().iter().map(|e| e.p))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter().filter_map(|id| self.get(id).cloned()).collect()
    }

    /// JSON view of a concept; edges are shortened to URL, name and id.
    pub fn to_json(&self, concept: &Concept) -> ConceptJson {
        ConceptJson::new(self, concept)
    }
}

impl From<Vec<Arc<Concept>>> for Graph {
    fn from(concepts: Vec<Arc<Concept>>) -> Self {
        let by_url = concepts
            .iter()
            .filter_map(|c| c.id().map(|id| (c.url().to_string(), id)))
            .collect();
        Self { concepts, by_url }
    }
}

impl From<Graph> for Vec<Arc<Concept>> {
    fn from(graph: Graph) -> Self {
        graph.concepts
    }
}
