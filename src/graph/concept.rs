//! Concepts and edges of the concept graph.
//!
//! Concepts live in the [`Graph`](super::Graph) arena and refer to each other
//! by [`ConceptId`]; edges never own their endpoints, so cyclic knowledge
//! bases (symmetric predicates, for example) need no reference cycles.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Dense, 1-based identifier of a concept in its graph.
///
/// Uses `NonZeroU32` so that `Option<ConceptId>` is the same size as `ConceptId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ConceptId(NonZeroU32);

impl ConceptId {
    /// Create a `ConceptId` from a raw `u32`.
    ///
    /// Returns `None` if `raw` is zero.
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(ConceptId)
    }

    /// Get the underlying `u32` value.
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Id of the concept at arena position `index`.
    pub(crate) fn from_index(index: usize) -> Self {
        ConceptId(NonZeroU32::MIN.saturating_add(index as u32))
    }

    /// Position of the concept in the graph arena.
    pub(crate) fn index(self) -> usize {
        self.0.get() as usize - 1
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A directed, labelled link `(predicate, object)` leaving a concept.
///
/// `distance` is zero for knowledge-base edges; the fuzzy matcher uses it to
/// carry the edit distance of each candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub p: ConceptId,
    pub o: ConceptId,
    pub distance: u8,
}

impl Edge {
    /// An exact edge.
    pub fn new(p: ConceptId, o: ConceptId) -> Self {
        Self { p, o, distance: 0 }
    }

    /// An edge carrying an edit distance.
    pub fn with_distance(p: ConceptId, o: ConceptId, distance: u8) -> Self {
        Self { p, o, distance }
    }
}

/// A node of the knowledge base, identified by its URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    url: String,
    name: Option<String>,
    id: Option<ConceptId>,
    edges: Vec<Edge>,
    ambiguous: bool,
}

impl Concept {
    pub(crate) fn new(url: &str, id: ConceptId) -> Self {
        Self {
            url: url.to_string(),
            name: None,
            id: Some(id),
            edges: Vec::new(),
            ambiguous: false,
        }
    }

    /// Build a concept that is not a member of any graph, such as the
    /// candidate set produced by the fuzzy matcher. Its edges still refer to
    /// graph members.
    pub fn synthetic(
        url: impl Into<String>,
        name: Option<String>,
        id: Option<ConceptId>,
        edges: Vec<Edge>,
        ambiguous: bool,
    ) -> Self {
        Self {
            url: url.into(),
            name,
            id,
            edges,
            ambiguous,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The graph id, `None` for synthetic concepts.
    pub fn id(&self) -> Option<ConceptId> {
        self.id
    }

    /// The raw id, `0` for synthetic concepts.
    pub fn raw_id(&self) -> u32 {
        self.id.map(ConceptId::get).unwrap_or(0)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Ambiguous concepts enumerate their candidate meanings as edge objects.
    pub fn is_ambiguous(&self) -> bool {
        self.ambiguous
    }

    /// Whether this concept links to `o` under `p`.
    pub fn has_edge(&self, p: ConceptId, o: ConceptId) -> bool {
        self.edges.iter().any(|e| e.p == p && e.o == o)
    }

    /// The name if there is one, otherwise the last segment of the URL.
    pub fn short_name(&self) -> &str {
        if let Some(name) = self.name() {
            return name;
        }
        let trimmed = self.url.trim_end_matches('/');
        match trimmed.rfind(['/', '#']) {
            Some(i) if i + 1 < trimmed.len() => &trimmed[i + 1..],
            _ => &self.url,
        }
    }

    /// Set the name unless one is already present.
    pub(crate) fn set_name(&mut self, name: &str) {
        if self.name.is_none() {
            self.name = Some(name.to_string());
        }
    }

    /// Append an edge unless an edge with the same predicate and object exists.
    pub(crate) fn push_edge(&mut self, edge: Edge) {
        if !self.has_edge(edge.p, edge.o) {
            self.edges.push(edge);
        }
    }

    pub(crate) fn set_ambiguous(&mut self, ambiguous: bool) {
        self.ambiguous = ambiguous;
    }
}

impl std::fmt::Display for Concept {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_name())
    }
}
