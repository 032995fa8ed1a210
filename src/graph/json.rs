//! JSON representation of concepts.
//!
//! Edge endpoints are shortened to `{URL, Name, ID}` so that serialising a
//! concept of a cyclic graph terminates.

use serde::{Deserialize, Serialize};

use super::{Concept, ConceptId, Graph};

/// A concept as exchanged over the REST interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptJson {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ID")]
    pub id: u32,
    #[serde(rename = "Edges")]
    pub edges: Vec<EdgeJson>,
    #[serde(rename = "Ambiguous")]
    pub ambiguous: bool,
}

/// Shortened reference to an edge endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRefJson {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ID")]
    pub id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeJson {
    #[serde(rename = "P")]
    pub p: ConceptRefJson,
    #[serde(rename = "O")]
    pub o: ConceptRefJson,
    #[serde(rename = "L")]
    pub l: u8,
}

impl ConceptJson {
    pub(crate) fn new(graph: &Graph, concept: &Concept) -> Self {
        let edges = concept
            .edges()
            .iter()
            .map(|e| EdgeJson {
                p: ConceptRefJson::of(graph, e.p),
                o: ConceptRefJson::of(graph, e.o),
                l: e.distance,
            })
            .collect();
        Self {
            url: concept.url().to_string(),
            name: concept.name().unwrap_or_default().to_string(),
            id: concept.raw_id(),
            edges,
            ambiguous: concept.is_ambiguous(),
        }
    }
}

impl ConceptRefJson {
    fn of(graph: &Graph, id: ConceptId) -> Self {
        match graph.get(id) {
            Some(c) => Self {
                url: c.url().to_string(),
                name: c.name().unwrap_or_default().to_string(),
                id: id.get(),
            },
            None => Self {
                url: String::new(),
                name: String::new(),
                id: id.get(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_references_terminate() {
        let mut g = Graph::new();
        let a = g.add("A", "sameAs", "A").unwrap();
        g.set_name(a, "alpha");
        let json = g.to_json(g.get(a).unwrap());
        assert_eq!(json.url, "A");
        assert_eq!(json.edges.len(), 1);
        assert_eq!(json.edges[0].o.url, "A");
        assert_eq!(json.edges[0].o.name, "alpha");

        let text = serde_json::to_string(&json).unwrap();
        assert!(text.contains("\"URL\":\"A\""));
        assert!(text.contains("\"Ambiguous\":false"));
        let back: ConceptJson = serde_json::from_str(&text).unwrap();
        assert_eq!(back, json);
    }
}
