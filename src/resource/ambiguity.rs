//! Homograph handling: combine the concepts that share a surface form.

use std::collections::HashSet;

use crate::graph::{ConceptId, Edge, Graph, SPLIT_URL};
use crate::traits::AmbiguityPolicy;

use super::DictEntry;

/// Sort and dedupe `urls` and join them with `-`.
pub fn combine_urls(urls: &[String]) -> (Vec<String>, String) {
    let mut urls = urls.to_vec();
    urls.sort_unstable();
    urls.dedup();
    let joined = urls.join("-");
    (urls, joined)
}

/// Build an ambiguous concept whose `split` edges enumerate `urls`.
pub fn split(graph: &mut Graph, urls: &[String]) -> ConceptId {
    let (urls, joined) = combine_urls(urls);
    let id = graph.register(&joined);
    let split = graph.register(SPLIT_URL);
    for url in &urls {
        let o = graph.register(url);
        graph.add_edge(id, Edge::new(split, o));
    }
    graph.set_ambiguous(id, true);
    id
}

/// Build a distinct concept carrying the edges common to all `urls`.
pub fn merge(graph: &mut Graph, urls: &[String]) -> ConceptId {
    let (urls, joined) = combine_urls(urls);
    let edges = intersect_edges(graph, &urls);
    let id = graph.register(&joined);
    for edge in edges {
        graph.add_edge(id, edge);
    }
    id
}

/// Edges `(p, o)` present on every concept of `urls`, in the order of the
/// first concept.
pub fn intersect_edges(graph: &Graph, urls: &[String]) -> Vec<Edge> {
    let mut concepts = urls.iter().map(|url| graph.find(url));
    let Some(Some(first)) = concepts.next() else {
        return Vec::new();
    };
    let mut common: Vec<Edge> = first.edges().iter().map(|e| Edge::new(e.p, e.o)).collect();
    for concept in concepts {
        let Some(concept) = concept else {
            return Vec::new();
        };
        let links: HashSet<(ConceptId, ConceptId)> = concept.edges().iter().map(|e| (e.p, e.o)).collect();
        common.retain(|e| links.contains(&(e.p, e.o)));
    }
    common
}

/// Merge when the common edges keep at least `threshold` of the smallest
/// member's edges, split otherwise. Members without edges always split.
pub fn automatic(graph: &mut Graph, urls: &[String], threshold: f64) -> DictEntry {
    let min = urls
        .iter()
        .filter_map(|url| graph.find(url))
        .map(|c| c.edges().len())
        .min()
        .unwrap_or(0);
    let common = intersect_edges(graph, urls).len();
    if min == 0 || common == 0 || (common as f64 / min as f64) < threshold {
        DictEntry::ambiguous(split(graph, urls))
    } else {
        DictEntry::distinct(merge(graph, urls))
    }
}

/// Apply `policy` to the members of one surface form. `None` drops it.
pub fn handle(policy: AmbiguityPolicy, graph: &mut Graph, urls: &[String]) -> Option<DictEntry> {
    match policy {
        AmbiguityPolicy::Split => Some(DictEntry::ambiguous(split(graph, urls))),
        AmbiguityPolicy::Merge => Some(DictEntry::distinct(merge(graph, urls))),
        AmbiguityPolicy::Discard => None,
        AmbiguityPolicy::Automatic(threshold) => Some(automatic(graph, urls, threshold)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn edge_urls(graph: &Graph, id: ConceptId) -> Vec<(String, String)> {
        graph
            .get(id)
            .unwrap()
            .edges()
            .iter()
            .map(|e| (graph.url_of(e.p).to_string(), graph.url_of(e.o).to_string()))
            .collect()
    }

    fn merge_graph() -> Graph {
        let mut g = Graph::new();
        for (s, p, o) in [
            ("A1", "PA", "a"),
            ("A2", "PA", "a"),
            ("B1", "PA", "a"),
            ("B1", "PB", "b"),
            ("B2", "PA", "a"),
            ("B2", "PB", "b"),
            ("C1", "PA", "a"),
            ("C2", "PB", "b"),
        ] {
            g.add(s, p, o).unwrap();
        }
        g
    }

    #[test]
    fn split_sorts_and_dedupes_members() {
        for (want, members) in [
            ("A-B-C", vec!["A", "B", "C"]),
            ("A-B-C", vec!["A", "B", "C", "A"]),
            ("A-B-C", vec!["C", "B", "A", "A"]),
            ("A-B", vec!["B", "A", "A"]),
        ] {
            let mut g = Graph::new();
            let id = split(&mut g, &urls(&members));
            let c = g.get(id).unwrap();
            assert_eq!(c.url(), want);
            assert!(c.is_ambiguous());
            for m in &members {
                assert!(edge_urls(&g, id).contains(&(SPLIT_URL.to_string(), m.to_string())));
            }
        }
    }

    #[test]
    fn merge_keeps_common_edges() {
        for (want, members, edges) in [
            ("A1-A2", vec!["A1", "A2"], vec![("PA", "a")]),
            ("A1-B1", vec!["A1", "B1"], vec![("PA", "a")]),
            ("B1-B2", vec!["B1", "B2"], vec![("PA", "a"), ("PB", "b")]),
            ("A1-B1-C1", vec!["A1", "B1", "C1"], vec![("PA", "a")]),
            ("A1-C2", vec!["A1", "C2"], vec![]),
        ] {
            let mut g = merge_graph();
            let id = merge(&mut g, &urls(&members));
            let c = g.get(id).unwrap();
            assert_eq!(c.url(), want);
            assert!(!c.is_ambiguous());
            let got = edge_urls(&g, id);
            assert_eq!(got.len(), edges.len(), "{want}");
            for (p, o) in edges {
                assert!(got.contains(&(p.to_string(), o.to_string())));
            }
        }
    }

    #[test]
    fn automatic_chooses_by_overlap() {
        let mut g = merge_graph();
        let entry = automatic(&mut g, &urls(&["B1", "B2"]), 0.5);
        assert!(!entry.ambiguous);
        let entry = automatic(&mut g, &urls(&["A1", "C2"]), 0.5);
        assert!(entry.ambiguous);
        assert_eq!(g.url_of(entry.id), "A1-C2");
        // one common edge out of B1's two
        let entry = automatic(&mut g, &urls(&["A1", "B1"]), 1.0);
        assert!(!entry.ambiguous);
        let entry = automatic(&mut g, &urls(&["B1", "C1"]), 1.0);
        assert!(!entry.ambiguous);
    }

    #[test]
    fn discard_drops_the_form() {
        let mut g = merge_graph();
        let before = g.len();
        assert!(handle(AmbiguityPolicy::Discard, &mut g, &urls(&["A1", "A2"])).is_none());
        assert_eq!(g.len(), before);
    }
}
