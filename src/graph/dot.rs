//! Graphviz rendering of a concept's neighbourhood.

use std::collections::BTreeSet;
use std::fmt::Write;

use super::{Concept, ConceptId, Graph};

/// Render `concept` and the targets of its edges as dot code.
///
/// An edge `c -p-> t` is left out when another target of `c` already links
/// to `t` under `p`, which hides the shortcuts added by transitive closure.
pub fn render(graph: &Graph, concept: &Concept, rankdir: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph semix {{");
    let _ = writeln!(out, "rankdir={rankdir}");

    let mut nodes = BTreeSet::new();
    nodes.insert(concept.raw_id());
    for e in concept.edges() {
        nodes.insert(e.o.get());
    }
    for raw in &nodes {
        let label = match ConceptId::new(*raw).and_then(|id| graph.get(id)) {
            Some(c) => c.short_name().to_string(),
            None => concept.short_name().to_string(),
        };
        let _ = writeln!(out, "{raw} [label={}]", label_of(&label));
    }
    for e in concept.edges() {
        let implied = concept.edges().iter().any(|other| {
            other.o != e.o && graph.get(other.o).is_some_and(|o| o.has_edge(e.p, e.o))
        });
        if implied {
            continue;
        }
        let predicate = graph.get(e.p).map(|p| p.short_name()).unwrap_or_default();
        let _ = writeln!(
            out,
            "{} -> {} [label={predicate:?}]",
            concept.raw_id(),
            e.o.get()
        );
    }
    out.push_str("}\n");
    out
}

/// Quote a label and break long ones at the first space past the middle.
fn label_of(name: &str) -> String {
    let quoted = format!("{name:?}");
    let half = quoted.len() / 2 + 1;
    match quoted.char_indices().find(|(i, c)| *i >= half && *c == ' ') {
        Some((at, _)) => format!("{}\\n{}", &quoted[..at], &quoted[at + 1..]),
        None => quoted,
    }
}
