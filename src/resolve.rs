//! Resolvers: choose one meaning of an ambiguous concept from the memory.
//!
//! Every resolver scores the candidates of an ambiguous concept and returns
//! the single candidate with the strictly highest score. Ties and all-zero
//! scores leave the concept unresolved.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::graph::{Concept, Graph};
use crate::memory::Memory;
use crate::rule::Rules;

/// The resolution strategies.
#[derive(Debug, Clone)]
pub enum Resolver {
    /// Score by how often a candidate occurs in the memory.
    Frequency,
    /// Score by the share of the memory a candidate's edges cover.
    Thematic { threshold: f64 },
    /// Score 1 if the candidate's rule holds on the memory.
    Ruled { rules: Arc<Rules> },
}

impl Resolver {
    /// Look up a resolver by name. `simple`/`frequency`,
    /// `automatic`/`thematic` and `ruled` are known.
    pub fn from_name(name: &str, threshold: f64, rules: &Arc<Rules>) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().as_str() {
            "simple" | "frequency" => Ok(Resolver::Frequency),
            "automatic" | "thematic" => Ok(Resolver::Thematic { threshold }),
            "ruled" => Ok(Resolver::Ruled {
                rules: Arc::clone(rules),
            }),
            _ => Err(ConfigError::InvalidResolver {
                value: name.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Resolver::Frequency => "simple",
            Resolver::Thematic { .. } => "automatic",
            Resolver::Ruled { .. } => "ruled",
        }
    }

    /// Resolve the ambiguous `concept`, or `None` if no candidate wins.
    pub fn resolve(&self, concept: &Concept, memory: &Memory) -> Option<Arc<Concept>> {
        let graph = memory.graph();
        let candidates = candidates(concept, graph);
        match self {
            Resolver::Frequency => strict_max(candidates, |c| {
                memory.count_if(|m| m.url() == c.url()) as f64
            }),
            Resolver::Thematic { threshold } => {
                let elements = memory.elements_s();
                strict_max(candidates, |c| {
                    let o = overlap(graph, c, &elements);
                    if o > *threshold { o } else { 0.0 }
                })
            }
            Resolver::Ruled { rules } => strict_max(candidates, |c| match rules.get(c.url()) {
                Some(rule) if rule.execute(memory) >= 1.0 => 1.0,
                _ => 0.0,
            }),
        }
    }
}

/// The edge objects of an ambiguous concept. Ambiguous objects contribute
/// their own objects instead.
fn candidates(concept: &Concept, graph: &Graph) -> Vec<Arc<Concept>> {
    let mut out = Vec::new();
    for o in graph.objects(concept) {
        if o.is_ambiguous() {
            out.extend(graph.objects(o).cloned());
        } else {
            out.push(Arc::clone(o));
        }
    }
    out
}

/// The candidate with the single highest positive score.
fn strict_max(candidates: Vec<Arc<Concept>>, mut score: impl FnMut(&Concept) -> f64) -> Option<Arc<Concept>> {
    let mut best = None;
    let mut max = 0.0;
    let mut ties = 0;
    for c in candidates {
        let s = score(&c);
        if s > max {
            max = s;
            ties = 1;
            best = Some(c);
        } else if s == max && s > 0.0 {
            ties += 1;
        }
    }
    if ties == 1 { best } else { None }
}

fn overlap(graph: &Graph, concept: &Concept, elements: &BTreeSet<String>) -> f64 {
    if elements.is_empty() {
        return 0.0;
    }
    let objects: BTreeSet<&str> = graph.objects(concept).map(|o| o.url()).collect();
    let n = objects.iter().filter(|url| elements.contains(**url)).count();
    n as f64 / elements.len() as f64
}
