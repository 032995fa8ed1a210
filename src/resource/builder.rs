//! Compile a triple stream into a [`Resource`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::SemixResult;
use crate::graph::{FUZZY_URL, Graph, SPLIT_URL};
use crate::kb::TripleSource;
use crate::text::{expand_braces, normalize};
use crate::traits::Traits;

use super::closure::Relation;
use super::{DictEntry, Dictionary, Resource, ambiguity};

#[derive(Debug, Clone)]
struct Label {
    url: String,
    ambiguous: bool,
}

/// Collects classified triples, then builds graph, dictionary and rules.
pub(crate) struct Builder<'t> {
    traits: &'t Traits,
    buckets: BTreeMap<String, Relation>,
    names: HashMap<String, String>,
    labels: BTreeMap<String, Label>,
    ambigs: BTreeMap<String, Vec<String>>,
    rules: BTreeMap<String, String>,
}

impl<'t> Builder<'t> {
    pub(crate) fn new(traits: &'t Traits) -> Self {
        Self {
            traits,
            buckets: BTreeMap::new(),
            names: HashMap::new(),
            labels: BTreeMap::new(),
            ambigs: BTreeMap::new(),
            rules: BTreeMap::new(),
        }
    }

    pub(crate) fn read<S: TripleSource + ?Sized>(&mut self, source: &mut S) -> SemixResult<()> {
        source.parse(&mut |s, p, o| self.add(s, p, o))
    }

    /// Classify one triple by its predicate.
    pub(crate) fn add(&mut self, s: &str, p: &str, o: &str) -> SemixResult<()> {
        let traits = self.traits;
        if traits.is_ignore(p) {
            return Ok(());
        }
        if traits.is_rule(p) {
            self.rules.insert(s.to_string(), o.to_string());
            return Ok(());
        }
        if traits.is_name(p) {
            if let Some(first) = expand_braces(o)?.into_iter().next() {
                self.names.entry(s.to_string()).or_insert(first);
            }
            return self.add_labels(o, s, false);
        }
        if traits.is_ambiguous(p) {
            return self.add_labels(o, s, true);
        }
        if traits.is_distinct(p) {
            return self.add_labels(o, s, false);
        }
        self.buckets.entry(p.to_string()).or_default().insert(s, o);
        Ok(())
    }

    /// Register every expansion of `entry` as a surface form of `url`.
    /// A form claimed by two different URLs moves to the ambiguity map.
    fn add_labels(&mut self, entry: &str, url: &str, ambiguous: bool) -> SemixResult<()> {
        for expanded in expand_braces(entry)? {
            let form = normalize(&expanded, false);
            if form.is_empty() {
                continue;
            }
            if let Some(members) = self.ambigs.get_mut(&form) {
                if !members.iter().any(|m| m == url) {
                    members.push(url.to_string());
                }
                continue;
            }
            match self.labels.get(&form) {
                Some(label) if label.url != url => {
                    let previous = label.url.clone();
                    self.labels.remove(&form);
                    self.ambigs.insert(form, vec![previous, url.to_string()]);
                }
                _ => {
                    self.labels.insert(
                        form,
                        Label {
                            url: url.to_string(),
                            ambiguous,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> SemixResult<Resource> {
        let mut graph = Graph::new();
        for (p, relation) in &self.buckets {
            for (s, o) in self.close(p, relation).iter() {
                graph.add(s, p, o)?;
            }
        }

        let mut dictionary = Dictionary::new();
        for (form, label) in &self.labels {
            let id = graph.register(&label.url);
            let entry = if label.ambiguous {
                DictEntry::ambiguous(id)
            } else {
                DictEntry::distinct(id)
            };
            dictionary.insert(form.clone(), entry);
        }
        for members in self.ambigs.values() {
            for url in members {
                graph.register(url);
            }
        }
        for (url, name) in &self.names {
            if let Some(id) = graph.id_of(url) {
                graph.set_name(id, name);
            }
        }
        let policy = self.traits.policy();
        for (form, members) in &self.ambigs {
            let Some(entry) = ambiguity::handle(policy, &mut graph, members) else {
                tracing::debug!(form = %form, "discarded ambiguous surface form");
                continue;
            };
            graph.set_name(entry.id, form);
            dictionary.insert(form.clone(), entry);
        }
        graph.register(SPLIT_URL);
        graph.register(FUZZY_URL);

        tracing::info!(
            concepts = graph.len(),
            entries = dictionary.len(),
            ambiguous = self.ambigs.len(),
            rules = self.rules.len(),
            policy = %policy,
            "built knowledge base resource"
        );
        Ok(Resource::assemble(Arc::new(graph), dictionary, self.rules)?)
    }

    /// Apply inversion, then symmetric, then transitive closure.
    fn close(&self, p: &str, relation: &Relation) -> Relation {
        let mut closed = relation.clone();
        if self.traits.is_inverted(p) {
            closed = closed.inverted();
        }
        if self.traits.is_symmetric(p) {
            closed = closed.symmetric_closure();
        }
        if self.traits.is_transitive(p) {
            closed = closed.transitive_closure();
        }
        if closed.len() != relation.len() {
            tracing::debug!(predicate = p, before = relation.len(), after = closed.len(), "closed relation");
        }
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kb::Triples;
    use crate::traits::{AmbiguityPolicy, Trait};

    fn traits() -> Traits {
        Traits::new()
            .with(Trait::Distinct, ["label"])
            .with(Trait::Ambiguous, ["alt"])
            .with(Trait::Name, ["name"])
            .with(Trait::Ignore, ["ignored"])
            .with(Trait::Rule, ["rule"])
            .with(Trait::Transitive, ["broader"])
            .with(Trait::Symmetric, ["sibling"])
            .with(Trait::Inverted, ["narrower"])
    }

    fn build(triples: Triples, traits: &Traits) -> Resource {
        let mut triples = triples;
        Resource::build(&mut triples, traits).unwrap()
    }

    fn has_edge(r: &Resource, s: &str, p: &str, o: &str) -> bool {
        let g = r.graph();
        match (g.find(s), g.id_of(p), g.id_of(o)) {
            (Some(c), Some(p), Some(o)) => c.has_edge(p, o),
            _ => false,
        }
    }

    #[test]
    fn classifies_predicates() {
        let r = build(
            Triples::new()
                .add("A", "broader", "B")
                .add("A", "ignored", "X")
                .add("A", "label", "{alpha,first}")
                .add("B", "name", "Bee")
                .add("A", "rule", "1 > 0"),
            &traits(),
        );
        let g = r.graph();
        assert!(g.find("X").is_none());
        assert!(g.find("ignored").is_none());
        assert!(g.find("label").is_none());
        assert_eq!(g.find("B").unwrap().name(), Some("Bee"));
        assert_eq!(r.dictionary()["alpha"], DictEntry::distinct(g.id_of("A").unwrap()));
        assert_eq!(r.dictionary()["first"], DictEntry::distinct(g.id_of("A").unwrap()));
        assert_eq!(r.dictionary()["Bee"], DictEntry::distinct(g.id_of("B").unwrap()));
        assert!(r.rule("A").is_some());
        assert!(g.find(SPLIT_URL).is_some());
        assert!(g.find(FUZZY_URL).is_some());
    }

    #[test]
    fn closes_relations() {
        let r = build(
            Triples::new()
                .add("A", "broader", "B")
                .add("B", "broader", "C")
                .add("X", "sibling", "Y")
                .add("N", "narrower", "M"),
            &traits(),
        );
        assert!(has_edge(&r, "A", "broader", "C"));
        assert!(has_edge(&r, "A", "broader", "B"));
        assert!(!has_edge(&r, "C", "broader", "A"));
        assert!(has_edge(&r, "Y", "sibling", "X"));
        assert!(has_edge(&r, "M", "narrower", "N"));
        assert!(!has_edge(&r, "N", "narrower", "M"));
    }

    #[test]
    fn ambiguous_labels_are_marked() {
        let r = build(Triples::new().add("A", "alt", "Bank"), &traits());
        let entry = r.dictionary()["Bank"];
        assert!(entry.ambiguous);
        let concept = r.lookup("Bank").unwrap();
        assert!(concept.is_ambiguous());
        assert_eq!(concept.edges().len(), 1);
    }

    #[test]
    fn name_labels_are_distinct() {
        let t = Traits::new().with(Trait::Name, ["pn"]).with(Trait::Ambiguous, ["pn"]);
        let r = build(Triples::new().add("A", "pn", "Alpha"), &t);
        let g = r.graph();
        assert_eq!(g.find("A").unwrap().name(), Some("Alpha"));
        assert_eq!(r.dictionary()["Alpha"], DictEntry::distinct(g.id_of("A").unwrap()));
    }

    #[test]
    fn homographs_split_by_default() {
        let r = build(
            Triples::new()
                .add("B", "label", "split-name")
                .add("A", "label", "split name"),
            &traits(),
        );
        let entry = r.dictionary()["split name"];
        assert!(entry.ambiguous);
        let g = r.graph();
        let c = g.get(entry.id).unwrap();
        assert_eq!(c.url(), "A-B");
        assert_eq!(c.name(), Some("split name"));
        assert!(c.is_ambiguous());
        let split = g.id_of(SPLIT_URL).unwrap();
        assert!(c.has_edge(split, g.id_of("A").unwrap()));
        assert!(c.has_edge(split, g.id_of("B").unwrap()));
    }

    #[test]
    fn homographs_merge_common_edges() {
        let t = traits().with_policy(AmbiguityPolicy::Merge);
        let r = build(
            Triples::new()
                .add("A1", "PA", "a")
                .add("A1", "PX", "x")
                .add("A2", "PA", "a")
                .add("A2", "PY", "y")
                .add("A1", "label", "same")
                .add("A2", "label", "same"),
            &t,
        );
        let entry = r.dictionary()["same"];
        assert!(!entry.ambiguous);
        let c = r.graph().get(entry.id).unwrap();
        assert_eq!(c.url(), "A1-A2");
        assert_eq!(c.edges().len(), 1);
        assert!(has_edge(&r, "A1-A2", "PA", "a"));
    }

    #[test]
    fn third_claimant_joins_the_ambiguity() {
        let r = build(
            Triples::new()
                .add("A", "label", "x")
                .add("B", "label", "x")
                .add("C", "label", "x")
                .add("C", "label", "x"),
            &traits(),
        );
        let entry = r.dictionary()["x"];
        assert_eq!(r.graph().url_of(entry.id), "A-B-C");
    }

    #[test]
    fn discard_removes_homographs() {
        let t = traits().with_policy(AmbiguityPolicy::Discard);
        let r = build(Triples::new().add("A", "label", "x").add("B", "label", "x").add("A", "label", "y"), &t);
        assert!(!r.dictionary().contains_key("x"));
        assert!(r.dictionary().contains_key("y"));
    }

    #[test]
    fn dictionary_is_well_formed() {
        let r = build(
            Triples::new()
                .add("A", "label", "Hello, World!")
                .add("B", "alt", "{a,b}c")
                .add("C", "label", "--"),
            &traits(),
        );
        assert!(!r.dictionary().is_empty());
        for (key, entry) in r.dictionary() {
            assert!(!key.is_empty());
            assert_eq!(&normalize(key, false), key);
            assert!(r.graph().get(entry.id).is_some());
        }
    }

    #[test]
    fn invalid_rules_fail_the_build() {
        let mut triples = Triples::new().add("A", "rule", "1 +");
        assert!(Resource::build(&mut triples, &traits()).is_err());
    }

    #[test]
    fn unbalanced_labels_fail_the_build() {
        let mut triples = Triples::new().add("A", "label", "{a,b");
        assert!(Resource::build(&mut triples, &traits()).is_err());
    }
}
