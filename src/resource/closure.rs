//! Per-predicate relations and their closures.

use std::collections::{HashMap, HashSet};

/// The `(subject, object)` pairs of one predicate, in insertion order and
/// without duplicates.
#[derive(Debug, Clone, Default)]
pub struct Relation {
    pairs: Vec<(String, String)>,
    seen: HashSet<(String, String)>,
}

impl Relation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pair; returns `false` if it was already present.
    pub fn insert(&mut self, s: &str, o: &str) -> bool {
        let pair = (s.to_string(), o.to_string());
        if self.seen.contains(&pair) {
            return false;
        }
        self.seen.insert(pair.clone());
        self.pairs.push(pair);
        true
    }

    pub fn contains(&self, s: &str, o: &str) -> bool {
        self.seen.contains(&(s.to_string(), o.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(s, o)| (s.as_str(), o.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Swap subject and object of every pair.
    pub fn inverted(&self) -> Relation {
        let mut out = Relation::new();
        for (s, o) in self.iter() {
            out.insert(o, s);
        }
        out
    }

    /// Add the reverse of every pair.
    pub fn symmetric_closure(&self) -> Relation {
        let mut out = Relation::new();
        for (s, o) in self.iter() {
            out.insert(s, o);
            out.insert(o, s);
        }
        out
    }

    /// Close the relation under composition.
    ///
    /// Breadth-first over the pairs: every pair `(s, o)` is extended by the
    /// original successors of `o`, and each new pair is queued in turn.
    pub fn transitive_closure(&self) -> Relation {
        let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
        for (s, o) in self.iter() {
            successors.entry(s).or_default().push(o);
        }
        let mut out = Relation::new();
        let mut queue: Vec<(String, String)> = self.pairs.clone();
        let mut i = 0;
        while i < queue.len() {
            let (s, o) = queue[i].clone();
            i += 1;
            if !out.insert(&s, &o) {
                continue;
            }
            if let Some(next) = successors.get(o.as_str()) {
                for t in next {
                    if !out.contains(&s, t) {
                        queue.push((s.clone(), t.to_string()));
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation(pairs: &[(&str, &str)]) -> Relation {
        let mut r = Relation::new();
        for (s, o) in pairs {
            r.insert(s, o);
        }
        r
    }

    fn sorted(r: &Relation) -> Vec<(String, String)> {
        let mut v: Vec<(String, String)> = r.iter().map(|(s, o)| (s.into(), o.into())).collect();
        v.sort();
        v
    }

    fn pairs(want: &[(&str, &str)]) -> Vec<(String, String)> {
        let mut v: Vec<(String, String)> = want.iter().map(|(s, o)| (s.to_string(), o.to_string())).collect();
        v.sort();
        v
    }

    #[test]
    fn insert_dedupes() {
        let mut r = Relation::new();
        assert!(r.insert("a", "b"));
        assert!(!r.insert("a", "b"));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn inversion() {
        let r = relation(&[("a", "b"), ("b", "c")]).inverted();
        assert_eq!(sorted(&r), pairs(&[("b", "a"), ("c", "b")]));
    }

    #[test]
    fn symmetric_closure_adds_reverse_edges() {
        let r = relation(&[("a", "b"), ("b", "a"), ("b", "c")]).symmetric_closure();
        assert_eq!(sorted(&r), pairs(&[("a", "b"), ("b", "a"), ("b", "c"), ("c", "b")]));
        let again = r.symmetric_closure();
        assert_eq!(sorted(&again), sorted(&r));
    }

    #[test]
    fn transitive_closure_of_a_chain() {
        let r = relation(&[("a", "b"), ("b", "c"), ("c", "d")]).transitive_closure();
        assert_eq!(
            sorted(&r),
            pairs(&[("a", "b"), ("a", "c"), ("a", "d"), ("b", "c"), ("b", "d"), ("c", "d")])
        );
    }

    #[test]
    fn transitive_closure_terminates_on_cycles() {
        let r = relation(&[("a", "b"), ("b", "a")]).transitive_closure();
        assert_eq!(
            sorted(&r),
            pairs(&[("a", "a"), ("a", "b"), ("b", "a"), ("b", "b")])
        );
    }

    #[test]
    fn transitive_closure_is_closed() {
        let r = relation(&[("a", "b"), ("b", "c"), ("x", "a"), ("c", "y")]).transitive_closure();
        for (s, o) in r.iter() {
            for (s2, o2) in r.iter() {
                if o == s2 {
                    assert!(r.contains(s, o2), "missing ({s}, {o2})");
                }
            }
        }
    }
}
