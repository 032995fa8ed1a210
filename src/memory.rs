//! Concept memory: a fixed-capacity ring buffer of recent concepts.
//!
//! The resolvers and the rule VM read statistics from it. The `_s`
//! variants of the queries also visit the objects of every stored
//! concept's edges, which is why the memory keeps a handle to the graph.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use crate::graph::{Concept, ConceptId, Graph};

/// Ring buffer of concepts; the oldest entry is overwritten once full.
#[derive(Debug, Clone)]
pub struct Memory {
    buffer: VecDeque<Arc<Concept>>,
    capacity: usize,
    graph: Arc<Graph>,
}

impl Memory {
    pub fn new(capacity: usize, graph: Arc<Graph>) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            graph,
        }
    }

    pub fn push(&mut self, concept: Arc<Concept>) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(concept);
    }

    /// Visit the stored concepts, oldest first.
    pub fn each(&self, mut f: impl FnMut(&Concept)) {
        for c in &self.buffer {
            f(c);
        }
    }

    /// Visit the stored concepts and the objects of their edges.
    pub fn each_s(&self, mut f: impl FnMut(&Concept)) {
        for c in &self.buffer {
            f(c);
            for o in self.graph.objects(c) {
                f(o);
            }
        }
    }

    pub fn count_if(&self, mut pred: impl FnMut(&Concept) -> bool) -> usize {
        let mut n = 0;
        self.each(|c| {
            if pred(c) {
                n += 1;
            }
        });
        n
    }

    pub fn count_if_s(&self, mut pred: impl FnMut(&Concept) -> bool) -> usize {
        let mut n = 0;
        self.each_s(|c| {
            if pred(c) {
                n += 1;
            }
        });
        n
    }

    /// Distinct URLs of the stored concepts.
    pub fn elements(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        self.each(|c| {
            set.insert(c.url().to_string());
        });
        set
    }

    /// Distinct URLs of the stored concepts and their edge objects.
    pub fn elements_s(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        self.each_s(|c| {
            set.insert(c.url().to_string());
        });
        set
    }

    /// Distinct ids of the stored concepts.
    pub fn element_ids(&self) -> BTreeSet<ConceptId> {
        let mut set = BTreeSet::new();
        self.each(|c| set.extend(c.id()));
        set
    }

    /// Distinct ids of the stored concepts and their edge objects.
    pub fn element_ids_s(&self) -> BTreeSet<ConceptId> {
        let mut set = BTreeSet::new();
        self.each_s(|c| set.extend(c.id()));
        set
    }

    /// Number of stored concepts; saturates at the capacity.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }
}
