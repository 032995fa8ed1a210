//! Byte-level DFA packed into a sparse transition table.
//!
//! The automaton is first built as a trie over the sorted keys, then every
//! state's transitions are placed into one shared `cells` array at
//! `base[state] + byte`. A cell records its owning state, so a lookup that
//! lands in a cell owned by another state is a missing transition.

use std::collections::BTreeMap;

/// A state of a [`SparseDfa`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct State(u32);

impl State {
    pub fn get(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Cell {
    /// Owning state plus one; zero marks a free cell.
    check: u32,
    next: u32,
}

/// Immutable sparse-table automaton mapping byte strings to signed data.
#[derive(Debug, Clone, Default)]
pub struct SparseDfa {
    base: Vec<u32>,
    cells: Vec<Cell>,
    finals: Vec<Option<i32>>,
    /// Outgoing bytes of every state, `labels[spans[s].0..spans[s].1]`.
    labels: Vec<u8>,
    spans: Vec<(u32, u32)>,
}

impl SparseDfa {
    /// Build an automaton from `(key, data)` pairs. Later duplicates of a
    /// key overwrite earlier data.
    pub fn build<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a [u8], i32)>,
    {
        let mut sorted: Vec<(&[u8], i32)> = entries.into_iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let mut trie: Vec<BTreeMap<u8, u32>> = vec![BTreeMap::new()];
        let mut finals: Vec<Option<i32>> = vec![None];
        for (key, data) in sorted {
            let mut state = 0usize;
            for &byte in key {
                let next = match trie[state].get(&byte) {
                    Some(next) => *next as usize,
                    None => {
                        let next = trie.len();
                        trie.push(BTreeMap::new());
                        finals.push(None);
                        trie[state].insert(byte, next as u32);
                        next
                    }
                };
                state = next;
            }
            finals[state] = Some(data);
        }
        Self::pack(&trie, finals)
    }

    fn pack(trie: &[BTreeMap<u8, u32>], finals: Vec<Option<i32>>) -> Self {
        let mut base = vec![0u32; trie.len()];
        let mut cells: Vec<Cell> = Vec::new();
        let mut labels = Vec::new();
        let mut spans = Vec::with_capacity(trie.len());
        let mut first_free = 0usize;

        for (state, transitions) in trie.iter().enumerate() {
            let start = labels.len() as u32;
            labels.extend(transitions.keys().copied());
            spans.push((start, labels.len() as u32));
            let Some(&min) = transitions.keys().next() else {
                continue;
            };
            while first_free < cells.len() && cells[first_free].check != 0 {
                first_free += 1;
            }
            let mut b = first_free.saturating_sub(min as usize);
            loop {
                if cells.len() < b + 256 {
                    cells.resize(b + 256, Cell::default());
                }
                if transitions.keys().all(|&byte| cells[b + byte as usize].check == 0) {
                    break;
                }
                b += 1;
            }
            base[state] = b as u32;
            for (&byte, &next) in transitions {
                cells[b + byte as usize] = Cell {
                    check: state as u32 + 1,
                    next,
                };
            }
        }
        while cells.last().is_some_and(|c| c.check == 0) {
            cells.pop();
        }
        Self {
            base,
            cells,
            finals,
            labels,
            spans,
        }
    }

    /// The start state.
    pub fn initial(&self) -> State {
        State(0)
    }

    /// Follow the transition on `byte`, `None` if there is none.
    pub fn delta(&self, state: State, byte: u8) -> Option<State> {
        let base = *self.base.get(state.0 as usize)? as usize;
        let cell = self.cells.get(base + byte as usize)?;
        (cell.check == state.0 + 1).then_some(State(cell.next))
    }

    /// Data attached to a final state.
    pub fn final_data(&self, state: State) -> Option<i32> {
        self.finals.get(state.0 as usize).copied().flatten()
    }

    /// Bytes with a transition out of `state`, in ascending order.
    pub fn transitions(&self, state: State) -> &[u8] {
        match self.spans.get(state.0 as usize) {
            Some(&(start, end)) => &self.labels[start as usize..end as usize],
            None => &[],
        }
    }

    /// Run the whole of `input` from the start state.
    pub fn lookup(&self, input: &[u8]) -> Option<i32> {
        let mut state = self.initial();
        for &byte in input {
            state = self.delta(state, byte)?;
        }
        self.final_data(state)
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.base.len()
    }

    /// Whether the automaton accepts nothing.
    pub fn is_empty(&self) -> bool {
        self.finals.iter().all(Option::is_none)
    }

    /// Number of slots in the packed table.
    pub fn table_size(&self) -> usize {
        self.cells.len()
    }
}
