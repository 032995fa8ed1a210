//! Bounded Levenshtein search over a [`SparseDfa`].
//!
//! Configurations `(state, position, errors)` are explored level by level:
//! exact transitions stay on the current error level, substitutions,
//! insertions and deletions move to the next one. Each `(state, position)`
//! pair is visited once, at its smallest error count, so every reachable
//! final configuration is reported exactly once with its minimal error.

use std::collections::HashMap;

use super::sparse::{SparseDfa, State};

/// A final state reached by the fuzzy search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyHit {
    /// Edits needed to reach the final state.
    pub errors: u8,
    /// Input bytes consumed.
    pub consumed: usize,
    /// Data of the final state.
    pub data: i32,
}

/// Call `f` for every final state reachable from the start state with at
/// most `k` edits of a prefix of `input`.
pub fn search<F>(dfa: &SparseDfa, input: &[u8], k: u8, mut f: F)
where
    F: FnMut(FuzzyHit),
{
    let mut visited: HashMap<(State, usize), u8> = HashMap::new();
    let mut level: Vec<(State, usize)> = vec![(dfa.initial(), 0)];
    for errors in 0..=k {
        let mut next_level = Vec::new();
        let mut stack = std::mem::take(&mut level);
        while let Some((state, pos)) = stack.pop() {
            if visited.contains_key(&(state, pos)) {
                continue;
            }
            visited.insert((state, pos), errors);
            if let Some(data) = dfa.final_data(state) {
                f(FuzzyHit {
                    errors,
                    consumed: pos,
                    data,
                });
            }
            let current = input.get(pos).copied();
            if let Some(byte) = current {
                if let Some(next) = dfa.delta(state, byte) {
                    stack.push((next, pos + 1));
                }
            }
            if errors == k {
                continue;
            }
            // insertion: skip an input byte
            if current.is_some() {
                next_level.push((state, pos + 1));
            }
            for &label in dfa.transitions(state) {
                let Some(next) = dfa.delta(state, label) else {
                    continue;
                };
                // deletion: take a transition without consuming input
                next_level.push((next, pos));
                // substitution
                if current.is_some_and(|byte| byte != label) {
                    next_level.push((next, pos + 1));
                }
            }
        }
        if next_level.is_empty() {
            break;
        }
        level = next_level;
    }
}
