//! Stack machine executing compiled rules against a concept memory.
//!
//! Every value is an `f64`. Booleans are `1` and `0`; sets are sorted runs
//! of ids followed by their length.

use std::collections::HashMap;

use crate::graph::Concept;
use crate::memory::Memory;

use super::compile::{Instruction, Opcode};

#[derive(Debug, Default)]
struct Stack(Vec<f64>);

impl Stack {
    fn push(&mut self, x: f64) {
        self.0.push(x);
    }

    fn push_bool(&mut self, b: bool) {
        self.0.push(if b { 1.0 } else { 0.0 });
    }

    fn push_set(&mut self, set: Vec<f64>) {
        let n = set.len() as f64;
        self.0.extend(set);
        self.0.push(n);
    }

    fn pop(&mut self) -> f64 {
        self.0.pop().unwrap_or(0.0)
    }

    /// Pop two values, returned in push order.
    fn pop2(&mut self) -> (f64, f64) {
        let b = self.pop();
        let a = self.pop();
        (a, b)
    }

    fn pop_bool2(&mut self) -> (bool, bool) {
        let (a, b) = self.pop2();
        (a != 0.0, b != 0.0)
    }

    fn pop_set(&mut self) -> Vec<f64> {
        let n = self.pop() as usize;
        let at = self.0.len().saturating_sub(n);
        self.0.split_off(at)
    }

    fn pop_set2(&mut self) -> (Vec<f64>, Vec<f64>) {
        let b = self.pop_set();
        let a = self.pop_set();
        (a, b)
    }
}

/// Merge two sorted runs; `keep` decides from the membership flags
/// `(in_a, in_b)` whether an element is part of the result.
fn merge(a: &[f64], b: &[f64], keep: impl Fn(bool, bool) -> bool) -> Vec<f64> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        let (x, in_a, in_b) = match (a.get(i), b.get(j)) {
            (Some(&x), Some(&y)) if x < y => (x, true, false),
            (Some(&x), Some(&y)) if y < x => (y, false, true),
            (Some(&x), Some(_)) => (x, true, true),
            (Some(&x), None) => (x, true, false),
            (None, Some(&y)) => (y, false, true),
            (None, None) => break,
        };
        if in_a {
            i += 1;
        }
        if in_b {
            j += 1;
        }
        if keep(in_a, in_b) {
            out.push(x);
        }
    }
    out
}

fn counts(memory: &Memory, ids: &[f64], star: bool) -> Vec<f64> {
    let mut table: HashMap<u32, usize> = HashMap::new();
    let mut tally = |c: &Concept| *table.entry(c.raw_id()).or_default() += 1;
    if star {
        memory.each_s(&mut tally);
    } else {
        memory.each(&mut tally);
    }
    let mut out: Vec<f64> = ids
        .iter()
        .map(|id| table.get(&(*id as u32)).copied().unwrap_or(0) as f64)
        .collect();
    out.sort_by(f64::total_cmp);
    out
}

fn count(memory: &Memory, id: f64, star: bool) -> f64 {
    let id = id as u32;
    let n = if star {
        memory.count_if_s(|c| c.raw_id() == id)
    } else {
        memory.count_if(|c| c.raw_id() == id)
    };
    n as f64
}

/// Run `code` and return the value on top of the stack.
pub fn execute(code: &[Instruction], memory: &Memory) -> f64 {
    let mut stack = Stack::default();
    for ins in code {
        match ins.op {
            Opcode::PushNum | Opcode::PushId => stack.push(ins.arg),
            Opcode::PushTrue => stack.push_bool(true),
            Opcode::PushFalse => stack.push_bool(false),
            Opcode::Eq => {
                let (a, b) = stack.pop2();
                stack.push_bool(a == b);
            }
            Opcode::Lt => {
                let (a, b) = stack.pop2();
                stack.push_bool(a < b);
            }
            Opcode::Gt => {
                let (a, b) = stack.pop2();
                stack.push_bool(a > b);
            }
            Opcode::Not => {
                let a = stack.pop();
                stack.push_bool(a == 0.0);
            }
            Opcode::Neg => {
                let a = stack.pop();
                stack.push(-a);
            }
            Opcode::Add => {
                let (a, b) = stack.pop2();
                stack.push(a + b);
            }
            Opcode::Sub => {
                let (a, b) = stack.pop2();
                stack.push(a - b);
            }
            Opcode::Mul => {
                let (a, b) = stack.pop2();
                stack.push(a * b);
            }
            Opcode::Div => {
                let (a, b) = stack.pop2();
                stack.push(a / b);
            }
            Opcode::Or => {
                let (a, b) = stack.pop_bool2();
                stack.push_bool(a || b);
            }
            Opcode::And => {
                let (a, b) = stack.pop_bool2();
                stack.push_bool(a && b);
            }
            Opcode::SetEq => {
                let (a, b) = stack.pop_set2();
                stack.push_bool(a == b);
            }
            Opcode::SetUnion => {
                let (a, b) = stack.pop_set2();
                stack.push_set(merge(&a, &b, |x, y| x || y));
            }
            Opcode::SetIntersect => {
                let (a, b) = stack.pop_set2();
                stack.push_set(merge(&a, &b, |x, y| x && y));
            }
            Opcode::SetSub => {
                let (a, b) = stack.pop_set2();
                stack.push_set(merge(&a, &b, |x, y| x && !y));
            }
            Opcode::Len => {
                let a = stack.pop_set();
                stack.push(a.len() as f64);
            }
            Opcode::Log => {
                let a = stack.pop();
                stack.push(a.ln());
            }
            Opcode::Exp => {
                let a = stack.pop();
                stack.push(a.exp());
            }
            Opcode::Pow => {
                let (a, b) = stack.pop2();
                stack.push(a.powf(b));
            }
            Opcode::Min => {
                let a = stack.pop_set();
                stack.push(a.into_iter().reduce(f64::min).unwrap_or(-f64::MAX));
            }
            Opcode::Max => {
                let a = stack.pop_set();
                stack.push(a.into_iter().reduce(f64::max).unwrap_or(f64::MAX));
            }
            Opcode::Counts | Opcode::CountsS => {
                let ids = stack.pop_set();
                stack.push_set(counts(memory, &ids, ins.op == Opcode::CountsS));
            }
            Opcode::Count | Opcode::CountS => {
                let id = stack.pop();
                stack.push(count(memory, id, ins.op == Opcode::CountS));
            }
            Opcode::Elements => {
                let ids = memory.element_ids().into_iter().map(|id| f64::from(id.get())).collect();
                stack.push_set(ids);
            }
            Opcode::ElementsS => {
                let ids = memory.element_ids_s().into_iter().map(|id| f64::from(id.get())).collect();
                stack.push_set(ids);
            }
            Opcode::MemCapacity => stack.push(memory.capacity() as f64),
            Opcode::MemLen => stack.push(memory.len() as f64),
        }
    }
    stack.pop()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_merges() {
        let a = [1.0, 2.0, 4.0];
        let b = [2.0, 3.0];
        assert_eq!(merge(&a, &b, |x, y| x || y), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(merge(&a, &b, |x, y| x && y), vec![2.0]);
        assert_eq!(merge(&a, &b, |x, y| x && !y), vec![1.0, 4.0]);
        assert_eq!(merge(&[], &b, |x, y| x || y), vec![2.0, 3.0]);
    }

    #[test]
    fn stack_sets_carry_their_length() {
        let mut s = Stack::default();
        s.push(7.0);
        s.push_set(vec![1.0, 2.0]);
        assert_eq!(s.pop_set(), vec![1.0, 2.0]);
        assert_eq!(s.pop(), 7.0);
        assert_eq!(s.pop(), 0.0);
    }
}
