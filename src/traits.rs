//! Predicate traits: how the resource builder treats each predicate URL.
//!
//! A predicate can carry any combination of [`Trait`]s. Predicates without
//! traits are plain relations. Independent of the predicates, the
//! [`AmbiguityPolicy`] decides how homographs are combined.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trait {
    /// Triples are dropped.
    Ignore,
    /// The relation holds in both directions.
    Symmetric,
    /// The relation is closed under composition.
    Transitive,
    /// The object is the subject's name (and a label).
    Name,
    /// The object is an unambiguous label.
    Distinct,
    /// The object is an ambiguous label.
    Ambiguous,
    /// Subject and object are swapped.
    Inverted,
    /// The object is a rule expression for the subject.
    Rule,
}

impl Trait {
    fn bit(self) -> u8 {
        match self {
            Trait::Ignore => 1,
            Trait::Symmetric => 1 << 1,
            Trait::Transitive => 1 << 2,
            Trait::Name => 1 << 3,
            Trait::Distinct => 1 << 4,
            Trait::Ambiguous => 1 << 5,
            Trait::Inverted => 1 << 6,
            Trait::Rule => 1 << 7,
        }
    }
}

/// How surface forms claimed by several concepts are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum AmbiguityPolicy {
    /// Build an ambiguous split concept that enumerates the candidates.
    #[default]
    Split,
    /// Build a distinct concept carrying the candidates' common edges.
    Merge,
    /// Drop the surface form.
    Discard,
    /// Merge if the common edges keep at least the given share of the
    /// smallest candidate's edges, split otherwise.
    Automatic(f64),
}

impl fmt::Display for AmbiguityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmbiguityPolicy::Split => write!(f, "split"),
            AmbiguityPolicy::Merge => write!(f, "merge"),
            AmbiguityPolicy::Discard => write!(f, "discard"),
            AmbiguityPolicy::Automatic(t) => write!(f, "{t}"),
        }
    }
}

/// Trait table for predicate URLs.
#[derive(Debug, Clone, Default)]
pub struct Traits {
    table: HashMap<String, u8>,
    policy: AmbiguityPolicy,
}

impl Traits {
    /// An empty table with the split policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `t` to each of `urls`.
    pub fn with<I, S>(mut self, t: Trait, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for url in urls {
            *self.table.entry(url.into()).or_default() |= t.bit();
        }
        self
    }

    /// Set the ambiguity policy.
    pub fn with_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Whether `url` carries `t`.
    pub fn has(&self, url: &str, t: Trait) -> bool {
        self.table.get(url).is_some_and(|bits| bits & t.bit() != 0)
    }

    pub fn is_ignore(&self, url: &str) -> bool {
        self.has(url, Trait::Ignore)
    }

    pub fn is_symmetric(&self, url: &str) -> bool {
        self.has(url, Trait::Symmetric)
    }

    pub fn is_transitive(&self, url: &str) -> bool {
        self.has(url, Trait::Transitive)
    }

    pub fn is_name(&self, url: &str) -> bool {
        self.has(url, Trait::Name)
    }

    pub fn is_distinct(&self, url: &str) -> bool {
        self.has(url, Trait::Distinct)
    }

    pub fn is_ambiguous(&self, url: &str) -> bool {
        self.has(url, Trait::Ambiguous)
    }

    pub fn is_inverted(&self, url: &str) -> bool {
        self.has(url, Trait::Inverted)
    }

    pub fn is_rule(&self, url: &str) -> bool {
        self.has(url, Trait::Rule)
    }

    pub fn policy(&self) -> AmbiguityPolicy {
        self.policy
    }

    /// Whether the split policy is in effect.
    pub fn split_ambiguous(&self) -> bool {
        self.policy == AmbiguityPolicy::Split
    }
}
