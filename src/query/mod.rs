//! The query language.
//!
//! A query names a set of concepts and constrains the relation through
//! which index entries reach them:
//!
//! ```text
//! ?(*({A,B}))       every indirect entry of A and B
//! ?({R,S}({A}))     entries of A reached through R or S
//! ?(!{S}(*))        indirect entries of any concept not reached through S
//! ?({}({A}))        direct entries of A
//! ?2*({R}({A}))     the same with error options, kept for clients
//! ```
//!
//! Entries are admitted by the relation constraint alone. Fuzzy and
//! ambiguous entries carry their distance and flag, so callers filter on
//! them if they need to.

pub mod lexer;
pub mod parser;

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{QueryError, SemixResult};
use crate::index::{Entry, Index, IndexResult};

pub use parser::{Parser, Resolve};

/// Result type for query parsing.
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// The relation constraint of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraint {
    pub set: BTreeSet<String>,
    pub not: bool,
    pub all: bool,
}

impl Constraint {
    fn contains(&self, relation: &str) -> bool {
        if self.all {
            return !relation.is_empty();
        }
        if relation.is_empty() {
            return self.set.is_empty();
        }
        self.set.contains(relation)
    }

    /// Whether an entry reached through `relation` passes. A direct entry
    /// never satisfies a negated constraint.
    pub fn matches(&self, relation: &str) -> bool {
        if self.not && relation.is_empty() {
            return false;
        }
        self.not != self.contains(relation)
    }
}

/// The concepts a query looks up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConceptSet {
    /// Every concept with entries in the index.
    All,
    Urls(BTreeSet<String>),
}

/// A parsed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub constraint: Constraint,
    pub concepts: ConceptSet,
    /// Error count of the `errorK` option; parsed and rendered only.
    pub k: u8,
    /// The `*` error option; parsed and rendered only.
    pub star: bool,
}

/// Where a query reads its entries from.
pub trait EntrySource {
    /// Visit the entries of `url` until `f` returns `false`.
    fn get(&self, url: &str, f: &mut dyn FnMut(&Entry) -> bool) -> IndexResult<()>;

    /// Every URL with entries.
    fn urls(&self) -> IndexResult<Vec<String>>;
}

impl EntrySource for Index {
    fn get(&self, url: &str, f: &mut dyn FnMut(&Entry) -> bool) -> IndexResult<()> {
        Index::get(self, url, f)
    }

    fn urls(&self) -> IndexResult<Vec<String>> {
        Index::urls(self)
    }
}

impl Query {
    /// Parse `src`, keeping identifiers as they are.
    pub fn parse(src: &str) -> QueryResult<Self> {
        Self::parse_with(src, &|ident: &str| Ok(vec![ident.to_string()]))
    }

    /// Parse `src`, mapping every identifier through `resolve`.
    pub fn parse_with(src: &str, resolve: &Resolve<'_>) -> QueryResult<Self> {
        Parser::new(src, resolve)?.parse()
    }

    /// Whether `entry` passes the relation constraint.
    pub fn admits(&self, entry: &Entry) -> bool {
        self.constraint.matches(&entry.relation_url)
    }

    /// Call `f` on every admitted entry until it returns `false`.
    pub fn execute_with<S>(&self, source: &S, mut f: impl FnMut(&Entry) -> bool) -> SemixResult<()>
    where
        S: EntrySource + ?Sized,
    {
        let urls: Vec<String> = match &self.concepts {
            ConceptSet::All => source.urls()?,
            ConceptSet::Urls(urls) => urls.iter().cloned().collect(),
        };
        let mut stopped = false;
        for url in urls {
            source.get(&url, &mut |e| {
                if self.admits(e) && !f(e) {
                    stopped = true;
                }
                !stopped
            })?;
            if stopped {
                break;
            }
        }
        Ok(())
    }

    /// Every admitted entry.
    pub fn execute<S>(&self, source: &S) -> SemixResult<Vec<Entry>>
    where
        S: EntrySource + ?Sized,
    {
        let mut out = Vec::new();
        self.execute_with(source, |e| {
            out.push(e.clone());
            true
        })?;
        Ok(out)
    }
}

fn write_set(f: &mut fmt::Formatter<'_>, set: &BTreeSet<String>) -> fmt::Result {
    f.write_str("{")?;
    for (i, url) in set.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        f.write_str(url)?;
    }
    f.write_str("}")
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.not {
            f.write_str("!")?;
        }
        if self.all {
            return f.write_str("*");
        }
        write_set(f, &self.set)
    }
}

impl fmt::Display for ConceptSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConceptSet::All => f.write_str("*"),
            ConceptSet::Urls(urls) => write_set(f, urls),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("?")?;
        if self.k > 0 {
            write!(f, "{}", self.k)?;
        }
        if self.star {
            f.write_str("*")?;
        }
        write!(f, "({}({}))", self.constraint, self.concepts)
    }
}
