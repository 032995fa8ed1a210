// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # semix
//!
//! A semantic indexer. A knowledge base of RDF triples is compiled into a
//! concept graph, a dictionary of surface forms and a matching automaton;
//! documents are then streamed through a pipeline that finds concepts in
//! the text, disambiguates homographs and writes every hit to an inverted
//! index that can be queried with a small query language.
//!
//! ## Architecture
//!
//! - **Knowledge bases** (`kb`, `traits`, `resource`): Turtle and RDF/XML
//!   triples, predicate traits, closures and ambiguity handling
//! - **Matching** (`text`, `dfa`, `matcher`): normalisation, a sparse-table
//!   automaton with exact and fuzzy search
//! - **Disambiguation** (`memory`, `rule`, `resolve`): a ring buffer of recent
//!   concepts, rule byte code and three resolvers
//! - **Pipeline** (`document`, `stream`): thread-per-stage streaming over
//!   bounded channels with cancellation
//! - **Index** (`index`, `query`, `search`): an append-only per-concept
//!   store behind an actor, and its query language
//!
//! ## Library usage
//!
//! ```no_run
//! use semix::config::Config;
//! use semix::document::Document;
//! use semix::index::Index;
//! use semix::query::Query;
//! use semix::stream::Pipeline;
//!
//! # fn main() -> semix::error::SemixResult<()> {
//! let resource = Config::read("semix.toml")?.parse(true)?;
//! let index = Index::open("index", semix::index::DEFAULT_BUFFER_SIZE)?;
//! Pipeline::new(&resource)
//!     .with_fuzzy(2)
//!     .index(vec![Document::file("doc.txt")], &index)?;
//! for entry in Query::parse("?(*({http://example.org/A}))")?.execute(&index)? {
//!     println!("{} {}", entry.path, entry.token);
//! }
//! index.close()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dfa;
pub mod document;
pub mod error;
pub mod graph;
pub mod index;
pub mod kb;
pub mod matcher;
pub mod memory;
pub mod query;
pub mod resolve;
pub mod resource;
pub mod rule;
pub mod search;
pub mod stream;
pub mod text;
pub mod traits;
