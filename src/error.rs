//! Rich diagnostic error types for the semix indexer.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for semix.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum SemixError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Kb(#[from] KbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Expand(#[from] ExpandError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Knowledge-base (triple parser) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum KbError {
    #[error("syntax error in line {line}: {message}")]
    #[diagnostic(
        code(semix::kb::syntax),
        help("The knowledge base could not be parsed. Check the reported line for a missing dot, quote or bracket.")
    )]
    Syntax { line: usize, message: String },

    #[error("undefined prefix \"{prefix}\" in line {line}")]
    #[diagnostic(
        code(semix::kb::prefix),
        help("Declare the prefix with `@prefix {prefix}: <...> .` before using it.")
    )]
    UndefinedPrefix { prefix: String, line: usize },

    #[error("invalid RDF/XML: {message}")]
    #[diagnostic(
        code(semix::kb::rdfxml),
        help("The RDF/XML document is malformed. Validate it with an RDF/XML validator.")
    )]
    RdfXml { message: String },

    #[error("I/O error while reading the knowledge base: {source}")]
    #[diagnostic(
        code(semix::kb::io),
        help("Check that the knowledge base file exists and is readable.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Brace expansion errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ExpandError {
    #[error("unbalanced braces in \"{input}\"")]
    #[diagnostic(
        code(semix::expand::unbalanced),
        help("Every `{{` in a label must be closed by a `}}`. Escape literal braces with a backslash.")
    )]
    Unbalanced { input: String },
}

// ---------------------------------------------------------------------------
// Resource errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ResourceError {
    #[error("invalid triple: empty {part} in ({subject}, {predicate}, {object})")]
    #[diagnostic(
        code(semix::resource::empty_triple),
        help("Subjects, predicates and objects of relation triples must be non-empty URLs.")
    )]
    EmptyTriple {
        part: &'static str,
        subject: String,
        predicate: String,
        object: String,
    },

    #[error("concept not found: {key}")]
    #[diagnostic(
        code(semix::resource::not_found),
        help("The concept is not part of the knowledge base. Search for it with `semix search`.")
    )]
    NotFound { key: String },

    #[error("invalid rule for {url}: {message}")]
    #[diagnostic(
        code(semix::resource::rule),
        help("Fix the rule expression attached to this concept in the knowledge base.")
    )]
    InvalidRule { url: String, message: String },

    #[error("cannot encode resource: {message}")]
    #[diagnostic(code(semix::resource::encode), help("This is likely a bug. Please report it."))]
    Encode { message: String },

    #[error("cannot decode resource cache: {message}")]
    #[diagnostic(
        code(semix::resource::decode),
        help("The cache file is corrupt or was written by another version. Delete it to rebuild.")
    )]
    Decode { message: String },

    #[error("resource cache I/O error: {source}")]
    #[diagnostic(
        code(semix::resource::io),
        help("Check that the cache path is writable.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Rule errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RuleError {
    #[error("syntax error at position {pos}: {message}")]
    #[diagnostic(
        code(semix::rule::syntax),
        help("Rules are arithmetic, boolean or set expressions such as `c(\"a\") > 2`.")
    )]
    Syntax { pos: usize, message: String },

    #[error("type error: {message}")]
    #[diagnostic(
        code(semix::rule::type_error),
        help("Both operands of an infix operator must have the same type.")
    )]
    Type { message: String },

    #[error("invalid call {name}(): {message}")]
    #[diagnostic(
        code(semix::rule::call),
        help("Known functions are min, max, len, e, es, c, cs, n, log, exp and pow.")
    )]
    Call { name: String, message: String },

    #[error("unknown concept \"{name}\"")]
    #[diagnostic(
        code(semix::rule::unknown_concept),
        help("Strings in rules must name concepts that are known to the lookup.")
    )]
    UnknownConcept { name: String },
}

// ---------------------------------------------------------------------------
// Index errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IndexError {
    #[error("index I/O error: {source}")]
    #[diagnostic(
        code(semix::index::io),
        help("Check that the index directory exists and has correct permissions.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode index block: {message}")]
    #[diagnostic(code(semix::index::encode), help("This is likely a bug. Please report it."))]
    Encode { message: String },

    #[error("cannot decode index block in {path}: {message}")]
    #[diagnostic(
        code(semix::index::decode),
        help("The index file is corrupt. Remove it and re-index the affected documents.")
    )]
    Decode { path: String, message: String },

    #[error("invalid index record: {message}")]
    #[diagnostic(
        code(semix::index::record),
        help("Relation ids are limited to 24 bits and distances to 63.")
    )]
    InvalidRecord { message: String },

    #[error("unknown relation id {id}")]
    #[diagnostic(
        code(semix::index::register),
        help("The URL register does not match the index files. Re-index the documents.")
    )]
    UnknownId { id: u32 },

    #[error("invalid context window [{begin}, {end}) in a document of {len} bytes")]
    #[diagnostic(
        code(semix::index::context),
        help("Begin and end must lie inside the normalised document and on character boundaries.")
    )]
    Context { begin: usize, end: usize, len: usize },

    #[error("index is closed")]
    #[diagnostic(
        code(semix::index::closed),
        help("The index rejects requests after close. Open it again.")
    )]
    Closed,
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("syntax error at position {pos}: expected {expected}, got {got}")]
    #[diagnostic(
        code(semix::query::syntax),
        help("Queries look like `?({{rel}}({{concept}}))`, `?(*({{a,b}}))` or `?(2*!{{rel}}(*))`.")
    )]
    Syntax {
        pos: usize,
        expected: String,
        got: String,
    },

    #[error("unterminated quote at position {pos}")]
    #[diagnostic(
        code(semix::query::quote),
        help("Close quoted identifiers with the same quote character.")
    )]
    UnterminatedQuote { pos: usize },

    #[error("cannot resolve \"{ident}\": {message}")]
    #[diagnostic(code(semix::query::resolve), help("Use the concept's full URL instead."))]
    Resolve { ident: String, message: String },
}

// ---------------------------------------------------------------------------
// Document errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum DocumentError {
    #[error("cannot read document {path}: {source}")]
    #[diagnostic(
        code(semix::document::io),
        help("Check that the document exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot fetch {url}: {message}")]
    #[diagnostic(
        code(semix::document::fetch),
        help("Check that the URL is reachable and the network is available.")
    )]
    Fetch { url: String, message: String },

    #[error("document not found: {path}")]
    #[diagnostic(
        code(semix::document::not_found),
        help("Dump files are addressed by the name returned when the text was posted.")
    )]
    NotFound { path: String },

    #[error("unsupported content type \"{content_type}\"")]
    #[diagnostic(
        code(semix::document::content_type),
        help("Supported content types are text/plain and text/html.")
    )]
    UnsupportedContentType { content_type: String },
}

// ---------------------------------------------------------------------------
// Stream errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StreamError {
    #[error("pipeline cancelled")]
    #[diagnostic(code(semix::stream::cancelled))]
    Cancelled,

    #[error("pipeline stage {stage} failed: {message}")]
    #[diagnostic(code(semix::stream::stage), help("This is likely a bug. Please report it."))]
    Stage { stage: &'static str, message: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("cannot read configuration {path}: {source}")]
    #[diagnostic(
        code(semix::config::io),
        help("Check that the configuration file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(semix::config::toml),
        help("The configuration must be TOML with a [File] and a [Predicates] table.")
    )]
    Toml { message: String },

    #[error("invalid knowledge base type \"{value}\"")]
    #[diagnostic(
        code(semix::config::kb_type),
        help("Supported types are `rdfxml` and `turtle`.")
    )]
    InvalidType { value: String },

    #[error("invalid ambiguity handler \"{value}\"")]
    #[diagnostic(
        code(semix::config::ambigs),
        help("Use `split`, `merge`, `discard` or a threshold between 0 and 1.")
    )]
    InvalidAmbigs { value: String },

    #[error("invalid resolver \"{value}\"")]
    #[diagnostic(
        code(semix::config::resolver),
        help("Known resolvers are `simple`, `automatic` and `ruled`.")
    )]
    InvalidResolver { value: String },
}

/// Convenience alias for functions returning semix results.
pub type SemixResult<T> = std::result::Result<T, SemixError>;
