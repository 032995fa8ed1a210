//! Assemble the stages for a resource.

use std::sync::Arc;

use crate::document::Document;
use crate::error::SemixResult;
use crate::index::Index;
use crate::matcher::Matcher;
use crate::resolve::Resolver;
use crate::resource::Resource;

use super::{Cancel, Stream, Token, collect, stage};

/// A configured pipeline over one resource.
///
/// ```no_run
/// # use semix::stream::Pipeline;
/// # use semix::document::Document;
/// # fn demo(resource: &semix::resource::Resource, index: semix::index::Index) -> semix::error::SemixResult<()> {
/// let tokens = Pipeline::new(resource)
///     .with_fuzzy(2)
///     .with_resolver(semix::resolve::Resolver::Frequency, 10)
///     .index(vec![Document::file("doc.txt")], &index)?;
/// # Ok(()) }
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline<'a> {
    resource: &'a Resource,
    matchers: Vec<Matcher>,
    resolvers: Vec<(Resolver, usize)>,
    cancel: Cancel,
}

impl<'a> Pipeline<'a> {
    /// Exact matching only, no resolvers.
    pub fn new(resource: &'a Resource) -> Self {
        Self {
            resource,
            matchers: vec![Matcher::Exact(resource.dfa())],
            resolvers: Vec::new(),
            cancel: Cancel::new(),
        }
    }

    /// Append a fuzzy matching stage allowing `k` errors. `k == 0` adds
    /// nothing, since the exact stage already covers it.
    pub fn with_fuzzy(mut self, k: u8) -> Self {
        if k > 0 {
            self.matchers.push(Matcher::Fuzzy {
                dfa: self.resource.dfa(),
                k,
            });
        }
        self
    }

    /// Append an arbitrary matching stage.
    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Append a resolver stage with a memory of `memory_size` concepts.
    pub fn with_resolver(mut self, resolver: Resolver, memory_size: usize) -> Self {
        self.resolvers.push((resolver, memory_size));
        self
    }

    /// Share an existing cancellation token.
    pub fn with_cancel(mut self, cancel: Cancel) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel(&self) -> &Cancel {
        &self.cancel
    }

    /// Start all stages up to and including resolution.
    pub fn stream(&self, documents: Vec<Document>) -> Stream {
        let cancel = &self.cancel;
        let mut s = stage::normalize(stage::read(documents, cancel), cancel);
        for matcher in &self.matchers {
            tracing::debug!(matcher = %matcher.name(), "adding match stage");
            s = stage::match_concepts(matcher.clone(), s, cancel);
        }
        s = stage::filter(s, cancel);
        for (resolver, memory_size) in &self.resolvers {
            s = stage::resolve(
                resolver.clone(),
                *memory_size,
                Arc::clone(self.resource.graph()),
                s,
                cancel,
            );
        }
        s
    }

    /// Start all stages and store the tokens in `index`.
    pub fn index_stream(&self, documents: Vec<Document>, index: &Index) -> Stream {
        let s = self.stream(documents);
        stage::put(index.clone(), Arc::clone(self.resource.graph()), s, &self.cancel)
    }

    /// Run the pipeline without storing anything; the concept tokens in
    /// stream order.
    pub fn run(&self, documents: Vec<Document>) -> SemixResult<Vec<Token>> {
        self.finish(collect(self.stream(documents)))
    }

    /// Run the pipeline into `index`; the stored tokens.
    pub fn index(&self, documents: Vec<Document>, index: &Index) -> SemixResult<Vec<Token>> {
        let n = documents.len();
        let tokens = self.finish(collect(self.index_stream(documents, index)))?;
        tracing::info!(documents = n, tokens = tokens.len(), "indexed documents");
        Ok(tokens)
    }

    /// Stop the remaining stages once the sink gave up.
    fn finish(&self, result: SemixResult<Vec<Token>>) -> SemixResult<Vec<Token>> {
        if result.is_err() {
            self.cancel.cancel();
        }
        result
    }
}
