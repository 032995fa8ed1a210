//! The pipeline stages.
//!
//! Each function takes the upstream [`Stream`] and returns its own output
//! stream; the stage thread runs until its input closes, the pipeline is
//! cancelled or the downstream receiver is dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use crate::document::Document;
use crate::graph::Graph;
use crate::index::Index;
use crate::matcher::Matcher;
use crate::memory::Memory;
use crate::resolve::Resolver;
use crate::text;

use super::{Cancel, Stream, StreamToken, Token, CHANNEL_CAPACITY, next, send, spawn_stage, stage_error};

/// Read every document into one token holding its whole text.
///
/// Documents are read concurrently, one thread each; the stage closes its
/// output after the last document has been emitted.
pub fn read(documents: Vec<Document>, cancel: &Cancel) -> Stream {
    let capacity = documents.len();
    spawn_stage("read", capacity, cancel, move |out, cancel| {
        thread::scope(|scope| {
            for doc in &documents {
                let (out, cancel) = (&out, &cancel);
                let spawned = thread::Builder::new()
                    .name("semix-read-doc".into())
                    .spawn_scoped(scope, move || {
                        send(out, cancel, read_token(doc));
                    });
                if let Err(e) = spawned {
                    send(out, cancel, Err(stage_error("read", e.to_string())));
                }
            }
        });
        tracing::debug!(documents = documents.len(), "read stage done");
    })
}

fn read_token(doc: &Document) -> StreamToken {
    let text = doc.read()?;
    tracing::debug!(path = doc.path(), bytes = text.len(), "read document");
    let end = text.len() + 2;
    Ok(Token {
        token: text,
        path: doc.path().to_string(),
        begin: 0,
        end,
        concept: None,
    })
}

/// Normalise each token's text and surround it with single spaces.
pub fn normalize(input: Stream, cancel: &Cancel) -> Stream {
    spawn_stage("normalize", CHANNEL_CAPACITY, cancel, move |out, cancel| {
        while let Some(t) = next(&input, &cancel) {
            let t = t.map(|mut t| {
                t.token = text::normalize(&t.token, true);
                t.end = t.begin + t.token.len();
                t
            });
            if !send(&out, &cancel, t) {
                return;
            }
        }
    })
}

/// Split unmatched tokens around the matches `matcher` finds in them.
///
/// A token ` x <match> y ` becomes ` x `, `<match>` and ` y `, in order.
/// Tokens that already denote a concept pass unchanged, so a later match
/// stage only sees what earlier ones left.
pub fn match_concepts(matcher: Matcher, input: Stream, cancel: &Cancel) -> Stream {
    spawn_stage("match", CHANNEL_CAPACITY, cancel, move |out, cancel| {
        while let Some(t) = next(&input, &cancel) {
            let keep_going = match t {
                Ok(t) if !t.has_concept() => split(&matcher, t)
                    .into_iter()
                    .all(|t| send(&out, &cancel, Ok(t))),
                t => send(&out, &cancel, t),
            };
            if !keep_going {
                return;
            }
        }
    })
}

fn split(matcher: &Matcher, t: Token) -> Vec<Token> {
    let piece = |text: &str, begin: usize, concept| Token {
        token: text.to_string(),
        path: t.path.clone(),
        begin,
        end: begin + text.len(),
        concept,
    };
    let mut tokens = Vec::new();
    let mut rest = t.token.as_str();
    let mut ofs = t.begin;
    while !rest.is_empty() {
        let found = matcher.find(rest.as_bytes()).and_then(|m| {
            let prefix = rest.get(..m.begin)?;
            let matched = rest.get(m.begin..m.end)?;
            (m.end > 0).then_some((prefix, matched, m))
        });
        let Some((prefix, matched, m)) = found else {
            tokens.push(piece(rest, ofs, None));
            break;
        };
        if !prefix.is_empty() {
            tokens.push(piece(prefix, ofs, None));
        }
        tokens.push(piece(matched, ofs + m.begin, Some(m.concept)));
        rest = &rest[m.end..];
        ofs += m.end;
    }
    tokens
}

/// Drop tokens that do not denote a concept. Errors pass.
pub fn filter(input: Stream, cancel: &Cancel) -> Stream {
    spawn_stage("filter", CHANNEL_CAPACITY, cancel, move |out, cancel| {
        while let Some(t) = next(&input, &cancel) {
            if matches!(&t, Ok(t) if !t.has_concept()) {
                continue;
            }
            if !send(&out, &cancel, t) {
                return;
            }
        }
    })
}

/// Resolve ambiguous concepts against a per-document memory of the
/// `memory_size` most recent unambiguous ones.
///
/// Unresolvable tokens keep their ambiguous concept.
pub fn resolve(
    resolver: Resolver,
    memory_size: usize,
    graph: Arc<Graph>,
    input: Stream,
    cancel: &Cancel,
) -> Stream {
    spawn_stage("resolve", CHANNEL_CAPACITY, cancel, move |out, cancel| {
        let mut memories: HashMap<String, Memory> = HashMap::new();
        while let Some(t) = next(&input, &cancel) {
            let t = t.map(|mut t| {
                let Some(concept) = t.concept.take() else {
                    return t;
                };
                let memory = memories
                    .entry(t.path.clone())
                    .or_insert_with(|| Memory::new(memory_size, Arc::clone(&graph)));
                let concept = if concept.is_ambiguous() {
                    match resolver.resolve(&concept, memory) {
                        Some(resolved) => {
                            tracing::debug!(
                                resolver = resolver.name(),
                                from = concept.url(),
                                to = resolved.url(),
                                "resolved ambiguous concept"
                            );
                            memory.push(Arc::clone(&resolved));
                            resolved
                        }
                        None => concept,
                    }
                } else {
                    memory.push(Arc::clone(&concept));
                    concept
                };
                t.concept = Some(concept);
                t
            });
            if !send(&out, &cancel, t) {
                return;
            }
        }
    })
}

/// Store every token in `index` and forward it.
///
/// The first error, from upstream or from the index, is forwarded and
/// ends the stage.
pub fn put(index: Index, graph: Arc<Graph>, input: Stream, cancel: &Cancel) -> Stream {
    spawn_stage("put", CHANNEL_CAPACITY, cancel, move |out, cancel| {
        while let Some(t) = next(&input, &cancel) {
            let t = t.and_then(|t| {
                index.put(&t, &graph)?;
                Ok(t)
            });
            let failed = t.is_err();
            if !send(&out, &cancel, t) || failed {
                return;
            }
        }
    })
}
