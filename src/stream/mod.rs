//! Streaming pipeline: documents in, index entries out.
//!
//! Every stage runs on its own thread and hands [`StreamToken`]s to the
//! next stage over a bounded channel:
//!
//! ```text
//! read -> normalize -> match (exact, fuzzy...) -> filter -> resolve... -> put
//! ```
//!
//! All stages share one [`Cancel`] token. A cancelled stage stops reading,
//! drops its output sender and exits; cancellation is not an error.
//! Errors travel downstream as `Err` tokens.

pub mod pipeline;
pub mod stage;

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded, select};

use crate::document::Document;
use crate::error::{SemixError, SemixResult, StreamError};
use crate::graph::Concept;

pub use pipeline::Pipeline;
pub use stage::{filter, match_concepts, normalize, put, read, resolve};

/// Default channel capacity between two stages.
pub const CHANNEL_CAPACITY: usize = 16;

/// A slice of a document's normalised text, optionally denoting a concept.
///
/// `begin` and `end` are byte offsets into the normalised text.
#[derive(Debug, Clone)]
pub struct Token {
    pub token: String,
    pub path: String,
    pub begin: usize,
    pub end: usize,
    pub concept: Option<Arc<Concept>>,
}

impl Token {
    pub fn has_concept(&self) -> bool {
        self.concept.is_some()
    }
}

/// A token or the error that ended its document.
pub type StreamToken = SemixResult<Token>;

/// The receiving end of a stage.
pub type Stream = Receiver<StreamToken>;

/// Cooperative cancellation shared by all stages of a pipeline.
///
/// Nothing is ever sent on the channel; `cancel()` drops the only sender,
/// which makes every pending and future receive on it return at once.
#[derive(Debug, Clone)]
pub struct Cancel {
    rx: Receiver<()>,
    tx: Arc<Mutex<Option<Sender<()>>>>,
}

impl Cancel {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            rx,
            tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Cancel every stage observing this token. Idempotent.
    pub fn cancel(&self) {
        let mut tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if tx.take().is_some() {
            tracing::debug!("pipeline cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }

    /// The channel that disconnects on cancellation, for use in `select!`.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

impl Default for Cancel {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the stage `name` with an output channel of `capacity` slots.
///
/// If the thread cannot be spawned the returned stream yields a single
/// [`StreamError::Stage`] and closes.
pub(crate) fn spawn_stage<F>(name: &'static str, capacity: usize, cancel: &Cancel, body: F) -> Stream
where
    F: FnOnce(Sender<StreamToken>, Cancel) + Send + 'static,
{
    let (tx, rx) = bounded(capacity.max(1));
    let fallback = tx.clone();
    let cancel = cancel.clone();
    let spawned = thread::Builder::new()
        .name(format!("semix-{name}"))
        .spawn(move || body(tx, cancel));
    if let Err(e) = spawned {
        tracing::warn!(stage = name, error = %e, "cannot spawn pipeline stage");
        let _ = fallback.try_send(Err(stage_error(name, e.to_string())));
    }
    rx
}

pub(crate) fn stage_error(stage: &'static str, message: String) -> SemixError {
    StreamError::Stage { stage, message }.into()
}

/// Receive the next token, or `None` once the input closed or the pipeline
/// was cancelled.
pub(crate) fn next(input: &Stream, cancel: &Cancel) -> Option<StreamToken> {
    if cancel.is_cancelled() {
        return None;
    }
    select! {
        recv(input) -> t => t.ok(),
        recv(cancel.receiver()) -> _ => None,
    }
}

/// Send a token downstream. Returns `false` if the stage should stop: the
/// pipeline was cancelled or the receiver hung up.
pub(crate) fn send(out: &Sender<StreamToken>, cancel: &Cancel, t: StreamToken) -> bool {
    select! {
        send(out, t) -> res => res.is_ok(),
        recv(cancel.receiver()) -> _ => false,
    }
}

/// Drain `stream` into a vector, stopping at the first error.
pub fn collect(stream: Stream) -> SemixResult<Vec<Token>> {
    let mut tokens = Vec::new();
    for t in stream {
        tokens.push(t?);
    }
    Ok(tokens)
}

/// Call `f` on every token of `stream`, stopping at the first error.
pub fn for_each(stream: Stream, mut f: impl FnMut(Token)) -> SemixResult<()> {
    for t in stream {
        f(t?);
    }
    Ok(())
}

/// Read and normalise a single document; the whole text as one token.
pub fn normalized(document: Document) -> SemixResult<Token> {
    let cancel = Cancel::new();
    let s = normalize(read(vec![document], &cancel), &cancel);
    let t = s.recv().unwrap_or_else(|_| Err(StreamError::Cancelled.into()));
    cancel.cancel();
    t
}
