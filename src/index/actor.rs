//! The index actor: a single thread owning the buffer and the storage.
//!
//! [`Index`] handles are cheap to clone; every call is a request on the
//! actor's channel followed by a wait for the reply.

use std::collections::{BTreeSet, HashMap};
use std::mem;
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};

use crate::error::IndexError;
use crate::graph::Graph;
use crate::stream::Token;

use super::storage::Storage;
use super::{Entry, IndexResult, entries};

/// Number of buffered entries per URL that triggers a write.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

const REQUEST_CAPACITY: usize = 16;

enum Request {
    Put {
        entries: Vec<Entry>,
        reply: Sender<IndexResult<()>>,
    },
    Get {
        url: String,
        reply: Sender<IndexResult<Vec<Entry>>>,
    },
    Urls {
        reply: Sender<IndexResult<Vec<String>>>,
    },
    Flush {
        reply: Sender<IndexResult<()>>,
    },
    Close {
        reply: Sender<IndexResult<()>>,
    },
}

/// Handle to a directory index.
#[derive(Debug, Clone)]
pub struct Index {
    tx: Sender<Request>,
    dir: PathBuf,
}

impl Index {
    /// Open the index in `dir`, flushing a URL's buffer every `buffer_size`
    /// entries.
    pub fn open(dir: impl AsRef<Path>, buffer_size: usize) -> IndexResult<Self> {
        let dir = dir.as_ref();
        let storage = Storage::open(dir)?;
        let (tx, rx) = bounded(REQUEST_CAPACITY);
        let actor = Actor {
            storage,
            buffer: HashMap::new(),
            buffer_size: buffer_size.max(1),
            closed: false,
        };
        thread::Builder::new()
            .name("semix-index".into())
            .spawn(move || actor.run(rx))
            .map_err(|source| IndexError::Io { source })?;
        tracing::info!(dir = %dir.display(), buffer_size, "opened index");
        Ok(Self {
            tx,
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store the entries of a concept token.
    pub fn put(&self, token: &Token, graph: &Graph) -> IndexResult<()> {
        let entries = entries(token, graph);
        if entries.is_empty() {
            return Ok(());
        }
        self.put_entries(entries)
    }

    pub fn put_entries(&self, entries: Vec<Entry>) -> IndexResult<()> {
        self.call(|reply| Request::Put { entries, reply })
    }

    /// Visit the entries of `url`, buffered ones first, until `f` returns
    /// `false`. The actor never waits on `f`, so `f` may call back into the
    /// index.
    pub fn get(&self, url: &str, mut f: impl FnMut(&Entry) -> bool) -> IndexResult<()> {
        let (reply, rx) = unbounded();
        self.tx
            .send(Request::Get {
                url: url.to_string(),
                reply,
            })
            .map_err(|_| IndexError::Closed)?;
        // dropping `rx` early tells the actor to stop reading
        for chunk in rx {
            if !chunk?.iter().all(&mut f) {
                break;
            }
        }
        Ok(())
    }

    /// URLs with at least one entry, sorted.
    pub fn urls(&self) -> IndexResult<Vec<String>> {
        self.call(|reply| Request::Urls { reply })
    }

    /// Write all buffers and the register.
    pub fn flush(&self) -> IndexResult<()> {
        self.call(|reply| Request::Flush { reply })
    }

    /// Flush and reject all further requests.
    pub fn close(&self) -> IndexResult<()> {
        self.call(|reply| Request::Close { reply })
    }

    fn call<T>(&self, request: impl FnOnce(Sender<IndexResult<T>>) -> Request) -> IndexResult<T> {
        let (reply, rx) = bounded(1);
        self.tx.send(request(reply)).map_err(|_| IndexError::Closed)?;
        rx.recv().map_err(|_| IndexError::Closed)?
    }
}

struct Actor {
    storage: Storage,
    buffer: HashMap<String, Vec<Entry>>,
    buffer_size: usize,
    closed: bool,
}

impl Actor {
    fn run(mut self, rx: Receiver<Request>) {
        for request in rx {
            self.handle(request);
        }
        // all handles are gone
        if !self.closed {
            if let Err(e) = self.flush() {
                tracing::warn!(error = %e, "cannot flush index on shutdown");
            }
        }
        tracing::debug!(dir = %self.storage.dir().display(), "index actor stopped");
    }

    fn handle(&mut self, request: Request) {
        if self.closed {
            match request {
                Request::Get { reply, .. } => drop(reply.send(Err(IndexError::Closed))),
                Request::Urls { reply } => drop(reply.send(Err(IndexError::Closed))),
                Request::Put { reply, .. } | Request::Flush { reply } | Request::Close { reply } => {
                    drop(reply.send(Err(IndexError::Closed)))
                }
            }
            return;
        }
        match request {
            Request::Put { entries, reply } => drop(reply.send(self.put(entries))),
            Request::Get { url, reply } => self.get(&url, &reply),
            Request::Urls { reply } => drop(reply.send(Ok(self.urls()))),
            Request::Flush { reply } => drop(reply.send(self.flush())),
            Request::Close { reply } => {
                let result = self.flush();
                self.closed = true;
                tracing::info!(dir = %self.storage.dir().display(), "closed index");
                drop(reply.send(result));
            }
        }
    }

    fn put(&mut self, entries: Vec<Entry>) -> IndexResult<()> {
        for entry in entries {
            let buffer = self.buffer.entry(entry.concept_url.clone()).or_default();
            buffer.push(entry);
            if buffer.len() >= self.buffer_size {
                let full = mem::take(buffer);
                let url = &full[0].concept_url;
                self.storage.put(url, &full)?;
            }
        }
        Ok(())
    }

    fn get(&self, url: &str, reply: &Sender<IndexResult<Vec<Entry>>>) {
        if let Some(buffered) = self.buffer.get(url).filter(|b| !b.is_empty()) {
            if reply.send(Ok(buffered.clone())).is_err() {
                return;
            }
        }
        let result = self.storage.blocks(url, |block| reply.send(Ok(block)).is_ok());
        if let Err(e) = result {
            drop(reply.send(Err(e)));
        }
    }

    fn urls(&self) -> Vec<String> {
        let buffered = self
            .buffer
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(url, _)| url);
        let urls: BTreeSet<&String> = self.storage.stored().iter().chain(buffered).collect();
        urls.into_iter().cloned().collect()
    }

    fn flush(&mut self) -> IndexResult<()> {
        let mut urls: Vec<&String> = self.buffer.keys().collect();
        urls.sort_unstable();
        for url in urls {
            let entries = &self.buffer[url];
            self.storage.put(url, entries)?;
        }
        self.buffer.clear();
        self.storage.write_register()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(url: &str, begin: usize) -> Entry {
        Entry {
            concept_url: url.into(),
            relation_url: String::new(),
            origin_url: url.into(),
            token: "t".into(),
            path: "doc".into(),
            begin,
            end: begin + 1,
            distance: 0,
            ambiguous: false,
        }
    }

    fn begins(index: &Index, url: &str) -> Vec<usize> {
        let mut out = Vec::new();
        index
            .get(url, |e| {
                out.push(e.begin);
                true
            })
            .unwrap();
        out
    }

    #[test]
    fn buffered_entries_are_visible() {
        let dir = TempDir::new().unwrap();
        let index = Index::open(dir.path(), 10).unwrap();
        index.put_entries(vec![entry("a", 1), entry("b", 2), entry("a", 3)]).unwrap();
        assert_eq!(begins(&index, "a"), vec![1, 3]);
        assert_eq!(index.urls().unwrap(), vec!["a", "b"]);
        index.close().unwrap();
    }

    #[test]
    fn full_buffers_are_written() {
        let dir = TempDir::new().unwrap();
        let index = Index::open(dir.path(), 2).unwrap();
        index.put_entries((0..5).map(|i| entry("a", i)).collect()).unwrap();
        // two blocks on disk, one entry buffered; buffered entries come first
        assert_eq!(begins(&index, "a"), vec![4, 0, 1, 2, 3]);
        index.close().unwrap();
    }

    #[test]
    fn callbacks_may_call_the_index() {
        let dir = TempDir::new().unwrap();
        let index = Index::open(dir.path(), 2).unwrap();
        index.put_entries((0..5).map(|i| entry("a", i)).collect()).unwrap();

        let (done, finished) = bounded(1);
        let handle = index.clone();
        thread::spawn(move || {
            let mut seen = Vec::new();
            let result = handle.get("a", |e| {
                seen.push((e.begin, handle.urls().map(|u| u.len())));
                true
            });
            drop(done.send((result, seen)));
        });
        let (result, seen) = finished
            .recv_timeout(std::time::Duration::from_secs(10))
            .expect("get with a calling callback did not finish");
        result.unwrap();
        assert_eq!(seen.len(), 5);
        assert!(seen.iter().all(|(_, urls)| matches!(urls, Ok(1))));
        index.close().unwrap();
    }

    #[test]
    fn close_is_terminal() {
        let dir = TempDir::new().unwrap();
        let index = Index::open(dir.path(), 10).unwrap();
        index.put_entries(vec![entry("a", 1)]).unwrap();
        index.close().unwrap();
        assert!(matches!(index.put_entries(vec![entry("a", 2)]), Err(IndexError::Closed)));
        assert!(matches!(index.get("a", |_| true), Err(IndexError::Closed)));
        assert!(matches!(index.close(), Err(IndexError::Closed)));
    }

    #[test]
    fn entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let index = Index::open(dir.path(), 10).unwrap();
            index.put_entries(vec![entry("a", 1), entry("a", 2)]).unwrap();
            index.close().unwrap();
        }
        let index = Index::open(dir.path(), 10).unwrap();
        assert_eq!(begins(&index, "a"), vec![1, 2]);
        assert_eq!(index.urls().unwrap(), vec!["a"]);
    }

    #[test]
    fn get_can_stop_early() {
        let dir = TempDir::new().unwrap();
        let index = Index::open(dir.path(), 1).unwrap();
        index.put_entries((0..4).map(|i| entry("a", i)).collect()).unwrap();
        let mut seen = 0;
        index
            .get("a", |_| {
                seen += 1;
                seen < 2
            })
            .unwrap();
        assert_eq!(seen, 2);
        // the actor is still responsive afterwards
        assert_eq!(begins(&index, "a").len(), 4);
    }
}
