//! Append-only directory storage: one file per concept URL.
//!
//! A file is a sequence of blocks, each a big-endian `u64` length followed
//! by a bincode-encoded `Vec<DsEntry>`. The register and the set of stored
//! URLs live in `semix.register` next to the entry files. No file stays
//! open between calls.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

use super::record::DsEntry;
use super::register::Register;
use super::{Entry, IndexResult};

/// Name of the register file.
pub const REGISTER_FILE: &str = "semix.register";

/// Suffix of entry files.
pub const ENTRY_SUFFIX: &str = ".dse";

const FILE_NAME: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'-').remove(b'_').remove(b'~');

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegisterFile {
    register: Register,
    stored: BTreeSet<String>,
}

/// Path-safe file name of the entries of `url`.
pub fn file_name(url: &str) -> String {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let dotted = stripped.replace('/', ".");
    format!("{}{ENTRY_SUFFIX}", utf8_percent_encode(&dotted, FILE_NAME))
}

fn io_error(source: io::Error) -> IndexError {
    IndexError::Io { source }
}

/// Entry files plus the register.
#[derive(Debug)]
pub struct Storage {
    dir: PathBuf,
    register: Register,
    stored: BTreeSet<String>,
}

impl Storage {
    /// Open the storage in `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> IndexResult<Self> {
        fs::create_dir_all(dir).map_err(io_error)?;
        let path = dir.join(REGISTER_FILE);
        let file = match File::open(&path) {
            Ok(file) => bincode::deserialize_from(BufReader::new(file)).map_err(|e| IndexError::Decode {
                path: path.display().to_string(),
                message: e.to_string(),
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => RegisterFile::default(),
            Err(e) => return Err(io_error(e)),
        };
        tracing::debug!(
            dir = %dir.display(),
            urls = file.register.len(),
            stored = file.stored.len(),
            "opened index storage"
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            register: file.register,
            stored: file.stored,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Concept URLs that have entries on disk.
    pub fn stored(&self) -> &BTreeSet<String> {
        &self.stored
    }

    pub fn path(&self, url: &str) -> PathBuf {
        self.dir.join(file_name(url))
    }

    /// Append `entries` as one block to the file of `url`. The register
    /// is rewritten whenever the block introduces new ids or a new URL.
    pub fn put(&mut self, url: &str, entries: &[Entry]) -> IndexResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let known = self.register.len();
        let records = entries
            .iter()
            .map(|e| DsEntry::encode(e, &mut self.register))
            .collect::<IndexResult<Vec<_>>>()?;
        let block = bincode::serialize(&records).map_err(|e| IndexError::Encode {
            message: e.to_string(),
        })?;
        let path = self.path(url);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_error)?;
        let mut w = BufWriter::new(file);
        w.write_all(&(block.len() as u64).to_be_bytes()).map_err(io_error)?;
        w.write_all(&block).map_err(io_error)?;
        w.flush().map_err(io_error)?;
        let new_url = self.stored.insert(url.to_string());
        tracing::debug!(url, entries = entries.len(), path = %path.display(), "wrote index block");
        if new_url || self.register.len() != known {
            self.write_register()?;
        }
        Ok(())
    }

    /// Visit the blocks stored for `url` until `f` returns `false`.
    pub fn blocks(&self, url: &str, mut f: impl FnMut(Vec<Entry>) -> bool) -> IndexResult<()> {
        let path = self.path(url);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(io_error(e)),
        };
        let size = file.metadata().map_err(io_error)?.len();
        let mut r = BufReader::new(file);
        let mut pos = 0u64;
        let decode_error = |message: String| IndexError::Decode {
            path: path.display().to_string(),
            message,
        };
        loop {
            let mut header = [0u8; 8];
            match r.read_exact(&mut header) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(io_error(e)),
            }
            pos += header.len() as u64;
            let len = u64::from_be_bytes(header);
            if len > size.saturating_sub(pos) {
                return Err(decode_error(format!(
                    "block length {len} exceeds the {} remaining bytes",
                    size.saturating_sub(pos)
                )));
            }
            pos += len;
            let len = usize::try_from(len).map_err(|_| decode_error(format!("block length {len}")))?;
            let mut block = vec![0u8; len];
            r.read_exact(&mut block)
                .map_err(|e| decode_error(format!("truncated block: {e}")))?;
            let records: Vec<DsEntry> =
                bincode::deserialize(&block).map_err(|e| decode_error(e.to_string()))?;
            let entries = records
                .into_iter()
                .map(|d| d.decode(url, &self.register))
                .collect::<IndexResult<Vec<_>>>()?;
            if !f(entries) {
                return Ok(());
            }
        }
    }

    /// Visit the entries stored for `url` until `f` returns `false`.
    pub fn get(&self, url: &str, mut f: impl FnMut(&Entry) -> bool) -> IndexResult<()> {
        self.blocks(url, |entries| entries.iter().all(&mut f))
    }

    /// Persist the register and the stored URL set.
    pub fn write_register(&self) -> IndexResult<()> {
        let path = self.dir.join(REGISTER_FILE);
        let file = RegisterFile {
            register: self.register.clone(),
            stored: self.stored.clone(),
        };
        let bytes = bincode::serialize(&file).map_err(|e| IndexError::Encode {
            message: e.to_string(),
        })?;
        fs::write(&path, bytes).map_err(io_error)?;
        tracing::debug!(path = %path.display(), urls = self.register.len(), "wrote register");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(url: &str, rel: &str, begin: usize) -> Entry {
        Entry {
            concept_url: url.into(),
            relation_url: rel.into(),
            origin_url: "http://origin".into(),
            token: "tok".into(),
            path: "doc".into(),
            begin,
            end: begin + 3,
            distance: 0,
            ambiguous: false,
        }
    }

    #[test]
    fn file_names_are_path_safe() {
        assert_eq!(file_name("http://example.org/a/b"), "example.org.a.b.dse");
        assert_eq!(file_name("https://x.org/a b"), "x.org.a%20b.dse");
        assert_eq!(file_name("urn:x#y"), "urn%3Ax%23y.dse");
        assert!(!file_name("http://a/../../etc").contains('/'));
    }

    #[test]
    fn blocks_append_and_read_back() {
        let dir = TempDir::new().unwrap();
        let mut s = Storage::open(dir.path()).unwrap();
        s.put("http://c", &[entry("http://c", "", 1), entry("http://c", "http://p", 5)]).unwrap();
        s.put("http://c", &[entry("http://c", "", 9)]).unwrap();
        let mut got = Vec::new();
        s.get("http://c", |e| {
            got.push(e.clone());
            true
        })
        .unwrap();
        assert_eq!(got.len(), 3);
        assert_eq!(got[1], entry("http://c", "http://p", 5));
        assert_eq!(got[2].begin, 9);
        assert!(s.stored().contains("http://c"));
    }

    #[test]
    fn get_stops_early() {
        let dir = TempDir::new().unwrap();
        let mut s = Storage::open(dir.path()).unwrap();
        s.put("u", &[entry("u", "", 1), entry("u", "", 2)]).unwrap();
        s.put("u", &[entry("u", "", 3)]).unwrap();
        let mut n = 0;
        s.get("u", |_| {
            n += 1;
            false
        })
        .unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn missing_files_are_empty() {
        let dir = TempDir::new().unwrap();
        let s = Storage::open(dir.path()).unwrap();
        let mut n = 0;
        s.get("http://nothing", |_| {
            n += 1;
            true
        })
        .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn register_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let mut s = Storage::open(dir.path()).unwrap();
            s.put("u", &[entry("u", "http://p", 1)]).unwrap();
            s.write_register().unwrap();
        }
        let s = Storage::open(dir.path()).unwrap();
        let mut got = Vec::new();
        s.get("u", |e| {
            got.push(e.relation_url.clone());
            true
        })
        .unwrap();
        assert_eq!(got, vec!["http://p"]);
        assert!(s.stored().contains("u"));
    }

    #[test]
    fn corrupt_blocks_are_decode_errors() {
        let dir = TempDir::new().unwrap();
        let s = Storage::open(dir.path()).unwrap();
        fs::write(s.path("u"), [0, 0, 0, 0, 0, 0, 0, 9, 1]).unwrap();
        let err = s.get("u", |_| true).unwrap_err();
        assert!(matches!(err, IndexError::Decode { .. }));
    }

    #[test]
    fn put_persists_new_ids_without_flush() {
        let dir = TempDir::new().unwrap();
        let mut s = Storage::open(dir.path()).unwrap();
        s.put("u", &[entry("u", "http://p", 1)]).unwrap();
        drop(s);

        let s = Storage::open(dir.path()).unwrap();
        assert!(s.stored().contains("u"));
        let mut got = Vec::new();
        s.get("u", |e| {
            got.push((e.relation_url.clone(), e.origin_url.clone()));
            true
        })
        .unwrap();
        assert_eq!(got, vec![("http://p".to_string(), "http://origin".to_string())]);
    }

    #[test]
    fn oversized_block_lengths_are_decode_errors() {
        let dir = TempDir::new().unwrap();
        let s = Storage::open(dir.path()).unwrap();
        let mut bytes = u64::MAX.to_be_bytes().to_vec();
        bytes.extend_from_slice(&[1, 2, 3]);
        fs::write(s.path("u"), bytes).unwrap();
        let err = s.get("u", |_| true).unwrap_err();
        assert!(matches!(err, IndexError::Decode { .. }), "{err:?}");
    }
}
