//! Compact on-disk index records.
//!
//! The concept URL of a record is implied by the file it lives in; the
//! relation and origin URLs are register ids. The relation id word packs
//! the flags:
//!
//! ```text
//! bit 31     ambiguous
//! bit 30     direct
//! bits 24-29 edit distance (0..=63)
//! bits 0-23  relation id
//! ```

use serde::{Deserialize, Serialize};

use crate::error::IndexError;

use super::register::Register;
use super::{Entry, IndexResult};

const ID_MASK: u32 = 0x00ff_ffff;
const DISTANCE_MASK: u32 = 0x3f;
const DISTANCE_SHIFT: u32 = 24;
const AMBIGUOUS: u32 = 0x8000_0000;
const DIRECT: u32 = 0x4000_0000;

/// Relation id with packed distance and flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationId(u32);

impl RelationId {
    pub fn new(id: u32, distance: u8, ambiguous: bool, direct: bool) -> IndexResult<Self> {
        if id > ID_MASK {
            return Err(IndexError::InvalidRecord {
                message: format!("relation id {id} exceeds 24 bits"),
            });
        }
        if u32::from(distance) > DISTANCE_MASK {
            return Err(IndexError::InvalidRecord {
                message: format!("distance {distance} exceeds 63"),
            });
        }
        let mut x = id | (u32::from(distance) << DISTANCE_SHIFT);
        if ambiguous {
            x |= AMBIGUOUS;
        }
        if direct {
            x |= DIRECT;
        }
        Ok(Self(x))
    }

    pub fn id(self) -> u32 {
        self.0 & ID_MASK
    }

    pub fn distance(self) -> u8 {
        ((self.0 >> DISTANCE_SHIFT) & DISTANCE_MASK) as u8
    }

    pub fn ambiguous(self) -> bool {
        self.0 & AMBIGUOUS != 0
    }

    pub fn direct(self) -> bool {
        self.0 & DIRECT != 0
    }
}

/// One stored entry. Short field names keep the encoding small.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsEntry {
    /// token
    pub s: String,
    /// document path
    pub p: String,
    pub b: u32,
    pub e: u32,
    pub r: RelationId,
    /// origin URL id
    pub o: u32,
}

fn offset(x: usize) -> IndexResult<u32> {
    u32::try_from(x).map_err(|_| IndexError::InvalidRecord {
        message: format!("offset {x} exceeds 32 bits"),
    })
}

impl DsEntry {
    /// Encode `entry`, registering its relation and origin URLs.
    pub fn encode(entry: &Entry, register: &mut Register) -> IndexResult<Self> {
        let rel = register.register(&entry.relation_url);
        let r = RelationId::new(rel, entry.distance, entry.ambiguous, entry.is_direct())?;
        Ok(Self {
            s: entry.token.clone(),
            p: entry.path.clone(),
            b: offset(entry.begin)?,
            e: offset(entry.end)?,
            r,
            o: register.register(&entry.origin_url),
        })
    }

    /// Decode the record stored under `url`.
    pub fn decode(self, url: &str, register: &Register) -> IndexResult<Entry> {
        let lookup = |id| {
            register
                .lookup_id(id)
                .map(str::to_string)
                .ok_or(IndexError::UnknownId { id })
        };
        let relation_url = if self.r.direct() {
            String::new()
        } else {
            lookup(self.r.id())?
        };
        Ok(Entry {
            concept_url: url.to_string(),
            relation_url,
            origin_url: lookup(self.o)?,
            token: self.s,
            path: self.p,
            begin: self.b as usize,
            end: self.e as usize,
            distance: self.r.distance(),
            ambiguous: self.r.ambiguous(),
        })
    }
}
