//! URL register: interns URLs as small positive integers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Bijective map between URLs and ids `1..=len`. The empty URL is id 0 and
/// is never stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Register {
    urls: Vec<String>,
    ids: HashMap<String, u32>,
}

impl Register {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id of `url`, registering it if it is new.
    pub fn register(&mut self, url: &str) -> u32 {
        if url.is_empty() {
            return 0;
        }
        if let Some(&id) = self.ids.get(url) {
            return id;
        }
        self.urls.push(url.to_string());
        let id = self.urls.len() as u32;
        self.ids.insert(url.to_string(), id);
        id
    }

    pub fn lookup_url(&self, url: &str) -> Option<u32> {
        self.ids.get(url).copied()
    }

    /// The URL of `id`; id 0 is the empty URL.
    pub fn lookup_id(&self, id: u32) -> Option<&str> {
        match id {
            0 => Some(""),
            _ => self.urls.get(id as usize - 1).map(String::as_str),
        }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl From<Vec<String>> for Register {
    fn from(urls: Vec<String>) -> Self {
        let ids = urls
            .iter()
            .enumerate()
            .map(|(i, url)| (url.clone(), i as u32 + 1))
            .collect();
        Self { urls, ids }
    }
}

impl From<Register> for Vec<String> {
    fn from(register: Register) -> Self {
        register.urls
    }
}
