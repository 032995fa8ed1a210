//! Knowledge-base configuration.
//!
//! ```toml
//! [File]
//! Path = "kb.ttl"
//! Type = "turtle"
//! Cache = "kb.cache"
//! Ambigs = "split"
//!
//! [Predicates]
//! Distinct = ["http://www.w3.org/2004/02/skos/core#altLabel"]
//! Transitive = ["http://www.w3.org/2004/02/skos/core#broader"]
//! ```
//!
//! Relative paths are taken relative to the directory of the configuration
//! file.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SemixResult};
use crate::kb::KbFormat;
use crate::resource::Resource;
use crate::traits::{AmbiguityPolicy, Trait, Traits};

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// The `[File]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileConfig {
    pub path: PathBuf,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambigs: Option<String>,
}

/// The `[Predicates]` table: predicate URLs per trait.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Predicates {
    pub ignore: Vec<String>,
    pub transitive: Vec<String>,
    pub symmetric: Vec<String>,
    pub name: Vec<String>,
    pub distinct: Vec<String>,
    pub ambiguous: Vec<String>,
    pub inverted: Vec<String>,
    pub rule: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "File")]
    pub file: FileConfig,
    #[serde(rename = "Predicates", default)]
    pub predicates: Predicates,
    #[serde(skip)]
    base: Option<PathBuf>,
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s).map_err(|e| ConfigError::Toml {
            message: e.to_string(),
        })
    }
}

impl Config {
    /// Read a configuration file.
    pub fn read(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Config = content.parse()?;
        config.base = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn format(&self) -> ConfigResult<KbFormat> {
        self.file.kind.parse()
    }

    /// The ambiguity handler: `split` (default), `merge`, `discard` or a
    /// threshold in `[0, 1]` for automatic handling.
    pub fn policy(&self) -> ConfigResult<AmbiguityPolicy> {
        let Some(ambigs) = self.file.ambigs.as_deref() else {
            return Ok(AmbiguityPolicy::Split);
        };
        match ambigs.trim().to_ascii_lowercase().as_str() {
            "split" => Ok(AmbiguityPolicy::Split),
            "merge" => Ok(AmbiguityPolicy::Merge),
            "discard" => Ok(AmbiguityPolicy::Discard),
            other => match other.parse::<f64>() {
                Ok(t) if (0.0..=1.0).contains(&t) => Ok(AmbiguityPolicy::Automatic(t)),
                _ => Err(ConfigError::InvalidAmbigs {
                    value: ambigs.to_string(),
                }),
            },
        }
    }

    pub fn traits(&self) -> ConfigResult<Traits> {
        let p = &self.predicates;
        Ok(Traits::new()
            .with(Trait::Ignore, p.ignore.iter().cloned())
            .with(Trait::Transitive, p.transitive.iter().cloned())
            .with(Trait::Symmetric, p.symmetric.iter().cloned())
            .with(Trait::Name, p.name.iter().cloned())
            .with(Trait::Distinct, p.distinct.iter().cloned())
            .with(Trait::Ambiguous, p.ambiguous.iter().cloned())
            .with(Trait::Inverted, p.inverted.iter().cloned())
            .with(Trait::Rule, p.rule.iter().cloned())
            .with_policy(self.policy()?))
    }

    /// Path of the knowledge base.
    pub fn kb_path(&self) -> PathBuf {
        self.resolve(&self.file.path)
    }

    /// Path of the resource cache, if configured.
    pub fn cache_path(&self) -> Option<PathBuf> {
        self.file.cache.as_deref().map(|p| self.resolve(p))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Load the resource. With `use_cache` and a configured cache, a cached
    /// resource is read if present, and a freshly built one is written.
    pub fn parse(&self, use_cache: bool) -> SemixResult<Resource> {
        let cache = self.cache_path().filter(|_| use_cache);
        if let Some(cache) = cache.as_deref().filter(|p| p.exists()) {
            match Resource::read_cache(cache) {
                Ok(resource) => return Ok(resource),
                Err(e) => tracing::warn!(path = %cache.display(), error = %e, "ignoring resource cache"),
            }
        }
        let resource = self.build()?;
        if let Some(cache) = cache {
            if let Err(e) = resource.write_cache(&cache) {
                tracing::warn!(path = %cache.display(), error = %e, "cannot write resource cache");
            }
        }
        Ok(resource)
    }

    fn build(&self) -> SemixResult<Resource> {
        let format = self.format()?;
        let traits = self.traits()?;
        let path = self.kb_path();
        let file = File::open(&path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), %format, policy = %traits.policy(), "reading knowledge base");
        let mut parser = format.parser(BufReader::new(file));
        let resource = Resource::build(parser.as_mut(), &traits)?;
        tracing::info!(
            concepts = resource.graph().len(),
            entries = resource.dictionary().len(),
            rules = resource.rules().len(),
            "built resource"
        );
        Ok(resource)
    }
}
