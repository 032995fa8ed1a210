//! Knowledge-base triple sources.
//!
//! Both formats share one contract: given a reader, call a visitor with each
//! `(subject, predicate, object)` triple. Parsing stops at the first visitor
//! error, which is returned unchanged.

pub mod rdfxml;
pub mod turtle;

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use crate::error::{ConfigError, SemixResult};

pub use rdfxml::RdfXmlParser;
pub use turtle::TurtleParser;

/// Callback receiving `(subject, predicate, object)`.
pub type Visitor<'a> = dyn FnMut(&str, &str, &str) -> SemixResult<()> + 'a;

/// A stream of triples.
pub trait TripleSource {
    /// Visit every triple in document order.
    fn parse(&mut self, visit: &mut Visitor<'_>) -> SemixResult<()>;
}

/// Supported knowledge-base formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KbFormat {
    RdfXml,
    Turtle,
}

impl KbFormat {
    /// A parser of this format reading from `reader`.
    pub fn parser<'r, R: Read + 'r>(self, reader: R) -> Box<dyn TripleSource + 'r> {
        match self {
            KbFormat::RdfXml => Box::new(RdfXmlParser::new(reader)),
            KbFormat::Turtle => Box::new(TurtleParser::new(reader)),
        }
    }
}

impl FromStr for KbFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rdfxml" => Ok(KbFormat::RdfXml),
            "turtle" => Ok(KbFormat::Turtle),
            _ => Err(ConfigError::InvalidType {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for KbFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KbFormat::RdfXml => write!(f, "rdfxml"),
            KbFormat::Turtle => write!(f, "turtle"),
        }
    }
}

/// Triples held in memory; handy for tests and programmatic knowledge bases.
#[derive(Debug, Clone, Default)]
pub struct Triples(pub Vec<(String, String, String)>);

impl Triples {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a triple.
    pub fn add(mut self, s: &str, p: &str, o: &str) -> Self {
        self.0.push((s.to_string(), p.to_string(), o.to_string()));
        self
    }
}

impl TripleSource for Triples {
    fn parse(&mut self, visit: &mut Visitor<'_>) -> SemixResult<()> {
        for (s, p, o) in &self.0 {
            visit(s, p, o)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names_are_case_insensitive() {
        assert_eq!("Turtle".parse::<KbFormat>().unwrap(), KbFormat::Turtle);
        assert_eq!("RDFXML".parse::<KbFormat>().unwrap(), KbFormat::RdfXml);
        assert!("n3".parse::<KbFormat>().is_err());
    }

    #[test]
    fn boxed_parser_visits_triples() {
        let mut count = 0;
        KbFormat::Turtle
            .parser("A B C; D E.".as_bytes())
            .parse(&mut |_, _, _| {
                count += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(count, 2);
    }
}
