//! RDF/XML triple parser backed by oxigraph.
//!
//! Every statement of the document is visited as `(subject, predicate,
//! object)`. Literal objects are visited with their lexical value, resources
//! with their IRI. Typed node elements (`<skos:Concept rdf:about=…>`) also
//! produce an `rdf:type` statement; list that predicate under `Ignore` to
//! drop it.

use std::io::Read;

use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::Term;

use crate::error::{KbError, SemixResult};

use super::{TripleSource, Visitor};

/// RDF/XML parser over any reader.
pub struct RdfXmlParser<R> {
    reader: Option<R>,
}

impl<R: Read> RdfXmlParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
        }
    }
}

fn term_value(term: Term) -> String {
    match term {
        Term::NamedNode(node) => node.into_string(),
        Term::BlankNode(node) => node.into_string(),
        Term::Literal(literal) => literal.value().to_string(),
        #[allow(unreachable_patterns)]
        other => other.to_string(),
    }
}

impl<R: Read> TripleSource for RdfXmlParser<R> {
    fn parse(&mut self, visit: &mut Visitor<'_>) -> SemixResult<()> {
        let Some(reader) = self.reader.take() else {
            return Ok(());
        };
        for quad in RdfParser::from_format(RdfFormat::RdfXml).for_reader(reader) {
            let quad = quad.map_err(|e| KbError::RdfXml {
                message: e.to_string(),
            })?;
            let subject = term_value(Term::from(quad.subject));
            let predicate = quad.predicate.into_string();
            let object = term_value(quad.object);
            visit(&subject, &predicate, &object)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:skos="http://www.w3.org/2004/02/skos/core#">
  <rdf:Description rdf:about="http://example.org/A">
    <skos:prefLabel>alpha</skos:prefLabel>
    <skos:broader rdf:resource="http://example.org/B"/>
  </rdf:Description>
</rdf:RDF>"#;

    #[test]
    fn visits_labels_and_links() {
        let mut triples = Vec::new();
        RdfXmlParser::new(DOC.as_bytes())
            .parse(&mut |s, p, o| {
                triples.push((s.to_string(), p.to_string(), o.to_string()));
                Ok(())
            })
            .unwrap();
        assert_eq!(triples.len(), 2);
        assert!(triples.contains(&(
            "http://example.org/A".into(),
            "http://www.w3.org/2004/02/skos/core#prefLabel".into(),
            "alpha".into()
        )));
        assert!(triples.contains(&(
            "http://example.org/A".into(),
            "http://www.w3.org/2004/02/skos/core#broader".into(),
            "http://example.org/B".into()
        )));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let result = RdfXmlParser::new("<rdf:RDF><oops".as_bytes()).parse(&mut |_, _, _| Ok(()));
        assert!(result.is_err());
    }
}
