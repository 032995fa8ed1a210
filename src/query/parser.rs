//! Recursive-descent parser for queries.
//!
//! ```text
//! query      := '?' [errorK] '(' [errorK] ['<'|'>'] expr ')'
//! expr       := constraint '(' conceptset ')' | list
//! constraint := ['!'] ('*' | list)
//! conceptset := '*' | list
//! list       := '{' [ident {',' ident}] '}' | ident {',' ident}
//! errorK     := integer | '*' | '*' integer | integer '*'
//! ```
//!
//! The first syntax error aborts parsing.

use std::collections::BTreeSet;

use crate::error::QueryError;

use super::lexer::{Lexeme, lex};
use super::{ConceptSet, Constraint, Query, QueryResult};

/// Maps a query identifier to concept URLs.
pub type Resolve<'a> = dyn Fn(&str) -> QueryResult<Vec<String>> + 'a;

pub struct Parser<'a> {
    lexemes: Vec<(usize, Lexeme)>,
    at: usize,
    resolve: &'a Resolve<'a>,
}

fn is_integer(l: &Lexeme) -> bool {
    matches!(l, Lexeme::Word(w) if w.bytes().all(|b| b.is_ascii_digit()))
}

impl<'a> Parser<'a> {
    pub fn new(src: &str, resolve: &'a Resolve<'a>) -> QueryResult<Self> {
        Ok(Self {
            lexemes: lex(src)?,
            at: 0,
            resolve,
        })
    }

    fn peek_at(&self, n: usize) -> &Lexeme {
        self.lexemes
            .get(self.at + n)
            .or(self.lexemes.last())
            .map(|(_, l)| l)
            .unwrap_or(&Lexeme::Eof)
    }

    fn peek(&self) -> &Lexeme {
        self.peek_at(0)
    }

    fn is_punct(&self, c: char) -> bool {
        *self.peek() == Lexeme::Punct(c)
    }

    fn pos(&self) -> usize {
        self.lexemes.get(self.at).map(|(p, _)| *p).unwrap_or_default()
    }

    fn bump(&mut self) -> Lexeme {
        let l = self.peek().clone();
        if self.at < self.lexemes.len() {
            self.at += 1;
        }
        l
    }

    fn error(&self, expected: &str) -> QueryError {
        QueryError::Syntax {
            pos: self.pos(),
            expected: expected.to_string(),
            got: self.peek().to_string(),
        }
    }

    fn expect(&mut self, c: char) -> QueryResult<()> {
        if !self.is_punct(c) {
            return Err(self.error(&format!("'{c}'")));
        }
        self.bump();
        Ok(())
    }

    pub fn parse(mut self) -> QueryResult<Query> {
        self.expect('?')?;
        let mut k = 0;
        let mut star = false;
        self.error_k(false, &mut k, &mut star)?;
        self.expect('(')?;
        self.error_k(true, &mut k, &mut star)?;
        // direction markers are accepted for compatibility and ignored
        if self.is_punct('<') || self.is_punct('>') {
            self.bump();
        }
        let (constraint, concepts) = self.expression()?;
        self.expect(')')?;
        if *self.peek() != Lexeme::Eof {
            return Err(self.error("end of query"));
        }
        Ok(Query {
            constraint,
            concepts,
            k,
            star,
        })
    }

    /// Error options. Inside the parentheses a `*` directly followed by `(`
    /// is the constraint, and an integer followed by `(`, `,`, `)` or `}`
    /// is an identifier.
    fn error_k(&mut self, inside: bool, k: &mut u8, star: &mut bool) -> QueryResult<()> {
        loop {
            let next = self.peek_at(1);
            if self.is_punct('*') {
                if inside && *next == Lexeme::Punct('(') {
                    return Ok(());
                }
                self.bump();
                *star = true;
            } else if is_integer(self.peek()) {
                let ident_follows = matches!(next, Lexeme::Punct('(' | ',' | ')' | '}'));
                if inside && ident_follows {
                    return Ok(());
                }
                let pos = self.pos();
                let word = self.bump();
                let Lexeme::Word(digits) = &word else {
                    return Ok(());
                };
                *k = digits.parse().map_err(|_| QueryError::Syntax {
                    pos,
                    expected: "an error count between 0 and 255".into(),
                    got: digits.clone(),
                })?;
            } else {
                return Ok(());
            }
        }
    }

    fn expression(&mut self) -> QueryResult<(Constraint, ConceptSet)> {
        let mut constraint = Constraint::default();
        match self.peek() {
            Lexeme::Punct('!') => {
                self.bump();
                constraint.not = true;
                if self.is_punct('*') {
                    self.bump();
                    constraint.all = true;
                } else {
                    constraint.set = self.list()?;
                }
            }
            Lexeme::Punct('*') => {
                self.bump();
                constraint.all = true;
            }
            Lexeme::Punct('{') | Lexeme::Word(_) | Lexeme::Quoted(_) => {
                let set = self.list()?;
                if !self.is_punct('(') {
                    return Ok((constraint, ConceptSet::Urls(set)));
                }
                constraint.set = set;
            }
            _ => return Err(self.error("'!', '*', '{' or an identifier")),
        }
        self.expect('(')?;
        let concepts = if self.is_punct('*') {
            self.bump();
            ConceptSet::All
        } else {
            ConceptSet::Urls(self.list()?)
        };
        self.expect(')')?;
        Ok((constraint, concepts))
    }

    fn list(&mut self) -> QueryResult<BTreeSet<String>> {
        let mut set = BTreeSet::new();
        let braced = self.is_punct('{');
        if braced {
            self.bump();
            if self.is_punct('}') {
                self.bump();
                return Ok(set);
            }
        } else if self.peek().ident().is_none() {
            return Ok(set);
        }
        loop {
            self.ident(&mut set)?;
            if !self.is_punct(',') {
                break;
            }
            self.bump();
        }
        if braced {
            self.expect('}')?;
        }
        Ok(set)
    }

    fn ident(&mut self, set: &mut BTreeSet<String>) -> QueryResult<()> {
        let Some(ident) = self.peek().ident().map(str::to_string) else {
            return Err(self.error("an identifier"));
        };
        self.bump();
        set.extend((self.resolve)(&ident)?);
        Ok(())
    }
}
