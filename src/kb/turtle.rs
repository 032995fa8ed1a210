//! Turtle triple parser.
//!
//! A recursive-descent parser for the subset of Turtle used by SKOS-style
//! knowledge bases: `@prefix`/`PREFIX`, `@base`/`BASE`, `#` comments, quoted
//! literals, `<…>` URIs, prefixed names and the `;` and `,` abbreviations.
//! Tokens are read lazily, so triples before a syntax error are visited.

use std::io::Read;

use crate::error::{KbError, SemixResult};

use super::{TripleSource, Visitor};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Eof,
    Dot,
    Comma,
    Semicolon,
    /// A bare word (prefixed name or relative name).
    Word(String),
    /// `<…>`
    Uri(String),
    /// `"…"`
    Literal(String),
    /// `@prefix` (`sparql` is false) or `PREFIX` (`sparql` is true).
    Prefix { sparql: bool },
    Base { sparql: bool },
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Eof => "end of input".into(),
            Tok::Dot => "'.'".into(),
            Tok::Comma => "','".into(),
            Tok::Semicolon => "';'".into(),
            Tok::Word(w) => format!("word {w:?}"),
            Tok::Uri(u) => format!("<{u}>"),
            Tok::Literal(l) => format!("literal {l:?}"),
            Tok::Prefix { .. } => "prefix declaration".into(),
            Tok::Base { .. } => "base declaration".into(),
        }
    }
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> KbError {
        KbError::Syntax {
            line: self.line,
            message: message.into(),
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Read up to (and consume) `delim`. Running out of input is an error.
    fn until(&mut self, delim: char) -> Result<String, KbError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == delim => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(self.error(format!("unexpected end of input, expected {delim:?}"))),
            }
        }
    }

    fn next(&mut self) -> Result<Tok, KbError> {
        loop {
            while self.peek_char().is_some_and(char::is_whitespace) {
                self.bump();
            }
            let Some(c) = self.peek_char() else {
                return Ok(Tok::Eof);
            };
            return match c {
                '#' => {
                    self.bump();
                    self.until('\n')?;
                    continue;
                }
                '@' => {
                    self.bump();
                    let mut keyword = String::new();
                    while let Some(c) = self.peek_char().filter(|c| c.is_alphanumeric()) {
                        keyword.push(c);
                        self.bump();
                    }
                    match keyword.as_str() {
                        "prefix" => Ok(Tok::Prefix { sparql: false }),
                        "base" => Ok(Tok::Base { sparql: false }),
                        _ => Err(self.error(format!("invalid annotation @{keyword}"))),
                    }
                }
                '<' => {
                    self.bump();
                    Ok(Tok::Uri(self.until('>')?))
                }
                '"' => {
                    self.bump();
                    self.literal().map(Tok::Literal)
                }
                '.' => {
                    self.bump();
                    Ok(Tok::Dot)
                }
                ',' => {
                    self.bump();
                    Ok(Tok::Comma)
                }
                ';' => {
                    self.bump();
                    Ok(Tok::Semicolon)
                }
                _ => Ok(self.word()),
            };
        }
    }

    fn literal(&mut self) -> Result<String, KbError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => break,
                },
                Some(c) => out.push(c),
                None => break,
            }
        }
        Err(self.error("unterminated literal"))
    }

    fn word(&mut self) -> Tok {
        let mut word = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() || matches!(c, '@' | ',' | '.' | ';' | '"' | '<') {
                break;
            }
            word.push(c);
            self.bump();
        }
        match word.as_str() {
            "PREFIX" => Tok::Prefix { sparql: true },
            "BASE" => Tok::Base { sparql: true },
            _ => Tok::Word(word),
        }
    }
}

/// Streaming Turtle parser over any reader.
pub struct TurtleParser<R> {
    reader: R,
}

impl<R: Read> TurtleParser<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read> TripleSource for TurtleParser<R> {
    fn parse(&mut self, visit: &mut Visitor<'_>) -> SemixResult<()> {
        let mut input = String::new();
        self.reader
            .read_to_string(&mut input)
            .map_err(|source| KbError::Io { source })?;
        let mut parser = Parser {
            lexer: Lexer::new(&input),
            lookahead: None,
            prefixes: Vec::new(),
            base: String::new(),
        };
        parser.document(visit)
    }
}

struct Parser {
    lexer: Lexer,
    lookahead: Option<Tok>,
    prefixes: Vec<(String, String)>,
    base: String,
}

impl Parser {
    fn peek(&mut self) -> Result<&Tok, KbError> {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.lexer.next()?);
        }
        Ok(self.lookahead.get_or_insert(Tok::Eof))
    }

    fn advance(&mut self) -> Result<Tok, KbError> {
        match self.lookahead.take() {
            Some(tok) => Ok(tok),
            None => self.lexer.next(),
        }
    }

    fn expect_dot(&mut self) -> Result<(), KbError> {
        match self.advance()? {
            Tok::Dot => Ok(()),
            other => Err(self.lexer.error(format!("expected '.', got {}", other.describe()))),
        }
    }

    fn document(&mut self, visit: &mut Visitor<'_>) -> SemixResult<()> {
        loop {
            match self.peek()? {
                Tok::Eof => return Ok(()),
                Tok::Prefix { .. } => self.prefix()?,
                Tok::Base { .. } => self.base()?,
                Tok::Word(_) | Tok::Uri(_) | Tok::Literal(_) => self.triples(visit)?,
                other => {
                    let message = format!("unexpected {}", other.describe());
                    return Err(self.lexer.error(message).into());
                }
            }
        }
    }

    fn prefix(&mut self) -> Result<(), KbError> {
        let Tok::Prefix { sparql } = self.advance()? else {
            return Err(self.lexer.error("expected prefix declaration"));
        };
        let name = match self.advance()? {
            Tok::Word(w) if w.ends_with(':') => w,
            other => {
                return Err(self.lexer.error(format!("expected prefix name, got {}", other.describe())));
            }
        };
        let url = self.term()?;
        if !sparql {
            self.expect_dot()?;
        }
        self.prefixes.retain(|(p, _)| *p != name);
        self.prefixes.push((name, url));
        Ok(())
    }

    fn base(&mut self) -> Result<(), KbError> {
        let Tok::Base { sparql } = self.advance()? else {
            return Err(self.lexer.error("expected base declaration"));
        };
        let base = match self.advance()? {
            Tok::Uri(u) | Tok::Word(u) => u,
            other => return Err(self.lexer.error(format!("expected base URI, got {}", other.describe()))),
        };
        if !sparql {
            self.expect_dot()?;
        }
        self.base = base;
        Ok(())
    }

    fn triples(&mut self, visit: &mut Visitor<'_>) -> SemixResult<()> {
        let s = self.term()?;
        let mut p = self.term()?;
        let o = self.term()?;
        visit(&s, &p, &o)?;
        loop {
            match self.advance()? {
                Tok::Dot => return Ok(()),
                Tok::Comma => {
                    let o = self.term()?;
                    visit(&s, &p, &o)?;
                }
                Tok::Semicolon => {
                    p = self.term()?;
                    let o = self.term()?;
                    visit(&s, &p, &o)?;
                }
                other => {
                    let message = format!("expected '.', ',' or ';', got {}", other.describe());
                    return Err(self.lexer.error(message).into());
                }
            }
        }
    }

    /// Read one subject, predicate or object and expand it to a URL.
    fn term(&mut self) -> Result<String, KbError> {
        match self.advance()? {
            Tok::Literal(l) => Ok(l),
            Tok::Uri(u) if u.contains(':') => Ok(u),
            Tok::Uri(u) => Ok(format!("{}{u}", self.base)),
            Tok::Word(w) => self.expand(w),
            other => Err(self.lexer.error(format!("expected a term, got {}", other.describe()))),
        }
    }

    fn expand(&self, word: String) -> Result<String, KbError> {
        if word.find("//").is_some_and(|i| i > 0) {
            return Ok(word);
        }
        let Some(colon) = word.find(':') else {
            return Ok(format!("{}{word}", self.base));
        };
        let prefix = &word[..=colon];
        match self.prefixes.iter().find(|(p, _)| p == prefix) {
            Some((_, url)) => Ok(format!("{url}{}", &word[colon + 1..])),
            None => Err(KbError::UndefinedPrefix {
                prefix: word[..colon].to_string(),
                line: self.lexer.line,
            }),
        }
    }
}
