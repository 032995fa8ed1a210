//! Tokenizer for queries.

use std::fmt;

use crate::error::QueryError;

use super::QueryResult;

/// Characters that always form a token of their own.
const PUNCT: &[char] = &['?', '<', '>', '(', ')', '{', '}', ',', '*', '!', ';'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lexeme {
    /// A bare word, such as an identifier or an integer.
    Word(String),
    /// A quoted identifier, without its quotes.
    Quoted(String),
    Punct(char),
    Eof,
}

impl Lexeme {
    /// The identifier text of a word or quoted word.
    pub fn ident(&self) -> Option<&str> {
        match self {
            Lexeme::Word(s) | Lexeme::Quoted(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lexeme::Word(s) => write!(f, "{s}"),
            Lexeme::Quoted(s) => write!(f, "{s:?}"),
            Lexeme::Punct(c) => write!(f, "'{c}'"),
            Lexeme::Eof => write!(f, "end of query"),
        }
    }
}

/// Split `src` into lexemes with their byte positions. The last lexeme is
/// always [`Lexeme::Eof`].
pub fn lex(src: &str) -> QueryResult<Vec<(usize, Lexeme)>> {
    let mut out = Vec::new();
    let mut chars = src.char_indices().peekable();
    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if PUNCT.contains(&c) {
            chars.next();
            out.push((pos, Lexeme::Punct(c)));
        } else if c == '\'' || c == '"' {
            chars.next();
            let start = pos + c.len_utf8();
            let end = loop {
                match chars.next() {
                    Some((i, q)) if q == c => break i,
                    Some(_) => {}
                    None => return Err(QueryError::UnterminatedQuote { pos }),
                }
            };
            out.push((pos, Lexeme::Quoted(src[start..end].to_string())));
        } else {
            let mut end = src.len();
            while let Some(&(i, c)) = chars.peek() {
                if c.is_whitespace() || PUNCT.contains(&c) || c == '\'' || c == '"' {
                    end = i;
                    break;
                }
                chars.next();
            }
            out.push((pos, Lexeme::Word(src[pos..end].to_string())));
        }
    }
    out.push((src.len(), Lexeme::Eof));
    Ok(out)
}
