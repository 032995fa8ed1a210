//! Bash-style brace expansion for knowledge-base labels.
//!
//! `a{b,c}d` expands to `abd` and `acd`. Groups nest and factor over the
//! surrounding literals. Commas outside of a group are literal. A backslash
//! escapes the following character (including itself); a trailing backslash
//! is dropped.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::ExpandError;

/// Result type for brace expansion.
pub type ExpandResult<T> = std::result::Result<T, ExpandError>;

/// Expand all brace groups in `input`.
///
/// The expansions are returned in bash order: the leftmost group varies
/// slowest. Unbalanced braces are an error.
pub fn expand_braces(input: &str) -> ExpandResult<Vec<String>> {
    let mut expander = Expander {
        input,
        chars: input.chars().peekable(),
    };
    let (words, end) = expander.sequence(false)?;
    match end {
        End::Eof => Ok(words),
        End::Comma | End::Close => Err(expander.unbalanced()),
    }
}

enum End {
    Eof,
    Comma,
    Close,
}

struct Expander<'a> {
    input: &'a str,
    chars: Peekable<Chars<'a>>,
}

impl Expander<'_> {
    fn unbalanced(&self) -> ExpandError {
        ExpandError::Unbalanced {
            input: self.input.to_string(),
        }
    }

    /// Parse a sequence of literals and groups up to the end of input or,
    /// inside a group, up to the next `,` or `}`.
    fn sequence(&mut self, in_group: bool) -> ExpandResult<(Vec<String>, End)> {
        let mut words = vec![String::new()];
        while let Some(c) = self.chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = self.chars.next() {
                        append(&mut words, escaped);
                    }
                }
                '{' => {
                    let alternatives = self.group()?;
                    words = product(&words, &alternatives);
                }
                '}' if in_group => return Ok((words, End::Close)),
                '}' => return Err(self.unbalanced()),
                ',' if in_group => return Ok((words, End::Comma)),
                c => append(&mut words, c),
            }
        }
        if in_group {
            return Err(self.unbalanced());
        }
        Ok((words, End::Eof))
    }

    /// Parse the alternatives of a group; the opening brace is consumed.
    fn group(&mut self) -> ExpandResult<Vec<String>> {
        let mut alternatives = Vec::new();
        loop {
            let (words, end) = self.sequence(true)?;
            alternatives.extend(words);
            match end {
                End::Comma => continue,
                End::Close => return Ok(alternatives),
                End::Eof => return Err(self.unbalanced()),
            }
        }
    }
}

fn append(words: &mut [String], c: char) {
    for word in words.iter_mut() {
        word.push(c);
    }
}

fn product(prefixes: &[String], suffixes: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(prefixes.len() * suffixes.len());
    for prefix in prefixes {
        for suffix in suffixes {
            out.push(format!("{prefix}{suffix}"));
        }
    }
    out
}
