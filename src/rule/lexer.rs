//! Tokenizer for rule expressions.

use crate::error::RuleError;

use super::RuleResult;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Num(f64),
    Str(String),
    Ident(String),
    Punct(char),
    Eof,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Num(n) => write!(f, "number {n}"),
            Token::Str(s) => write!(f, "string {s:?}"),
            Token::Ident(s) => write!(f, "identifier {s}"),
            Token::Punct(c) => write!(f, "'{c}'"),
            Token::Eof => write!(f, "end of rule"),
        }
    }
}

const PUNCT: &[char] = &['(', ')', '{', '}', ',', '+', '-', '*', '/', '=', '<', '>', '!'];

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    /// Position of the next unread byte.
    pub fn pos(&self) -> usize {
        self.pos
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, pos: usize, message: impl Into<String>) -> RuleError {
        RuleError::Syntax {
            pos,
            message: message.into(),
        }
    }

    /// Scan the next token, returning it with its start position.
    pub fn next_token(&mut self) -> RuleResult<(usize, Token)> {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.bump();
        }
        let start = self.pos;
        let Some(c) = self.peek_char() else {
            return Ok((start, Token::Eof));
        };
        if c.is_ascii_digit() || c == '.' {
            return self.number(start).map(|n| (start, Token::Num(n)));
        }
        if c == '"' || c == '`' {
            return self.string(start, c).map(|s| (start, Token::Str(s)));
        }
        if c.is_alphabetic() || c == '_' {
            while self.peek_char().is_some_and(|c| c.is_alphanumeric() || c == '_') {
                self.bump();
            }
            return Ok((start, Token::Ident(self.src[start..self.pos].to_string())));
        }
        if PUNCT.contains(&c) {
            self.bump();
            return Ok((start, Token::Punct(c)));
        }
        Err(self.error(start, format!("unexpected character '{c}'")))
    }

    fn number(&mut self, start: usize) -> RuleResult<f64> {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.bump();
        }
        if self.peek_char().is_some_and(|c| c.is_alphabetic() || c == '_') {
            return Err(self.error(start, "invalid number"));
        }
        let text = &self.src[start..self.pos];
        text.parse()
            .map_err(|_| self.error(start, format!("invalid number {text:?}")))
    }

    fn string(&mut self, start: usize, quote: char) -> RuleResult<String> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error(start, "unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') if quote == '"' => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c @ ('"' | '\\')) => out.push(c),
                    Some(c) => return Err(self.error(self.pos, format!("invalid escape '\\{c}'"))),
                    None => return Err(self.error(start, "unterminated string")),
                },
                Some(c) => out.push(c),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> RuleResult<Vec<Token>> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let (_, tok) = lexer.next_token()?;
            if tok == Token::Eof {
                return Ok(out);
            }
            out.push(tok);
        }
    }

    #[test]
    fn scans_all_token_kinds() {
        assert_eq!(
            tokens(r#"min(4.2, "a\"b") + {`x`}"#).unwrap(),
            vec![
                Token::Ident("min".into()),
                Token::Punct('('),
                Token::Num(4.2),
                Token::Punct(','),
                Token::Str("a\"b".into()),
                Token::Punct(')'),
                Token::Punct('+'),
                Token::Punct('{'),
                Token::Str("x".into()),
                Token::Punct('}'),
            ]
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(tokens("100a").is_err());
        assert!(tokens("4a.2").is_err());
        assert!(tokens(r#""open"#).is_err());
        assert!(tokens("??").is_err());
        assert!(tokens("1..2").is_err());
    }
}
