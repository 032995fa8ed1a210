//! Pratt parser for rule expressions.
//!
//! Precedence, lowest first: `=`, `< >`, `+ -`, `* /`, unary `- !`.

use crate::error::RuleError;

use super::RuleResult;
use super::ast::Expr;
use super::lexer::{Lexer, Token};

const LOWEST: u8 = 1;
const UNARY: u8 = 6;

fn precedence(tok: &Token) -> u8 {
    match tok {
        Token::Punct('=') => 2,
        Token::Punct('<' | '>') => 3,
        Token::Punct('+' | '-') => 4,
        Token::Punct('*' | '/') => 5,
        _ => LOWEST,
    }
}

/// Parse a complete rule expression.
pub fn parse(src: &str) -> RuleResult<Expr> {
    let mut parser = Parser::new(src)?;
    let expr = parser.expression(LOWEST)?;
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    tok: Token,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> RuleResult<Self> {
        let mut lexer = Lexer::new(src);
        let (pos, tok) = lexer.next_token()?;
        Ok(Self { lexer, tok, pos })
    }

    fn advance(&mut self) -> RuleResult<Token> {
        let (pos, tok) = self.lexer.next_token()?;
        self.pos = pos;
        Ok(std::mem::replace(&mut self.tok, tok))
    }

    fn unexpected(&self, expected: &str) -> RuleError {
        RuleError::Syntax {
            pos: self.pos,
            message: format!("expected {expected}; got {}", self.tok),
        }
    }

    fn eat(&mut self, c: char) -> RuleResult<()> {
        if self.tok != Token::Punct(c) {
            return Err(self.unexpected(&format!("'{c}'")));
        }
        self.advance()?;
        Ok(())
    }

    fn expect_eof(&self) -> RuleResult<()> {
        if self.tok != Token::Eof {
            return Err(self.unexpected("end of rule"));
        }
        Ok(())
    }

    fn expression(&mut self, prec: u8) -> RuleResult<Expr> {
        let mut left = self.prefix()?;
        while prec < precedence(&self.tok) {
            let Token::Punct(op) = self.tok else { break };
            let op_prec = precedence(&self.tok);
            self.advance()?;
            let right = self.expression(op_prec)?;
            left = Expr::Infix {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn prefix(&mut self) -> RuleResult<Expr> {
        match self.advance()? {
            Token::Num(n) => Ok(Expr::Num(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Punct(op @ ('-' | '!')) => {
                let expr = self.expression(UNARY)?;
                Ok(Expr::Prefix {
                    op,
                    expr: Box::new(expr),
                })
            }
            Token::Punct('(') => {
                let expr = self.expression(LOWEST)?;
                self.eat(')')?;
                Ok(expr)
            }
            Token::Punct('{') => self.set(),
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Bool(true)),
                "false" => Ok(Expr::Bool(false)),
                _ if self.tok == Token::Punct('(') => {
                    let args = self.args()?;
                    Ok(Expr::Call { name, args })
                }
                _ => Err(RuleError::Syntax {
                    pos: self.pos,
                    message: format!("invalid identifier {name}"),
                }),
            },
            tok => Err(RuleError::Syntax {
                pos: self.pos,
                message: format!("invalid expression: {tok}"),
            }),
        }
    }

    /// Set literal after its opening brace; a trailing comma is allowed.
    fn set(&mut self) -> RuleResult<Expr> {
        let mut items = Vec::new();
        while self.tok != Token::Punct('}') {
            match self.advance()? {
                Token::Str(s) => items.push(s),
                _ => {
                    return Err(RuleError::Syntax {
                        pos: self.pos,
                        message: "sets contain strings only".to_string(),
                    });
                }
            }
            if self.tok == Token::Punct('}') {
                break;
            }
            self.eat(',')?;
        }
        self.eat('}')?;
        items.sort();
        items.dedup();
        Ok(Expr::Set(items))
    }

    fn args(&mut self) -> RuleResult<Vec<Expr>> {
        self.eat('(')?;
        let mut args = Vec::new();
        while self.tok != Token::Punct(')') {
            args.push(self.expression(LOWEST)?);
            if self.tok == Token::Punct(')') {
                break;
            }
            self.eat(',')?;
        }
        self.eat(')')?;
        Ok(args)
    }
}
