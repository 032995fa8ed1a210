//! Compile a type-checked rule expression to stack-machine instructions.

use std::fmt;

use crate::error::RuleError;

use super::RuleResult;
use super::ast::{Expr, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    PushNum,
    PushId,
    PushTrue,
    PushFalse,
    Eq,
    Lt,
    Gt,
    Not,
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    Or,
    And,
    SetEq,
    SetUnion,
    SetIntersect,
    SetSub,
    Len,
    Log,
    Exp,
    Pow,
    Min,
    Max,
    /// Counts of a set of ids in the memory.
    Counts,
    /// As `Counts`, including edge objects.
    CountsS,
    /// Count of one id in the memory.
    Count,
    /// As `Count`, including edge objects.
    CountS,
    Elements,
    ElementsS,
    MemCapacity,
    MemLen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruction {
    pub op: Opcode,
    pub arg: f64,
}

impl Instruction {
    fn op(op: Opcode) -> Self {
        Self { op, arg: 0.0 }
    }

    fn num(n: f64) -> Self {
        Self { op: Opcode::PushNum, arg: n }
    }

    fn id(id: u32) -> Self {
        Self {
            op: Opcode::PushId,
            arg: f64::from(id),
        }
    }

    fn boolean(b: bool) -> Self {
        Self::op(if b { Opcode::PushTrue } else { Opcode::PushFalse })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.op {
            Opcode::PushNum => return write!(f, "PUSH {:.2}", self.arg),
            Opcode::PushId => return write!(f, "PUSH {}", self.arg as i64),
            Opcode::PushTrue => "PUSH true",
            Opcode::PushFalse => "PUSH false",
            Opcode::Eq => "EQ",
            Opcode::Lt => "LT",
            Opcode::Gt => "GT",
            Opcode::Not => "NOT",
            Opcode::Neg => "NEG",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Or => "OR",
            Opcode::And => "AND",
            Opcode::SetEq => "SEQ",
            Opcode::SetUnion => "SU",
            Opcode::SetIntersect => "SI",
            Opcode::SetSub => "SSUB",
            Opcode::Len => "LEN",
            Opcode::Log => "LOG",
            Opcode::Exp => "EXP",
            Opcode::Pow => "POW",
            Opcode::Min => "MIN",
            Opcode::Max => "MAX",
            Opcode::Counts => "C",
            Opcode::CountsS => "CS",
            Opcode::Count => "SC",
            Opcode::CountS => "SCS",
            Opcode::Elements => "E",
            Opcode::ElementsS => "ES",
            Opcode::MemCapacity => "MN",
            Opcode::MemLen => "MLEN",
        };
        f.write_str(name)
    }
}

/// Maps concept names in string literals to concept ids.
pub type Lookup<'a> = dyn Fn(&str) -> Option<u32> + 'a;

pub struct Compiler<'a> {
    lookup: &'a Lookup<'a>,
    code: Vec<Instruction>,
}

impl<'a> Compiler<'a> {
    pub fn new(lookup: &'a Lookup<'a>) -> Self {
        Self {
            lookup,
            code: Vec::new(),
        }
    }

    /// Compile `expr`, which must already have passed [`Expr::check`].
    pub fn compile(mut self, expr: &Expr) -> RuleResult<Vec<Instruction>> {
        self.expr(expr)?;
        Ok(self.code)
    }

    fn emit(&mut self, i: Instruction) {
        self.code.push(i);
    }

    fn find(&self, name: &str) -> RuleResult<u32> {
        (self.lookup)(name)
            .filter(|id| *id > 0)
            .ok_or_else(|| RuleError::UnknownConcept {
                name: name.to_string(),
            })
    }

    /// Push a set as its sorted ids followed by their count.
    fn id_set(&mut self, items: &[String]) -> RuleResult<()> {
        let mut ids = items.iter().map(|s| self.find(s)).collect::<RuleResult<Vec<u32>>>()?;
        ids.sort_unstable();
        ids.dedup();
        for id in &ids {
            self.emit(Instruction::id(*id));
        }
        self.emit(Instruction::id(ids.len() as u32));
        Ok(())
    }

    fn expr(&mut self, expr: &Expr) -> RuleResult<()> {
        match expr {
            Expr::Num(n) => self.emit(Instruction::num(*n)),
            Expr::Bool(b) => self.emit(Instruction::boolean(*b)),
            Expr::Str(s) => {
                let id = self.find(s)?;
                self.emit(Instruction::id(id));
            }
            Expr::Set(items) => self.id_set(items)?,
            Expr::Prefix { op, expr: inner } => {
                let t = inner.check()?;
                self.expr(inner)?;
                match (op, t) {
                    ('-', Type::Num) => self.emit(Instruction::op(Opcode::Neg)),
                    ('-' | '!', Type::Bool) => self.emit(Instruction::op(Opcode::Not)),
                    _ => {
                        return Err(RuleError::Type {
                            message: format!("cannot compile {expr}"),
                        });
                    }
                }
            }
            Expr::Infix { op, left, right } => self.infix(expr, *op, left, right)?,
            Expr::Call { name, args } => self.call(expr, name, args)?,
        }
        Ok(())
    }

    fn infix(&mut self, expr: &Expr, op: char, left: &Expr, right: &Expr) -> RuleResult<()> {
        let t = left.check()?;
        if t == Type::Str {
            let (Expr::Str(a), Expr::Str(b)) = (left, right) else {
                return Err(RuleError::Type {
                    message: format!("cannot compile {expr}"),
                });
            };
            let value = match op {
                '=' => a == b,
                '<' => a < b,
                '>' => a > b,
                _ => {
                    return Err(RuleError::Type {
                        message: format!("cannot compile {expr}"),
                    });
                }
            };
            self.emit(Instruction::boolean(value));
            return Ok(());
        }
        let opcode = match (t, op) {
            (_, '=') if t == Type::Set => Opcode::SetEq,
            (_, '=') => Opcode::Eq,
            (Type::Num, '<') => Opcode::Lt,
            (Type::Num, '>') => Opcode::Gt,
            (Type::Bool, '+') => Opcode::Or,
            (Type::Bool, '*') => Opcode::And,
            (Type::Num, '+') => Opcode::Add,
            (Type::Num, '-') => Opcode::Sub,
            (Type::Num, '*') => Opcode::Mul,
            (Type::Num, '/') => Opcode::Div,
            (Type::Set, '+') => Opcode::SetUnion,
            (Type::Set, '*') => Opcode::SetIntersect,
            (Type::Set, '-') => Opcode::SetSub,
            _ => {
                return Err(RuleError::Type {
                    message: format!("cannot compile {expr}"),
                });
            }
        };
        self.expr(left)?;
        self.expr(right)?;
        self.emit(Instruction::op(opcode));
        Ok(())
    }

    fn call(&mut self, expr: &Expr, name: &str, args: &[Expr]) -> RuleResult<()> {
        match (name, args) {
            ("len", []) => self.emit(Instruction::op(Opcode::MemLen)),
            ("len", [Expr::Str(s)]) => self.emit(Instruction::id(s.len() as u32)),
            ("len", [set]) => {
                self.expr(set)?;
                self.emit(Instruction::op(Opcode::Len));
            }
            ("n", []) => self.emit(Instruction::op(Opcode::MemCapacity)),
            ("e", []) => self.emit(Instruction::op(Opcode::Elements)),
            ("es", []) => self.emit(Instruction::op(Opcode::ElementsS)),
            ("c" | "cs", [arg]) => {
                let star = name == "cs";
                if let Expr::Str(s) = arg {
                    let id = self.find(s)?;
                    self.emit(Instruction::id(id));
                    self.emit(Instruction::op(if star { Opcode::CountS } else { Opcode::Count }));
                } else {
                    self.expr(arg)?;
                    self.emit(Instruction::op(if star { Opcode::CountsS } else { Opcode::Counts }));
                }
            }
            ("min" | "max", _) => {
                let opcode = if name == "min" { Opcode::Min } else { Opcode::Max };
                match args {
                    [single] if single.check()? == Type::Set => self.expr(single)?,
                    _ => {
                        for arg in args {
                            self.expr(arg)?;
                        }
                        self.emit(Instruction::id(args.len() as u32));
                    }
                }
                self.emit(Instruction::op(opcode));
            }
            ("log" | "exp" | "pow", _) => {
                for arg in args {
                    self.expr(arg)?;
                }
                let opcode = match name {
                    "log" => Opcode::Log,
                    "exp" => Opcode::Exp,
                    _ => Opcode::Pow,
                };
                self.emit(Instruction::op(opcode));
            }
            _ => {
                return Err(RuleError::Call {
                    name: name.to_string(),
                    message: format!("cannot compile {expr}"),
                });
            }
        }
        Ok(())
    }
}
