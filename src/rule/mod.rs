//! Rule expressions: a small typed language over concept-memory statistics.
//!
//! Rules are parsed, type-checked and compiled to stack-machine code once,
//! when the resource is built. Executing a rule never fails; a rule whose
//! value is at least `1` holds.
//!
//! ```text
//! c("bank") > 2 * cs("river")
//! len(es() * {"finance", "money"}) > 0
//! ```

pub mod ast;
pub mod compile;
pub mod lexer;
pub mod parser;
pub mod vm;

use std::collections::BTreeMap;
use std::fmt;

use crate::error::RuleError;
use crate::memory::Memory;

pub use ast::{Expr, Type};
pub use compile::{Instruction, Lookup, Opcode};

/// Result type for rule compilation.
pub type RuleResult<T> = std::result::Result<T, RuleError>;

/// Compiled rules by concept URL.
pub type Rules = BTreeMap<String, Rule>;

/// A compiled rule together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    source: String,
    code: Vec<Instruction>,
}

impl Rule {
    /// Parse, type-check and compile `source`. String literals are mapped
    /// to concept ids with `lookup`.
    pub fn compile(source: &str, lookup: &Lookup<'_>) -> RuleResult<Self> {
        let expr = parser::parse(source)?;
        expr.check()?;
        let code = compile::Compiler::new(lookup).compile(&expr)?;
        Ok(Self {
            source: source.to_string(),
            code,
        })
    }

    pub fn execute(&self, memory: &Memory) -> f64 {
        vm::execute(&self.code, memory)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn code(&self) -> &[Instruction] {
        &self.code
    }
}

/// The instructions, each followed by `;`.
impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ins in &self.code {
            write!(f, "{ins};")?;
        }
        Ok(())
    }
}
