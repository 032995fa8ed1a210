//! Rule syntax tree and its static type check.

use std::fmt;

use crate::error::RuleError;

use super::RuleResult;

/// Static type of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Num,
    Bool,
    Str,
    Set,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Num => write!(f, "number"),
            Type::Bool => write!(f, "boolean"),
            Type::Str => write!(f, "string"),
            Type::Set => write!(f, "set"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Bool(bool),
    Str(String),
    /// Sorted and deduplicated.
    Set(Vec<String>),
    Prefix { op: char, expr: Box<Expr> },
    Infix { op: char, left: Box<Expr>, right: Box<Expr> },
    Call { name: String, args: Vec<Expr> },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(n) => write!(f, "{n:.2}"),
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Str(s) => write!(f, "{s:?}"),
            Expr::Set(items) => {
                let items: Vec<String> = items.iter().map(|s| format!("{s:?}")).collect();
                write!(f, "{{{}}}", items.join(","))
            }
            Expr::Prefix { op, expr } => write!(f, "({op}{expr})"),
            Expr::Infix { op, left, right } => write!(f, "({left}{op}{right})"),
            Expr::Call { name, args } => {
                let args: Vec<String> = args.iter().map(Expr::to_string).collect();
                write!(f, "{name}({})", args.join(","))
            }
        }
    }
}

fn type_error(expr: &Expr) -> RuleError {
    RuleError::Type {
        message: format!("invalid expression {expr}"),
    }
}

fn call_error(name: &str, expr: &Expr) -> RuleError {
    RuleError::Call {
        name: name.to_string(),
        message: format!("invalid arguments in {expr}"),
    }
}

impl Expr {
    /// The static type of the expression.
    pub fn check(&self) -> RuleResult<Type> {
        match self {
            Expr::Num(_) => Ok(Type::Num),
            Expr::Bool(_) => Ok(Type::Bool),
            Expr::Str(_) => Ok(Type::Str),
            Expr::Set(_) => Ok(Type::Set),
            Expr::Prefix { op, expr } => match (op, expr.check()?) {
                ('-', t @ (Type::Num | Type::Bool)) => Ok(t),
                ('!', Type::Bool) => Ok(Type::Bool),
                _ => Err(type_error(self)),
            },
            Expr::Infix { op, left, right } => {
                let t = left.check()?;
                if t != right.check()? {
                    return Err(RuleError::Type {
                        message: format!("operand types do not match in {self}"),
                    });
                }
                match (op, t) {
                    ('=', _) => Ok(Type::Bool),
                    ('<' | '>', Type::Num | Type::Str) => Ok(Type::Bool),
                    ('+' | '*', Type::Bool | Type::Num | Type::Set) => Ok(t),
                    ('-', Type::Num | Type::Set) => Ok(t),
                    ('/', Type::Num) => Ok(t),
                    _ => Err(type_error(self)),
                }
            }
            Expr::Call { name, args } => self.check_call(name, args),
        }
    }

    fn check_call(&self, name: &str, args: &[Expr]) -> RuleResult<Type> {
        let types = args.iter().map(Expr::check).collect::<RuleResult<Vec<Type>>>()?;
        let ok = match name {
            "min" | "max" => {
                return match types.as_slice() {
                    [Type::Set] => Ok(Type::Num),
                    ts if ts.iter().all(|t| matches!(t, Type::Num | Type::Bool)) => Ok(Type::Num),
                    _ => Err(call_error(name, self)),
                };
            }
            "len" => {
                return match types.as_slice() {
                    [] | [Type::Set] | [Type::Str] => Ok(Type::Num),
                    _ => Err(call_error(name, self)),
                };
            }
            "c" | "cs" => {
                return match types.as_slice() {
                    [Type::Str] => Ok(Type::Num),
                    [Type::Set] => Ok(Type::Set),
                    _ => Err(call_error(name, self)),
                };
            }
            "e" | "es" => types.is_empty(),
            "n" => types.is_empty(),
            "log" | "exp" => types == [Type::Num],
            "pow" => types == [Type::Num, Type::Num],
            _ => {
                return Err(RuleError::Call {
                    name: name.to_string(),
                    message: "unknown function".to_string(),
                });
            }
        };
        if !ok {
            return Err(call_error(name, self));
        }
        Ok(match name {
            "e" | "es" => Type::Set,
            _ => Type::Num,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::parser::parse;

    fn check(src: &str) -> RuleResult<Type> {
        parse(src).unwrap().check()
    }

    #[test]
    fn well_typed_expressions() {
        for (src, want) in [
            ("2", Type::Num),
            ("2+2", Type::Num),
            ("true+true", Type::Bool),
            ("false*true", Type::Bool),
            ("-false", Type::Bool),
            ("!false", Type::Bool),
            ("-1", Type::Num),
            ("1>2", Type::Bool),
            ("1=2", Type::Bool),
            ("true=false", Type::Bool),
            (r#""ab"="cd""#, Type::Bool),
            (r#""ab"<"cd""#, Type::Bool),
            (r#"{"a","b"}+es()"#, Type::Set),
            (r#"c({"a","b"})"#, Type::Set),
            (r#"cs("a")"#, Type::Num),
            (r#"min(len({"a","b"}),cs("foo"))"#, Type::Num),
            (r#"c({"a","b"})+cs({"c","d"})"#, Type::Set),
            ("max()", Type::Num),
            ("min(1.0,false,false,true)", Type::Num),
            (r#"len(es()-{"topnode"})"#, Type::Num),
            (r#"len("abc")"#, Type::Num),
            ("len()", Type::Num),
            ("n()", Type::Num),
            ("e()+es()", Type::Set),
            ("pow(2,3)", Type::Num),
        ] {
            assert_eq!(check(src).unwrap(), want, "{src}");
        }
    }

    #[test]
    fn ill_typed_expressions() {
        for src in [
            "2-true",
            "false+2",
            "false/true",
            "false=0",
            "false<true",
            "false>true",
            "!1",
            "-{}",
            "-es()",
            r#""a"+"b""#,
            r#"min(len({"a","b"}),"foo")"#,
            "es(true,false)",
            r#"max(1.0,"foo")"#,
            r#"max("foo", "bar")"#,
            "e(true)",
            "c()",
            r#"c({"abc"},1.0,true)"#,
            r#"len("ab","foo")"#,
            "len(1.0)",
            "LEN(1.0)",
            "es(1.0)",
            r#"e({"a"})"#,
            "cs()",
            "c(1.0)",
            "n(1)",
            "log()",
            "exp(1.0,2.0,3.0)",
            "pow(1.0,{})",
        ] {
            assert!(check(src).is_err(), "{src}");
        }
    }

    #[test]
    fn display_is_fully_parenthesised() {
        assert_eq!(parse("1+2*3").unwrap().to_string(), "(1.00+(2.00*3.00))");
        assert_eq!(parse(r#"{"b","a","b"}"#).unwrap().to_string(), r#"{"a","b"}"#);
        assert_eq!(parse("-min(1,true)").unwrap().to_string(), "(-min(1.00,true))");
    }
}
