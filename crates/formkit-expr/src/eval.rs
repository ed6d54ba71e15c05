//! Tree-walking interpreter

use crate::parser::{BinaryOp, Expr, Function, LogicalOp, UnaryOp};
use crate::value::Value;
use crate::ExprError;
use formkit_common::ValueMap;

/// Values visible to an expression
///
/// `override` shadows one field, which is how validators test a
/// candidate value before it is committed.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    values: &'a ValueMap,
    override_value: Option<(&'a str, &'a str)>,
}

impl<'a> EvalContext<'a> {
    /// Context over a value map
    pub fn new(values: &'a ValueMap) -> Self {
        Self {
            values,
            override_value: None,
        }
    }

    /// Same map with `field` reading as `value`
    pub fn with_override(mut self, field: &'a str, value: &'a str) -> Self {
        self.override_value = Some((field, value));
        self
    }

    /// Look up a field
    pub fn get(&self, field: &str) -> Option<&'a str> {
        match self.override_value {
            Some((name, value)) if name == field => Some(value),
            _ => self.values.get(field).map(String::as_str),
        }
    }
}

/// Evaluate a parsed tree
pub fn eval(expr: &Expr, ctx: &EvalContext<'_>) -> Result<Value, ExprError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Field(name) => Ok(ctx.get(name).map(Value::from).unwrap_or(Value::Null)),
        Expr::Unary { op, expr } => {
            let operand = eval(expr, ctx)?;
            Ok(match op {
                UnaryOp::Neg => Value::Number(-operand.to_number()?),
                UnaryOp::Plus => Value::Number(operand.to_number()?),
                UnaryOp::Not => Value::Bool(!operand.is_truthy()),
            })
        }
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval(lhs, ctx)?;
            let rhs = eval(rhs, ctx)?;
            binary(*op, &lhs, &rhs)
        }
        Expr::Logical { op, lhs, rhs } => {
            let left = eval(lhs, ctx)?.is_truthy();
            let result = match op {
                LogicalOp::And => left && eval(rhs, ctx)?.is_truthy(),
                LogicalOp::Or => left || eval(rhs, ctx)?.is_truthy(),
            };
            Ok(Value::Bool(result))
        }
        Expr::Conditional { cond, then, otherwise } => {
            if eval(cond, ctx)?.is_truthy() {
                eval(then, ctx)
            } else {
                eval(otherwise, ctx)
            }
        }
        Expr::Call { function, args } => call(*function, args, ctx),
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, ExprError> {
    use std::cmp::Ordering::*;

    let result = match op {
        // loose: `@AGE == 25` holds for the string "25"
        BinaryOp::Eq => Value::Bool(lhs.loose_eq(rhs)),
        BinaryOp::Ne => Value::Bool(!lhs.loose_eq(rhs)),
        BinaryOp::Lt => Value::Bool(matches!(lhs.compare(rhs), Some(Less))),
        BinaryOp::Le => Value::Bool(matches!(lhs.compare(rhs), Some(Less | Equal))),
        BinaryOp::Gt => Value::Bool(matches!(lhs.compare(rhs), Some(Greater))),
        BinaryOp::Ge => Value::Bool(matches!(lhs.compare(rhs), Some(Greater | Equal))),
        arithmetic => {
            let a = lhs.to_number()?;
            let b = rhs.to_number()?;
            Value::Number(match arithmetic {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Rem => a % b,
                _ => a.powf(b),
            })
        }
    };
    Ok(result)
}

fn call(function: Function, args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, ExprError> {
    if function == Function::If {
        // lazy: only the taken branch is evaluated
        return match args {
            [cond, then, otherwise] => {
                if eval(cond, ctx)?.is_truthy() {
                    eval(then, ctx)
                } else {
                    eval(otherwise, ctx)
                }
            }
            _ => Err(ExprError::Arity {
                function: "if",
                expected: "3",
                found: args.len(),
            }),
        };
    }

    let values = args
        .iter()
        .map(|arg| eval(arg, ctx))
        .collect::<Result<Vec<_>, _>>()?;

    let first_number = || -> Result<f64, ExprError> {
        values.first().map(Value::to_number).unwrap_or(Ok(0.0))
    };

    let result = match function {
        Function::Min | Function::Max => {
            let mut numbers = values.iter().map(Value::to_number);
            let mut acc = numbers.next().unwrap_or(Ok(f64::NAN))?;
            for n in numbers {
                let n = n?;
                acc = if function == Function::Min { acc.min(n) } else { acc.max(n) };
            }
            Value::Number(acc)
        }
        Function::Abs => Value::Number(first_number()?.abs()),
        Function::Floor => Value::Number(first_number()?.floor()),
        Function::Ceil => Value::Number(first_number()?.ceil()),
        Function::Round => {
            let x = first_number()?;
            let digits = match values.get(1) {
                Some(d) => d.to_number()?.trunc(),
                None => 0.0,
            };
            let factor = 10f64.powf(digits);
            // half-up, so round(-2.5) == -2
            Value::Number((x * factor + 0.5).floor() / factor)
        }
        Function::Len => {
            let len = match values.first() {
                None | Some(Value::Null) => 0,
                Some(v) => v.to_string().chars().count(),
            };
            Value::Number(len as f64)
        }
        Function::Concat => Value::Str(
            values
                .iter()
                .filter(|v| !v.is_null())
                .map(Value::to_string)
                .collect(),
        ),
        Function::If => Value::Null,
    };
    Ok(result)
}
