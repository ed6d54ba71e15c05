//! Recursive-descent parser
//!
//! Precedence, loosest first:
//!
//! | level        | operators                      | assoc |
//! |--------------|--------------------------------|-------|
//! | conditional  | `? :`                          | right |
//! | or           | `or` `\|\|`                    | left  |
//! | and          | `and` `&&`                     | left  |
//! | not          | `not` `!` (prefix)             | -     |
//! | comparison   | `== != < <= > >=`              | left  |
//! | additive     | `+ -`                          | left  |
//! | multiplicative | `* / %`                      | left  |
//! | unary        | `-` `+` (prefix)               | -     |
//! | power        | `^`                            | right |
//! | primary      | literals, `@FIELD`, calls, `( )` | -   |

use crate::lexer::{tokenize, Spanned, Token};
use crate::value::Value;
use crate::ExprError;

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation
    Neg,
    /// Numeric coercion
    Plus,
    /// Logical negation
    Not,
}

/// Binary operators (non short-circuit)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// Arithmetic (as opposed to comparison)
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem | BinaryOp::Pow
        )
    }
}

/// Short-circuit logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Whitelisted functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Min,
    Max,
    Abs,
    Round,
    Floor,
    Ceil,
    Len,
    Concat,
    If,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "min" => Function::Min,
            "max" => Function::Max,
            "abs" => Function::Abs,
            "round" => Function::Round,
            "floor" => Function::Floor,
            "ceil" => Function::Ceil,
            "len" | "length" => Function::Len,
            "concat" => Function::Concat,
            "if" => Function::If,
            _ => return None,
        })
    }

    /// Function name as written in expressions
    pub fn name(&self) -> &'static str {
        match self {
            Function::Min => "min",
            Function::Max => "max",
            Function::Abs => "abs",
            Function::Round => "round",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Len => "len",
            Function::Concat => "concat",
            Function::If => "if",
        }
    }

    fn check_arity(&self, found: usize) -> Result<(), ExprError> {
        let (ok, expected) = match self {
            Function::Min | Function::Max | Function::Concat => (found >= 1, "at least 1"),
            Function::Abs | Function::Floor | Function::Ceil | Function::Len => (found == 1, "1"),
            Function::Round => (found == 1 || found == 2, "1 or 2"),
            Function::If => (found == 3, "3"),
        };
        if ok {
            Ok(())
        } else {
            Err(ExprError::Arity {
                function: self.name(),
                expected,
                found,
            })
        }
    }
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant
    Literal(Value),
    /// `@NAME`
    Field(String),
    /// Prefix operator
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    /// Arithmetic or comparison
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `and` / `or`
    Logical {
        op: LogicalOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `cond ? then : otherwise`
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Whitelisted function call
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Whether any ternary or `if()` appears in the tree
    pub fn has_conditional(&self) -> bool {
        self.any(&|e| {
            matches!(
                e,
                Expr::Conditional { .. } | Expr::Call { function: Function::If, .. }
            )
        })
    }

    /// Whether any arithmetic operator appears in the tree
    pub fn has_math(&self) -> bool {
        self.any(&|e| match e {
            Expr::Binary { op, .. } => op.is_arithmetic(),
            Expr::Unary { op, .. } => *op == UnaryOp::Neg,
            _ => false,
        })
    }

    fn any(&self, pred: &dyn Fn(&Expr) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Expr::Literal(_) | Expr::Field(_) => false,
            Expr::Unary { expr, .. } => expr.any(pred),
            Expr::Binary { lhs, rhs, .. } | Expr::Logical { lhs, rhs, .. } => {
                lhs.any(pred) || rhs.any(pred)
            }
            Expr::Conditional { cond, then, otherwise } => {
                cond.any(pred) || then.any(pred) || otherwise.any(pred)
            }
            Expr::Call { args, .. } => args.iter().any(|a| a.any(pred)),
        }
    }
}

/// Deepest tree the parser builds before rejecting the input
///
/// Counts parentheses, call arguments, ternary branches, prefix operators
/// and chained binary operators alike.
pub const MAX_DEPTH: usize = 256;

/// Parse an expression string into a tree
pub fn parse(source: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.conditional()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some(spanned) => Err(ExprError::Syntax {
            position: spanned.position,
            message: format!("unexpected {:?} after complete expression", spanned.token),
        }),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            let position = self
                .tokens
                .get(self.pos)
                .or_else(|| self.tokens.last())
                .map_or(0, |s| s.position);
            return Err(ExprError::Syntax {
                position,
                message: format!("expression nests deeper than {} levels", MAX_DEPTH),
            });
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.pos).cloned();
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(word)) if word.eq_ignore_ascii_case(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ExprError> {
        match self.advance() {
            Some(spanned) if spanned.token == expected => Ok(()),
            Some(spanned) => Err(ExprError::Syntax {
                position: spanned.position,
                message: format!("expected {}, found {:?}", what, spanned.token),
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn conditional(&mut self) -> Result<Expr, ExprError> {
        self.descend()?;
        let expr = self.ternary()?;
        self.depth -= 1;
        Ok(expr)
    }

    fn ternary(&mut self) -> Result<Expr, ExprError> {
        let cond = self.or()?;
        if !self.eat(&Token::Question) {
            return Ok(cond);
        }
        let then = self.conditional()?;
        self.expect(Token::Colon, "`:`")?;
        let otherwise = self.conditional()?;
        Ok(Expr::Conditional {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        let mark = self.depth;
        let mut lhs = self.and()?;
        while self.eat(&Token::OrOr) || self.eat_keyword("or") {
            self.descend()?;
            let rhs = self.and()?;
            lhs = Expr::Logical {
                op: LogicalOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        self.depth = mark;
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        let mark = self.depth;
        let mut lhs = self.not()?;
        while self.eat(&Token::AndAnd) || self.eat_keyword("and") {
            self.descend()?;
            let rhs = self.not()?;
            lhs = Expr::Logical {
                op: LogicalOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        self.depth = mark;
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Token::Bang) || self.eat_keyword("not") {
            self.descend()?;
            let expr = self.not()?;
            self.depth -= 1;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let mark = self.depth;
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::Ne,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.additive()?;
            lhs = binary(op, lhs, rhs);
        }
        self.depth = mark;
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        let mark = self.depth;
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        self.depth = mark;
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mark = self.depth;
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
        self.depth = mark;
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.power(),
        };
        self.pos += 1;
        self.descend()?;
        let expr = self.unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.primary()?;
        if self.eat(&Token::Caret) {
            // right-assoc; exponent may carry its own sign: 2 ^ -1
            self.descend()?;
            let exponent = self.unary()?;
            self.depth -= 1;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let spanned = self.advance().ok_or(ExprError::UnexpectedEnd)?;
        match spanned.token {
            Token::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::Field(name) => Ok(Expr::Field(name)),
            Token::LParen => {
                let inner = self.conditional()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(inner)
            }
            Token::Ident(word) => self.word(word),
            other => Err(ExprError::Syntax {
                position: spanned.position,
                message: format!("unexpected {:?}", other),
            }),
        }
    }

    fn word(&mut self, word: String) -> Result<Expr, ExprError> {
        match word.to_ascii_lowercase().as_str() {
            "true" => return Ok(Expr::Literal(Value::Bool(true))),
            "false" => return Ok(Expr::Literal(Value::Bool(false))),
            "null" => return Ok(Expr::Literal(Value::Null)),
            _ => {}
        }

        if self.peek() != Some(&Token::LParen) {
            return Err(ExprError::UnknownIdentifier(word));
        }
        let function = Function::lookup(&word.to_ascii_lowercase())
            .ok_or_else(|| ExprError::UnknownFunction(word.clone()))?;
        self.pos += 1;

        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.conditional()?);
                if self.eat(&Token::Comma) {
                    continue;
                }
                self.expect(Token::RParen, "`,` or `)`")?;
                break;
            }
        }

        function.check_arity(args.len())?;
        Ok(Expr::Call { function, args })
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Literal(Value::Number(n)))
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            Expr::Binary {
                op: BinaryOp::Add,
                lhs: num(1.0),
                rhs: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    lhs: num(2.0),
                    rhs: num(3.0),
                }),
            }
        );
    }

    #[test]
    fn test_power_binds_tighter_than_negation() {
        assert_eq!(
            parse("-2 ^ 2").unwrap(),
            Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(Expr::Binary {
                    op: BinaryOp::Pow,
                    lhs: num(2.0),
                    rhs: num(2.0),
                }),
            }
        );
    }

    #[test]
    fn test_ternary_is_right_associative() {
        let expr = parse("@A ? 1 : @B ? 2 : 3").unwrap();
        match expr {
            Expr::Conditional { otherwise, .. } => {
                assert!(matches!(*otherwise, Expr::Conditional { .. }))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert!(parse("@A == 'x' AND NOT @B or TRUE").is_ok());
    }

    #[test]
    fn test_flags() {
        assert!(parse("@A > 1 ? 'x' : 'y'").unwrap().has_conditional());
        assert!(parse("if(@A, 1, 2)").unwrap().has_conditional());
        assert!(!parse("@A == 'a-b'").unwrap().has_math());
        assert!(parse("@A * 2").unwrap().has_math());
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("1 +").unwrap_err(), ExprError::UnexpectedEnd);
        assert_eq!(
            parse("PREMIUM * 2").unwrap_err(),
            ExprError::UnknownIdentifier("PREMIUM".into())
        );
        assert_eq!(
            parse("system('ls')").unwrap_err(),
            ExprError::UnknownFunction("system".into())
        );
        assert!(matches!(
            parse("round()").unwrap_err(),
            ExprError::Arity { function: "round", found: 0, .. }
        ));
        assert!(matches!(parse("(1 + 2").unwrap_err(), ExprError::UnexpectedEnd));
        assert!(matches!(parse("1 2").unwrap_err(), ExprError::Syntax { position: 2, .. }));
    }

    fn too_deep(err: ExprError) -> bool {
        matches!(err, ExprError::Syntax { message, .. } if message.contains("nests deeper"))
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let n = 100_000;
        let parens = format!("{}1{}", "(".repeat(n), ")".repeat(n));
        assert!(too_deep(parse(&parens).unwrap_err()));

        let chain = vec!["1"; n].join(" + ");
        assert!(too_deep(parse(&chain).unwrap_err()));

        assert!(too_deep(parse(&format!("{}1", "-".repeat(n))).unwrap_err()));
        assert!(too_deep(parse(&format!("{}true", "!".repeat(n))).unwrap_err()));
        assert!(too_deep(parse(&vec!["2"; n].join(" ^ ")).unwrap_err()));
        assert!(too_deep(
            parse(&format!("{}1{}", "abs(".repeat(n), ")".repeat(n))).unwrap_err()
        ));
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let n = 60;
        let parens = format!("{}@A{}", "(".repeat(n), ")".repeat(n));
        assert_eq!(parse(&parens).unwrap(), Expr::Field("A".into()));
        assert!(parse(&vec!["1"; 100].join(" + ")).is_ok());
        assert!(parse(&vec!["@A > 0"; 50].join(" && ")).is_ok());
    }
}
