//! Safe formula language for form defaults, dependency gates and validations
//!
//! Expressions reference form fields with an `@` sigil and are parsed into an
//! AST, never handed to a general-purpose evaluator.
//!
//! # Pipeline
//!
//! ```text
//!   "@PREMIUM * 10"
//!         │
//!         ▼
//!   ┌────────────┐  miss  ┌────────┐   ┌────────┐
//!   │ ParseCache │──────► │ lexer  │──►│ parser │──┐
//!   └─────┬──────┘        └────────┘   └────────┘  │ insert
//!         │ hit                                     │
//!         ▼                                         │
//!   ParsedExpression ◄──────────────────────────────┘
//!         │
//!         ▼  EvalContext (values + optional override)
//!   ┌────────────┐
//!   │    eval    │──► Value
//!   └────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use formkit_common::ValueMap;
//! use formkit_expr::{EvalContext, ExpressionEvaluator, Value};
//!
//! let evaluator = ExpressionEvaluator::new();
//! let mut values = ValueMap::new();
//! values.insert("PREMIUM".into(), "2000".into());
//!
//! let result = evaluator
//!     .evaluate("@PREMIUM * 10", &EvalContext::new(&values))
//!     .unwrap();
//! assert_eq!(result.value, Value::Number(20000.0));
//! assert_eq!(result.dependencies, vec!["PREMIUM".to_string()]);
//! ```

#![warn(clippy::all)]

pub mod cache;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod value;

pub use cache::{BoundedParseCache, ParseCache, UnboundedParseCache};
pub use error::ExprError;
pub use eval::EvalContext;
pub use parser::{Expr, Function};
pub use value::{format_number, Value};

use formkit_common::CachePolicy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Field references, matched textually so malformed input still reports them
fn reference_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"@([A-Za-z_][A-Za-z0-9_]*)").ok())
        .as_ref()
}

/// Extract referenced field names in first-occurrence order
pub fn extract_references(expression: &str) -> Vec<String> {
    let mut seen = Vec::new();
    let Some(pattern) = reference_pattern() else {
        return seen;
    };
    for caps in pattern.captures_iter(expression) {
        let name = &caps[1];
        if !seen.iter().any(|s: &String| s == name) {
            seen.push(name.to_string());
        }
    }
    seen
}

/// A parsed expression as held in the cache
#[derive(Debug, Clone)]
pub struct ParsedExpression {
    /// Source text
    pub raw: String,
    /// Tree, or why it could not be built
    pub ast: Result<Expr, ExprError>,
    /// Referenced fields, first-occurrence order
    pub variables: Vec<String>,
    /// Contains `?:` or `if()`
    pub has_conditional: bool,
    /// Contains arithmetic
    pub has_math: bool,
}

impl ParsedExpression {
    fn build(raw: &str) -> Self {
        let variables = extract_references(raw);
        let ast = if raw.trim().is_empty() {
            Ok(Expr::Literal(Value::Null))
        } else {
            parser::parse(raw)
        };
        let (has_conditional, has_math) = match &ast {
            Ok(expr) => (expr.has_conditional(), expr.has_math()),
            Err(_) => (false, false),
        };
        Self {
            raw: raw.to_string(),
            ast,
            variables,
            has_conditional,
            has_math,
        }
    }

    /// Whether parsing succeeded
    pub fn is_valid(&self) -> bool {
        self.ast.is_ok()
    }
}

/// Successful evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    /// Computed value
    pub value: Value,
    /// Fields the expression references
    pub dependencies: Vec<String>,
}

/// Evaluator counters
#[derive(Debug, Clone, Serialize)]
pub struct EvaluatorStats {
    /// Calls to `evaluate`
    pub evaluations: u64,
    /// Parses served from cache
    pub cache_hits: u64,
    /// Evaluations that returned an error
    pub failures: u64,
    /// Entries currently cached
    pub cached_expressions: u64,
}

/// Running totals behind [`EvaluatorStats`]
#[derive(Debug, Default)]
struct Usage {
    evaluations: AtomicU64,
    cache_hits: AtomicU64,
    failures: AtomicU64,
}

impl Usage {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self, cached_expressions: u64) -> EvaluatorStats {
        EvaluatorStats {
            evaluations: self.evaluations.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            cached_expressions,
        }
    }
}

/// Expression evaluator with an injectable parse cache
///
/// `Send + Sync`; share one instance behind an `Arc`.
pub struct ExpressionEvaluator {
    cache: Arc<dyn ParseCache>,
    usage: Usage,
}

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionEvaluator {
    /// Evaluator with an unbounded cache
    pub fn new() -> Self {
        Self::with_cache(Arc::new(UnboundedParseCache::new()))
    }

    /// Evaluator over a caller-supplied cache
    pub fn with_cache(cache: Arc<dyn ParseCache>) -> Self {
        Self {
            cache,
            usage: Usage::default(),
        }
    }

    /// Evaluator whose cache follows `policy`
    pub fn from_policy(policy: &CachePolicy) -> Self {
        Self::with_cache(cache::from_policy(policy))
    }

    /// Parse (memoized by raw text)
    pub fn parse_expression(&self, expression: &str) -> Arc<ParsedExpression> {
        if let Some(parsed) = self.cache.get(expression) {
            Usage::bump(&self.usage.cache_hits);
            return parsed;
        }
        let parsed = Arc::new(ParsedExpression::build(expression));
        if let Err(e) = &parsed.ast {
            debug!(expression, error = %e, "expression failed to parse");
        }
        self.cache.insert(expression, Arc::clone(&parsed));
        parsed
    }

    /// Evaluate against a context
    pub fn evaluate(
        &self,
        expression: &str,
        ctx: &EvalContext<'_>,
    ) -> Result<EvaluationResult, ExprError> {
        Usage::bump(&self.usage.evaluations);
        let parsed = self.parse_expression(expression);

        let outcome = match &parsed.ast {
            Ok(ast) => eval::eval(ast, ctx),
            Err(e) => Err(e.clone()),
        };

        match outcome {
            Ok(value) => Ok(EvaluationResult {
                value,
                dependencies: parsed.variables.clone(),
            }),
            Err(e) => {
                Usage::bump(&self.usage.failures);
                Err(e)
            }
        }
    }

    /// Evaluate as a condition; errors and falsy results are `false`
    pub fn evaluate_boolean(&self, expression: &str, ctx: &EvalContext<'_>) -> bool {
        self.evaluate(expression, ctx)
            .map(|r| r.value.is_truthy())
            .unwrap_or(false)
    }

    /// Pick `if_true` or `if_false` by a condition
    ///
    /// A condition that fails to evaluate is returned as the error.
    pub fn evaluate_conditional(
        &self,
        condition: &str,
        if_true: Value,
        if_false: Value,
        ctx: &EvalContext<'_>,
    ) -> Result<EvaluationResult, ExprError> {
        let cond = self.evaluate(condition, ctx)?;
        let value = if cond.value.is_truthy() { if_true } else { if_false };
        Ok(EvaluationResult {
            value,
            dependencies: cond.dependencies,
        })
    }

    /// Evaluate a named set of expressions against one context
    pub fn evaluate_batch(
        &self,
        expressions: &BTreeMap<String, String>,
        ctx: &EvalContext<'_>,
    ) -> BTreeMap<String, Result<EvaluationResult, ExprError>> {
        expressions
            .iter()
            .map(|(key, expr)| (key.clone(), self.evaluate(expr, ctx)))
            .collect()
    }

    /// Referenced fields; works on malformed expressions too
    pub fn get_dependencies(&self, expression: &str) -> Vec<String> {
        self.parse_expression(expression).variables.clone()
    }

    /// Whether the expression parses
    pub fn is_valid_expression(&self, expression: &str) -> bool {
        self.parse_expression(expression).is_valid()
    }

    /// Drop all cached parses
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Get evaluator statistics
    pub fn stats(&self) -> EvaluatorStats {
        self.usage.snapshot(self.cache.len())
    }
}
