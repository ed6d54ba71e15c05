//! `formkit eval`

use super::parse_assignment;
use crate::output::OutputFormat;
use anyhow::Context;
use clap::Args;
use formkit_common::{EngineConfig, ValueMap};
use formkit_expr::{EvalContext, ExpressionEvaluator, Value};
use serde::Serialize;
use tabled::Tabled;

#[derive(Args)]
pub struct EvalArgs {
    /// Expression text, e.g. "@PREMIUM * 10"
    expression: String,
    /// Field value: KEY=VALUE
    #[arg(long = "value", value_parser = parse_assignment)]
    values: Vec<(String, String)>,
}

#[derive(Serialize)]
struct EvalReport {
    expression: String,
    value: Value,
    dependencies: Vec<String>,
}

#[derive(Tabled)]
struct EvalRow {
    expression: String,
    value: String,
    dependencies: String,
}

pub fn handle(args: EvalArgs, config: &EngineConfig, format: OutputFormat) -> anyhow::Result<()> {
    let values: ValueMap = args.values.into_iter().collect();
    let evaluator = ExpressionEvaluator::from_policy(&config.parse_cache);
    let result = evaluator
        .evaluate(&args.expression, &EvalContext::new(&values))
        .with_context(|| format!("evaluating `{}`", args.expression))?;

    let row = EvalRow {
        expression: args.expression.clone(),
        value: result.value.to_canonical(),
        dependencies: result.dependencies.join(", "),
    };
    let report = EvalReport {
        expression: args.expression,
        value: result.value,
        dependencies: result.dependencies,
    };
    format.emit(&report, vec![row])
}
