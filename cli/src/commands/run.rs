//! `formkit run`

use super::{load_schema, load_values, parse_assignment};
use crate::output::OutputFormat;
use clap::Args;
use formkit_common::{EngineConfig, FormState};
use formkit_engine::{EngineOptions, FormEngine, FormEvent};
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;
use tracing::info;

/// Events are replayed as: every `--set` in order, every `--blur`,
/// then `--reset`, then `--validate`.
#[derive(Args)]
pub struct RunArgs {
    /// Schema JSON file
    #[arg(long, short)]
    schema: PathBuf,
    /// Initial values (JSON object)
    #[arg(long)]
    values: Option<PathBuf>,
    /// Transaction code (defaults to the configured one)
    #[arg(long)]
    transaction: Option<String>,
    /// Calculation step (defaults to the configured one)
    #[arg(long)]
    step: Option<String>,
    /// Change a field: KEY=VALUE
    #[arg(long = "set", value_parser = parse_assignment)]
    changes: Vec<(String, String)>,
    /// Blur a field
    #[arg(long = "blur")]
    blurs: Vec<String>,
    /// Reset the form after the edits
    #[arg(long)]
    reset: bool,
    /// Validate the whole form at the end
    #[arg(long)]
    validate: bool,
}

#[derive(Serialize)]
struct RunReport {
    state: FormState,
    events: Vec<FormEvent>,
}

#[derive(Tabled)]
struct FieldRow {
    field: String,
    value: String,
    visible: bool,
    disabled: bool,
    readonly: bool,
    mandatory: bool,
    errors: String,
}

pub fn handle(args: RunArgs, config: &EngineConfig, format: OutputFormat) -> anyhow::Result<()> {
    let schema = load_schema(&args.schema)?;
    let initial = match &args.values {
        Some(path) => load_values(path)?,
        None => Default::default(),
    };

    let mut options = EngineOptions::new()
        .with_config(config.clone())
        .with_values(initial);
    options.transaction_code = args.transaction;
    options.calc_step = args.step;

    let mut engine = FormEngine::initialize(&schema, options);
    for (field, value) in args.changes {
        engine.change(&field, value);
    }
    for field in &args.blurs {
        engine.blur(field);
    }
    if args.reset {
        engine.reset();
    }
    if args.validate {
        let result = engine.validate();
        info!(valid = result.valid, failing = result.errors.len(), "validated");
    }

    let rows: Vec<FieldRow> = engine
        .fields()
        .iter()
        .map(|f| {
            let keyword = f.keyword.as_str();
            FieldRow {
                field: keyword.to_string(),
                value: engine.field_value(keyword).unwrap_or_default().to_string(),
                visible: engine.is_visible(keyword),
                disabled: engine.is_disabled(keyword),
                readonly: engine.is_readonly(keyword),
                mandatory: engine.is_mandatory(keyword),
                errors: engine.state().field_errors(keyword).join("; "),
            }
        })
        .collect();

    let report = RunReport {
        state: engine.state().clone(),
        events: engine.take_events(),
    };
    format.emit(&report, rows)
}
