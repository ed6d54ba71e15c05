//! `formkit inspect`

use super::load_schema;
use crate::output::OutputFormat;
use clap::Args;
use formkit_common::EngineConfig;
use formkit_engine::{EngineOptions, FormEngine};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tabled::Tabled;

#[derive(Args)]
pub struct InspectArgs {
    /// Schema JSON file
    #[arg(long, short)]
    schema: PathBuf,
    /// Transaction code (defaults to the configured one)
    #[arg(long)]
    transaction: Option<String>,
    /// Calculation step (defaults to the configured one)
    #[arg(long)]
    step: Option<String>,
    /// Fail when rules or default expressions are circular
    #[arg(long)]
    strict: bool,
}

#[derive(Serialize)]
struct InspectReport {
    product: String,
    transaction_code: String,
    calc_step: String,
    fields: Vec<FieldSummary>,
    evaluation_order: Vec<String>,
    cycles: Vec<Vec<String>>,
    rule_counts: BTreeMap<String, usize>,
}

#[derive(Serialize, Tabled)]
struct FieldSummary {
    section: String,
    keyword: String,
    #[tabled(rename = "type")]
    field_type: String,
    value: String,
    visible: bool,
    mandatory: bool,
    rules: usize,
}

pub fn handle(args: InspectArgs, config: &EngineConfig, format: OutputFormat) -> anyhow::Result<()> {
    let schema = load_schema(&args.schema)?;
    let mut options = EngineOptions::new().with_config(config.clone());
    options.transaction_code = args.transaction;
    options.calc_step = args.step;
    let (transaction_code, calc_step) = options.context();

    let engine = FormEngine::initialize(&schema, options);
    if args.strict {
        engine.ensure_acyclic()?;
    }

    let rule_counts: BTreeMap<String, usize> = engine
        .validation_rules()
        .iter()
        .map(|(field, rules)| (field.clone(), rules.len()))
        .collect();

    let fields: Vec<FieldSummary> = engine
        .sections()
        .into_iter()
        .flat_map(|section| {
            let name = section.name;
            section.fields.into_iter().map(move |f| (name.clone(), f))
        })
        .map(|(section, f)| FieldSummary {
            rules: rule_counts.get(&f.definition.keyword).copied().unwrap_or(0),
            section,
            field_type: format!("{:?}", f.definition.field_type),
            value: f.value.unwrap_or_default(),
            visible: f.visible,
            mandatory: f.mandatory,
            keyword: f.definition.keyword,
        })
        .collect();

    let report = InspectReport {
        product: schema.product_name.clone(),
        transaction_code,
        calc_step,
        evaluation_order: engine.resolver().evaluation_order().to_vec(),
        cycles: engine.resolver().get_circular_dependencies().to_vec(),
        rule_counts,
        fields,
    };

    match format {
        OutputFormat::Table => {
            println!(
                "{} ({} / {})",
                report.product, report.transaction_code, report.calc_step
            );
            println!("evaluation order: {}", report.evaluation_order.join(", "));
            for cycle in &report.cycles {
                println!("cycle: {}", cycle.join(" -> "));
            }
            format.emit(&report, report.fields.iter().collect::<Vec<_>>())
        }
        _ => format.emit(&report, Vec::<&FieldSummary>::new()),
    }
}
