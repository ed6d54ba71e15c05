//! Session-level properties

use formkit_common::{
    DependencyAction, FieldDefinition, FieldDependency, FormError, ProductSchema, UiBehavior,
};
use formkit_engine::{EngineOptions, FormEngine};
use proptest::prelude::*;

fn field(keyword: &str) -> FieldDefinition {
    let mut f = FieldDefinition::new(keyword, keyword);
    f.transaction_code = "ISSU".into();
    f.calc_step = "NBQUOTE".into();
    f
}

fn gated_schema() -> ProductSchema {
    let mut detail = field("DETAIL");
    detail.is_mandatory = true;
    detail.min_length = Some(3);
    ProductSchema {
        fields: vec![field("MODE"), detail, field("AMOUNT")],
        field_dependencies: vec![
            FieldDependency::on_value("MODE", "SHORT", DependencyAction::Hide, "DETAIL"),
            FieldDependency::on_expression(
                "AMOUNT",
                "@AMOUNT > 100",
                DependencyAction::Disable,
                "MODE",
            ),
        ],
        ..Default::default()
    }
}

proptest! {
    #[test]
    fn prop_update_is_idempotent(
        mode in prop::sample::select(vec!["SHORT", "LONG", ""]),
        amount in 0u32..500,
    ) {
        let engine = FormEngine::initialize(&gated_schema(), EngineOptions::new());
        let resolver = engine.resolver();
        let amount = amount.to_string();

        let once = resolver.update_form_state("MODE", mode, engine.state());
        let once = resolver.update_form_state("AMOUNT", &amount, &once);
        let twice = resolver.update_form_state("AMOUNT", &amount, &once);
        let twice = resolver.update_form_state("MODE", mode, &twice);

        prop_assert_eq!(&once.values, &twice.values);
        prop_assert_eq!(once.ui_flags(), twice.ui_flags());
    }

    #[test]
    fn prop_hidden_fields_never_error(detail in proptest::option::of("[a-z]{0,5}")) {
        let mut engine = FormEngine::initialize(&gated_schema(), EngineOptions::new());
        engine.change("MODE", "SHORT");
        if let Some(detail) = detail {
            engine.change("DETAIL", detail);
        }
        prop_assert!(!engine.is_visible("DETAIL"));

        engine.blur("DETAIL");
        let result = engine.validate();
        prop_assert!(result.valid);
        prop_assert!(!engine.errors().contains_key("DETAIL"));
    }
}

#[test]
fn test_blur_validates_hidden_field() {
    let mut engine = FormEngine::initialize(&gated_schema(), EngineOptions::new());
    engine.change("MODE", "SHORT");
    assert!(!engine.is_visible("DETAIL"));

    engine.blur("DETAIL");
    assert_eq!(engine.errors()["DETAIL"], vec!["DETAIL is required".to_string()]);

    // whole-form validation still exempts it
    assert!(engine.validate().valid);
    assert!(!engine.errors().contains_key("DETAIL"));
}

#[test]
fn test_declared_hidden_field_is_exempt() {
    let mut secret = field("SECRET");
    secret.is_mandatory = true;
    secret.default_ui_behavior = UiBehavior::Hide;
    let schema = ProductSchema {
        fields: vec![secret],
        ..Default::default()
    };
    let mut engine = FormEngine::initialize(&schema, EngineOptions::new());
    assert!(engine.submit().is_ok());
}

#[test]
fn test_rule_cycle_reported_as_closed_path() {
    let schema = ProductSchema {
        fields: vec![field("A"), field("B")],
        field_dependencies: vec![
            FieldDependency::on_value("A", "Y", DependencyAction::Show, "B"),
            FieldDependency::on_value("B", "Y", DependencyAction::Show, "A"),
        ],
        ..Default::default()
    };
    let mut engine = FormEngine::initialize(&schema, EngineOptions::new());
    assert!(engine.resolver().has_circular_dependencies());

    match engine.ensure_acyclic() {
        Err(FormError::CircularDependency { cycles }) => {
            assert!(!cycles.is_empty());
            for cycle in &cycles {
                assert!(cycle.len() >= 2);
                assert_eq!(cycle.first(), cycle.last());
            }
        }
        other => panic!("expected a cycle, got {:?}", other),
    }

    // cyclic sessions still run
    engine.change("A", "Y");
    assert_eq!(engine.field_value("A"), Some("Y"));
}

#[test]
fn test_default_expression_cycle_reported() {
    let mut a = field("A");
    a.default_value = Some("@B + 1".into());
    let mut b = field("B");
    b.default_value = Some("@A + 1".into());
    let schema = ProductSchema {
        fields: vec![a, b],
        ..Default::default()
    };
    let engine = FormEngine::initialize(&schema, EngineOptions::new());
    assert!(matches!(
        engine.ensure_acyclic(),
        Err(FormError::CircularDependency { .. })
    ));
}

#[test]
fn test_cyclic_recalculation_is_deterministic() {
    let schema = ProductSchema {
        fields: vec![field("A"), field("B"), field("C")],
        field_dependencies: vec![
            FieldDependency::on_value("A", "Y", DependencyAction::Show, "B"),
            FieldDependency::on_value("B", "Y", DependencyAction::Hide, "C"),
            FieldDependency::on_value("C", "Y", DependencyAction::Disable, "A"),
            FieldDependency::on_expression("B", "@B == 'Y'", DependencyAction::Mandatory, "A"),
        ],
        ..Default::default()
    };
    let options = || {
        EngineOptions::new()
            .with_value("A", "Y")
            .with_value("B", "Y")
            .with_value("C", "Y")
    };
    let first = FormEngine::initialize(&schema, options());
    let second = FormEngine::initialize(&schema, options());
    assert!(first.resolver().has_circular_dependencies());

    let order = first.resolver().evaluation_order().to_vec();
    assert_eq!(order, second.resolver().evaluation_order());

    let once = first.resolver().recalculate_all(first.state());
    let twice = first.resolver().recalculate_all(&once);
    let other = second.resolver().recalculate_all(second.state());
    assert_eq!(once.ui_flags(), twice.ui_flags());
    assert_eq!(once.ui_flags(), other.ui_flags());
    assert_eq!(first.resolver().evaluation_order(), order.as_slice());

    assert!(once.is_visible("B"));
    assert!(!once.is_visible("C"));
    assert!(once.is_disabled("A"));
}
