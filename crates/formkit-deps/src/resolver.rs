//! Per-field UI-state calculation over the dependency graph

use crate::graph::DependencyGraph;
use formkit_common::{
    DependencyAction, FieldDependency, FormState, UiFlags, ValueDependency, ValueMap,
};
use formkit_expr::{EvalContext, ExpressionEvaluator};
use std::sync::Arc;
use tracing::debug;

/// Resolves visibility, disabled, readonly and mandatory flags from rules
///
/// Holds no per-call state: every calculation reads the state it is given.
pub struct DependencyResolver {
    graph: DependencyGraph,
    evaluator: Arc<ExpressionEvaluator>,
    defaults: UiFlags,
}

impl DependencyResolver {
    /// Create resolver over a rule set
    pub fn new(
        field_rules: Vec<FieldDependency>,
        value_rules: Vec<ValueDependency>,
        evaluator: Arc<ExpressionEvaluator>,
    ) -> Self {
        let graph = DependencyGraph::build(&field_rules, &value_rules, &evaluator);
        debug!(
            nodes = graph.len(),
            cycles = graph.cycles().len(),
            "dependency graph built"
        );
        Self {
            graph,
            evaluator,
            defaults: UiFlags::default(),
        }
    }

    /// Create resolver from the rules that apply to one transaction/step
    pub fn for_context(
        field_rules: &[FieldDependency],
        value_rules: &[ValueDependency],
        transaction_code: &str,
        calc_step: &str,
        evaluator: Arc<ExpressionEvaluator>,
    ) -> Self {
        let field_rules = field_rules
            .iter()
            .filter(|r| r.in_context(transaction_code, calc_step))
            .cloned()
            .collect();
        let value_rules = value_rules
            .iter()
            .filter(|r| r.in_context(transaction_code, calc_step))
            .cloned()
            .collect();
        Self::new(field_rules, value_rules, evaluator)
    }

    /// Static per-field flags used when no rule decides
    pub fn with_defaults(mut self, defaults: UiFlags) -> Self {
        self.defaults = defaults;
        self
    }

    // =========================================================================
    // Rule matching
    // =========================================================================

    fn trigger_matches(
        &self,
        changed_keyword: &str,
        literal: Option<&str>,
        gate: Option<&str>,
        values: &ValueMap,
    ) -> bool {
        if let Some(expression) = gate {
            return self
                .evaluator
                .evaluate_boolean(expression, &EvalContext::new(values));
        }
        let current = values.get(changed_keyword).map(String::as_str).unwrap_or("");
        if current.is_empty() {
            return false;
        }
        match literal {
            Some(expected) if !expected.is_empty() => current == expected,
            _ => true,
        }
    }

    fn field_rule_matches(&self, rule: &FieldDependency, values: &ValueMap) -> bool {
        self.trigger_matches(
            &rule.changed_keyword,
            rule.changed_keyword_value.as_deref(),
            rule.gate(),
            values,
        )
    }

    fn value_rule_matches(&self, rule: &ValueDependency, values: &ValueMap) -> bool {
        let gate = rule.expression.as_deref().filter(|e| !e.trim().is_empty());
        self.trigger_matches(
            &rule.changed_keyword,
            Some(rule.changed_keyword_value.as_str()),
            gate,
            values,
        )
    }

    fn any_field_rule(&self, field: &str, action: DependencyAction, state: &FormState) -> bool {
        self.graph.node(field).is_some_and(|node| {
            node.field_rules
                .iter()
                .filter(|r| r.action == action)
                .any(|r| self.field_rule_matches(r, &state.values))
        })
    }

    // =========================================================================
    // Flag calculation
    // =========================================================================

    /// Hide rules win; active show rules must have one match; otherwise the default
    pub fn calculate_visibility(&self, field: &str, state: &FormState) -> bool {
        let default = self.defaults.visibility.get(field).copied().unwrap_or(true);
        let Some(node) = self.graph.node(field) else {
            return default;
        };

        let mut active_show = false;
        let mut show_met = false;
        for rule in &node.field_rules {
            match rule.action {
                DependencyAction::Hide => {
                    if self.field_rule_matches(rule, &state.values) {
                        return false;
                    }
                }
                DependencyAction::Show => {
                    if state.has_value(&rule.changed_keyword) {
                        active_show = true;
                        show_met |= self.field_rule_matches(rule, &state.values);
                    }
                }
                _ => {}
            }
        }

        if active_show {
            show_met
        } else {
            default
        }
    }

    /// Disable match (field- or value-level), then enable match, then the static default
    pub fn calculate_disabled(&self, field: &str, state: &FormState) -> bool {
        if self.any_field_rule(field, DependencyAction::Disable, state) {
            return true;
        }
        let value_disabled = self.graph.node(field).is_some_and(|node| {
            node.value_rules
                .iter()
                .filter(|r| r.action == DependencyAction::Disable)
                .any(|r| self.value_rule_matches(r, &state.values))
        });
        if value_disabled {
            return true;
        }
        if self.any_field_rule(field, DependencyAction::Enable, state) {
            return false;
        }
        self.defaults.disabled.get(field).copied().unwrap_or(false)
    }

    /// Any matching readonly rule
    pub fn calculate_readonly(&self, field: &str, state: &FormState) -> bool {
        self.any_field_rule(field, DependencyAction::Readonly, state)
            || self.defaults.readonly.get(field).copied().unwrap_or(false)
    }

    /// Mandatory match, then optional match, then the static default
    pub fn calculate_mandatory(&self, field: &str, state: &FormState) -> bool {
        if self.any_field_rule(field, DependencyAction::Mandatory, state) {
            return true;
        }
        if self.any_field_rule(field, DependencyAction::Optional, state) {
            return false;
        }
        self.defaults.mandatory.get(field).copied().unwrap_or(false)
    }

    /// Whether value-level rules let `option_value` of `field` be offered
    ///
    /// The first show rule naming the option decides; a matching hide rule
    /// removes it. Options no rule names are always offered.
    pub fn is_option_offered(&self, field: &str, option_value: &str, values: &ValueMap) -> bool {
        let Some(node) = self.graph.node(field) else {
            return true;
        };
        for rule in node
            .value_rules
            .iter()
            .filter(|r| r.actioned_keyword_value == option_value)
        {
            match rule.action {
                DependencyAction::Show => return self.value_rule_matches(rule, values),
                DependencyAction::Hide if self.value_rule_matches(rule, values) => return false,
                _ => {}
            }
        }
        true
    }

    // =========================================================================
    // State transitions
    // =========================================================================

    /// Downstream fields to recompute after `field` changes
    pub fn get_affected_fields(&self, field: &str) -> Vec<String> {
        self.graph.affected_fields(field)
    }

    /// Set `field` and recompute every affected field's flags from the new values
    pub fn update_form_state(&self, field: &str, value: &str, state: &FormState) -> FormState {
        let mut next = state.clone();
        next.values.insert(field.to_string(), value.to_string());

        let affected = self.get_affected_fields(field);
        debug!(field, affected = affected.len(), "recomputing dependent flags");
        for target in &affected {
            self.apply_flags(target, &mut next);
        }
        next
    }

    /// Recompute flags for every field some rule targets
    pub fn recalculate_all(&self, state: &FormState) -> FormState {
        let mut next = state.clone();
        let targets: Vec<String> = self
            .graph
            .nodes()
            .filter(|node| node.has_rules())
            .map(|node| node.field.clone())
            .collect();
        for target in &targets {
            self.apply_flags(target, &mut next);
        }
        next
    }

    /// Recompute the flags of the given fields, in order
    pub fn recalculate_fields<'a>(
        &self,
        fields: impl IntoIterator<Item = &'a String>,
        state: &FormState,
    ) -> FormState {
        let mut next = state.clone();
        for field in fields {
            self.apply_flags(field, &mut next);
        }
        next
    }

    fn apply_flags(&self, field: &str, state: &mut FormState) {
        let visible = self.calculate_visibility(field, state);
        let disabled = self.calculate_disabled(field, state);
        let readonly = self.calculate_readonly(field, state);
        let mandatory = self.calculate_mandatory(field, state);
        state.visibility.insert(field.to_string(), visible);
        state.disabled.insert(field.to_string(), disabled);
        state.readonly.insert(field.to_string(), readonly);
        state.mandatory.insert(field.to_string(), mandatory);
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Dependencies before dependents
    pub fn evaluation_order(&self) -> &[String] {
        self.graph.evaluation_order()
    }

    /// Whether any cycle was detected
    pub fn has_circular_dependencies(&self) -> bool {
        !self.graph.cycles().is_empty()
    }

    /// Detected cycles as closed paths
    pub fn get_circular_dependencies(&self) -> &[Vec<String>] {
        self.graph.cycles()
    }

    /// Underlying graph
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Shared evaluator
    pub fn evaluator(&self) -> &Arc<ExpressionEvaluator> {
        &self.evaluator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DependencyAction::*;

    fn resolver(rules: Vec<FieldDependency>) -> DependencyResolver {
        DependencyResolver::new(rules, vec![], Arc::new(ExpressionEvaluator::new()))
    }

    fn state(pairs: &[(&str, &str)]) -> FormState {
        FormState::with_values(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_show_rule_literal() {
        let r = resolver(vec![FieldDependency::on_value(
            "PR_VARIANT",
            "VARIANT_B",
            Show,
            "RIDER_AMOUNT",
        )]);
        // no active show rule yet
        assert!(r.calculate_visibility("RIDER_AMOUNT", &state(&[])));
        assert!(!r.calculate_visibility("RIDER_AMOUNT", &state(&[("PR_VARIANT", "VARIANT_A")])));
        assert!(r.calculate_visibility("RIDER_AMOUNT", &state(&[("PR_VARIANT", "VARIANT_B")])));
    }

    #[test]
    fn test_hide_wins_over_show() {
        let r = resolver(vec![
            FieldDependency::on_value("A", "1", Show, "T"),
            FieldDependency::on_expression("B", "@B == 'x'", Hide, "T"),
        ]);
        assert!(!r.calculate_visibility("T", &state(&[("A", "1"), ("B", "x")])));
        assert!(r.calculate_visibility("T", &state(&[("A", "1"), ("B", "y")])));
    }

    #[test]
    fn test_expression_show_rule() {
        let r = resolver(vec![FieldDependency::on_expression("AGE", "@AGE >= 60", Show, "SENIOR")]);
        assert!(r.calculate_visibility("SENIOR", &state(&[])));
        assert!(!r.calculate_visibility("SENIOR", &state(&[("AGE", "30")])));
        assert!(r.calculate_visibility("SENIOR", &state(&[("AGE", "61")])));
    }

    #[test]
    fn test_default_visibility_used_when_no_rule_decides() {
        let mut defaults = UiFlags::default();
        defaults.visibility.insert("T".into(), false);
        let r = resolver(vec![FieldDependency::on_value("A", "1", Show, "T")]).with_defaults(defaults);
        assert!(!r.calculate_visibility("T", &state(&[])));
        assert!(r.calculate_visibility("T", &state(&[("A", "1")])));
    }

    #[test]
    fn test_disabled_and_readonly() {
        let r = DependencyResolver::new(
            vec![
                FieldDependency::on_expression("A", "@A > 10", Disable, "T"),
                FieldDependency::on_value("B", "LOCK", Readonly, "T"),
            ],
            vec![ValueDependency::new("C", "OFF", Disable, "T", "")],
            Arc::new(ExpressionEvaluator::new()),
        );
        assert!(!r.calculate_disabled("T", &state(&[("A", "5")])));
        assert!(r.calculate_disabled("T", &state(&[("A", "50")])));
        assert!(r.calculate_disabled("T", &state(&[("C", "OFF")])));
        assert!(r.calculate_readonly("T", &state(&[("B", "LOCK")])));
        assert!(!r.calculate_readonly("T", &state(&[("B", "OPEN")])));
        // value-level rules never touch visibility
        assert!(r.calculate_visibility("T", &state(&[("C", "OFF")])));
    }

    #[test]
    fn test_mandatory_precedence() {
        let mut defaults = UiFlags::default();
        defaults.mandatory.insert("T".into(), true);
        let r = resolver(vec![
            FieldDependency::on_value("A", "Y", Mandatory, "T"),
            FieldDependency::on_value("B", "Y", Optional, "T"),
        ])
        .with_defaults(defaults);
        assert!(r.calculate_mandatory("T", &state(&[])));
        assert!(!r.calculate_mandatory("T", &state(&[("B", "Y")])));
        assert!(r.calculate_mandatory("T", &state(&[("A", "Y"), ("B", "Y")])));
    }

    #[test]
    fn test_enable_rule_overrides_default() {
        let mut defaults = UiFlags::default();
        defaults.disabled.insert("T".into(), true);
        let r = resolver(vec![
            FieldDependency::on_value("A", "Y", Enable, "T"),
            FieldDependency::on_value("B", "Y", Disable, "T"),
        ])
        .with_defaults(defaults);
        assert!(r.calculate_disabled("T", &state(&[])));
        assert!(!r.calculate_disabled("T", &state(&[("A", "Y")])));
        assert!(r.calculate_disabled("T", &state(&[("A", "N")])));
        // disable still wins over enable
        assert!(r.calculate_disabled("T", &state(&[("A", "Y"), ("B", "Y")])));

        let next = r.update_form_state("A", "Y", &state(&[]));
        assert!(!next.is_disabled("T"));
    }

    #[test]
    fn test_rule_without_trigger_value_matches_any_value() {
        let r = resolver(vec![FieldDependency {
            changed_keyword_value: None,
            ..FieldDependency::on_value("A", "", Disable, "T")
        }]);
        assert!(!r.calculate_disabled("T", &state(&[])));
        assert!(r.calculate_disabled("T", &state(&[("A", "anything")])));
    }

    #[test]
    fn test_update_form_state_cascades() {
        let r = resolver(vec![
            FieldDependency::on_value("A", "1", Show, "B"),
            FieldDependency::on_expression("B", "@A == '1'", Disable, "C"),
        ]);
        let next = r.update_form_state("A", "2", &state(&[]));
        assert_eq!(next.value("A"), Some("2"));
        assert!(!next.is_visible("B"));
        assert!(!next.is_disabled("C"));

        let next = r.update_form_state("A", "1", &next);
        assert!(next.is_visible("B"));
        assert!(next.is_disabled("C"));
    }

    #[test]
    fn test_option_filters() {
        let r = DependencyResolver::new(
            vec![],
            vec![
                ValueDependency::new("PLAN", "BASIC", Hide, "TERM", "30"),
                ValueDependency::new("PLAN", "GOLD", Show, "TERM", "40"),
            ],
            Arc::new(ExpressionEvaluator::new()),
        );
        let basic = state(&[("PLAN", "BASIC")]).values;
        let gold = state(&[("PLAN", "GOLD")]).values;
        assert!(!r.is_option_offered("TERM", "30", &basic));
        assert!(!r.is_option_offered("TERM", "40", &basic));
        assert!(r.is_option_offered("TERM", "40", &gold));
        assert!(r.is_option_offered("TERM", "30", &gold));
        assert!(r.is_option_offered("TERM", "10", &basic));
        assert!(r.is_option_offered("OTHER", "x", &basic));
    }

    #[test]
    fn test_for_context_filters_rules() {
        let mut other = FieldDependency::on_value("A", "1", Hide, "T");
        other.transaction_code = "ENDT".into();
        let r = DependencyResolver::for_context(
            &[other, FieldDependency::on_value("A", "2", Hide, "T")],
            &[],
            "ISSU",
            "NBQUOTE",
            Arc::new(ExpressionEvaluator::new()),
        );
        assert!(r.calculate_visibility("T", &state(&[("A", "1")])));
        assert!(!r.calculate_visibility("T", &state(&[("A", "2")])));
    }
}
