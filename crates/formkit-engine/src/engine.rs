//! Form session orchestrator

use crate::events::FormEvent;
use crate::options::EngineOptions;
use crate::sections::{dedupe_and_sort, FormSection, SectionField, DEFAULT_SECTION};
use formkit_common::{
    CoercionError, ErrorMap, FieldDefinition, FieldDependency, FieldOption, FieldType, FieldValueEntry,
    FormError, FormResult, FormState, ProductSchema, ResetPolicy, TypedValue, UiBehavior, UiFlags,
    ValueMap,
};
use formkit_datasource::DataSourceResolver;
use formkit_deps::{topological_order, DependencyResolver};
use formkit_expr::{extract_references, EvalContext, ExpressionEvaluator};
use formkit_validate::{
    add_conditional_required, build_validation_rules, FormValidator, RuleSet, ValidationResult,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Callback fired after every accepted change
pub type ChangeListener = Box<dyn FnMut(&str, &str, &FormState) + Send>;

/// Sourced options keyed by the dependency values they were resolved under
type OptionMemo = BTreeMap<String, (Vec<Option<String>>, Vec<FieldOption>)>;

/// One form session over a product schema
///
/// Owns the [`FormState`]; every mutation goes through `&mut self`.
pub struct FormEngine {
    fields: Vec<FieldDefinition>,
    field_index: BTreeMap<String, usize>,
    state: FormState,
    initial_values: ValueMap,
    initial_flags: UiFlags,
    reset_policy: ResetPolicy,

    evaluator: Arc<ExpressionEvaluator>,
    resolver: DependencyResolver,
    data_sources: DataSourceResolver,
    validator: FormValidator,
    rules: RuleSet,

    /// Fields with a default expression, dependencies first
    default_order: Vec<String>,
    /// Field → fields whose default expression references it
    default_dependents: BTreeMap<String, BTreeSet<String>>,
    default_cycles: Vec<Vec<String>>,
    /// Sourced field → fields its option list reads
    source_dependencies: BTreeMap<String, Vec<String>>,
    option_memo: Mutex<OptionMemo>,

    listener: Option<ChangeListener>,
    events: Vec<FormEvent>,
}

impl std::fmt::Debug for FormEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormEngine")
            .field("fields", &self.fields.len())
            .field("state", &self.state)
            .field("reset_policy", &self.reset_policy)
            .finish_non_exhaustive()
    }
}

impl FormEngine {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Build a session for the options' transaction/step context
    pub fn initialize(schema: &ProductSchema, options: EngineOptions) -> Self {
        let (transaction_code, calc_step) = options.context();

        let mut fields: Vec<FieldDefinition> = schema
            .fields
            .iter()
            .filter(|f| f.in_context(&transaction_code, &calc_step))
            .cloned()
            .collect();
        attach_static_options(&mut fields, &schema.field_values, &transaction_code, &calc_step);

        let field_index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.keyword.clone(), i))
            .collect();

        let evaluator = Arc::new(ExpressionEvaluator::from_policy(&options.config.parse_cache));
        let static_flags = static_flags(&fields);
        let resolver = DependencyResolver::for_context(
            &schema.field_dependencies,
            &schema.value_dependencies,
            &transaction_code,
            &calc_step,
            Arc::clone(&evaluator),
        )
        .with_defaults(static_flags.clone());
        let data_sources = DataSourceResolver::new(
            Arc::new(schema.data_sources.clone()),
            Arc::clone(&evaluator),
        );
        let validator = FormValidator::new(Arc::clone(&evaluator));

        let context_rules: Vec<FieldDependency> = schema
            .field_dependencies
            .iter()
            .filter(|r| r.in_context(&transaction_code, &calc_step))
            .cloned()
            .collect();
        let mut rules = build_validation_rules(&fields);
        add_conditional_required(&mut rules, &fields, &context_rules);

        let mut default_refs: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for field in &fields {
            if let Some(expression) = default_expression(field) {
                let refs = extract_references(expression)
                    .into_iter()
                    .filter(|r| *r != field.keyword)
                    .collect();
                default_refs.insert(field.keyword.clone(), refs);
            }
        }
        let (order, default_cycles) = topological_order(&default_refs);
        let default_order = order
            .into_iter()
            .filter(|f| default_refs.contains_key(f))
            .collect();
        let mut default_dependents: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (field, refs) in &default_refs {
            for reference in refs {
                default_dependents
                    .entry(reference.clone())
                    .or_default()
                    .insert(field.clone());
            }
        }

        let source_dependencies = fields
            .iter()
            .filter(|f| f.data_source().is_some())
            .map(|f| (f.keyword.clone(), data_sources.get_data_source_dependencies(f)))
            .collect();

        let mut state = FormState::with_values(options.initial_values.clone());
        state.restore_ui_flags(static_flags);

        let mut engine = Self {
            fields,
            field_index,
            state,
            initial_values: options.initial_values,
            initial_flags: UiFlags::default(),
            reset_policy: options.config.reset_policy,
            evaluator,
            resolver,
            data_sources,
            validator,
            rules,
            default_order,
            default_dependents,
            default_cycles,
            source_dependencies,
            option_memo: Mutex::new(BTreeMap::new()),
            listener: None,
            events: Vec::new(),
        };

        engine.apply_defaults();
        engine.state = engine.resolver.recalculate_all(&engine.state);
        engine.initial_flags = engine.state.ui_flags();

        for cycle in engine.resolver.get_circular_dependencies() {
            warn!(cycle = %cycle.join(" -> "), "circular field dependency");
        }
        for cycle in &engine.default_cycles {
            warn!(cycle = %cycle.join(" -> "), "circular default expression");
        }
        info!(
            transaction_code = %transaction_code,
            calc_step = %calc_step,
            fields = engine.fields.len(),
            rules = engine.rules.len(),
            "form engine initialized"
        );
        engine
    }

    /// Register the change listener, replacing any previous one
    pub fn on_change(&mut self, listener: impl FnMut(&str, &str, &FormState) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Fill fields the caller left out; a supplied key wins even when empty
    fn apply_defaults(&mut self) {
        let mut values = std::mem::take(&mut self.state.values);

        for field in &self.fields {
            if values.contains_key(&field.keyword) || field.field_type != FieldType::List {
                continue;
            }
            if let Some(option) = field.static_options().find(|o| o.default_selected) {
                values.insert(field.keyword.clone(), option.value.clone());
            }
        }

        for keyword in &self.default_order {
            if values.contains_key(keyword) {
                continue;
            }
            let Some(field) = self.field(keyword) else {
                continue;
            };
            if let Some(value) = self.evaluate_default(field, &values) {
                values.insert(keyword.clone(), value);
            }
        }

        self.state.values = values;
    }

    /// Evaluate a field's default expression
    ///
    /// A failing expression without field references is taken as a literal.
    fn evaluate_default(&self, field: &FieldDefinition, values: &ValueMap) -> Option<String> {
        let expression = default_expression(field)?;
        match self.evaluator.evaluate(expression, &EvalContext::new(values)) {
            Ok(result) if result.value.is_null() => None,
            Ok(result) => Some(result.value.to_canonical()),
            Err(_) if extract_references(expression).is_empty() => Some(expression.to_string()),
            Err(e) => {
                debug!(field = %field.keyword, expression, error = %e, "default expression failed");
                None
            }
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Apply a user edit and everything it implies
    pub fn change(&mut self, field: &str, value: impl Into<String>) {
        let value = value.into();
        let mut next = self.resolver.update_form_state(field, &value, &self.state);
        let derived = self.cascade_defaults(field, &mut next);
        next.errors.remove(field);
        self.state = next;

        if let Some(listener) = self.listener.as_mut() {
            listener(field, &value, &self.state);
        }
        debug!(field, derived = derived.len(), "field changed");
        self.events.push(FormEvent::ValueChanged {
            field: field.to_string(),
            value,
            derived,
        });
    }

    /// Same as [`change`](Self::change)
    pub fn set_field_value(&mut self, field: &str, value: impl Into<String>) {
        self.change(field, value);
    }

    /// Re-evaluate every default expression downstream of `changed`
    ///
    /// Each field is evaluated at most once, in default-dependency order.
    /// Returns the fields whose value changed.
    fn cascade_defaults(&self, changed: &str, state: &mut FormState) -> Vec<String> {
        let mut reached: BTreeSet<&str> = BTreeSet::new();
        let mut pending = vec![changed];
        while let Some(current) = pending.pop() {
            let Some(dependents) = self.default_dependents.get(current) else {
                continue;
            };
            for dependent in dependents {
                if dependent != changed && reached.insert(dependent.as_str()) {
                    pending.push(dependent.as_str());
                }
            }
        }

        let mut derived = Vec::new();
        for keyword in self
            .default_order
            .iter()
            .filter(|k| reached.contains(k.as_str()))
        {
            let Some(field) = self.field(keyword) else {
                continue;
            };
            let Some(value) = self.evaluate_default(field, &state.values) else {
                continue;
            };
            if state.value(keyword) != Some(value.as_str()) {
                *state = self.resolver.update_form_state(keyword, &value, state);
                derived.push(keyword.clone());
            }
        }
        derived
    }

    /// Mark `field` touched and replace its errors with a fresh validation
    ///
    /// Runs the field's full rule set regardless of visibility; only
    /// [`validate`](Self::validate) exempts hidden fields.
    pub fn blur(&mut self, field: &str) {
        self.state.touched.insert(field.to_string());

        let errors = match self.rules.get(field) {
            Some(rules) => {
                self.validator
                    .validate_field(field, self.state.value(field), rules, &self.state)
            }
            None => Vec::new(),
        };

        let count = errors.len();
        if errors.is_empty() {
            self.state.errors.remove(field);
        } else {
            self.state.errors.insert(field.to_string(), errors);
        }
        self.events.push(FormEvent::Blurred {
            field: field.to_string(),
            errors: count,
        });
    }

    /// Validate every visible field and replace the error map
    pub fn validate(&mut self) -> ValidationResult {
        let visible: BTreeSet<String> = self
            .fields
            .iter()
            .filter(|f| self.state.is_visible(&f.keyword))
            .map(|f| f.keyword.clone())
            .collect();
        let result = self
            .validator
            .validate_form(&self.state, &self.rules, Some(&visible));
        self.state.errors = result.errors.clone();

        self.events.push(FormEvent::Validated {
            valid: result.valid,
            failing: result.errors.len(),
        });
        result
    }

    /// Validate and hand back the state when the form is clean
    pub fn submit(&mut self) -> FormResult<FormState> {
        let result = self.validate();
        if result.valid {
            Ok(self.state.clone())
        } else {
            Err(FormError::ValidationFailed {
                errors: result.errors,
            })
        }
    }

    /// Restore the initial values and clear errors and touched marks
    pub fn reset(&mut self) {
        self.state.values = self.initial_values.clone();
        self.state.errors.clear();
        self.state.touched.clear();
        if self.reset_policy == ResetPolicy::RestoreUiState {
            self.state.restore_ui_flags(self.initial_flags.clone());
        }
        self.option_memo.lock().clear();
        self.events.push(FormEvent::Reset);
    }

    /// Drain the events recorded since the last call
    pub fn take_events(&mut self) -> Vec<FormEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current state snapshot
    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// Current values
    pub fn values(&self) -> &ValueMap {
        &self.state.values
    }

    /// Current errors
    pub fn errors(&self) -> &ErrorMap {
        &self.state.errors
    }

    /// Raw value of a field
    pub fn field_value(&self, field: &str) -> Option<&str> {
        self.state.value(field)
    }

    /// Value decoded by the field's declared type
    ///
    /// Unknown fields decode as text.
    pub fn typed_value(&self, field: &str) -> Result<Option<TypedValue>, CoercionError> {
        let field_type = self.field(field).map(|f| f.field_type).unwrap_or_default();
        match self.state.value(field) {
            Some(raw) => field_type.decode(raw),
            None => Ok(None),
        }
    }

    /// Visibility flag
    pub fn is_visible(&self, field: &str) -> bool {
        self.state.is_visible(field)
    }

    /// Disabled flag
    pub fn is_disabled(&self, field: &str) -> bool {
        self.state.is_disabled(field)
    }

    /// Read-only flag
    pub fn is_readonly(&self, field: &str) -> bool {
        self.state.is_readonly(field)
    }

    /// Mandatory flag
    pub fn is_mandatory(&self, field: &str) -> bool {
        self.state.is_mandatory(field)
    }

    /// Fields of the active context, schema order
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Definition of one field
    pub fn field(&self, keyword: &str) -> Option<&FieldDefinition> {
        self.field_index.get(keyword).map(|&i| &self.fields[i])
    }

    /// Options currently offered for `field`
    ///
    /// Sourced lists come from the data-source resolver, static lists from
    /// the schema. Both are filtered by value-level rules, de-duplicated by
    /// value and sorted by sequence.
    pub fn field_options(&self, field: &str) -> Vec<FieldOption> {
        let Some(definition) = self.field(field) else {
            return Vec::new();
        };
        let raw = if definition.data_source().is_some() {
            self.sourced_options(definition)
        } else {
            definition.static_options().cloned().collect()
        };
        dedupe_and_sort(raw.into_iter().filter(|o| {
            self.resolver
                .is_option_offered(field, &o.value, &self.state.values)
        }))
    }

    fn sourced_options(&self, field: &FieldDefinition) -> Vec<FieldOption> {
        let key: Vec<Option<String>> = self
            .source_dependencies
            .get(&field.keyword)
            .map(|deps| deps.iter().map(|d| self.state.values.get(d).cloned()).collect())
            .unwrap_or_default();

        let mut memo = self.option_memo.lock();
        if let Some((cached_key, options)) = memo.get(&field.keyword) {
            if *cached_key == key {
                return options.clone();
            }
        }
        let options = self
            .data_sources
            .resolve_field_options(field, &self.state.values);
        memo.insert(field.keyword.clone(), (key, options.clone()));
        options
    }

    /// Fields grouped by section, sections sorted by name
    pub fn sections(&self) -> Vec<FormSection> {
        let mut grouped: BTreeMap<String, Vec<SectionField>> = BTreeMap::new();
        for definition in &self.fields {
            let name = match definition.section.trim() {
                "" => DEFAULT_SECTION,
                name => name,
            };
            grouped
                .entry(name.to_string())
                .or_default()
                .push(self.section_field(definition));
        }
        grouped
            .into_iter()
            .map(|(name, fields)| FormSection::new(name, fields))
            .collect()
    }

    fn section_field(&self, definition: &FieldDefinition) -> SectionField {
        let keyword = definition.keyword.as_str();
        SectionField {
            definition: definition.clone(),
            value: self.state.value(keyword).map(str::to_string),
            visible: self.state.is_visible(keyword),
            disabled: self.state.is_disabled(keyword),
            readonly: self.state.is_readonly(keyword),
            mandatory: self.state.is_mandatory(keyword),
            options: self.field_options(keyword),
            errors: self.state.field_errors(keyword).to_vec(),
        }
    }

    /// Dependency resolver
    pub fn resolver(&self) -> &DependencyResolver {
        &self.resolver
    }

    /// Validator
    pub fn validator(&self) -> &FormValidator {
        &self.validator
    }

    /// Derived validation rules
    pub fn validation_rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Shared expression evaluator
    pub fn evaluator(&self) -> &Arc<ExpressionEvaluator> {
        &self.evaluator
    }

    /// Fail when rules or default expressions form a cycle
    pub fn ensure_acyclic(&self) -> FormResult<()> {
        let cycles: Vec<Vec<String>> = self
            .resolver
            .get_circular_dependencies()
            .iter()
            .chain(&self.default_cycles)
            .cloned()
            .collect();
        if cycles.is_empty() {
            Ok(())
        } else {
            Err(FormError::CircularDependency { cycles })
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn default_expression(field: &FieldDefinition) -> Option<&str> {
    field
        .default_value
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
}

/// Attach the schema's static options to each non-sourced field
///
/// Fields with no matching options keep whatever they carried.
fn attach_static_options(
    fields: &mut [FieldDefinition],
    options: &[FieldOption],
    transaction_code: &str,
    calc_step: &str,
) {
    let mut grouped: BTreeMap<&str, Vec<FieldOption>> = BTreeMap::new();
    for option in options {
        let in_context = (option.transaction_code.is_empty()
            || option.transaction_code == transaction_code)
            && (option.calc_step.is_empty() || option.calc_step == calc_step);
        if in_context {
            grouped
                .entry(option.keyword.as_str())
                .or_default()
                .push(option.clone());
        }
    }

    for field in fields.iter_mut().filter(|f| f.data_source().is_none()) {
        if let Some(group) = grouped.remove(field.keyword.as_str()) {
            field.value_data = group.into_iter().map(FieldValueEntry::Option).collect();
        }
    }
}

/// Flags implied by each field's declared behaviour
fn static_flags(fields: &[FieldDefinition]) -> UiFlags {
    let mut flags = UiFlags::default();
    for field in fields {
        let keyword = field.keyword.clone();
        let behavior = field.default_ui_behavior;
        flags
            .visibility
            .insert(keyword.clone(), behavior != UiBehavior::Hide);
        flags
            .disabled
            .insert(keyword.clone(), behavior == UiBehavior::Disabled);
        flags
            .readonly
            .insert(keyword.clone(), behavior == UiBehavior::Readonly);
        flags.mandatory.insert(keyword, field.is_mandatory);
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use formkit_common::{DependencyAction, ValueDependency};

    fn field(keyword: &str) -> FieldDefinition {
        let mut f = FieldDefinition::new(keyword, keyword);
        f.transaction_code = "ISSU".into();
        f.calc_step = "NBQUOTE".into();
        f
    }

    fn option(keyword: &str, value: &str, sequence: i64) -> FieldOption {
        let mut o = FieldOption::new(keyword, value, value);
        o.sequence = sequence;
        o
    }

    #[test]
    fn test_fields_filtered_by_context() {
        let mut other = field("OTHER");
        other.calc_step = "PROPOSAL".into();
        let schema = ProductSchema {
            fields: vec![field("A"), other],
            ..Default::default()
        };
        let engine = FormEngine::initialize(&schema, EngineOptions::new());
        assert_eq!(engine.fields().len(), 1);
        assert!(engine.field("OTHER").is_none());

        let engine = FormEngine::initialize(
            &schema,
            EngineOptions::new().for_context("ISSU", "PROPOSAL"),
        );
        assert_eq!(engine.fields()[0].keyword, "OTHER");
    }

    #[test]
    fn test_static_flags_seeded() {
        let mut hidden = field("HIDDEN");
        hidden.default_ui_behavior = UiBehavior::Hide;
        let mut locked = field("LOCKED");
        locked.default_ui_behavior = UiBehavior::Readonly;
        let mut required = field("REQUIRED");
        required.is_mandatory = true;
        let schema = ProductSchema {
            fields: vec![hidden, locked, required],
            ..Default::default()
        };

        let engine = FormEngine::initialize(&schema, EngineOptions::new());
        assert!(!engine.is_visible("HIDDEN"));
        assert!(engine.is_readonly("LOCKED"));
        assert!(engine.is_mandatory("REQUIRED"));
        assert!(!engine.is_disabled("REQUIRED"));
    }

    #[test]
    fn test_list_default_selected() {
        let mut plan = field("PLAN");
        plan.field_type = FieldType::List;
        let mut gold = option("PLAN", "GOLD", 2);
        gold.default_selected = true;
        let schema = ProductSchema {
            fields: vec![plan],
            field_values: vec![option("PLAN", "BASIC", 1), gold],
            ..Default::default()
        };

        let engine = FormEngine::initialize(&schema, EngineOptions::new());
        assert_eq!(engine.field_value("PLAN"), Some("GOLD"));

        let engine =
            FormEngine::initialize(&schema, EngineOptions::new().with_value("PLAN", "BASIC"));
        assert_eq!(engine.field_value("PLAN"), Some("BASIC"));
    }

    #[test]
    fn test_literal_default_fallback() {
        let mut country = field("COUNTRY");
        country.default_value = Some("INDIA".into());
        let mut broken = field("BROKEN");
        broken.default_value = Some("@MISSING +".into());
        let schema = ProductSchema {
            fields: vec![country, broken],
            ..Default::default()
        };

        let engine = FormEngine::initialize(&schema, EngineOptions::new());
        assert_eq!(engine.field_value("COUNTRY"), Some("INDIA"));
        assert_eq!(engine.field_value("BROKEN"), None);
    }

    #[test]
    fn test_defaults_evaluated_in_dependency_order() {
        let mut total = field("A_TOTAL");
        total.default_value = Some("@Z_BASE * 2".into());
        let mut base = field("Z_BASE");
        base.default_value = Some("@INPUT + 1".into());
        let schema = ProductSchema {
            fields: vec![total, base, field("INPUT")],
            ..Default::default()
        };

        let mut engine =
            FormEngine::initialize(&schema, EngineOptions::new().with_value("INPUT", "4"));
        assert_eq!(engine.field_value("Z_BASE"), Some("5"));
        assert_eq!(engine.field_value("A_TOTAL"), Some("10"));

        engine.change("INPUT", "9");
        assert_eq!(engine.field_value("Z_BASE"), Some("10"));
        assert_eq!(engine.field_value("A_TOTAL"), Some("20"));
        match &engine.take_events()[..] {
            [FormEvent::ValueChanged { derived, .. }] => {
                assert_eq!(derived, &vec!["Z_BASE".to_string(), "A_TOTAL".to_string()])
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[test]
    fn test_change_clears_field_errors_and_notifies() {
        let mut name = field("NAME");
        name.is_mandatory = true;
        let schema = ProductSchema {
            fields: vec![name],
            ..Default::default()
        };
        let mut engine = FormEngine::initialize(&schema, EngineOptions::new());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        engine.on_change(move |field, value, _| sink.lock().push(format!("{field}={value}")));

        engine.blur("NAME");
        assert_eq!(engine.errors()["NAME"].len(), 1);
        assert!(engine.state().touched.contains("NAME"));

        engine.change("NAME", "Asha");
        assert!(engine.errors().is_empty());
        assert_eq!(*seen.lock(), vec!["NAME=Asha".to_string()]);

        engine.blur("NAME");
        assert!(engine.errors().is_empty());
    }

    #[test]
    fn test_value_rules_filter_static_options() {
        let mut plan = field("PLAN");
        plan.field_type = FieldType::List;
        let mut term = field("TERM");
        term.field_type = FieldType::List;
        let schema = ProductSchema {
            fields: vec![plan, term],
            field_values: vec![
                option("TERM", "30", 3),
                option("TERM", "10", 1),
                option("TERM", "20", 2),
                option("TERM", "10", 4),
            ],
            value_dependencies: vec![ValueDependency::new(
                "PLAN",
                "BASIC",
                DependencyAction::Hide,
                "TERM",
                "30",
            )],
            ..Default::default()
        };

        let mut engine = FormEngine::initialize(&schema, EngineOptions::new());
        let values: Vec<String> = engine
            .field_options("TERM")
            .into_iter()
            .map(|o| o.value)
            .collect();
        assert_eq!(values, vec!["10", "20", "30"]);

        engine.change("PLAN", "BASIC");
        assert_eq!(engine.field_options("TERM").len(), 2);
    }

    #[test]
    fn test_reset_policy_restores_flags() {
        let schema = ProductSchema {
            fields: vec![field("FLAG"), field("TARGET")],
            field_dependencies: vec![FieldDependency::on_value(
                "FLAG",
                "Y",
                DependencyAction::Disable,
                "TARGET",
            )],
            ..Default::default()
        };

        let mut keep = FormEngine::initialize(&schema, EngineOptions::new());
        keep.change("FLAG", "Y");
        keep.reset();
        assert!(keep.is_disabled("TARGET"));

        let config = formkit_common::EngineConfig {
            reset_policy: ResetPolicy::RestoreUiState,
            ..Default::default()
        };
        let mut restore = FormEngine::initialize(&schema, EngineOptions::new().with_config(config));
        restore.change("FLAG", "Y");
        assert!(restore.is_disabled("TARGET"));
        restore.reset();
        assert!(!restore.is_disabled("TARGET"));
    }

    #[test]
    fn test_typed_value() {
        let mut age = field("AGE");
        age.field_type = FieldType::Integer;
        let schema = ProductSchema {
            fields: vec![age],
            ..Default::default()
        };
        let mut engine = FormEngine::initialize(&schema, EngineOptions::new());
        assert_eq!(engine.typed_value("AGE"), Ok(None));
        engine.change("AGE", "42");
        assert_eq!(engine.typed_value("AGE"), Ok(Some(TypedValue::Integer(42))));
        engine.change("AGE", "forty");
        assert!(engine.typed_value("AGE").is_err());
    }
}
