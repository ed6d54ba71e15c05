//! Schema payload types
//!
//! Mirrors the JSON shape emitted by the product configuration service.
//! Field names on the wire are lower-case concatenations (`keywordcaption`,
//! `actiontotake`, ...); the Rust side uses snake_case with serde renames.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Row of a data source table: flat string-keyed record
pub type TableRow = BTreeMap<String, String>;

/// Table registry: table name → rows
pub type TableRegistry = BTreeMap<String, Vec<TableRow>>;

// =============================================================================
// Payload envelope
// =============================================================================

/// Response envelope used by the schema service
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchemaEnvelope {
    /// HTTP-like status code
    #[serde(rename = "statusCode", default)]
    pub status_code: i64,
    /// Status message
    #[serde(rename = "statusMsg", default)]
    pub status_msg: String,
    /// The schema itself
    pub response: ProductSchema,
}

/// Complete schema payload for one product
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProductSchema {
    /// Product identifier
    #[serde(rename = "productid", default)]
    pub product_id: i64,
    /// Product name
    #[serde(rename = "productname", default)]
    pub product_name: String,
    /// Product master record
    #[serde(rename = "productmaster", default)]
    pub master: Option<ProductMaster>,
    /// Riders attached to the product
    #[serde(default)]
    pub riders: Vec<Rider>,
    /// Product versions
    #[serde(rename = "productversion", default)]
    pub versions: Vec<ProductVersion>,
    /// Field definitions
    #[serde(rename = "productkeyword", default)]
    pub fields: Vec<FieldDefinition>,
    /// Static options for list fields
    #[serde(rename = "productkeywordvalue", default)]
    pub field_values: Vec<FieldOption>,
    /// Data source table registry
    #[serde(rename = "productkeyworddatasource", default)]
    pub data_sources: TableRegistry,
    /// Field-level dependency rules
    #[serde(rename = "productkeyworddependency", default)]
    pub field_dependencies: Vec<FieldDependency>,
    /// Value-level dependency rules
    #[serde(rename = "productkeyworddependencyvalue", default)]
    pub value_dependencies: Vec<ValueDependency>,
}

impl ProductSchema {
    /// Parse a schema from JSON, accepting either the bare schema or the envelope
    pub fn from_json(json: &str) -> crate::FormResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if value.get("response").is_some() {
            let envelope: SchemaEnvelope = serde_json::from_value(value)?;
            Ok(envelope.response)
        } else {
            Ok(serde_json::from_value(value)?)
        }
    }
}

/// Product master record
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProductMaster {
    /// Product identifier
    #[serde(rename = "productid", default)]
    pub product_id: i64,
    /// Product name
    #[serde(rename = "productname", default)]
    pub product_name: String,
    /// Product type
    #[serde(rename = "prodtype", default)]
    pub product_type: String,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
    /// Line of business
    #[serde(default)]
    pub lob: String,
    /// Sub line of business
    #[serde(default)]
    pub sublob: String,
    /// Company code
    #[serde(rename = "companycode", default)]
    pub company_code: String,
    /// Lifecycle status
    #[serde(default)]
    pub status: String,
}

/// Rider attached to a product
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Rider {
    /// Product identifier of the rider
    #[serde(rename = "productid", default)]
    pub product_id: i64,
    /// Rider name
    #[serde(rename = "productname", default)]
    pub product_name: String,
    /// Product type
    #[serde(rename = "prodtype", default)]
    pub product_type: String,
    /// Short form
    #[serde(rename = "shortform", default)]
    pub short_form: String,
    /// Line of business
    #[serde(default)]
    pub lob: String,
    /// Sub line of business
    #[serde(default)]
    pub sublob: String,
    /// Lifecycle status
    #[serde(default)]
    pub status: String,
}

/// Product version record
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProductVersion {
    /// Version identifier
    #[serde(rename = "versionid", default)]
    pub version_id: i64,
    /// Change type
    #[serde(rename = "versionchangetype", default)]
    pub change_type: String,
    /// Effective from
    #[serde(rename = "fromeffectivedate", default)]
    pub from_effective_date: Option<String>,
    /// Effective to
    #[serde(rename = "toeffectivedate", default)]
    pub to_effective_date: Option<String>,
    /// Version status
    #[serde(rename = "versionstatus", default)]
    pub status: String,
}

// =============================================================================
// Field definitions
// =============================================================================

/// Field type as declared by the schema
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Free text
    #[default]
    String,
    /// Whole number
    Integer,
    /// Decimal number
    Decimal,
    /// Date of birth
    #[serde(rename = "DOB")]
    Dob,
    /// Calendar date
    Date,
    /// Single selection from an option list
    List,
    /// Yes/no
    Boolean,
    /// Phone number
    Phone,
    /// Email address
    Email,
    /// Anything the engine does not know about
    #[serde(other)]
    Other,
}

/// Initial UI behaviour of a field
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UiBehavior {
    /// Visible and editable
    #[default]
    Show,
    /// Hidden
    Hide,
    /// Visible, not editable
    Readonly,
    /// Visible, disabled
    Disabled,
}

/// Whether a field is captured, computed, or both
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputOutputType {
    /// Captured from the user
    #[default]
    Input,
    /// Computed for display
    Output,
    /// Both
    Both,
}

/// Metadata describing how to read options from a data source table
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSourceMetadata {
    /// `AND`-joined `column = expression` predicates
    #[serde(default)]
    pub lookup: Option<String>,
    /// Column holding the option value
    #[serde(rename = "keywordvalue", default)]
    pub value_column: Option<String>,
    /// Column holding the option label
    #[serde(rename = "keyworddisplay", default)]
    pub display_column: Option<String>,
}

/// Data source binding of an externally sourced field
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSourceSpec {
    /// Table name in the registry
    #[serde(rename = "fieldvaluecode")]
    pub table: String,
    /// Source type tag
    #[serde(rename = "fieldvaluesourcetype", default)]
    pub source_type: String,
    /// Lookup metadata
    #[serde(rename = "fieldvaluemetadata", default)]
    pub metadata: Option<DataSourceMetadata>,
}

/// Entry of a field's value data: either a data source binding or a static option
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValueEntry {
    /// External table binding
    Source(DataSourceSpec),
    /// Static option
    Option(FieldOption),
}

/// Immutable definition of one form field
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field identifier
    #[serde(rename = "keywordid", default)]
    pub id: String,
    /// Unique keyword
    pub keyword: String,
    /// Display caption
    #[serde(rename = "keywordcaption", default)]
    pub caption: String,
    /// Declared type
    #[serde(rename = "keywordtype", default)]
    pub field_type: FieldType,
    /// Declared data type
    #[serde(rename = "keyworddatatype", default)]
    pub data_type: String,
    /// Owning section
    #[serde(rename = "keywordsection", default)]
    pub section: String,
    /// Default value: literal or expression
    #[serde(rename = "defaultvalue", default)]
    pub default_value: Option<String>,
    /// Statically mandatory
    #[serde(rename = "ismandatory", default)]
    pub is_mandatory: bool,
    /// Input/output role
    #[serde(rename = "inputoroutput", default)]
    pub io_type: InputOutputType,
    /// Initial UI behaviour
    #[serde(rename = "defaultuibehavior", default)]
    pub default_ui_behavior: UiBehavior,
    /// Numeric lower bound
    #[serde(rename = "keyminvalue", default)]
    pub min_value: Option<f64>,
    /// Numeric upper bound
    #[serde(rename = "keymaxvalue", default)]
    pub max_value: Option<f64>,
    /// Minimum length
    #[serde(rename = "minlength", default)]
    pub min_length: Option<usize>,
    /// Maximum length
    #[serde(rename = "maxlength", default)]
    pub max_length: Option<usize>,
    /// Regex the value must match
    #[serde(default)]
    pub regex: Option<String>,
    /// Lookup condition (informational, data sources carry their own)
    #[serde(rename = "lookupccondition", default)]
    pub lookup_condition: Option<String>,
    /// Additional boolean condition the value must satisfy
    #[serde(rename = "addlcondition", default)]
    pub additional_condition: Option<String>,
    /// Gate for every validation rule of this field
    #[serde(rename = "validationcondition", default)]
    pub validation_condition: Option<String>,
    /// Display ordering
    #[serde(rename = "keysequence", default)]
    pub sequence: Option<i64>,
    /// Parent keyword
    #[serde(rename = "parentkeyword", default)]
    pub parent_keyword: Option<String>,
    /// Line of business
    #[serde(default)]
    pub lob: String,
    /// Sub line of business
    #[serde(default)]
    pub sublob: String,
    /// Product identifier
    #[serde(rename = "productid", default)]
    pub product_id: i64,
    /// Transaction context
    #[serde(rename = "transactioncode", default)]
    pub transaction_code: String,
    /// Step context
    #[serde(rename = "calcstep", default)]
    pub calc_step: String,
    /// Options must be resolved from a data source
    #[serde(rename = "chkfieldsource", default)]
    pub field_source: bool,
    /// Data source binding or attached static options
    #[serde(rename = "fieldvaluedata", default)]
    pub value_data: Vec<FieldValueEntry>,
}

impl FieldDefinition {
    /// Create a text field with the given keyword and caption
    pub fn new(keyword: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            caption: caption.into(),
            ..Default::default()
        }
    }

    /// Data source binding, when the field is externally sourced
    pub fn data_source(&self) -> Option<&DataSourceSpec> {
        if !self.field_source {
            return None;
        }
        self.value_data.iter().find_map(|entry| match entry {
            FieldValueEntry::Source(spec) => Some(spec),
            FieldValueEntry::Option(_) => None,
        })
    }

    /// Static options attached to the field
    pub fn static_options(&self) -> impl Iterator<Item = &FieldOption> {
        self.value_data.iter().filter_map(|entry| match entry {
            FieldValueEntry::Option(option) => Some(option),
            FieldValueEntry::Source(_) => None,
        })
    }

    /// Whether the field belongs to the given transaction/step context
    pub fn in_context(&self, transaction_code: &str, calc_step: &str) -> bool {
        self.transaction_code == transaction_code && self.calc_step == calc_step
    }
}

/// One selectable value of a list field
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    /// Option identifier
    #[serde(rename = "keywordvalueid", default)]
    pub id: String,
    /// Owning keyword
    #[serde(default)]
    pub keyword: String,
    /// Display label
    #[serde(rename = "keyworddisplay", default)]
    pub display: String,
    /// Value code
    #[serde(rename = "keywordvalue")]
    pub value: String,
    /// Selected by default
    #[serde(rename = "defaultselected", default)]
    pub default_selected: bool,
    /// Ordering sequence
    #[serde(rename = "keyvalsequence", default)]
    pub sequence: i64,
    /// Transaction context
    #[serde(rename = "transactioncode", default)]
    pub transaction_code: String,
    /// Step context
    #[serde(rename = "calcstep", default)]
    pub calc_step: String,
}

impl FieldOption {
    /// Create an option with value and label
    pub fn new(keyword: impl Into<String>, value: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            value: value.into(),
            display: display.into(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Dependency rules
// =============================================================================

/// Action a dependency rule applies to its target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyAction {
    /// Make visible
    Show,
    /// Make invisible
    Hide,
    /// Make editable
    Enable,
    /// Make disabled
    Disable,
    /// Make read-only
    Readonly,
    /// Make mandatory
    Mandatory,
    /// Make optional
    Optional,
}

/// Field-level rule: when `changed_keyword` matches, apply `action` to `actioned_keyword`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldDependency {
    /// Rule identifier
    #[serde(rename = "keydependentid", default)]
    pub id: String,
    /// Trigger field
    #[serde(rename = "changedkeyword")]
    pub changed_keyword: String,
    /// Literal trigger value
    #[serde(rename = "changedkeywordvalue", default)]
    pub changed_keyword_value: Option<String>,
    /// Target field
    #[serde(rename = "actionedkeyword")]
    pub actioned_keyword: String,
    /// Action to apply
    #[serde(rename = "actiontotake")]
    pub action: DependencyAction,
    /// Gating expression, replaces the literal match when present
    #[serde(default)]
    pub expression: Option<String>,
    /// Operator type tag
    #[serde(rename = "operatortype", default)]
    pub operator_type: Option<String>,
    /// Transaction context
    #[serde(rename = "transactioncode", default)]
    pub transaction_code: String,
    /// Step context
    #[serde(rename = "calcstep", default)]
    pub calc_step: String,
}

impl FieldDependency {
    /// Literal-value rule
    pub fn on_value(
        changed: impl Into<String>,
        value: impl Into<String>,
        action: DependencyAction,
        actioned: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            changed_keyword: changed.into(),
            changed_keyword_value: Some(value.into()),
            actioned_keyword: actioned.into(),
            action,
            expression: None,
            operator_type: None,
            transaction_code: String::new(),
            calc_step: String::new(),
        }
    }

    /// Expression-gated rule
    pub fn on_expression(
        changed: impl Into<String>,
        expression: impl Into<String>,
        action: DependencyAction,
        actioned: impl Into<String>,
    ) -> Self {
        Self {
            changed_keyword_value: None,
            expression: Some(expression.into()),
            ..Self::on_value(changed, "", action, actioned)
        }
    }

    /// Gating expression, if non-blank
    pub fn gate(&self) -> Option<&str> {
        self.expression.as_deref().filter(|e| !e.trim().is_empty())
    }

    /// Whether the rule applies to the given context; blank context applies everywhere
    pub fn in_context(&self, transaction_code: &str, calc_step: &str) -> bool {
        context_matches(&self.transaction_code, &self.calc_step, transaction_code, calc_step)
    }
}

/// Value-level rule: controls which options of `actioned_keyword` are offered
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValueDependency {
    /// Rule identifier
    #[serde(rename = "keyvaluedependentid", default)]
    pub id: String,
    /// Trigger field
    #[serde(rename = "changedkeyword")]
    pub changed_keyword: String,
    /// Trigger value
    #[serde(rename = "changedkeywordvalue", default)]
    pub changed_keyword_value: String,
    /// Target list field
    #[serde(rename = "actionedkeyword")]
    pub actioned_keyword: String,
    /// Target option value
    #[serde(rename = "actionedkeywordvalue", default)]
    pub actioned_keyword_value: String,
    /// Action to apply
    #[serde(rename = "actiontotake")]
    pub action: DependencyAction,
    /// Gating expression
    #[serde(default)]
    pub expression: Option<String>,
    /// Operator type tag
    #[serde(rename = "operatortype", default)]
    pub operator_type: Option<String>,
    /// Transaction context
    #[serde(rename = "transactioncode", default)]
    pub transaction_code: String,
    /// Step context
    #[serde(rename = "calcstep", default)]
    pub calc_step: String,
}

impl ValueDependency {
    /// Rule acting on one option of the target field
    pub fn new(
        changed: impl Into<String>,
        changed_value: impl Into<String>,
        action: DependencyAction,
        actioned: impl Into<String>,
        actioned_value: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            changed_keyword: changed.into(),
            changed_keyword_value: changed_value.into(),
            actioned_keyword: actioned.into(),
            actioned_keyword_value: actioned_value.into(),
            action,
            expression: None,
            operator_type: None,
            transaction_code: String::new(),
            calc_step: String::new(),
        }
    }

    /// Whether the rule applies to the given context; blank context applies everywhere
    pub fn in_context(&self, transaction_code: &str, calc_step: &str) -> bool {
        context_matches(&self.transaction_code, &self.calc_step, transaction_code, calc_step)
    }
}

fn context_matches(rule_tx: &str, rule_step: &str, tx: &str, step: &str) -> bool {
    (rule_tx.is_empty() || rule_tx == tx) && (rule_step.is_empty() || rule_step == step)
}
