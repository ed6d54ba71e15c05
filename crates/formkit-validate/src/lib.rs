//! Per-field validation for formkit
//!
//! Rules are derived once from field definitions ([`build_validation_rules`])
//! and applied on blur and submit by [`FormValidator`]. Each rule may carry a
//! gating expression; fields hidden in the current state are never validated.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod rules;
pub mod validator;

pub use rules::{add_conditional_required, build_validation_rules, RuleKind, RuleSet, ValidationRule};
pub use validator::{FormValidator, ValidationResult};
