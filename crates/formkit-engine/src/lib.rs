//! formkit engine - one form session over a product schema
//!
//! [`FormEngine`] ties the other formkit crates together:
//!
//! ```text
//!   initialize(schema, options)
//!        │
//!        ├─ filter fields by (transaction code, calc step)
//!        ├─ seed flags from declared UI behaviour
//!        ├─ apply initial values, default options, default expressions
//!        └─ recalculate every rule target
//!
//!   change ──► DependencyResolver ──► derived defaults ──► listener
//!   blur   ──► FormValidator (one field)
//!   validate / submit ──► FormValidator (visible fields)
//!   sections ──► DataSourceResolver + value rules ──► FormSection[]
//! ```
//!
//! # Example
//!
//! ```
//! use formkit_common::{FieldDefinition, ProductSchema};
//! use formkit_engine::{EngineOptions, FormEngine};
//!
//! let mut premium = FieldDefinition::new("PREMIUM", "Premium");
//! let mut sum = FieldDefinition::new("SUM_ASSURED", "Sum assured");
//! sum.default_value = Some("@PREMIUM * 10".into());
//! for field in [&mut premium, &mut sum] {
//!     field.transaction_code = "ISSU".into();
//!     field.calc_step = "NBQUOTE".into();
//! }
//! let schema = ProductSchema { fields: vec![premium, sum], ..Default::default() };
//!
//! let mut engine = FormEngine::initialize(&schema, EngineOptions::new().with_value("PREMIUM", "1000"));
//! engine.change("PREMIUM", "2000");
//! assert_eq!(engine.field_value("SUM_ASSURED"), Some("20000"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod events;
pub mod options;
pub mod sections;

pub use engine::{ChangeListener, FormEngine};
pub use events::FormEvent;
pub use options::EngineOptions;
pub use sections::{format_section_name, FormSection, SectionField, DEFAULT_SECTION};
