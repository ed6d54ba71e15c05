//! formkit common - shared types for the form rule engine
//!
//! This crate provides the vocabulary every other formkit crate speaks:
//! - Schema payload (field definitions, options, dependency rules, tables)
//! - The [`FormState`] aggregate
//! - Typed decode of canonical string values
//! - Engine configuration
//! - Error handling
//!
//! # Architecture
//!
//! ```text
//!                    ┌──────────────────┐
//!                    │  formkit-engine  │  owns FormState
//!                    └────────┬─────────┘
//!          ┌─────────────┬────┴────────┬────────────────┐
//!          ▼             ▼             ▼                ▼
//!   formkit-deps  formkit-validate  formkit-datasource  │
//!          └─────────────┴──────┬──────┘                │
//!                               ▼                       │
//!                         formkit-expr                  │
//!                               └───────────┬───────────┘
//!                                           ▼
//!                                    formkit-common
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod schema;
pub mod state;
pub mod typed;

pub use config::{CachePolicy, EngineConfig, ResetPolicy};
pub use error::*;
pub use schema::*;
pub use state::*;
pub use typed::{CoercionError, TypedValue};
