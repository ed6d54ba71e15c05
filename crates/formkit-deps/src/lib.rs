//! Field dependency resolution
//!
//! Builds a graph from field-level and value-level rules and derives each
//! field's visibility, disabled, readonly and mandatory flags from it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      DependencyResolver                      │
//! │                                                              │
//! │  rules ──► DependencyGraph ──► evaluation order + cycles     │
//! │                  │                                           │
//! │   change(F) ─────┴─► affected(F) ──► calculate_* per field   │
//! │                                          │                   │
//! │                                   ExpressionEvaluator        │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod graph;
pub mod resolver;

pub use graph::{topological_order, DependencyGraph, DependencyNode};
pub use resolver::DependencyResolver;
