//! Typer Schema
//!
//! Normalizes tracking-plan JSON Schemas into a canonical AST that analytics
//! SDK generators consume, and allocates collision-free identifiers for the
//! code they emit.
//!
//! ## Features
//!
//! - **Normalization**: `type` lists, nullability, enums and `const` reduced to
//!   four node shapes (primitive, array, object, union)
//! - **Custom Types**: `$defs` resolved into a registry, with `$ref` validation
//!   and cycle detection
//! - **Payload Projection**: the `properties` and `traits` objects analytics
//!   calls actually send
//! - **Identifier Allocation**: per-language sanitizing, reserved-word escaping
//!   and scoped collision suffixes
//!
//! ## Pipeline
//!
//! ```text
//! raw JSON ──► RefGraph ──► CustomTypeResolver ──► TypeRegistry
//!     │                                                │
//!     └──────► parse ──► properties / traits ──► CompiledEvent
//!                                                      │
//!                             Build ──► GeneratorClient (Namer per language)
//! ```

pub mod build;
pub mod codegen;
pub mod config;
pub mod error;
pub mod graph;
pub mod parser;
pub mod resolver;
pub mod schema;

pub use build::{compile_event, Build, CompiledEvent};
pub use codegen::{AnalyticsCall, GeneratorClient, Language, Namer, NamingRules};
pub use config::TyperConfig;
pub use error::{Result, SchemaError};
pub use parser::{parse, properties_schema, traits_schema};
pub use resolver::{CustomTypeResolver, TypeRegistry};
pub use schema::{EnumValue, PrimitiveKind, Schema, SchemaPath, SchemaType};
