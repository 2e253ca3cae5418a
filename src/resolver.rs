//! Custom Type Resolution
//!
//! Turns an event's root `$defs` into a [`TypeRegistry`] of named custom types.
//!
//! Resolution happens in two passes. [`CustomTypeResolver::new`] walks the
//! whole raw tree, rejecting malformed or dangling `$ref`s and reference
//! cycles. Definitions are then parsed lazily, once each. A `$ref` inside a
//! definition stays a reference, so no definition waits on another and
//! declaration order never matters.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::graph::RefGraph;
use crate::parser::parse_at;
use crate::schema::{PathSegment, Schema, SchemaPath};

// =============================================================================
// Type Registry
// =============================================================================

/// Custom types of one event, keyed by `$defs` id in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TypeRegistry {
    types: IndexMap<String, Schema>,
}

impl TypeRegistry {
    pub fn get(&self, id: &str) -> Option<&Schema> {
        self.types.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Schema)> {
        self.types.iter().map(|(id, schema)| (id.as_str(), schema))
    }

    /// Dereference a node carrying a `ref_name`
    pub fn resolve(&self, node: &Schema) -> Option<&Schema> {
        node.ref_name().and_then(|id| self.types.get(id))
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Lazily resolves the `$defs` of one event schema.
pub struct CustomTypeResolver<'a> {
    /// Raw definitions in declaration order
    defs: IndexMap<&'a str, &'a Value>,
    graph: RefGraph,
    source_label: String,
    resolved: HashMap<String, Schema>,
}

impl<'a> CustomTypeResolver<'a> {
    /// Validate every `$ref` in `root` and prepare its definitions.
    ///
    /// `source_label` names the event in backfilled descriptions.
    pub fn new(root: &'a Value, source_label: impl Into<String>) -> Result<Self> {
        let root_path = SchemaPath::root();
        if !root.is_object() {
            return Err(SchemaError::invalid(&root_path, "expected a schema object"));
        }

        let mut defs = IndexMap::new();
        match root.get("$defs") {
            None => {}
            Some(Value::Object(map)) => {
                for (id, def) in map {
                    if def.is_boolean() {
                        continue;
                    }
                    if !def.is_object() {
                        let def_path = root_path.join(PathSegment::Definition(id.clone()));
                        return Err(SchemaError::invalid(&def_path, "expected a schema object"));
                    }
                    defs.insert(id.as_str(), def);
                }
            }
            Some(_) => return Err(SchemaError::invalid(&root_path, "`$defs` must be an object")),
        }

        let graph = RefGraph::build(root)?;
        graph.check_acyclic()?;

        Ok(Self {
            defs,
            graph,
            source_label: source_label.into(),
            resolved: HashMap::new(),
        })
    }

    /// Resolve one definition by id.
    ///
    /// Memoized: asking twice returns the same schema.
    pub fn resolve(&mut self, id: &str) -> Result<&Schema> {
        if !self.resolved.contains_key(id) {
            let schema = self.parse_definition(id)?;
            debug!(
                id,
                name = schema.name(),
                kind = schema.kind_label(),
                references = ?self.graph.dependencies(id),
                "resolved custom type"
            );
            self.resolved.insert(id.to_string(), schema);
        }
        self.resolved.get(id).ok_or_else(|| unknown_definition(id))
    }

    /// Resolve every definition and hand back the registry.
    pub fn resolve_all(mut self) -> Result<TypeRegistry> {
        let ids: Vec<&'a str> = self.defs.keys().copied().collect();
        for id in ids {
            self.resolve(id)?;
        }
        Ok(self.into_registry())
    }

    /// The definitions resolved so far, in declaration order
    pub fn into_registry(mut self) -> TypeRegistry {
        let mut types = IndexMap::with_capacity(self.resolved.len());
        for id in self.defs.keys() {
            if let Some(schema) = self.resolved.remove(*id) {
                types.insert((*id).to_string(), schema);
            }
        }
        TypeRegistry { types }
    }

    fn parse_definition(&self, id: &str) -> Result<Schema> {
        let raw = self.defs.get(id).ok_or_else(|| unknown_definition(id))?;
        let path = SchemaPath::root().join(PathSegment::Definition(id.to_string()));

        // A string title names the type; otherwise the id does
        let has_title = raw.get("title").and_then(Value::as_str).is_some();
        let mut schema = parse_at(raw, (!has_title).then_some(id), false, &path)?;

        if schema.meta.description.is_none() {
            schema.meta.description = Some(format!("Custom type for {}", self.source_label));
        }
        Ok(schema)
    }
}

fn unknown_definition(id: &str) -> SchemaError {
    SchemaError::MalformedReference {
        path: SchemaPath::root(),
        reference: format!("#/$defs/{}", id),
        reason: format!("no definition named `{}` in $defs", id),
    }
}

/// Resolve all custom types of an event schema in one call.
pub fn resolve_types(root: &Value, source_label: &str) -> Result<TypeRegistry> {
    CustomTypeResolver::new(root, source_label)?.resolve_all()
}
