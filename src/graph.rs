//! Custom Type Reference Graph
//!
//! Collects every `$ref` in a raw event schema, checks that each one points at a
//! local `$defs` entry, and tracks definition -> definition edges so cycles can
//! be rejected before anything is resolved.

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde_json::Value;

use crate::error::{Result, SchemaError};
use crate::parser::extract_ref_name;
use crate::schema::{PathSegment, SchemaPath};

/// A `$ref` found in the raw tree
#[derive(Debug, Clone)]
struct RawRef {
    /// Definition the reference sits in (`None` for the event body)
    owner: Option<String>,
    reference: String,
    path: SchemaPath,
}

/// Dependency graph over the root `$defs`
#[derive(Debug)]
pub struct RefGraph {
    graph: DiGraph<String, ()>,
    node_indices: HashMap<String, NodeIndex>,
    /// Definition ids in declaration order
    declared: Vec<String>,
}

impl RefGraph {
    /// Build the graph for a root schema, validating every reference in it.
    pub fn build(root: &Value) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();
        let mut declared = Vec::new();

        if let Some(defs) = root.get("$defs").and_then(Value::as_object) {
            for (id, def) in defs {
                if def.is_boolean() {
                    continue;
                }
                let idx = graph.add_node(id.clone());
                node_indices.insert(id.clone(), idx);
                declared.push(id.clone());
            }
        }

        let mut refs = Vec::new();
        collect_refs(root, None, &SchemaPath::root(), true, &mut refs);

        for raw_ref in refs {
            let Some(target) = extract_ref_name(&raw_ref.reference) else {
                return Err(SchemaError::MalformedReference {
                    path: raw_ref.path,
                    reference: raw_ref.reference,
                    reason: "only local `#/$defs/<id>` pointers are supported".to_string(),
                });
            };
            let Some(&to_idx) = node_indices.get(&target) else {
                return Err(SchemaError::MalformedReference {
                    path: raw_ref.path,
                    reason: format!("no definition named `{}` in $defs", target),
                    reference: raw_ref.reference,
                });
            };
            if let Some(owner) = raw_ref.owner {
                if let Some(&from_idx) = node_indices.get(&owner) {
                    graph.update_edge(from_idx, to_idx, ());
                }
            }
        }

        Ok(Self {
            graph,
            node_indices,
            declared,
        })
    }

    /// Definitions that `id` references directly, in declaration order
    pub fn dependencies(&self, id: &str) -> Vec<&str> {
        let Some(&idx) = self.node_indices.get(id) else {
            return Vec::new();
        };
        let targets: HashSet<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        self.declared
            .iter()
            .filter(|d| {
                self.node_indices
                    .get(d.as_str())
                    .is_some_and(|n| targets.contains(n))
            })
            .map(String::as_str)
            .collect()
    }

    /// Fail with the first cycle found, reported as a closed path
    /// (`A -> B -> A`) starting from the earliest declared member.
    pub fn check_acyclic(&self) -> Result<()> {
        let mut cyclic: HashSet<NodeIndex> = HashSet::new();
        for scc in tarjan_scc(&self.graph) {
            let self_loop = scc.len() == 1 && self.graph.contains_edge(scc[0], scc[0]);
            if scc.len() > 1 || self_loop {
                cyclic.extend(scc);
            }
        }
        if cyclic.is_empty() {
            return Ok(());
        }

        let start = self
            .declared
            .iter()
            .filter_map(|id| self.node_indices.get(id).copied())
            .find(|idx| cyclic.contains(idx));
        let cycle = start
            .and_then(|s| self.cycle_through(s))
            .unwrap_or_else(|| {
                cyclic
                    .iter()
                    .filter_map(|idx| self.graph.node_weight(*idx).cloned())
                    .collect()
            });
        Err(SchemaError::CyclicReference { cycle })
    }

    /// Depth-first search for a path from `start` back to itself
    fn cycle_through(&self, start: NodeIndex) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut path = vec![start];
        if self.dfs_back_to(start, start, &mut visited, &mut path) {
            let mut names: Vec<String> = path
                .iter()
                .filter_map(|idx| self.graph.node_weight(*idx).cloned())
                .collect();
            if let Some(first) = names.first().cloned() {
                names.push(first);
            }
            Some(names)
        } else {
            None
        }
    }

    fn dfs_back_to(
        &self,
        current: NodeIndex,
        start: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        path: &mut Vec<NodeIndex>,
    ) -> bool {
        let mut next: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(current, Direction::Outgoing)
            .collect();
        // neighbors() yields most recent edge first
        next.sort();
        for n in next {
            if n == start {
                return true;
            }
            if visited.insert(n) {
                path.push(n);
                if self.dfs_back_to(n, start, visited, path) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }
}

/// Walk the schema-bearing keywords of a raw node collecting `$ref`s.
///
/// Only `properties`, `items` and `$defs` are descended into; values under
/// `enum`, `const`, `default` and friends are data, not schemas.
fn collect_refs(
    json: &Value,
    owner: Option<&str>,
    path: &SchemaPath,
    is_root: bool,
    refs: &mut Vec<RawRef>,
) {
    let Value::Object(obj) = json else {
        return;
    };

    if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
        refs.push(RawRef {
            owner: owner.map(str::to_string),
            reference: reference.to_string(),
            path: path.clone(),
        });
    }

    if let Some(props) = obj.get("properties").and_then(Value::as_object) {
        for (name, sub) in props {
            let sub_path = path.join(PathSegment::Property(name.clone()));
            collect_refs(sub, owner, &sub_path, false, refs);
        }
    }

    match obj.get("items") {
        Some(item @ Value::Object(_)) => {
            collect_refs(item, owner, &path.join(PathSegment::Items), false, refs);
        }
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                collect_refs(item, owner, &path.join(PathSegment::TupleItem(i)), false, refs);
            }
        }
        _ => {}
    }

    if let Some(defs) = obj.get("$defs").and_then(Value::as_object) {
        for (id, def) in defs {
            // Root definitions own their references; nested ones inherit the owner
            let def_owner = if is_root { Some(id.as_str()) } else { owner };
            let def_path = path.join(PathSegment::Definition(id.clone()));
            collect_refs(def, def_owner, &def_path, false, refs);
        }
    }
}
