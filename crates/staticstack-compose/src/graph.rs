//! Reference graph management using `petgraph`.
//!
//! Builds a directed acyclic graph from `Ref`, `Fn::GetAtt`, and
//! `DependsOn` between resources and resolves the order in which the
//! reconciliation engine will create them.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::graph::NodeIndex;
use serde_json::Value;
use staticstack_common::error::{Result, StackError};

use crate::template::{Template, pseudo};

/// A dependency graph of resources.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Internal petgraph representation.
    graph: petgraph::Graph<String, ()>,
    nodes: BTreeMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: petgraph::Graph::new(),
            nodes: BTreeMap::new(),
        }
    }

    /// Builds the graph of every resource in `template`.
    ///
    /// # Errors
    ///
    /// Returns an error if a resource or output references a logical id the
    /// template does not declare.
    pub fn from_template(template: &Template) -> Result<Self> {
        let mut graph = Self::new();
        for id in template.resources.keys() {
            let _ = graph.add_resource(id.as_str());
        }

        for (id, resource) in &template.resources {
            let mut deps = references(&resource.properties);
            deps.extend(resource.depends_on.iter().map(|d| d.as_str().to_owned()));

            let dependent = graph.add_resource(id.as_str());
            for dep in deps {
                let dependency = graph.node(&dep).ok_or_else(|| StackError::NotFound {
                    kind: "resource",
                    id: format!("\"{dep}\" referenced by \"{id}\""),
                })?;
                graph.add_dependency(dependent, dependency);
            }
        }

        for (id, output) in &template.outputs {
            for dep in references(&output.value) {
                if graph.node(&dep).is_none() {
                    return Err(StackError::NotFound {
                        kind: "resource",
                        id: format!("\"{dep}\" referenced by output \"{id}\""),
                    });
                }
            }
        }

        Ok(graph)
    }

    /// Adds a resource node to the graph, returning the existing node if present.
    pub fn add_resource(&mut self, name: impl Into<String>) -> NodeIndex {
        let name = name.into();
        if let Some(&idx) = self.nodes.get(&name) {
            return idx;
        }
        let idx = self.graph.add_node(name.clone());
        let _ = self.nodes.insert(name, idx);
        idx
    }

    /// Returns the node of a resource, if declared.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<NodeIndex> {
        self.nodes.get(name).copied()
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// The graph edge points from `dependency` to `dependent`
    /// so that topological sort yields dependencies first.
    pub fn add_dependency(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        let _ = self.graph.update_edge(dependency, dependent, ());
    }

    /// Returns the direct dependencies of a resource, sorted by name.
    #[must_use]
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        let Some(idx) = self.node(name) else {
            return Vec::new();
        };
        let mut deps: Vec<String> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .filter_map(|n| self.graph.node_weight(n).cloned())
            .collect();
        deps.sort();
        deps
    }

    /// Returns a topological ordering of resources for creation.
    ///
    /// Dependencies appear before the resources that depend on them.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph contains cycles.
    pub fn resolve_order(&self) -> Result<Vec<String>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => {
                let names: Vec<String> = indices
                    .iter()
                    .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                    .collect();
                Ok(names)
            }
            Err(cycle) => {
                let at = self
                    .graph
                    .node_weight(cycle.node_id())
                    .cloned()
                    .unwrap_or_default();
                Err(StackError::Config {
                    message: format!("cyclic dependency detected in resource graph at \"{at}\""),
                })
            }
        }
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects the logical ids referenced by `Ref` and `Fn::GetAtt` in a value.
///
/// Pseudo parameters are not logical ids and are skipped.
#[must_use]
pub fn references(value: &Value) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    collect_references(value, &mut found);
    found
}

fn collect_references(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get("Ref") {
                if !pseudo::is_pseudo(target) {
                    let _ = found.insert(target.clone());
                }
            }
            if let Some(Value::String(target)) = map
                .get("Fn::GetAtt")
                .and_then(Value::as_array)
                .and_then(|args| args.first())
            {
                let _ = found.insert(target.clone());
            }
            for nested in map.values() {
                collect_references(nested, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, found);
            }
        }
        _ => {}
    }
}
