//! Resource dependency graph and cycle detection.
//!
//! The graph has one node per declared resource and an edge `A -> B` when
//! `A` must be created after `B`. Edges come from two places:
//!
//! - **Explicit**: `DependsOn` entries naming a declared resource
//! - **Implicit**: `Ref`, `Fn::GetAtt` and `Fn::Sub` references inside a
//!   resource's `Properties` whose target is a declared resource
//!
//! References to parameters and pseudo parameters never produce edges, so a
//! resource that `Ref`s a parameter is not mistaken for a dependency.
//!
//! # Algorithms
//!
//! - **Cycle Detection**: depth-first search with a recursion stack, visiting
//!   nodes in ascending logical-id order so the reported cycle is stable.
//!   A `DependsOn` entry naming its own resource is left to the `DependsOn`
//!   check; a resource referencing itself is still a cycle.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

use crate::app::cfn_intrinsic_functions::collect_references;
use crate::app::cfn_template::Template;
use serde_json::Value;

/// Dependency graph over the resources of one template.
#[derive(Debug, Clone, Default)]
pub struct ResourceDag {
    /// Explicit `DependsOn` edges, keyed by dependent.
    explicit: BTreeMap<String, BTreeSet<String>>,
    /// Edges inferred from references in properties, keyed by dependent.
    implicit: BTreeMap<String, BTreeSet<String>>,
}

impl ResourceDag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from a template's resources.
    pub fn from_template(template: &Template) -> Self {
        let mut dag = Self::new();

        for (id, resource) in &template.resources {
            dag.explicit.entry(id.clone()).or_default();
            dag.implicit.entry(id.clone()).or_default();

            for dep in &resource.depends_on {
                if template.has_resource(dep) {
                    dag.add_explicit(id, dep);
                }
            }

            let properties = Value::Object(
                resource
                    .properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            );
            for reference in collect_references(&properties) {
                if template.has_resource(&reference.target) {
                    dag.add_implicit(id, &reference.target);
                }
            }
        }

        debug!(
            "Built dependency graph with {} nodes and {} edges",
            dag.explicit.len(),
            dag.edge_count()
        );
        dag
    }

    pub fn add_explicit(&mut self, dependent: &str, dependency: &str) {
        self.explicit
            .entry(dependent.to_string())
            .or_default()
            .insert(dependency.to_string());
        self.ensure_node(dependency);
    }

    pub fn add_implicit(&mut self, dependent: &str, dependency: &str) {
        self.implicit
            .entry(dependent.to_string())
            .or_default()
            .insert(dependency.to_string());
        self.ensure_node(dependency);
    }

    fn ensure_node(&mut self, id: &str) {
        self.explicit.entry(id.to_string()).or_default();
        self.implicit.entry(id.to_string()).or_default();
    }

    /// All node ids in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.explicit.keys().map(String::as_str)
    }

    /// Combined explicit and implicit dependencies of a node, ascending.
    pub fn get_dependencies(&self, id: &str) -> BTreeSet<&str> {
        self.explicit
            .get(id)
            .into_iter()
            .chain(self.implicit.get(id))
            .flat_map(|deps| deps.iter().map(String::as_str))
            .collect()
    }

    /// Dependencies inferred from references only.
    pub fn implicit_dependencies(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.implicit.get(id)
    }

    fn references_itself(&self, id: &str) -> bool {
        self.implicit.get(id).is_some_and(|deps| deps.contains(id))
    }

    fn edge_count(&self) -> usize {
        self.nodes().map(|id| self.get_dependencies(id).len()).sum()
    }

    /// Find one dependency cycle, if any.
    ///
    /// The returned path starts and ends at the same node, for example
    /// `["A", "B", "A"]`. Nodes are explored in ascending id order, so the
    /// same graph always yields the same cycle.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for node_id in self.nodes() {
            if visited.contains(node_id) {
                continue;
            }
            if let Some(cycle) = self.detect_cycle_util(node_id, &mut visited, &mut rec_stack, &mut path)
            {
                return Some(cycle);
            }
        }
        None
    }

    pub fn has_cycle(&self) -> bool {
        self.find_cycle().is_some()
    }

    fn detect_cycle_util<'a>(
        &'a self,
        node_id: &'a str,
        visited: &mut HashSet<&'a str>,
        rec_stack: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        visited.insert(node_id);
        rec_stack.insert(node_id);
        path.push(node_id);

        for dep_id in self.get_dependencies(node_id) {
            if dep_id == node_id && !self.references_itself(node_id) {
                continue;
            }
            if rec_stack.contains(dep_id) {
                // Cycle closes at dep_id; report the loop from its first visit.
                let start = path.iter().position(|id| *id == dep_id).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|id| id.to_string()).collect();
                cycle.push(dep_id.to_string());
                return Some(cycle);
            }
            if !visited.contains(dep_id) {
                if let Some(cycle) = self.detect_cycle_util(dep_id, visited, rec_stack, path) {
                    return Some(cycle);
                }
            }
        }

        rec_stack.remove(node_id);
        path.pop();
        None
    }
}
