//! Component dependency graph.
//!
//! Nodes are component names, edges point from a component to a component it
//! depends on. The resolver builds the graph while expanding a request and
//! `list --tree` renders it.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// Directed graph of component dependencies.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.node_map.get(name) {
            index
        } else {
            let index = self.graph.add_node(name.to_string());
            self.node_map.insert(name.to_string(), index);
            index
        }
    }

    /// Add a component without dependencies.
    pub fn add_component(&mut self, name: &str) {
        self.ensure_node(name);
    }

    /// Record that `from` depends on `to`. Duplicate edges are ignored.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);
        if !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// Dependencies of `node` in the order their edges were added.
    fn ordered_dependencies(&self, node: NodeIndex) -> Vec<NodeIndex> {
        // petgraph yields the most recently added edge first
        let mut neighbors: Vec<NodeIndex> =
            self.graph.neighbors_directed(node, Direction::Outgoing).collect();
        neighbors.reverse();
        neighbors
    }

    /// Direct dependencies of `name`, in declaration order.
    pub fn get_direct_deps(&self, name: &str) -> Vec<String> {
        self.node_map
            .get(name)
            .map(|&idx| {
                self.ordered_dependencies(idx)
                    .into_iter()
                    .map(|n| self.graph[n].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Render the dependency tree below `root`.
    ///
    /// ```text
    /// Button
    /// ├── Icon
    /// └── Spinner
    ///     └── Icon
    /// ```
    pub fn to_tree_string(&self, root: &str) -> String {
        let mut result = format!("{root}\n");
        let mut stack = HashSet::from([root.to_string()]);
        self.build_tree_string(root, &mut result, "", &mut stack);
        result
    }

    fn build_tree_string(
        &self,
        node: &str,
        result: &mut String,
        prefix: &str,
        stack: &mut HashSet<String>,
    ) {
        let deps = self.get_direct_deps(node);
        for (i, dep) in deps.iter().enumerate() {
            let is_last = i == deps.len() - 1;
            let connector = if is_last { "└── " } else { "├── " };
            result.push_str(&format!("{prefix}{connector}{dep}\n"));

            let child_prefix =
                if is_last { format!("{prefix}    ") } else { format!("{prefix}│   ") };
            if !stack.insert(dep.clone()) {
                result.push_str(&format!("{child_prefix}└── (circular reference)\n"));
                continue;
            }
            self.build_tree_string(dep, result, &child_prefix, stack);
            stack.remove(dep);
        }
    }
}
