//! Dependency graph (DAG) construction and traversal
//!
//! Nodes are kept in insertion order and every traversal breaks ties by that
//! order, so two graphs built from the same input always yield the same
//! ordering.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::hash::Hash;

/// Result of a topological sort that tolerates cycles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologicalOrder<N> {
    /// Nodes whose dependencies could all be placed before them
    pub ordered: Vec<N>,

    /// Nodes on (or behind) a cycle, in insertion order
    pub cyclic: Vec<N>,
}

impl<N> TopologicalOrder<N> {
    /// Whether every node could be ordered
    pub fn is_complete(&self) -> bool {
        self.cyclic.is_empty()
    }
}

/// Dependency graph with forward and reverse edges
#[derive(Debug, Clone)]
pub struct DependencyGraph<N> {
    /// All nodes, in insertion order
    nodes: Vec<N>,

    /// Node -> insertion index
    index: HashMap<N, usize>,

    /// Forward edges: node -> nodes it depends on (parents)
    parents: Vec<Vec<usize>>,

    /// Reverse edges: node -> nodes that depend on it (children)
    children: Vec<Vec<usize>>,
}

impl<N: Clone + Eq + Hash> DependencyGraph<N> {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add a node if it is not present yet; returns its insertion index
    pub fn add_node(&mut self, node: N) -> usize {
        if let Some(&idx) = self.index.get(&node) {
            return idx;
        }

        let idx = self.nodes.len();
        self.index.insert(node.clone(), idx);
        self.nodes.push(node);
        self.parents.push(Vec::new());
        self.children.push(Vec::new());
        idx
    }

    /// Record that `node` depends on `dependency` (both are added if missing)
    pub fn add_dependency(&mut self, node: N, dependency: N) {
        let node_idx = self.add_node(node);
        let dep_idx = self.add_node(dependency);

        if !self.parents[node_idx].contains(&dep_idx) {
            self.parents[node_idx].push(dep_idx);
            self.children[dep_idx].push(node_idx);
        }
    }

    /// Get all nodes in insertion order
    pub fn all_nodes(&self) -> Vec<&N> {
        self.nodes.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get immediate parents (dependencies) of a node
    pub fn parents(&self, node: &N) -> Vec<&N> {
        self.index
            .get(node)
            .map(|&idx| self.parents[idx].iter().map(|&p| &self.nodes[p]).collect())
            .unwrap_or_default()
    }

    /// Get immediate children (dependents) of a node
    pub fn children(&self, node: &N) -> Vec<&N> {
        self.index
            .get(node)
            .map(|&idx| self.children[idx].iter().map(|&c| &self.nodes[c]).collect())
            .unwrap_or_default()
    }

    /// Get all upstream nodes (transitive closure of parents)
    pub fn upstream(&self, node: &N) -> Vec<N> {
        self.walk(node, &self.parents)
    }

    /// Get all downstream nodes (transitive closure of children)
    pub fn downstream(&self, node: &N) -> Vec<N> {
        self.walk(node, &self.children)
    }

    fn walk(&self, node: &N, edges: &[Vec<usize>]) -> Vec<N> {
        let Some(&start) = self.index.get(node) else {
            return Vec::new();
        };

        let mut visited = HashSet::new();
        let mut queue: VecDeque<usize> = edges[start].iter().copied().collect();
        let mut result = Vec::new();

        // BFS over the chosen edge direction
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }

            result.push(self.nodes[current].clone());

            for &next in &edges[current] {
                if !visited.contains(&next) {
                    queue.push_back(next);
                }
            }
        }

        result
    }

    /// Kahn's algorithm; among ready nodes the earliest inserted goes first.
    /// Nodes that can never become ready are reported as cyclic.
    pub fn topological_order(&self) -> TopologicalOrder<N> {
        let mut in_degree: Vec<usize> = self.parents.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree == 0)
            .map(|(idx, _)| Reverse(idx))
            .collect();

        let mut placed = vec![false; self.nodes.len()];
        let mut ordered = Vec::with_capacity(self.nodes.len());

        while let Some(Reverse(idx)) = ready.pop() {
            placed[idx] = true;
            ordered.push(self.nodes[idx].clone());

            for &child in &self.children[idx] {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    ready.push(Reverse(child));
                }
            }
        }

        let cyclic = self
            .nodes
            .iter()
            .zip(placed)
            .filter(|(_, placed)| !placed)
            .map(|(node, _)| node.clone())
            .collect();

        TopologicalOrder { ordered, cyclic }
    }

    /// Get topological sort of all nodes, or `None` when the graph has a cycle
    pub fn topological_sort(&self) -> Option<Vec<N>> {
        let order = self.topological_order();
        if order.is_complete() {
            Some(order.ordered)
        } else {
            None
        }
    }
}

impl<N: Clone + Eq + Hash> Default for DependencyGraph<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&'static str, &'static str)]) -> DependencyGraph<&'static str> {
        let mut dag = DependencyGraph::new();
        for (node, dep) in edges {
            dag.add_dependency(*node, *dep);
        }
        dag
    }

    #[test]
    fn dependencies_come_first() {
        let mut dag = DependencyGraph::new();
        dag.add_node("orders");
        dag.add_node("customers");
        dag.add_node("regions");
        dag.add_dependency("orders", "customers");
        dag.add_dependency("customers", "regions");

        assert_eq!(dag.topological_sort(), Some(vec!["regions", "customers", "orders"]));
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut dag = DependencyGraph::new();
        for node in ["b", "a", "c"] {
            dag.add_node(node);
        }

        assert_eq!(dag.topological_sort(), Some(vec!["b", "a", "c"]));
    }

    #[test]
    fn cycles_are_reported() {
        let mut dag = graph(&[("a", "b"), ("b", "a")]);
        dag.add_node("c");

        let order = dag.topological_order();
        assert_eq!(order.ordered, vec!["c"]);
        assert_eq!(order.cyclic, vec!["a", "b"]);
        assert!(dag.topological_sort().is_none());
    }

    #[test]
    fn upstream_and_downstream() {
        let dag = graph(&[("orders", "customers"), ("customers", "regions"), ("invoices", "orders")]);

        assert_eq!(dag.upstream(&"orders"), vec!["customers", "regions"]);
        assert_eq!(dag.downstream(&"customers"), vec!["orders", "invoices"]);
        assert_eq!(dag.parents(&"orders"), vec![&"customers"]);
        assert_eq!(dag.children(&"regions"), vec![&"customers"]);
        assert!(dag.upstream(&"missing").is_empty());
    }

    #[test]
    fn duplicate_edges_are_ignored() {
        let dag = graph(&[("a", "b"), ("a", "b")]);
        assert_eq!(dag.parents(&"a").len(), 1);
        assert_eq!(dag.len(), 2);
    }
}
