//! Dependency graph ordering with cycle detection.
//!
//! Nodes are ordered so that every dependency precedes its dependents.
//! Among nodes that the edges leave unordered, higher priority comes first
//! and names break remaining ties.

use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

use crate::error::{CompilerError, GRAPH_CIRCULAR_DEP};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub name: String,
    pub dependencies: Vec<String>,
    pub priority: i64,
}

impl GraphNode {
    pub fn new(name: &str, dependencies: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }
}

struct Graph {
    /// Name -> (priority, dependencies); repeated names merge.
    nodes: IndexMap<String, (i64, IndexSet<String>)>,
    /// Dependency -> dependents, in input order.
    dependents: HashMap<String, Vec<String>>,
}

impl Graph {
    fn build(input: &[GraphNode]) -> Self {
        let mut nodes: IndexMap<String, (i64, IndexSet<String>)> = IndexMap::new();
        for node in input {
            let entry = nodes.entry(node.name.clone()).or_insert((node.priority, IndexSet::new()));
            entry.0 = entry.0.max(node.priority);
            entry.1.extend(node.dependencies.iter().cloned());
        }

        let implicit: Vec<String> = nodes
            .values()
            .flat_map(|(_, deps)| deps.iter())
            .filter(|dep| !nodes.contains_key(*dep))
            .cloned()
            .collect();
        for name in implicit {
            nodes.entry(name).or_insert((0, IndexSet::new()));
        }

        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for (name, (_, deps)) in &nodes {
            for dep in deps {
                dependents.entry(dep.clone()).or_default().push(name.clone());
            }
        }
        Self { nodes, dependents }
    }

    fn priority(&self, name: &str) -> i64 {
        self.nodes.get(name).map(|(p, _)| *p).unwrap_or(0)
    }

    fn ordered<'n>(&self, names: impl Iterator<Item = &'n String>) -> Vec<&'n String> {
        let mut names: Vec<&String> = names.collect();
        names.sort_by(|a, b| {
            self.priority(b)
                .cmp(&self.priority(a))
                .then_with(|| a.cmp(b))
        });
        names
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CYCLE DETECTION
// ═══════════════════════════════════════════════════════════════════════════════

struct Paths<'g> {
    graph: &'g Graph,
    /// from -> to -> shortest known path along dependency-to-dependent edges.
    known: HashMap<String, HashMap<String, Vec<String>>>,
}

impl<'g> Paths<'g> {
    fn record(&mut self, stack: &[String], to: &str) {
        for (i, from) in stack.iter().enumerate() {
            let mut path = stack[i..].to_vec();
            path.push(to.to_string());
            let slot = self.known.entry(from.clone()).or_default();
            match slot.get(to) {
                Some(existing) if existing.len() <= path.len() => {}
                _ => {
                    slot.insert(to.to_string(), path);
                }
            }
        }
    }

    fn path(&self, from: &str, to: &str) -> Option<&Vec<String>> {
        self.known.get(from).and_then(|m| m.get(to))
    }

    fn walk(
        &mut self,
        stack: &mut Vec<String>,
        seen: &mut IndexSet<String>,
    ) -> Result<(), CompilerError> {
        let Some(current) = stack.last().cloned() else {
            return Ok(());
        };
        let graph = self.graph;
        let Some(next) = graph.dependents.get(&current) else {
            return Ok(());
        };
        for dependent in next {
            if *dependent == current {
                return Err(cycle(&current, &current, &[current.clone()], &[current.clone()]));
            }
            if let Some(back) = self.path(dependent, &current) {
                let back = back.clone();
                let forward = self
                    .path(&current, dependent)
                    .cloned()
                    .unwrap_or_else(|| vec![current.clone(), dependent.clone()]);
                return Err(cycle(dependent, &current, &back, &forward));
            }
            self.record(stack, dependent);
            if seen.insert(dependent.clone()) {
                stack.push(dependent.clone());
                self.walk(stack, seen)?;
                stack.pop();
            }
        }
        Ok(())
    }
}

fn cycle(from: &str, to: &str, path: &[String], reverse: &[String]) -> CompilerError {
    CompilerError::new(GRAPH_CIRCULAR_DEP, "Circular dependency detected")
        .detail("from", from)
        .detail("to", to)
        .detail("path", path.join(" -> "))
        .detail("reverse", reverse.join(" -> "))
}

fn detect_cycles(graph: &Graph) -> Result<(), CompilerError> {
    let mut paths = Paths {
        graph,
        known: HashMap::new(),
    };
    for name in graph.nodes.keys() {
        let mut seen = IndexSet::new();
        seen.insert(name.clone());
        let mut stack = vec![name.clone()];
        paths.walk(&mut stack, &mut seen)?;
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOPOLOGICAL ORDER
// ═══════════════════════════════════════════════════════════════════════════════

fn visit(graph: &Graph, name: &String, done: &mut IndexSet<String>) {
    if done.contains(name) {
        return;
    }
    if let Some((_, deps)) = graph.nodes.get(name) {
        for dep in graph.ordered(deps.iter()) {
            visit(graph, dep, done);
        }
    }
    done.insert(name.clone());
}

/// Node names with dependencies first. Dependencies missing from the input
/// are ordered as implicit nodes with priority 0.
pub fn sort_nodes(input: &[GraphNode]) -> Result<Vec<String>, CompilerError> {
    let graph = Graph::build(input);
    detect_cycles(&graph)?;

    let roots = graph.ordered(
        graph
            .nodes
            .keys()
            .filter(|name| !graph.dependents.contains_key(*name)),
    );
    let mut done = IndexSet::new();
    for root in roots {
        visit(&graph, root, &mut done);
    }
    tracing::debug!(nodes = done.len(), "sorted dependency graph");
    Ok(done.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(lines: &str) -> Vec<GraphNode> {
        lines
            .split('|')
            .map(|line| {
                let mut parts = line.trim().split(',');
                let name = parts.next().unwrap_or_default();
                let deps: Vec<&str> = parts.collect();
                GraphNode::new(name, &deps)
            })
            .collect()
    }

    #[test]
    fn test_topological_order() {
        let nodes = parse("2 | 3 | 5 | 7 | 8 | 9 | 10 | 11 | 5,11 | 7,11,8 | 3,8,10 | 8,9 | 11,2,9,10");
        let order = sort_nodes(&nodes).unwrap();
        assert_eq!(order, vec!["10", "9", "8", "3", "2", "11", "5", "7"]);
    }

    #[test]
    fn test_dependencies_precede_dependents() {
        let nodes = parse("a,b,c | b,d | c,d | d | e");
        let order = sort_nodes(&nodes).unwrap();
        let at = |n: &str| order.iter().position(|x| x == n).unwrap();
        for node in &nodes {
            for dep in &node.dependencies {
                assert!(at(dep) < at(&node.name));
            }
        }
    }

    #[test]
    fn test_priority_breaks_ties() {
        let nodes = vec![
            GraphNode::new("low", &[]),
            GraphNode::new("high", &[]).with_priority(5),
        ];
        assert_eq!(sort_nodes(&nodes).unwrap(), vec!["high", "low"]);
    }

    #[test]
    fn test_cycle_report() {
        let nodes = parse("A | B | C,A | D,B | E,C,D | F,A,B | G,E,F | H,G | A,H");
        let err = sort_nodes(&nodes).unwrap_err();
        assert_eq!(err.code, GRAPH_CIRCULAR_DEP);
        let mut endpoints = vec![err.get("from").unwrap(), err.get("to").unwrap()];
        endpoints.sort();
        assert_eq!(endpoints, vec!["A", "H"]);

        let path = err.get("path").unwrap();
        let reverse = err.get("reverse").unwrap();
        assert!(path.starts_with("A") && path.ends_with("H"), "{}", path);
        assert!(reverse.starts_with("H") && reverse.ends_with("A"), "{}", reverse);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let err = sort_nodes(&parse("a,a")).unwrap_err();
        assert_eq!(err.code, GRAPH_CIRCULAR_DEP);
    }

    #[test]
    fn test_missing_dependencies_become_nodes() {
        assert_eq!(sort_nodes(&parse("a,x")).unwrap(), vec!["x", "a"]);
    }
}
