// src/checker/cycles.rs
//! Circular dependency detection.
//!
//! Nodes are module paths; edges are non-deprecated declared dependencies
//! exercised by at least one real import. Tarjan's algorithm finds the
//! strongly connected components; any component larger than one node (or
//! a self-loop) is reported as a cycle in path order.

use std::collections::HashSet;

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

use crate::config::ModuleConfig;

/// Returns each cycle as an ordered list of module paths, first node
/// repeated at the end for display.
#[must_use]
pub fn find_cycles<'a>(
    modules: &'a [ModuleConfig],
    used_edges: &HashSet<(String, String)>,
) -> Vec<Vec<&'a str>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    let mut self_loops: Vec<&str> = Vec::new();

    for module in modules {
        graph.add_node(module.path.as_str());
        for dependency in module.dependencies_iter().filter(|d| !d.deprecated) {
            let edge = (module.path.clone(), dependency.path.clone());
            if !used_edges.contains(&edge) {
                continue;
            }
            if dependency.path == module.path {
                self_loops.push(module.path.as_str());
            } else {
                graph.add_edge(module.path.as_str(), dependency.path.as_str(), ());
            }
        }
    }

    let mut cycles = Vec::new();
    for node in self_loops {
        cycles.push(vec![node, node]);
    }
    for component in tarjan_scc(&graph) {
        if component.len() > 1 {
            cycles.push(order_cycle(&graph, &component));
        }
    }

    cycles.sort();
    cycles
}

/// Walks edges inside the component from its smallest node until the walk
/// returns, producing one concrete cycle in deterministic order.
fn order_cycle<'a>(graph: &DiGraphMap<&'a str, ()>, component: &[&'a str]) -> Vec<&'a str> {
    let members: HashSet<&str> = component.iter().copied().collect();
    let start = *component.iter().min().expect("component is non-empty");

    let mut ordered = vec![start];
    let mut visited: HashSet<&str> = HashSet::from([start]);
    let mut current = start;

    loop {
        let mut neighbors: Vec<&str> = graph
            .neighbors(current)
            .filter(|n| members.contains(n))
            .collect();
        neighbors.sort_unstable();

        // Prefer closing the loop, otherwise take the first unvisited
        // member.
        if ordered.len() > 1 && neighbors.contains(&start) {
            ordered.push(start);
            return ordered;
        }
        let Some(next) = neighbors.into_iter().find(|n| !visited.contains(n)) else {
            ordered.push(start);
            return ordered;
        };
        visited.insert(next);
        ordered.push(next);
        current = next;
    }
}

/// Formats a cycle for a diagnostic message: `'a' -> 'b' -> 'a'`.
#[must_use]
pub fn format_cycle(cycle: &[&str]) -> String {
    cycle
        .iter()
        .map(|node| format!("'{node}'"))
        .collect::<Vec<_>>()
        .join(" -> ")
}
