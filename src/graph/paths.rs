//! All-shortest-paths search over the route graph
//!
//! Distances come from petgraph's Dijkstra. Every path of minimal weight is
//! then recovered by walking "tight" edges backwards from the target: an
//! edge `u -> v` is tight when `dist[u] + w == dist[v]`. Dijkstra derives
//! each distance with that same addition, so exact float equality holds.
//!
//! Weights must be non-negative; the store rejects anything else.

use super::store_models::Route;
use petgraph::algo::dijkstra;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

pub type RouteGraph = StableDiGraph<String, f64>;

/// Every minimal-weight route from `from` to `to`, sorted by name sequence
///
/// `from == to` yields the single zero-weight route `[from]`; an unreachable
/// target yields no routes.
pub fn all_shortest_routes(graph: &RouteGraph, from: NodeIndex, to: NodeIndex) -> Vec<Route> {
    if from == to {
        return vec![Route::new(vec![graph[from].clone()], 0.0)];
    }

    let dist = dijkstra(graph, from, None, |e| *e.weight());
    let Some(&weight) = dist.get(&to) else {
        return Vec::new();
    };

    let found = tight_paths(graph, &dist, from, to);

    let mut routes: Vec<Route> = found
        .into_iter()
        .map(|nodes| {
            let names = nodes.iter().rev().map(|&idx| graph[idx].clone()).collect();
            Route::new(names, weight)
        })
        .collect();

    routes.sort_by(|a, b| a.route.cmp(&b.route));
    routes
}

/// Every simple path over tight edges, walked from `target` back to `source`
///
/// Paths come back target first. The walk keeps its own stack of incoming
/// edge iterators, one per node on the current path, so route length is
/// bounded by the graph rather than the thread stack.
fn tight_paths(
    graph: &RouteGraph,
    dist: &HashMap<NodeIndex, f64>,
    source: NodeIndex,
    target: NodeIndex,
) -> Vec<Vec<NodeIndex>> {
    let mut found = Vec::new();
    let mut path = vec![target];
    let mut on_path = HashSet::from([target]);
    let mut stack = vec![graph.edges_directed(target, Direction::Incoming)];

    while let Some(edges) = stack.last_mut() {
        let node = path[path.len() - 1];
        let node_dist = dist[&node];

        // Zero-weight cycles make tight edges cyclic; keep paths simple
        let next = edges
            .find(|edge| {
                let pred = edge.source();
                !on_path.contains(&pred)
                    && dist
                        .get(&pred)
                        .is_some_and(|&d| d + *edge.weight() == node_dist)
            })
            .map(|edge| edge.source());

        match next {
            Some(pred) if pred == source => {
                let mut route = path.clone();
                route.push(pred);
                found.push(route);
            }
            Some(pred) => {
                path.push(pred);
                on_path.insert(pred);
                stack.push(graph.edges_directed(pred, Direction::Incoming));
            }
            None => {
                stack.pop();
                if let Some(done) = path.pop() {
                    on_path.remove(&done);
                }
            }
        }
    }

    found
}
