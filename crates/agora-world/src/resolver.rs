//! The routing resolver: path and travel-duration computation.
//!
//! The orchestration core depends only on the [`RouteResolver`] trait; the
//! chain builder calls it once per movement leg and treats any error as
//! fatal for the whole chain. [`GraphResolver`] is the in-process
//! implementation, running Dijkstra over route durations in the district
//! graph.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use agora_types::LocationId;
use tracing::trace;

use crate::error::RoutingError;
use crate::graph::WorldGraph;

/// A resolved path between two locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    /// The locations visited, origin first and destination last.
    pub path: Vec<LocationId>,
    /// Total travel duration in seconds.
    pub duration_secs: u64,
}

/// Computes a path and travel duration between two locations.
///
/// Implementations may fail; callers must not assume a route exists.
pub trait RouteResolver {
    /// Resolve a path from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::UnknownLocation`] if an endpoint is not part
    /// of the world, or [`RoutingError::NoRoute`] if no path connects them.
    fn resolve(&self, from: LocationId, to: LocationId) -> Result<ResolvedRoute, RoutingError>;
}

/// Shortest-duration resolver over a [`WorldGraph`].
#[derive(Debug, Clone, Copy)]
pub struct GraphResolver<'a> {
    graph: &'a WorldGraph,
}

impl<'a> GraphResolver<'a> {
    /// Create a resolver over the given graph.
    pub const fn new(graph: &'a WorldGraph) -> Self {
        Self { graph }
    }
}

impl RouteResolver for GraphResolver<'_> {
    fn resolve(&self, from: LocationId, to: LocationId) -> Result<ResolvedRoute, RoutingError> {
        for endpoint in [from, to] {
            if !self.graph.contains(endpoint) {
                return Err(RoutingError::UnknownLocation(endpoint));
            }
        }

        if from == to {
            return Ok(ResolvedRoute {
                path: vec![from],
                duration_secs: 0,
            });
        }

        // Dijkstra over route durations.
        let mut dist: BTreeMap<LocationId, u64> = BTreeMap::new();
        let mut prev: BTreeMap<LocationId, LocationId> = BTreeMap::new();
        let mut heap: BinaryHeap<Reverse<(u64, LocationId)>> = BinaryHeap::new();

        dist.insert(from, 0);
        heap.push(Reverse((0, from)));

        while let Some(Reverse((cost, node))) = heap.pop() {
            if node == to {
                break;
            }
            if dist.get(&node).is_some_and(|&best| cost > best) {
                continue;
            }

            for &(next, route_id) in self.graph.neighbors(node) {
                let Some(route) = self.graph.route(route_id) else {
                    continue;
                };
                let next_cost = cost.saturating_add(route.duration_secs);
                let improves = dist.get(&next).is_none_or(|&best| next_cost < best);
                if improves {
                    dist.insert(next, next_cost);
                    prev.insert(next, node);
                    heap.push(Reverse((next_cost, next)));
                }
            }
        }

        let Some(&duration_secs) = dist.get(&to) else {
            return Err(RoutingError::NoRoute { from, to });
        };

        // Walk predecessors back from the destination.
        let mut path = vec![to];
        let mut cursor = to;
        while cursor != from {
            let Some(&p) = prev.get(&cursor) else {
                return Err(RoutingError::NoRoute { from, to });
            };
            path.push(p);
            cursor = p;
        }
        path.reverse();

        trace!(%from, %to, duration_secs, hops = path.len(), "Route resolved");
        Ok(ResolvedRoute {
            path,
            duration_secs,
        })
    }
}
