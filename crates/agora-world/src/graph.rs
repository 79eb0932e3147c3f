//! The district graph: locations as nodes, routes as weighted edges.
//!
//! The graph is the routing view of the world. The record store holds the
//! authoritative location records; the driver seeds both from the same
//! values at startup. Locations are immutable reference data, so the two
//! views cannot drift during a run.

use std::collections::BTreeMap;

use agora_types::{Location, LocationId, Route, RouteId};

use crate::error::WorldError;

/// The district graph over which travel legs are resolved.
#[derive(Debug, Default, Clone)]
pub struct WorldGraph {
    /// All locations, keyed by ID.
    locations: BTreeMap<LocationId, Location>,
    /// All routes, keyed by ID.
    routes: BTreeMap<RouteId, Route>,
    /// Directed adjacency: origin -> (destination, route) pairs.
    adjacency: BTreeMap<LocationId, Vec<(LocationId, RouteId)>>,
}

impl WorldGraph {
    /// Create an empty graph.
    pub const fn new() -> Self {
        Self {
            locations: BTreeMap::new(),
            routes: BTreeMap::new(),
            adjacency: BTreeMap::new(),
        }
    }

    /// Add a location to the graph.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateLocation`] if the ID is already present.
    pub fn add_location(&mut self, location: Location) -> Result<(), WorldError> {
        if self.locations.contains_key(&location.id) {
            return Err(WorldError::DuplicateLocation(location.id));
        }
        self.adjacency.entry(location.id).or_default();
        self.locations.insert(location.id, location);
        Ok(())
    }

    /// Add a route to the graph. Both endpoints must already exist.
    ///
    /// Bidirectional routes are entered into the adjacency in both
    /// directions under the same route ID.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateRoute`] if the ID is already present,
    /// or [`WorldError::DanglingRoute`] if an endpoint is missing.
    pub fn add_route(&mut self, route: Route) -> Result<(), WorldError> {
        if self.routes.contains_key(&route.id) {
            return Err(WorldError::DuplicateRoute(route.id));
        }
        for endpoint in [route.from, route.to] {
            if !self.locations.contains_key(&endpoint) {
                return Err(WorldError::DanglingRoute {
                    route: route.id,
                    location: endpoint,
                });
            }
        }

        self.adjacency
            .entry(route.from)
            .or_default()
            .push((route.to, route.id));
        if route.bidirectional {
            self.adjacency
                .entry(route.to)
                .or_default()
                .push((route.from, route.id));
        }
        self.routes.insert(route.id, route);
        Ok(())
    }

    /// Look up a location by ID.
    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    /// Look up a route by ID.
    pub fn route(&self, id: RouteId) -> Option<&Route> {
        self.routes.get(&id)
    }

    /// Whether the graph contains the location.
    pub fn contains(&self, id: LocationId) -> bool {
        self.locations.contains_key(&id)
    }

    /// Number of locations in the graph.
    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    /// Outgoing neighbors of a location: (destination, route) pairs.
    pub fn neighbors(&self, id: LocationId) -> &[(LocationId, RouteId)] {
        self.adjacency.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Iterate over all locations, for seeding the record store.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn loc(name: &str) -> Location {
        Location {
            id: LocationId::new(),
            name: name.to_owned(),
            operator: None,
        }
    }

    fn route(from: LocationId, to: LocationId, secs: u64) -> Route {
        Route {
            id: RouteId::new(),
            from,
            to,
            duration_secs: secs,
            bidirectional: true,
        }
    }

    #[test]
    fn duplicate_location_rejected() {
        let mut graph = WorldGraph::new();
        let a = loc("Granary");
        let id = a.id;
        graph.add_location(a.clone()).unwrap();
        assert!(matches!(
            graph.add_location(a),
            Err(WorldError::DuplicateLocation(d)) if d == id
        ));
    }

    #[test]
    fn route_requires_both_endpoints() {
        let mut graph = WorldGraph::new();
        let a = loc("Granary");
        let from = a.id;
        graph.add_location(a).unwrap();
        let result = graph.add_route(route(from, LocationId::new(), 60));
        assert!(matches!(result, Err(WorldError::DanglingRoute { .. })));
    }

    #[test]
    fn bidirectional_route_appears_both_ways() {
        let mut graph = WorldGraph::new();
        let a = loc("Granary");
        let b = loc("Market Hall");
        let (from, to) = (a.id, b.id);
        graph.add_location(a).unwrap();
        graph.add_location(b).unwrap();
        graph.add_route(route(from, to, 60)).unwrap();

        assert_eq!(graph.neighbors(from).len(), 1);
        assert_eq!(graph.neighbors(to).len(), 1);
    }
}
