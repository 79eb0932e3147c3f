//! Error types for the `agora-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type alias.

use agora_types::{LocationId, RouteId};

/// Errors that can occur during district-graph operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A location was not found in the district graph.
    #[error("location not found: {0}")]
    LocationNotFound(LocationId),

    /// A duplicate location was inserted where uniqueness is required.
    #[error("duplicate location id: {0}")]
    DuplicateLocation(LocationId),

    /// A duplicate route was inserted where uniqueness is required.
    #[error("duplicate route id: {0}")]
    DuplicateRoute(RouteId),

    /// A route references a location that does not exist.
    #[error("route {route} references unknown location {location}")]
    DanglingRoute {
        /// The offending route.
        route: RouteId,
        /// The missing endpoint.
        location: LocationId,
    },
}

/// Errors returned by the routing resolver.
///
/// The orchestration core treats the resolver as an opaque collaborator
/// that may fail; these are the only failure shapes it observes.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    /// An endpoint is not part of the district graph.
    #[error("unknown location: {0}")]
    UnknownLocation(LocationId),

    /// No path connects the two locations.
    #[error("no route from {from} to {to}")]
    NoRoute {
        /// Origin location.
        from: LocationId,
        /// Destination location.
        to: LocationId,
    },
}
