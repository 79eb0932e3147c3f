//! District graph and routing resolver for the Agora economy simulation.
//!
//! The world is a graph of buildings joined by routes with travel
//! durations. The orchestration core never reads the graph directly; it
//! goes through the [`RouteResolver`] trait, which may fail, exactly as the
//! external routing service it stands in for.
//!
//! # Modules
//!
//! - [`graph`] -- The [`WorldGraph`] of locations and routes
//! - [`resolver`] -- [`RouteResolver`] trait and the Dijkstra implementation
//! - [`starting_world`] -- The seed district used by the driver and tests
//! - [`error`] -- [`WorldError`] and [`RoutingError`]

pub mod error;
pub mod graph;
pub mod resolver;
pub mod starting_world;

pub use error::{RoutingError, WorldError};
pub use graph::WorldGraph;
pub use resolver::{GraphResolver, ResolvedRoute, RouteResolver};
pub use starting_world::{create_starting_world, DistrictIds};
