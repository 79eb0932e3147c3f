//! The seed district used by the driver and by scenario tests.
//!
//! A small but realistic topology: six buildings joined by seven routes,
//! with travel durations on the order of minutes. Operators are assigned
//! later by whoever seeds the record store, since agents do not exist yet
//! when the graph is built.

use agora_types::{Location, LocationId, Route, RouteId};

use crate::error::WorldError;
use crate::graph::WorldGraph;

/// Well-known location IDs of the seed district.
#[derive(Debug, Clone, Copy)]
pub struct DistrictIds {
    /// The grain store.
    pub granary: LocationId,
    /// The central market.
    pub market_hall: LocationId,
    /// The stone quarry.
    pub quarry: LocationId,
    /// The timber yard.
    pub timber_yard: LocationId,
    /// The chapel construction site.
    pub chapel_site: LocationId,
    /// The weavers' hall.
    pub weavers_hall: LocationId,
}

/// Build the seed district graph.
///
/// Layout (durations in seconds):
///
/// ```text
/// granary --600-- market_hall --900-- quarry
///    |                |                 |
///   480              720              1200
///    |                |                 |
/// weavers_hall --- chapel_site --- timber_yard
///           (540)            (660)
/// ```
///
/// # Errors
///
/// Returns [`WorldError`] if graph construction fails, which would indicate
/// a bug in this function rather than bad input.
pub fn create_starting_world() -> Result<(WorldGraph, DistrictIds), WorldError> {
    let mut graph = WorldGraph::new();

    let ids = DistrictIds {
        granary: LocationId::new(),
        market_hall: LocationId::new(),
        quarry: LocationId::new(),
        timber_yard: LocationId::new(),
        chapel_site: LocationId::new(),
        weavers_hall: LocationId::new(),
    };

    for (id, name) in [
        (ids.granary, "Granary"),
        (ids.market_hall, "Market Hall"),
        (ids.quarry, "Quarry"),
        (ids.timber_yard, "Timber Yard"),
        (ids.chapel_site, "Chapel Site"),
        (ids.weavers_hall, "Weavers' Hall"),
    ] {
        graph.add_location(Location {
            id,
            name: name.to_owned(),
            operator: None,
        })?;
    }

    for (from, to, duration_secs) in [
        (ids.granary, ids.market_hall, 600),
        (ids.market_hall, ids.quarry, 900),
        (ids.granary, ids.weavers_hall, 480),
        (ids.market_hall, ids.chapel_site, 720),
        (ids.quarry, ids.timber_yard, 1200),
        (ids.weavers_hall, ids.chapel_site, 540),
        (ids.chapel_site, ids.timber_yard, 660),
    ] {
        graph.add_route(Route {
            id: RouteId::new(),
            from,
            to,
            duration_secs,
            bidirectional: true,
        })?;
    }

    Ok((graph, ids))
}
