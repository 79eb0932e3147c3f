//! Error taxonomy for chain construction.
//!
//! Three failure families, each with a distinct recovery policy: validation
//! errors mean the request itself is bad (fix the parameters), resolution
//! errors mean the world cannot satisfy it right now (retry with a
//! different route or later), and store errors are infrastructure.

use agora_types::{AgentId, LocationId, LotId};
use rust_decimal::Decimal;

/// A precondition on the action request failed. Nothing was persisted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The requesting agent does not own the named lot.
    #[error("agent {agent} does not own lot {lot}")]
    LotNotOwned {
        /// The lot named in the request.
        lot: LotId,
        /// The requesting agent.
        agent: AgentId,
    },

    /// The lot holds zero units and cannot be delivered or traded.
    #[error("lot {lot} is empty")]
    EmptyLot {
        /// The empty lot.
        lot: LotId,
    },

    /// The paying party cannot cover the amount.
    #[error("agent {agent} has {available} but needs {required}")]
    InsufficientBalance {
        /// The paying agent.
        agent: AgentId,
        /// The amount the action requires.
        required: Decimal,
        /// The agent's current balance.
        available: Decimal,
    },

    /// Trade price must be positive.
    #[error("price {price} is not positive")]
    NonPositivePrice {
        /// The offending price.
        price: Decimal,
    },

    /// Construction cost must be positive.
    #[error("cost {cost} is not positive")]
    NonPositiveCost {
        /// The offending cost.
        cost: Decimal,
    },

    /// An agent cannot trade with itself.
    #[error("agent {agent} cannot trade with itself")]
    SelfTrade {
        /// The requesting agent.
        agent: AgentId,
    },
}

/// Chain construction failed. The operation is all-or-nothing: on any
/// variant, zero steps were persisted.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// An action precondition failed.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The requesting agent has no current location to start from.
    #[error("agent {0} has no current location")]
    InvalidAgentLocation(AgentId),

    /// The routing resolver found no path for a movement leg.
    #[error("no route from {from} to {to}")]
    RouteNotFound {
        /// Leg origin.
        from: LocationId,
        /// Leg destination.
        to: LocationId,
        /// The resolver's own report.
        #[source]
        source: agora_world::RoutingError,
    },

    /// Accumulated step timings overflowed the timestamp range.
    #[error("step schedule overflowed the representable time range")]
    ScheduleOverflow,

    /// A record lookup or write failed.
    #[error(transparent)]
    Store(#[from] agora_store::StoreError),
}
