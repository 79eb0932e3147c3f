//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every record kind in the simulation has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. All IDs use UUID v7
//! (time-ordered) so that archive inserts index efficiently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for an agent (citizen) in the simulation.
    AgentId
}

define_id! {
    /// Unique identifier for a location (building or point in a district).
    LocationId
}

define_id! {
    /// Unique identifier for a route (edge in the district graph).
    RouteId
}

define_id! {
    /// Unique identifier for one activity step within a chain.
    StepId
}

define_id! {
    /// Unique identifier for an activity chain (one multi-step action).
    ChainId
}

define_id! {
    /// Unique identifier for a campaign (stratagem).
    CampaignId
}

define_id! {
    /// Unique identifier for a resource lot (an owned stock of one resource).
    LotId
}

define_id! {
    /// Unique identifier for a contract between two agents.
    ContractId
}
