//! Typed, versioned payloads for activity steps.
//!
//! Each [`StepKind`] has exactly one payload schema. Payloads persist as a
//! nested structured document inside the step record, so the schema can
//! evolve per kind without touching the step table layout. Every payload
//! carries a `version` field; readers reject versions they do not know
//! instead of guessing at keys.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{ResourceKind, StepKind};
use crate::ids::{AgentId, LocationId, LotId};

/// Current payload schema version written by this build.
pub const PAYLOAD_VERSION: u32 = 1;

const fn default_version() -> u32 {
    PAYLOAD_VERSION
}

/// Payload for a [`StepKind::Travel`] step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelPayload {
    /// Payload schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// The resolved path, including origin and destination.
    pub path: Vec<LocationId>,
    /// Total travel duration in seconds, as returned by the resolver.
    pub duration_secs: u64,
    /// The lot carried along, if the chain moves goods.
    pub carried_lot: Option<LotId>,
}

/// Payload for a [`StepKind::Deliver`] step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverPayload {
    /// Payload schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// The lot being dropped at the destination.
    pub lot: LotId,
    /// Resource kind of the lot (denormalized for campaign matching).
    pub resource: ResourceKind,
    /// Number of units in the lot at chain construction time.
    pub quantity: u32,
}

/// Payload for a [`StepKind::Transact`] step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactPayload {
    /// Payload schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// The agent on the other side of the exchange.
    pub counterparty: AgentId,
    /// The lot changing hands, or `None` for a pure payment.
    pub lot: Option<LotId>,
    /// The settlement amount. The counterparty pays it when a lot changes
    /// hands; the acting agent pays it otherwise.
    pub price: Decimal,
}

/// Payload for a [`StepKind::Build`] step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPayload {
    /// Payload schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// The building site.
    pub site: LocationId,
    /// Construction cost debited from the builder.
    pub cost: Decimal,
    /// Hand-over fee owed to the site operator on completion, if any.
    ///
    /// When present, the build handler appends a follow-up transact step
    /// paying this fee -- the data-dependent step creation path.
    pub handover_fee: Option<Decimal>,
}

/// Payload for a [`StepKind::Finalize`] step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizePayload {
    /// Payload schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Optional free-text note recorded on completion.
    pub note: Option<String>,
}

/// The kind-specific payload of an activity step.
///
/// The enum tag is serialized alongside the data, so a persisted payload
/// always identifies its own schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StepPayload {
    /// Travel leg data.
    Travel(TravelPayload),
    /// Delivery drop-off data.
    Deliver(DeliverPayload),
    /// Exchange data.
    Transact(TransactPayload),
    /// Construction data.
    Build(BuildPayload),
    /// Chain close-out data.
    Finalize(FinalizePayload),
}

impl StepPayload {
    /// The [`StepKind`] this payload belongs to.
    ///
    /// A step record is well-formed only when `step.kind == payload.kind()`;
    /// the chain builder constructs steps that way and the dispatcher
    /// rejects mismatches as corrupt.
    pub const fn kind(&self) -> StepKind {
        match self {
            Self::Travel(_) => StepKind::Travel,
            Self::Deliver(_) => StepKind::Deliver,
            Self::Transact(_) => StepKind::Transact,
            Self::Build(_) => StepKind::Build,
            Self::Finalize(_) => StepKind::Finalize,
        }
    }

    /// The schema version carried by the payload.
    pub const fn version(&self) -> u32 {
        match self {
            Self::Travel(p) => p.version,
            Self::Deliver(p) => p.version,
            Self::Transact(p) => p.version,
            Self::Build(p) => p.version,
            Self::Finalize(p) => p.version,
        }
    }
}
