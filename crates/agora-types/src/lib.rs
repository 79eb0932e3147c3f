//! Shared type definitions for the Agora economy simulation.
//!
//! This crate is the single source of truth for all types used across the
//! Agora workspace: identifier newtypes, closed enums, entity structs, the
//! versioned step payloads, and the action request types consumed by the
//! chain builder.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all record identifiers
//! - [`enums`] -- Enumeration types (step kinds, statuses, resources)
//! - [`structs`] -- Core entity structs (agents, steps, campaigns, ledger)
//! - [`payload`] -- One versioned payload schema per step kind
//! - [`request`] -- Action request types for chain construction

pub mod enums;
pub mod ids;
pub mod payload;
pub mod request;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    ActionKind, CampaignStatus, ContractKind, ResourceKind, StepKind, StepStatus,
    TerminationReason,
};
pub use ids::{AgentId, CampaignId, ChainId, ContractId, LocationId, LotId, RouteId, StepId};
pub use payload::{
    BuildPayload, DeliverPayload, FinalizePayload, StepPayload, TransactPayload, TravelPayload,
    PAYLOAD_VERSION,
};
pub use request::{ActionParams, ActionRequest};
pub use structs::{
    ActivityStep, Agent, Campaign, CampaignLedger, CampaignTarget, Contract, Location,
    ParticipantEntry, ResourceLot, Route,
};
