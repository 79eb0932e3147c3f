//! The [`RecordStore`] trait: the orchestration core's only view of
//! persistence.
//!
//! The core needs create / read / update / query-by-filter semantics and
//! nothing else -- no joins, no transactions beyond the atomicity the
//! individual methods promise. Implementations return owned records;
//! callers mutate copies and write them back via the `update_*` methods
//! (last write wins, one logical owner per record per tick is a deployment
//! invariant).

use agora_types::{
    ActivityStep, Agent, AgentId, Campaign, CampaignId, ChainId, Contract, Location, LocationId,
    LotId, ResourceLot, StepId,
};

use crate::error::StoreError;
use crate::query::StepQuery;

/// Record persistence used by the chain builder, dispatcher, and
/// campaign machinery.
pub trait RecordStore {
    // --- agents ---

    /// Fetch an agent by ID.
    fn agent(&self, id: AgentId) -> Result<Agent, StoreError>;

    /// Insert a new agent.
    fn insert_agent(&mut self, agent: Agent) -> Result<(), StoreError>;

    /// Overwrite an existing agent.
    fn update_agent(&mut self, agent: Agent) -> Result<(), StoreError>;

    // --- locations ---

    /// Fetch a location by ID.
    fn location(&self, id: LocationId) -> Result<Location, StoreError>;

    /// Insert a new location.
    fn insert_location(&mut self, location: Location) -> Result<(), StoreError>;

    /// Overwrite an existing location (operator change).
    fn update_location(&mut self, location: Location) -> Result<(), StoreError>;

    /// All buildings operated by the given agent.
    fn locations_operated_by(&self, agent: AgentId) -> Vec<LocationId>;

    // --- resource lots ---

    /// Fetch a lot by ID.
    fn lot(&self, id: LotId) -> Result<ResourceLot, StoreError>;

    /// Insert a new lot.
    fn insert_lot(&mut self, lot: ResourceLot) -> Result<(), StoreError>;

    /// Overwrite an existing lot (ownership or location change).
    fn update_lot(&mut self, lot: ResourceLot) -> Result<(), StoreError>;

    // --- contracts ---

    /// Insert a newly settled contract.
    fn insert_contract(&mut self, contract: Contract) -> Result<(), StoreError>;

    /// All contracts, in insertion order.
    fn contracts(&self) -> Vec<Contract>;

    // --- activity steps ---

    /// Insert a whole chain's steps atomically: either all steps are
    /// written or none are, so partial chains never exist in the store.
    fn insert_steps(&mut self, steps: &[ActivityStep]) -> Result<(), StoreError>;

    /// Fetch a step by ID.
    fn step(&self, id: StepId) -> Result<ActivityStep, StoreError>;

    /// Overwrite an existing step (status transition).
    fn update_step(&mut self, step: ActivityStep) -> Result<(), StoreError>;

    /// All steps matching the query, ordered by `(starts_at, chain, seq)`.
    fn query_steps(&self, query: &StepQuery) -> Vec<ActivityStep>;

    /// All steps of one chain, ordered by `seq`.
    fn chain_steps(&self, chain: ChainId) -> Vec<ActivityStep>;

    // --- campaigns ---

    /// Insert a new campaign.
    fn insert_campaign(&mut self, campaign: Campaign) -> Result<(), StoreError>;

    /// Fetch a campaign by ID.
    fn campaign(&self, id: CampaignId) -> Result<Campaign, StoreError>;

    /// Overwrite an existing campaign. This is the single atomic update
    /// the delta scanner performs per scan.
    fn update_campaign(&mut self, campaign: Campaign) -> Result<(), StoreError>;

    /// All campaigns still in the `Active` state.
    fn active_campaigns(&self) -> Vec<Campaign>;
}
