//! In-memory [`RecordStore`] backed by `BTreeMap`s.
//!
//! This is the authoritative store for a simulation run. Ordered maps
//! give deterministic iteration, cheap cloning for dry-run ticks, and no
//! I/O in the core path.

use std::collections::BTreeMap;

use agora_types::{
    ActivityStep, Agent, AgentId, Campaign, CampaignId, CampaignStatus, ChainId, Contract,
    Location, LocationId, LotId, ResourceLot, StepId,
};
use tracing::debug;

use crate::error::StoreError;
use crate::query::StepQuery;
use crate::store::RecordStore;

/// In-memory record store. `Clone` is intentionally cheap enough for the
/// driver's dry-run mode, which runs a full tick against a throwaway copy.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    agents: BTreeMap<AgentId, Agent>,
    locations: BTreeMap<LocationId, Location>,
    lots: BTreeMap<LotId, ResourceLot>,
    contracts: Vec<Contract>,
    steps: BTreeMap<StepId, ActivityStep>,
    campaigns: BTreeMap<CampaignId, Campaign>,
}

impl MemoryStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            agents: BTreeMap::new(),
            locations: BTreeMap::new(),
            lots: BTreeMap::new(),
            contracts: Vec::new(),
            steps: BTreeMap::new(),
            campaigns: BTreeMap::new(),
        }
    }

    /// Number of step records held (history included).
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

impl RecordStore for MemoryStore {
    fn agent(&self, id: AgentId) -> Result<Agent, StoreError> {
        self.agents
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("agent", id))
    }

    fn insert_agent(&mut self, agent: Agent) -> Result<(), StoreError> {
        if self.agents.contains_key(&agent.id) {
            return Err(StoreError::duplicate("agent", agent.id));
        }
        self.agents.insert(agent.id, agent);
        Ok(())
    }

    fn update_agent(&mut self, agent: Agent) -> Result<(), StoreError> {
        if !self.agents.contains_key(&agent.id) {
            return Err(StoreError::not_found("agent", agent.id));
        }
        self.agents.insert(agent.id, agent);
        Ok(())
    }

    fn location(&self, id: LocationId) -> Result<Location, StoreError> {
        self.locations
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("location", id))
    }

    fn insert_location(&mut self, location: Location) -> Result<(), StoreError> {
        if self.locations.contains_key(&location.id) {
            return Err(StoreError::duplicate("location", location.id));
        }
        self.locations.insert(location.id, location);
        Ok(())
    }

    fn update_location(&mut self, location: Location) -> Result<(), StoreError> {
        if !self.locations.contains_key(&location.id) {
            return Err(StoreError::not_found("location", location.id));
        }
        self.locations.insert(location.id, location);
        Ok(())
    }

    fn locations_operated_by(&self, agent: AgentId) -> Vec<LocationId> {
        self.locations
            .values()
            .filter(|l| l.operator == Some(agent))
            .map(|l| l.id)
            .collect()
    }

    fn lot(&self, id: LotId) -> Result<ResourceLot, StoreError> {
        self.lots
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("lot", id))
    }

    fn insert_lot(&mut self, lot: ResourceLot) -> Result<(), StoreError> {
        if self.lots.contains_key(&lot.id) {
            return Err(StoreError::duplicate("lot", lot.id));
        }
        self.lots.insert(lot.id, lot);
        Ok(())
    }

    fn update_lot(&mut self, lot: ResourceLot) -> Result<(), StoreError> {
        if !self.lots.contains_key(&lot.id) {
            return Err(StoreError::not_found("lot", lot.id));
        }
        self.lots.insert(lot.id, lot);
        Ok(())
    }

    fn insert_contract(&mut self, contract: Contract) -> Result<(), StoreError> {
        if self.contracts.iter().any(|c| c.id == contract.id) {
            return Err(StoreError::duplicate("contract", contract.id));
        }
        self.contracts.push(contract);
        Ok(())
    }

    fn contracts(&self) -> Vec<Contract> {
        self.contracts.clone()
    }

    fn insert_steps(&mut self, steps: &[ActivityStep]) -> Result<(), StoreError> {
        // Validate before touching the map so the insert is all-or-nothing.
        for step in steps {
            if self.steps.contains_key(&step.id) {
                return Err(StoreError::duplicate("step", step.id));
            }
        }
        for step in steps {
            self.steps.insert(step.id, step.clone());
        }
        debug!(count = steps.len(), "Inserted chain steps");
        Ok(())
    }

    fn step(&self, id: StepId) -> Result<ActivityStep, StoreError> {
        self.steps
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("step", id))
    }

    fn update_step(&mut self, step: ActivityStep) -> Result<(), StoreError> {
        if !self.steps.contains_key(&step.id) {
            return Err(StoreError::not_found("step", step.id));
        }
        self.steps.insert(step.id, step);
        Ok(())
    }

    fn query_steps(&self, query: &StepQuery) -> Vec<ActivityStep> {
        let mut matched: Vec<ActivityStep> = self
            .steps
            .values()
            .filter(|s| query.matches(s))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            a.starts_at
                .cmp(&b.starts_at)
                .then(a.chain_id.cmp(&b.chain_id))
                .then(a.seq.cmp(&b.seq))
        });
        matched
    }

    fn chain_steps(&self, chain: ChainId) -> Vec<ActivityStep> {
        let mut matched: Vec<ActivityStep> = self
            .steps
            .values()
            .filter(|s| s.chain_id == chain)
            .cloned()
            .collect();
        matched.sort_by_key(|s| s.seq);
        matched
    }

    fn insert_campaign(&mut self, campaign: Campaign) -> Result<(), StoreError> {
        if self.campaigns.contains_key(&campaign.id) {
            return Err(StoreError::duplicate("campaign", campaign.id));
        }
        self.campaigns.insert(campaign.id, campaign);
        Ok(())
    }

    fn campaign(&self, id: CampaignId) -> Result<Campaign, StoreError> {
        self.campaigns
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("campaign", id))
    }

    fn update_campaign(&mut self, campaign: Campaign) -> Result<(), StoreError> {
        if !self.campaigns.contains_key(&campaign.id) {
            return Err(StoreError::not_found("campaign", campaign.id));
        }
        self.campaigns.insert(campaign.id, campaign);
        Ok(())
    }

    fn active_campaigns(&self) -> Vec<Campaign> {
        self.campaigns
            .values()
            .filter(|c| c.status == CampaignStatus::Active)
            .cloned()
            .collect()
    }
}
