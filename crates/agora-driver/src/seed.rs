//! Seed world construction.
//!
//! Populates a fresh store with the six starting districts, a handful of
//! citizens with grain lots, and (optionally) a demonstration campaign
//! with one delivery chain already submitted, so the first ticks have
//! observable work.

use agora_campaign::{create_campaign, CampaignRequest};
use agora_chain::submit_chain;
use agora_store::{MemoryStore, RecordStore};
use agora_types::{
    ActionParams, ActionRequest, Agent, AgentId, CampaignId, CampaignTarget, LotId, ResourceKind,
    ResourceLot,
};
use agora_world::{create_starting_world, DistrictIds, GraphResolver, WorldGraph};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::config::WorldConfig;
use crate::error::DriverError;

/// Seed citizen names, cycled when `citizen_count` exceeds the list.
const CITIZEN_NAMES: [&str; 6] = ["Petra", "Matteo", "Alia", "Bruno", "Serena", "Cosimo"];

/// Grain units each seeded citizen starts with.
const STARTING_GRAIN: u32 = 40;

/// Demo campaign: up to 100 units of grain, 2 coins per unit, one week.
const DEMO_CAMPAIGN_MAX: u32 = 100;
const DEMO_REWARD_PER_UNIT: i64 = 2;
const DEMO_CAMPAIGN_DAYS: i64 = 7;

/// What seeding produced.
#[derive(Debug)]
pub struct SeedResult {
    /// The routable world graph.
    pub graph: WorldGraph,
    /// Well-known district IDs.
    pub districts: DistrictIds,
    /// Seeded citizens with their starting grain lots, in creation order.
    pub citizens: Vec<(AgentId, LotId)>,
    /// The demo campaign, when one was created.
    pub campaign: Option<CampaignId>,
}

/// Build the starting world inside the store.
///
/// # Errors
///
/// Returns [`DriverError`] if world construction, a store write, campaign
/// creation, or the demo chain fails.
pub fn seed_world(
    store: &mut MemoryStore,
    config: &WorldConfig,
    now: DateTime<Utc>,
) -> Result<SeedResult, DriverError> {
    let (graph, districts) = create_starting_world()?;
    for location in graph.locations() {
        store.insert_location(location.clone())?;
    }

    let district_cycle = [
        districts.granary,
        districts.market_hall,
        districts.quarry,
        districts.timber_yard,
        districts.chapel_site,
        districts.weavers_hall,
    ];
    let mut names = CITIZEN_NAMES.iter().cycle();
    let mut homes = district_cycle.iter().cycle();

    let mut citizens = Vec::new();
    for _ in 0..config.citizen_count {
        let name = names.next().copied().unwrap_or("Citizen");
        let home = homes.next().copied().unwrap_or(districts.granary);
        let agent = Agent {
            id: AgentId::new(),
            name: name.to_owned(),
            balance: Decimal::new(config.starting_balance, 0),
            location: Some(home),
        };
        store.insert_agent(agent.clone())?;

        // Every citizen starts with a grain lot at home.
        let lot = ResourceLot {
            id: LotId::new(),
            kind: ResourceKind::Grain,
            quantity: STARTING_GRAIN,
            owner: agent.id,
            location: home,
        };
        store.insert_lot(lot.clone())?;
        citizens.push((agent.id, lot.id));
    }

    let campaign = if config.demo_campaign {
        seed_demo_campaign(store, &graph, &districts, &citizens, now)?
    } else {
        None
    };

    info!(
        locations = graph.location_count(),
        citizens = citizens.len(),
        demo_campaign = campaign.is_some(),
        "Seed world built"
    );
    Ok(SeedResult {
        graph,
        districts,
        citizens,
        campaign,
    })
}

/// The first citizen organizes a grain campaign targeting the granary and
/// the second citizen submits a delivery chain toward it. Needs at least
/// two citizens; with fewer, no demo campaign is seeded.
fn seed_demo_campaign(
    store: &mut MemoryStore,
    graph: &WorldGraph,
    districts: &DistrictIds,
    citizens: &[(AgentId, LotId)],
    now: DateTime<Utc>,
) -> Result<Option<CampaignId>, DriverError> {
    let (Some(&(organizer, _)), Some(&(courier, courier_lot))) =
        (citizens.first(), citizens.get(1))
    else {
        return Ok(None);
    };

    let expires_at = now
        .checked_add_signed(Duration::days(DEMO_CAMPAIGN_DAYS))
        .unwrap_or(now);
    let campaign = create_campaign(
        store,
        &CampaignRequest {
            organizer,
            resource: ResourceKind::Grain,
            target: CampaignTarget::Building(districts.granary),
            max_total_amount: DEMO_CAMPAIGN_MAX,
            reward_per_unit: Decimal::new(DEMO_REWARD_PER_UNIT, 0),
            expires_at,
        },
        now,
    )?;

    let resolver = GraphResolver::new(graph);
    submit_chain(
        store,
        &resolver,
        &ActionRequest {
            agent_id: courier,
            params: ActionParams::Delivery {
                lot: courier_lot,
                destination: districts.granary,
            },
            submitted_at: now,
        },
        now,
    )?;

    Ok(Some(campaign.id))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn seeding_defaults_builds_a_runnable_world() {
        let mut store = MemoryStore::new();
        let result = seed_world(&mut store, &WorldConfig::default(), Utc::now()).unwrap();

        assert_eq!(result.citizens.len(), 6);
        assert!(result.campaign.is_some());
        // The demo courier's chain is pending in the store.
        assert!(store.step_count() > 0);
        assert_eq!(store.active_campaigns().len(), 1);
    }

    #[test]
    fn demo_campaign_needs_two_citizens() {
        let mut store = MemoryStore::new();
        let config = WorldConfig {
            citizen_count: 1,
            ..WorldConfig::default()
        };
        let result = seed_world(&mut store, &config, Utc::now()).unwrap();
        assert!(result.campaign.is_none());
    }

    #[test]
    fn demo_campaign_can_be_disabled() {
        let mut store = MemoryStore::new();
        let config = WorldConfig {
            demo_campaign: false,
            ..WorldConfig::default()
        };
        let result = seed_world(&mut store, &config, Utc::now()).unwrap();
        assert!(result.campaign.is_none());
        assert_eq!(store.step_count(), 0);
    }
}
