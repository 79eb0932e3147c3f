//! Campaign creation.
//!
//! Escrow for the full reward pool is debited from the organizer up front,
//! synchronously and atomically: either the organizer's balance and the
//! new campaign record both change, or neither does.

use agora_store::RecordStore;
use agora_types::{
    AgentId, Campaign, CampaignId, CampaignLedger, CampaignStatus, CampaignTarget, ResourceKind,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::error::CampaignError;

/// Parameters for a new campaign.
#[derive(Debug, Clone)]
pub struct CampaignRequest {
    /// The organizing agent paying the escrow.
    pub organizer: AgentId,
    /// The resource kind the campaign collects.
    pub resource: ResourceKind,
    /// Where qualifying deliveries must arrive.
    pub target: CampaignTarget,
    /// The most units the campaign will ever credit.
    pub max_total_amount: u32,
    /// Reward paid per delivered unit. Zero means no pooled reward.
    pub reward_per_unit: Decimal,
    /// When the campaign expires if the target is not reached.
    pub expires_at: DateTime<Utc>,
}

/// Create a campaign, reserving the whole reward pool in escrow.
///
/// `escrow = max_total_amount * reward_per_unit` leaves the organizer's
/// balance immediately; it comes back only through the lifecycle manager's
/// refund of whatever the scanner never paid out.
///
/// # Errors
///
/// Returns [`CampaignError`] if the parameters are invalid, the organizer
/// cannot cover the escrow, or the store rejects a write. On error the
/// organizer's balance is untouched.
pub fn create_campaign<S: RecordStore>(
    store: &mut S,
    request: &CampaignRequest,
    now: DateTime<Utc>,
) -> Result<Campaign, CampaignError> {
    if request.max_total_amount == 0 {
        return Err(CampaignError::ZeroTargetAmount);
    }
    if request.reward_per_unit < Decimal::ZERO {
        return Err(CampaignError::NegativeReward(request.reward_per_unit));
    }

    let escrow = Decimal::from(request.max_total_amount)
        .checked_mul(request.reward_per_unit)
        .ok_or(CampaignError::Overflow)?;

    let mut organizer = store.agent(request.organizer)?;
    if organizer.balance < escrow {
        return Err(CampaignError::InsufficientEscrow {
            organizer: organizer.id,
            required: escrow,
            available: organizer.balance,
        });
    }

    let campaign = Campaign {
        id: CampaignId::new(),
        organizer: organizer.id,
        resource: request.resource,
        target: request.target,
        max_total_amount: request.max_total_amount,
        reward_per_unit: request.reward_per_unit,
        status: CampaignStatus::Active,
        reason: None,
        created_at: now,
        expires_at: request.expires_at,
        ledger: CampaignLedger::new(escrow),
    };

    // Insert first so a duplicate ID cannot leave the balance debited.
    store.insert_campaign(campaign.clone())?;
    organizer.balance = organizer
        .balance
        .checked_sub(escrow)
        .ok_or(CampaignError::Overflow)?;
    store.update_agent(organizer)?;

    info!(
        campaign = %campaign.id,
        organizer = %campaign.organizer,
        escrow = %escrow,
        max = campaign.max_total_amount,
        "Campaign created"
    );
    Ok(campaign)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use agora_store::MemoryStore;
    use agora_types::{Agent, LocationId};
    use chrono::Duration;

    use super::*;

    fn organizer_with(balance: i64) -> (MemoryStore, Agent) {
        let mut store = MemoryStore::new();
        let agent = Agent {
            id: AgentId::new(),
            name: "Guildmaster".to_owned(),
            balance: Decimal::new(balance, 0),
            location: None,
        };
        store.insert_agent(agent.clone()).unwrap();
        (store, agent)
    }

    fn request(organizer: AgentId, max: u32, reward: i64) -> CampaignRequest {
        CampaignRequest {
            organizer,
            resource: ResourceKind::Grain,
            target: CampaignTarget::Building(LocationId::new()),
            max_total_amount: max,
            reward_per_unit: Decimal::new(reward, 0),
            expires_at: Utc::now().checked_add_signed(Duration::days(7)).unwrap(),
        }
    }

    #[test]
    fn escrow_is_debited_at_creation() {
        let (mut store, agent) = organizer_with(1000);
        let campaign =
            create_campaign(&mut store, &request(agent.id, 100, 10), Utc::now()).unwrap();

        assert_eq!(campaign.ledger.escrow_initial, Decimal::new(1000, 0));
        assert_eq!(campaign.ledger.escrow_remaining, Decimal::new(1000, 0));
        assert_eq!(store.agent(agent.id).unwrap().balance, Decimal::ZERO);
    }

    #[test]
    fn insufficient_escrow_leaves_balance_untouched() {
        let (mut store, agent) = organizer_with(500);
        let result = create_campaign(&mut store, &request(agent.id, 100, 10), Utc::now());

        assert!(matches!(
            result,
            Err(CampaignError::InsufficientEscrow { .. })
        ));
        assert_eq!(store.agent(agent.id).unwrap().balance, Decimal::new(500, 0));
        assert!(store.active_campaigns().is_empty());
    }

    #[test]
    fn zero_reward_campaign_reserves_nothing() {
        let (mut store, agent) = organizer_with(50);
        let campaign = create_campaign(&mut store, &request(agent.id, 100, 0), Utc::now()).unwrap();

        assert_eq!(campaign.ledger.escrow_initial, Decimal::ZERO);
        assert_eq!(store.agent(agent.id).unwrap().balance, Decimal::new(50, 0));
    }

    #[test]
    fn zero_target_amount_is_rejected() {
        let (mut store, agent) = organizer_with(1000);
        assert!(matches!(
            create_campaign(&mut store, &request(agent.id, 0, 10), Utc::now()),
            Err(CampaignError::ZeroTargetAmount)
        ));
    }
}
