//! The campaign delta scanner.
//!
//! Once per tick, each active campaign re-scans the shared step history
//! for newly completed deliveries matching its target. The ledger carries
//! its own cursor (`last_scanned_at`) plus the set of already-processed
//! step IDs, so re-scanning any window is idempotent: a step is credited
//! exactly once no matter how often the windows overlap.
//!
//! The scan runs in two phases. Phase one reads the candidate steps and
//! builds a settlement plan against a working copy of the ledger; phase
//! two resolves every record the plan touches, then writes them (balances,
//! lot ownership) along with the updated campaign as one atomic record
//! update. A failure in either phase moves the campaign to `errored` with
//! the last persisted ledger intact and no settlement applied.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use agora_store::{RecordStore, StepQuery};
use agora_types::{
    Agent, AgentId, Campaign, CampaignId, CampaignStatus, CampaignTarget, LocationId, LotId,
    ParticipantEntry, StepKind, StepPayload, StepStatus, TerminationReason,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error, info};

use crate::error::CampaignError;
use crate::lifecycle;

/// Cursor overlap, re-examining the tail of the previous window so steps
/// completed during the last scan are never lost to clock skew. The
/// processed-ID set absorbs the duplicates.
pub const SCAN_OVERLAP_SECS: i64 = 600;

/// Lookback for a campaign that has never been scanned.
pub const INITIAL_LOOKBACK_SECS: i64 = 3600;

/// What one scan pass decided about a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The campaign stays active; scan again next tick.
    Continuing,
    /// The campaign was already in a terminal state; nothing was queried.
    AlreadyTerminal,
    /// The campaign terminated this tick for the given reason.
    Terminated(TerminationReason),
    /// Scanning failed; the campaign was moved to `errored`.
    Errored,
}

/// One qualifying delivery, resolved during phase one.
struct Settlement {
    step: agora_types::StepId,
    agent: AgentId,
    amount: u32,
    reward: Decimal,
    lot: LotId,
}

/// Scan one campaign for new qualifying deliveries and settle them.
///
/// # Errors
///
/// Returns [`CampaignError`] only when the store fails while recording the
/// scan's outcome; a failure during scanning itself is absorbed into
/// [`ScanOutcome::Errored`] so other campaigns keep processing.
pub fn scan_campaign<S: RecordStore>(
    store: &mut S,
    id: CampaignId,
    now: DateTime<Utc>,
) -> Result<ScanOutcome, CampaignError> {
    let campaign = store.campaign(id)?;

    // Status guard before any query is issued.
    if campaign.status != CampaignStatus::Active {
        return Ok(ScanOutcome::AlreadyTerminal);
    }

    if let Some(reason) = lifecycle::evaluate(&campaign, now) {
        lifecycle::terminate(store, id, reason)?;
        return Ok(ScanOutcome::Terminated(reason));
    }

    let mut updated = campaign.clone();
    let settled = match plan_settlements(store, &mut updated, now) {
        Ok(plan) => plan,
        Err(err) => return mark_errored(store, campaign, &err),
    };

    if let Err(err) = apply_settlements(store, &updated, &settled) {
        return mark_errored(store, campaign, &err);
    }

    updated.ledger.last_scanned_at = Some(now);
    store.update_campaign(updated.clone())?;

    debug!(
        campaign = %id,
        new_steps = settled.len(),
        collected = updated.ledger.collected,
        escrow_remaining = %updated.ledger.escrow_remaining,
        "Scan pass complete"
    );

    if let Some(reason) = lifecycle::evaluate(&updated, now) {
        lifecycle::terminate(store, id, reason)?;
        return Ok(ScanOutcome::Terminated(reason));
    }
    Ok(ScanOutcome::Continuing)
}

/// Phase one: find new qualifying deliveries and fold them into the
/// working ledger, producing the settlement plan. Pure with respect to
/// the store.
fn plan_settlements<S: RecordStore>(
    store: &S,
    campaign: &mut Campaign,
    now: DateTime<Utc>,
) -> Result<Vec<Settlement>, CampaignError> {
    let destinations = target_destinations(store, &campaign.target);
    if destinations.is_empty() {
        return Ok(Vec::new());
    }

    let window_start = campaign.ledger.last_scanned_at.map_or_else(
        || now.checked_sub_signed(Duration::seconds(INITIAL_LOOKBACK_SECS)),
        |cursor| cursor.checked_sub_signed(Duration::seconds(SCAN_OVERLAP_SECS)),
    );
    let Some(window_start) = window_start else {
        return Ok(Vec::new());
    };

    let candidates = store.query_steps(
        &StepQuery::new()
            .with_status(StepStatus::Completed)
            .with_kind(StepKind::Deliver)
            .with_destinations(destinations)
            .ending_within(window_start, now),
    );

    let mut plan = Vec::new();
    for step in candidates {
        if campaign.ledger.processed_steps.contains(&step.id) {
            continue;
        }
        let StepPayload::Deliver(payload) = &step.payload else {
            continue;
        };
        if payload.resource != campaign.resource {
            continue;
        }

        let remaining = campaign.remaining_capacity();
        if remaining == 0 {
            break;
        }
        // Excess beyond the target is discarded, not credited.
        let amount = payload.quantity.min(remaining);
        if amount == 0 {
            continue;
        }

        let reward = Decimal::from(amount)
            .checked_mul(campaign.reward_per_unit)
            .ok_or(CampaignError::Overflow)?;
        campaign.ledger.escrow_remaining = campaign
            .ledger
            .escrow_remaining
            .checked_sub(reward)
            .filter(|left| *left >= Decimal::ZERO)
            .ok_or(CampaignError::Overflow)?;
        campaign.ledger.collected = campaign.ledger.collected.saturating_add(amount);
        upsert_participant(&mut campaign.ledger.participants, step.agent_id, amount, reward);
        campaign.ledger.processed_steps.insert(step.id);

        plan.push(Settlement {
            step: step.id,
            agent: step.agent_id,
            amount,
            reward,
            lot: payload.lot,
        });
    }
    Ok(plan)
}

/// Phase two: pay rewards and hand delivered lots to the beneficiary.
///
/// Every record the plan touches is resolved before the first write, so a
/// vanished lot or agent aborts the whole scan with the store untouched.
/// A partially settled scan would pay rewards the frozen ledger never
/// recorded.
fn apply_settlements<S: RecordStore>(
    store: &mut S,
    campaign: &Campaign,
    plan: &[Settlement],
) -> Result<(), CampaignError> {
    if plan.is_empty() {
        return Ok(());
    }
    let beneficiary = beneficiary(store, campaign)?;

    let mut lots = Vec::with_capacity(plan.len());
    let mut payees: BTreeMap<AgentId, Agent> = BTreeMap::new();
    for settlement in plan {
        let mut lot = store.lot(settlement.lot)?;
        lot.owner = beneficiary;
        lots.push(lot);

        if settlement.reward > Decimal::ZERO {
            let agent = match payees.entry(settlement.agent) {
                Entry::Vacant(slot) => slot.insert(store.agent(settlement.agent)?),
                Entry::Occupied(slot) => slot.into_mut(),
            };
            agent.balance = agent
                .balance
                .checked_add(settlement.reward)
                .ok_or(CampaignError::Overflow)?;
        }
    }

    for lot in lots {
        store.update_lot(lot)?;
    }
    for agent in payees.into_values() {
        store.update_agent(agent)?;
    }

    for settlement in plan {
        info!(
            campaign = %campaign.id,
            step = %settlement.step,
            agent = %settlement.agent,
            amount = settlement.amount,
            reward = %settlement.reward,
            "Delivery credited"
        );
    }
    Ok(())
}

/// The buildings where qualifying deliveries must arrive.
fn target_destinations<S: RecordStore>(store: &S, target: &CampaignTarget) -> Vec<LocationId> {
    match target {
        CampaignTarget::Building(location) => vec![*location],
        CampaignTarget::Operator(agent) => store.locations_operated_by(*agent),
    }
}

/// Who ends up owning the delivered goods.
fn beneficiary<S: RecordStore>(store: &S, campaign: &Campaign) -> Result<AgentId, CampaignError> {
    match &campaign.target {
        CampaignTarget::Building(location) => Ok(store
            .location(*location)?
            .operator
            .unwrap_or(campaign.organizer)),
        CampaignTarget::Operator(agent) => Ok(*agent),
    }
}

/// Create or increment the participant entry for one contributor.
fn upsert_participant(
    participants: &mut Vec<ParticipantEntry>,
    agent: AgentId,
    amount: u32,
    reward: Decimal,
) {
    if let Some(entry) = participants.iter_mut().find(|p| p.agent == agent) {
        entry.contributed = entry.contributed.saturating_add(amount);
        entry.reward_earned = entry.reward_earned.saturating_add(reward);
    } else {
        participants.push(ParticipantEntry {
            agent,
            contributed: amount,
            reward_earned: reward,
        });
    }
}

/// Move a campaign to `errored`, keeping the last persisted ledger as-is
/// for inspection.
fn mark_errored<S: RecordStore>(
    store: &mut S,
    mut campaign: Campaign,
    err: &CampaignError,
) -> Result<ScanOutcome, CampaignError> {
    error!(campaign = %campaign.id, error = %err, "Scan failed, freezing campaign");
    campaign.status = CampaignStatus::Errored;
    campaign.reason = Some(format!("{}: {err}", TerminationReason::ScanFailed));
    store.update_campaign(campaign)?;
    Ok(ScanOutcome::Errored)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::indexing_slicing)]
mod tests {
    use agora_store::MemoryStore;
    use agora_types::{
        ActivityStep, Agent, ChainId, DeliverPayload, Location, ResourceKind, ResourceLot, StepId,
        PAYLOAD_VERSION,
    };

    use super::*;
    use crate::create::{create_campaign, CampaignRequest};

    struct Fixture {
        store: MemoryStore,
        organizer: AgentId,
        operator: AgentId,
        depot: LocationId,
        campaign: CampaignId,
        now: DateTime<Utc>,
    }

    fn agent(store: &mut MemoryStore, name: &str, balance: i64) -> AgentId {
        let agent = Agent {
            id: AgentId::new(),
            name: name.to_owned(),
            balance: Decimal::new(balance, 0),
            location: None,
        };
        let id = agent.id;
        store.insert_agent(agent).unwrap();
        id
    }

    /// The standing scenario: target 100 units of grain at the depot,
    /// 10 per unit reward, organizer balance 1000 fully escrowed.
    fn fixture() -> Fixture {
        let mut store = MemoryStore::new();
        let organizer = agent(&mut store, "Guildmaster", 1000);
        let operator = agent(&mut store, "Depot keeper", 0);
        let depot = LocationId::new();
        store
            .insert_location(Location {
                id: depot,
                name: "Depot".to_owned(),
                operator: Some(operator),
            })
            .unwrap();

        let now = Utc::now();
        let campaign = create_campaign(
            &mut store,
            &CampaignRequest {
                organizer,
                resource: ResourceKind::Grain,
                target: CampaignTarget::Building(depot),
                max_total_amount: 100,
                reward_per_unit: Decimal::TEN,
                expires_at: now + Duration::days(7),
            },
            now,
        )
        .unwrap();

        Fixture {
            store,
            organizer,
            operator,
            depot,
            campaign: campaign.id,
            now,
        }
    }

    impl Fixture {
        /// Fabricate a completed delivery of `quantity` units ending at `at`.
        fn completed_delivery(
            &mut self,
            courier: AgentId,
            quantity: u32,
            at: DateTime<Utc>,
        ) -> StepId {
            let lot = ResourceLot {
                id: LotId::new(),
                kind: ResourceKind::Grain,
                quantity,
                owner: courier,
                location: self.depot,
            };
            let lot_id = lot.id;
            self.store.insert_lot(lot).unwrap();

            let step = ActivityStep {
                id: StepId::new(),
                chain_id: ChainId::new(),
                seq: 1,
                kind: StepKind::Deliver,
                agent_id: courier,
                status: StepStatus::Completed,
                starts_at: at - Duration::minutes(10),
                ends_at: at,
                from_location: Some(self.depot),
                to_location: Some(self.depot),
                payload: StepPayload::Deliver(DeliverPayload {
                    version: PAYLOAD_VERSION,
                    lot: lot_id,
                    resource: ResourceKind::Grain,
                    quantity,
                }),
                failure_reason: None,
                created_at: at,
            };
            let id = step.id;
            self.store.insert_steps(&[step]).unwrap();
            id
        }
    }

    #[test]
    fn single_delivery_credits_ledger_and_pays_reward() {
        let mut fix = fixture();
        let courier = agent(&mut fix.store, "Petra", 0);
        fix.completed_delivery(courier, 30, fix.now);

        let outcome = scan_campaign(&mut fix.store, fix.campaign, fix.now).unwrap();
        assert_eq!(outcome, ScanOutcome::Continuing);

        let campaign = fix.store.campaign(fix.campaign).unwrap();
        assert_eq!(campaign.ledger.collected, 30);
        assert_eq!(campaign.ledger.escrow_remaining, Decimal::new(700, 0));
        assert_eq!(campaign.ledger.participants.len(), 1);
        assert_eq!(campaign.ledger.participants[0].contributed, 30);
        assert_eq!(
            campaign.ledger.participants[0].reward_earned,
            Decimal::new(300, 0)
        );
        assert!(campaign.ledger.is_conserved());
        assert_eq!(
            fix.store.agent(courier).unwrap().balance,
            Decimal::new(300, 0)
        );
    }

    #[test]
    fn rescan_without_new_deliveries_changes_nothing() {
        let mut fix = fixture();
        let courier = agent(&mut fix.store, "Petra", 0);
        fix.completed_delivery(courier, 30, fix.now);

        scan_campaign(&mut fix.store, fix.campaign, fix.now).unwrap();
        let first = fix.store.campaign(fix.campaign).unwrap();

        // Same window again, then a later overlapping window.
        scan_campaign(&mut fix.store, fix.campaign, fix.now).unwrap();
        scan_campaign(&mut fix.store, fix.campaign, fix.now + Duration::minutes(5)).unwrap();
        let second = fix.store.campaign(fix.campaign).unwrap();

        assert_eq!(second.ledger.collected, first.ledger.collected);
        assert_eq!(
            second.ledger.escrow_remaining,
            first.ledger.escrow_remaining
        );
        assert_eq!(second.ledger.participants, first.ledger.participants);
        assert_eq!(
            fix.store.agent(courier).unwrap().balance,
            Decimal::new(300, 0)
        );
    }

    #[test]
    fn overshoot_is_clamped_and_campaign_completes() {
        let mut fix = fixture();
        let petra = agent(&mut fix.store, "Petra", 0);
        let matteo = agent(&mut fix.store, "Matteo", 0);

        fix.completed_delivery(petra, 30, fix.now);
        scan_campaign(&mut fix.store, fix.campaign, fix.now).unwrap();

        // 90 units arrive with only 70 units of capacity left.
        let later = fix.now + Duration::minutes(30);
        fix.completed_delivery(matteo, 90, later);
        let outcome = scan_campaign(&mut fix.store, fix.campaign, later).unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::Terminated(TerminationReason::TargetReached)
        );

        let campaign = fix.store.campaign(fix.campaign).unwrap();
        assert_eq!(campaign.status, CampaignStatus::Completed);
        assert_eq!(campaign.ledger.collected, 100);
        assert_eq!(campaign.ledger.escrow_remaining, Decimal::ZERO);
        assert!(campaign.ledger.is_conserved());

        // 70 credited units at 10 each.
        assert_eq!(
            fix.store.agent(matteo).unwrap().balance,
            Decimal::new(700, 0)
        );
        // Escrow fully spent, so the refund is zero.
        assert_eq!(fix.store.agent(fix.organizer).unwrap().balance, Decimal::ZERO);
    }

    #[test]
    fn delivered_lots_transfer_to_the_operator() {
        let mut fix = fixture();
        let courier = agent(&mut fix.store, "Petra", 0);
        let step = fix.completed_delivery(courier, 30, fix.now);

        scan_campaign(&mut fix.store, fix.campaign, fix.now).unwrap();

        let stored = fix.store.step(step).unwrap();
        let StepPayload::Deliver(payload) = &stored.payload else {
            panic!("expected a delivery payload");
        };
        assert_eq!(fix.store.lot(payload.lot).unwrap().owner, fix.operator);
    }

    #[test]
    fn wrong_resource_kind_is_ignored() {
        let mut fix = fixture();
        let courier = agent(&mut fix.store, "Petra", 0);
        let step = fix.completed_delivery(courier, 30, fix.now);

        // Rewrite the delivery to timber; the grain campaign must skip it.
        let mut stored = fix.store.step(step).unwrap();
        if let StepPayload::Deliver(ref mut payload) = stored.payload {
            payload.resource = ResourceKind::Timber;
        }
        fix.store.update_step(stored).unwrap();

        scan_campaign(&mut fix.store, fix.campaign, fix.now).unwrap();
        let campaign = fix.store.campaign(fix.campaign).unwrap();
        assert_eq!(campaign.ledger.collected, 0);
        assert!(campaign.ledger.participants.is_empty());
    }

    #[test]
    fn expired_campaign_terminates_before_querying() {
        let mut fix = fixture();
        let courier = agent(&mut fix.store, "Petra", 0);
        fix.completed_delivery(courier, 30, fix.now);

        let past_expiry = fix.now + Duration::days(8);
        let outcome = scan_campaign(&mut fix.store, fix.campaign, past_expiry).unwrap();
        assert_eq!(outcome, ScanOutcome::Terminated(TerminationReason::Expired));

        // Full escrow back to the organizer, nothing credited.
        let campaign = fix.store.campaign(fix.campaign).unwrap();
        assert_eq!(campaign.status, CampaignStatus::Expired);
        assert_eq!(
            fix.store.agent(fix.organizer).unwrap().balance,
            Decimal::new(1000, 0)
        );
    }

    #[test]
    fn terminal_campaign_is_never_rescanned() {
        let mut fix = fixture();
        lifecycle::terminate(&mut fix.store, fix.campaign, TerminationReason::Expired).unwrap();

        let outcome = scan_campaign(&mut fix.store, fix.campaign, fix.now).unwrap();
        assert_eq!(outcome, ScanOutcome::AlreadyTerminal);
    }

    #[test]
    fn missing_lot_moves_campaign_to_errored() {
        let mut fix = fixture();
        let courier = agent(&mut fix.store, "Petra", 0);
        let step = fix.completed_delivery(courier, 30, fix.now);

        // Point the payload at a lot that does not exist.
        let mut stored = fix.store.step(step).unwrap();
        if let StepPayload::Deliver(ref mut payload) = stored.payload {
            payload.lot = LotId::new();
        }
        fix.store.update_step(stored).unwrap();

        let outcome = scan_campaign(&mut fix.store, fix.campaign, fix.now).unwrap();
        assert_eq!(outcome, ScanOutcome::Errored);

        let campaign = fix.store.campaign(fix.campaign).unwrap();
        assert_eq!(campaign.status, CampaignStatus::Errored);
        // The persisted ledger is the pre-scan one, frozen for inspection.
        assert_eq!(campaign.ledger.collected, 0);
        assert!(campaign.ledger.processed_steps.is_empty());
        assert!(campaign.ledger.is_conserved());
    }

    #[test]
    fn failed_scan_applies_no_settlement_at_all() {
        let mut fix = fixture();
        let petra = agent(&mut fix.store, "Petra", 0);
        let matteo = agent(&mut fix.store, "Matteo", 0);
        let good = fix.completed_delivery(petra, 30, fix.now);
        let bad = fix.completed_delivery(matteo, 20, fix.now);

        // The second delivery points at a lot that does not exist.
        let mut stored = fix.store.step(bad).unwrap();
        if let StepPayload::Deliver(ref mut payload) = stored.payload {
            payload.lot = LotId::new();
        }
        fix.store.update_step(stored).unwrap();

        let outcome = scan_campaign(&mut fix.store, fix.campaign, fix.now).unwrap();
        assert_eq!(outcome, ScanOutcome::Errored);

        // The intact delivery must not have been settled either: rewards
        // the frozen ledger never recorded would break escrow conservation.
        assert_eq!(fix.store.agent(petra).unwrap().balance, Decimal::ZERO);
        let good_step = fix.store.step(good).unwrap();
        let StepPayload::Deliver(payload) = &good_step.payload else {
            panic!("expected a delivery payload");
        };
        assert_eq!(fix.store.lot(payload.lot).unwrap().owner, petra);

        let campaign = fix.store.campaign(fix.campaign).unwrap();
        assert_eq!(campaign.status, CampaignStatus::Errored);
        assert_eq!(campaign.ledger.collected, 0);
        assert_eq!(campaign.ledger.escrow_remaining, Decimal::new(1000, 0));
        assert!(campaign.ledger.is_conserved());
    }

    #[test]
    fn operator_target_collects_across_their_buildings() {
        let mut store = MemoryStore::new();
        let organizer = agent(&mut store, "Guildmaster", 1000);
        let magnate = agent(&mut store, "Magnate", 0);
        let first = LocationId::new();
        let second = LocationId::new();
        for (id, name) in [(first, "North hall"), (second, "South hall")] {
            store
                .insert_location(Location {
                    id,
                    name: name.to_owned(),
                    operator: Some(magnate),
                })
                .unwrap();
        }

        let now = Utc::now();
        let campaign = create_campaign(
            &mut store,
            &CampaignRequest {
                organizer,
                resource: ResourceKind::Grain,
                target: CampaignTarget::Operator(magnate),
                max_total_amount: 100,
                reward_per_unit: Decimal::TEN,
                expires_at: now + Duration::days(7),
            },
            now,
        )
        .unwrap();

        let mut fix = Fixture {
            store,
            organizer,
            operator: magnate,
            depot: first,
            campaign: campaign.id,
            now,
        };
        let courier = agent(&mut fix.store, "Petra", 0);
        fix.completed_delivery(courier, 20, now);
        fix.depot = second;
        fix.completed_delivery(courier, 15, now);

        scan_campaign(&mut fix.store, fix.campaign, now).unwrap();
        let scanned = fix.store.campaign(fix.campaign).unwrap();
        assert_eq!(scanned.ledger.collected, 35);
        assert_eq!(scanned.ledger.participants[0].contributed, 35);
    }
}
