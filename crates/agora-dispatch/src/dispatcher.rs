//! The step dispatcher: executes due pending steps in schedule order.
//!
//! One pass per tick. A step is due when it is pending and its start time
//! has arrived. Chain sequencing is enforced here, not in the handlers: a
//! step whose predecessor is still open is skipped until a later tick, and
//! a step whose predecessor ended badly is failed immediately with the
//! predecessor named, so the root cause stays visible at the point it
//! happened.

use agora_store::{RecordStore, StepQuery};
use agora_types::{ActivityStep, StepPayload, StepStatus};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::DispatchError;
use crate::handlers;

/// Outcome counts for one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Steps that completed.
    pub completed: u32,
    /// Steps marked failed (handler error or failed predecessor).
    pub failed: u32,
    /// Steps skipped because their predecessor is still open.
    pub skipped: u32,
    /// Steps cancelled because their predecessor was cancelled.
    pub cancelled: u32,
    /// Follow-up steps scheduled by handlers during this pass.
    pub scheduled: u32,
}

impl DispatchSummary {
    /// Total steps this pass looked at.
    #[must_use]
    pub const fn touched(&self) -> u32 {
        self.completed
            .saturating_add(self.failed)
            .saturating_add(self.skipped)
            .saturating_add(self.cancelled)
    }
}

/// How the predecessor check resolved for one due step.
enum Gate {
    /// No predecessor, or the predecessor completed. Run the step.
    Clear,
    /// The predecessor is still pending or in progress. Not its turn yet.
    Wait,
    /// The predecessor failed; the step inherits the failure.
    PredecessorFailed(u32),
    /// The predecessor was cancelled; the step is cancelled too.
    PredecessorCancelled,
}

/// Execute every due pending step once.
///
/// Steps are visited in `(starts_at, chain, seq)` order. A handler error
/// fails that one step and the pass continues; only store failures outside
/// the handlers abort the pass.
///
/// # Errors
///
/// Returns [`DispatchError`] if the store fails outside a handler.
pub fn process_due_steps<S: RecordStore>(
    store: &mut S,
    now: DateTime<Utc>,
) -> Result<DispatchSummary, DispatchError> {
    let due = store.query_steps(
        &StepQuery::new()
            .with_status(StepStatus::Pending)
            .due_by(now),
    );

    let mut summary = DispatchSummary::default();
    for step in due {
        // A guard earlier in this pass may have already closed this step.
        let current = store.step(step.id)?;
        if current.status != StepStatus::Pending {
            continue;
        }

        match gate(store, &current) {
            Gate::Wait => {
                summary.skipped = summary.skipped.saturating_add(1);
            }
            Gate::PredecessorFailed(seq) => {
                let reason = format!("predecessor step {seq} failed");
                close_step(store, current, StepStatus::Failed, Some(reason))?;
                summary.failed = summary.failed.saturating_add(1);
            }
            Gate::PredecessorCancelled => {
                close_step(store, current, StepStatus::Cancelled, None)?;
                summary.cancelled = summary.cancelled.saturating_add(1);
            }
            Gate::Clear => match execute(store, &current) {
                Ok(follow_ups) => {
                    summary.scheduled =
                        summary.scheduled.saturating_add(u32::try_from(follow_ups.len()).unwrap_or(u32::MAX));
                    if !follow_ups.is_empty() {
                        store.insert_steps(&follow_ups)?;
                    }
                    close_step(store, current, StepStatus::Completed, None)?;
                    summary.completed = summary.completed.saturating_add(1);
                }
                Err(err) => {
                    warn!(step = %current.id, error = %err, "Step handler failed");
                    close_step(store, current, StepStatus::Failed, Some(err.to_string()))?;
                    summary.failed = summary.failed.saturating_add(1);
                }
            },
        }
    }

    info!(
        completed = summary.completed,
        failed = summary.failed,
        skipped = summary.skipped,
        cancelled = summary.cancelled,
        scheduled = summary.scheduled,
        "Dispatch pass finished"
    );
    Ok(summary)
}

/// Cancel a pending step and every later pending step of its chain.
///
/// # Errors
///
/// Returns [`DispatchError::NotCancellable`] unless the step is still
/// pending, or a store error.
pub fn cancel_step<S: RecordStore>(
    store: &mut S,
    id: agora_types::StepId,
) -> Result<(), DispatchError> {
    let step = store.step(id)?;
    if step.status != StepStatus::Pending {
        return Err(DispatchError::NotCancellable {
            step: id,
            status: step.status,
        });
    }
    let chain = step.chain_id;
    let seq = step.seq;
    close_step(store, step, StepStatus::Cancelled, None)?;

    // Successors can never clear their gate once a predecessor is
    // cancelled; close them now instead of waiting for them to come due.
    for successor in store.chain_steps(chain) {
        if successor.seq > seq && successor.status == StepStatus::Pending {
            close_step(store, successor, StepStatus::Cancelled, None)?;
        }
    }
    Ok(())
}

/// Resolve the chain-sequencing gate for a due step.
fn gate<S: RecordStore>(store: &S, step: &ActivityStep) -> Gate {
    let Some(prior_seq) = step.seq.checked_sub(1) else {
        return Gate::Clear;
    };
    let predecessor = store
        .chain_steps(step.chain_id)
        .into_iter()
        .find(|s| s.seq == prior_seq);
    match predecessor.map(|p| p.status) {
        None | Some(StepStatus::Completed) => Gate::Clear,
        Some(StepStatus::Pending | StepStatus::InProgress) => Gate::Wait,
        Some(StepStatus::Failed) => Gate::PredecessorFailed(prior_seq),
        Some(StepStatus::Cancelled) => Gate::PredecessorCancelled,
    }
}

/// Dispatch a step to its kind's handler. The match is closed; adding a
/// step kind without a handler is a compile error.
fn execute<S: RecordStore>(
    store: &mut S,
    step: &ActivityStep,
) -> Result<handlers::FollowUps, crate::error::HandlerError> {
    match &step.payload {
        StepPayload::Travel(payload) => handlers::travel(store, step, payload),
        StepPayload::Deliver(payload) => handlers::deliver(store, step, payload),
        StepPayload::Transact(payload) => handlers::transact(store, step, payload),
        StepPayload::Build(payload) => handlers::build(store, step, payload),
        StepPayload::Finalize(_) => Ok(handlers::finalize(step)),
    }
}

/// Write a step's terminal status. Completed steps keep their precomputed
/// end time so the schedule stays deterministic.
fn close_step<S: RecordStore>(
    store: &mut S,
    mut step: ActivityStep,
    status: StepStatus,
    reason: Option<String>,
) -> Result<(), DispatchError> {
    step.status = status;
    step.failure_reason = reason;
    store.update_step(step)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::indexing_slicing)]
mod tests {
    use agora_chain::submit_chain;
    use agora_store::MemoryStore;
    use agora_types::{
        ActionParams, ActionRequest, Agent, AgentId, LocationId, LotId, ResourceKind,
        ResourceLot, StepKind,
    };
    use agora_world::{create_starting_world, GraphResolver};
    use chrono::Duration;
    use rust_decimal::Decimal;

    use super::*;

    struct Fixture {
        store: MemoryStore,
        graph: agora_world::WorldGraph,
        districts: agora_world::DistrictIds,
    }

    fn fixture() -> Fixture {
        let (graph, districts) = create_starting_world().unwrap();
        let mut store = MemoryStore::new();
        for location in graph.locations() {
            store.insert_location(location.clone()).unwrap();
        }
        Fixture {
            store,
            graph,
            districts,
        }
    }

    fn agent_at(store: &mut MemoryStore, at: LocationId, balance: i64) -> Agent {
        let agent = Agent {
            id: AgentId::new(),
            name: "Matteo".to_owned(),
            balance: Decimal::new(balance, 0),
            location: Some(at),
        };
        store.insert_agent(agent.clone()).unwrap();
        agent
    }

    fn lot_for(store: &mut MemoryStore, owner: AgentId, at: LocationId, qty: u32) -> LotId {
        let lot = ResourceLot {
            id: LotId::new(),
            kind: ResourceKind::Grain,
            quantity: qty,
            owner,
            location: at,
        };
        let id = lot.id;
        store.insert_lot(lot).unwrap();
        id
    }

    fn run_chain_to_completion(
        store: &mut MemoryStore,
        mut now: DateTime<Utc>,
    ) -> DispatchSummary {
        // Repeated passes with the clock jumped past each step's start.
        let mut total = DispatchSummary::default();
        for _ in 0..10 {
            let summary = process_due_steps(store, now).unwrap();
            total.completed += summary.completed;
            total.failed += summary.failed;
            total.scheduled += summary.scheduled;
            if summary.touched() == 0 && summary.scheduled == 0 {
                break;
            }
            now += Duration::hours(2);
        }
        total
    }

    #[test]
    fn delivery_chain_runs_to_completion() {
        let mut fix = fixture();
        let agent = agent_at(&mut fix.store, fix.districts.granary, 100);
        let lot = lot_for(&mut fix.store, agent.id, fix.districts.granary, 30);

        let resolver = GraphResolver::new(&fix.graph);
        let now = Utc::now();
        let steps = submit_chain(
            &mut fix.store,
            &resolver,
            &ActionRequest {
                agent_id: agent.id,
                params: ActionParams::Delivery {
                    lot,
                    destination: fix.districts.market_hall,
                },
                submitted_at: now,
            },
            now,
        )
        .unwrap();

        let total = run_chain_to_completion(&mut fix.store, now);
        assert_eq!(total.completed, u32::try_from(steps.len()).unwrap());
        assert_eq!(total.failed, 0);

        let moved = fix.store.lot(lot).unwrap();
        assert_eq!(moved.location, fix.districts.market_hall);
        let traveler = fix.store.agent(agent.id).unwrap();
        assert_eq!(traveler.location, Some(fix.districts.market_hall));
    }

    #[test]
    fn completed_steps_keep_precomputed_end_times() {
        let mut fix = fixture();
        let agent = agent_at(&mut fix.store, fix.districts.granary, 100);
        let lot = lot_for(&mut fix.store, agent.id, fix.districts.granary, 30);

        let resolver = GraphResolver::new(&fix.graph);
        let now = Utc::now();
        let steps = submit_chain(
            &mut fix.store,
            &resolver,
            &ActionRequest {
                agent_id: agent.id,
                params: ActionParams::Delivery {
                    lot,
                    destination: fix.districts.market_hall,
                },
                submitted_at: now,
            },
            now,
        )
        .unwrap();

        run_chain_to_completion(&mut fix.store, now);

        for built in &steps {
            let stored = fix.store.step(built.id).unwrap();
            assert_eq!(stored.status, StepStatus::Completed);
            assert_eq!(stored.ends_at, built.ends_at);
            assert_eq!(stored.starts_at, built.starts_at);
        }
    }

    #[test]
    fn successor_waits_for_open_predecessor() {
        let mut fix = fixture();
        let agent = agent_at(&mut fix.store, fix.districts.granary, 100);
        let lot = lot_for(&mut fix.store, agent.id, fix.districts.granary, 30);

        let resolver = GraphResolver::new(&fix.graph);
        let now = Utc::now();
        submit_chain(
            &mut fix.store,
            &resolver,
            &ActionRequest {
                agent_id: agent.id,
                params: ActionParams::Delivery {
                    lot,
                    destination: fix.districts.market_hall,
                },
                submitted_at: now,
            },
            now,
        )
        .unwrap();

        // Only the first step is due at `now`; one pass completes exactly it.
        let summary = process_due_steps(&mut fix.store, now).unwrap();
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn failed_predecessor_fails_the_successor_with_its_name() {
        let mut fix = fixture();
        let agent = agent_at(&mut fix.store, fix.districts.granary, 100);
        let lot = lot_for(&mut fix.store, agent.id, fix.districts.granary, 30);

        let resolver = GraphResolver::new(&fix.graph);
        let now = Utc::now();
        let steps = submit_chain(
            &mut fix.store,
            &resolver,
            &ActionRequest {
                agent_id: agent.id,
                params: ActionParams::Delivery {
                    lot,
                    destination: fix.districts.market_hall,
                },
                submitted_at: now,
            },
            now,
        )
        .unwrap();

        // Sabotage: the lot changes hands before the travel step runs.
        let stranger = agent_at(&mut fix.store, fix.districts.quarry, 0);
        let mut stolen = fix.store.lot(lot).unwrap();
        stolen.owner = stranger.id;
        fix.store.update_lot(stolen).unwrap();

        run_chain_to_completion(&mut fix.store, now);

        let travel = fix.store.step(steps[0].id).unwrap();
        assert_eq!(travel.status, StepStatus::Failed);

        let deliver = fix.store.step(steps[1].id).unwrap();
        assert_eq!(deliver.status, StepStatus::Failed);
        assert_eq!(
            deliver.failure_reason.as_deref(),
            Some("predecessor step 0 failed")
        );
    }

    #[test]
    fn failed_travel_leaves_the_agent_in_place() {
        let mut fix = fixture();
        let agent = agent_at(&mut fix.store, fix.districts.granary, 100);
        let lot = lot_for(&mut fix.store, agent.id, fix.districts.granary, 30);

        let resolver = GraphResolver::new(&fix.graph);
        let now = Utc::now();
        let steps = submit_chain(
            &mut fix.store,
            &resolver,
            &ActionRequest {
                agent_id: agent.id,
                params: ActionParams::Delivery {
                    lot,
                    destination: fix.districts.market_hall,
                },
                submitted_at: now,
            },
            now,
        )
        .unwrap();

        // The lot changes hands before the travel step runs.
        let stranger = agent_at(&mut fix.store, fix.districts.quarry, 0);
        let mut stolen = fix.store.lot(lot).unwrap();
        stolen.owner = stranger.id;
        fix.store.update_lot(stolen).unwrap();

        let summary = process_due_steps(&mut fix.store, now).unwrap();
        assert_eq!(summary.failed, 1);

        let travel = fix.store.step(steps[0].id).unwrap();
        assert_eq!(travel.status, StepStatus::Failed);
        // The failed step mutated nothing: no teleport, no lot move.
        assert_eq!(
            fix.store.agent(agent.id).unwrap().location,
            Some(fix.districts.granary)
        );
        assert_eq!(fix.store.lot(lot).unwrap().location, fix.districts.granary);
    }

    #[test]
    fn cancelled_steps_are_not_dispatched() {
        let mut fix = fixture();
        let agent = agent_at(&mut fix.store, fix.districts.granary, 100);
        let lot = lot_for(&mut fix.store, agent.id, fix.districts.granary, 30);

        let resolver = GraphResolver::new(&fix.graph);
        let now = Utc::now();
        let steps = submit_chain(
            &mut fix.store,
            &resolver,
            &ActionRequest {
                agent_id: agent.id,
                params: ActionParams::Delivery {
                    lot,
                    destination: fix.districts.market_hall,
                },
                submitted_at: now,
            },
            now,
        )
        .unwrap();

        cancel_step(&mut fix.store, steps[0].id).unwrap();

        // The whole chain is closed immediately.
        for built in &steps {
            let stored = fix.store.step(built.id).unwrap();
            assert_eq!(stored.status, StepStatus::Cancelled);
        }

        let total = run_chain_to_completion(&mut fix.store, now);
        assert_eq!(total.completed, 0);
        assert_eq!(
            fix.store.agent(agent.id).unwrap().location,
            Some(fix.districts.granary)
        );

        // A closed step cannot be cancelled again.
        assert!(matches!(
            cancel_step(&mut fix.store, steps[0].id),
            Err(DispatchError::NotCancellable { .. })
        ));
    }

    #[test]
    fn trade_settles_balances_and_writes_a_contract() {
        let mut fix = fixture();
        let seller = agent_at(&mut fix.store, fix.districts.market_hall, 50);
        let buyer = agent_at(&mut fix.store, fix.districts.market_hall, 200);
        let lot = lot_for(&mut fix.store, seller.id, fix.districts.market_hall, 10);

        let resolver = GraphResolver::new(&fix.graph);
        let now = Utc::now();
        submit_chain(
            &mut fix.store,
            &resolver,
            &ActionRequest {
                agent_id: seller.id,
                params: ActionParams::Trade {
                    counterparty: buyer.id,
                    lot: Some(lot),
                    price: Decimal::new(80, 0),
                },
                submitted_at: now,
            },
            now,
        )
        .unwrap();

        run_chain_to_completion(&mut fix.store, now);

        assert_eq!(
            fix.store.agent(seller.id).unwrap().balance,
            Decimal::new(130, 0)
        );
        assert_eq!(
            fix.store.agent(buyer.id).unwrap().balance,
            Decimal::new(120, 0)
        );
        assert_eq!(fix.store.lot(lot).unwrap().owner, buyer.id);

        let contracts = fix.store.contracts();
        assert_eq!(contracts.len(), 1);
        assert_eq!(contracts[0].buyer, buyer.id);
        assert_eq!(contracts[0].amount, Decimal::new(80, 0));
    }

    #[test]
    fn build_with_handover_fee_schedules_a_settlement_step() {
        let mut fix = fixture();
        let builder = agent_at(&mut fix.store, fix.districts.granary, 1000);
        let operator = agent_at(&mut fix.store, fix.districts.chapel_site, 10);

        let mut site = fix.store.location(fix.districts.chapel_site).unwrap();
        site.operator = Some(operator.id);
        fix.store.update_location(site).unwrap();

        let resolver = GraphResolver::new(&fix.graph);
        let now = Utc::now();
        submit_chain(
            &mut fix.store,
            &resolver,
            &ActionRequest {
                agent_id: builder.id,
                params: ActionParams::Construction {
                    site: fix.districts.chapel_site,
                    cost: Decimal::new(400, 0),
                    handover_fee: Some(Decimal::new(50, 0)),
                },
                submitted_at: now,
            },
            now,
        )
        .unwrap();

        let total = run_chain_to_completion(&mut fix.store, now);
        assert_eq!(total.scheduled, 1);
        assert_eq!(total.failed, 0);

        // Cost debited, fee paid to the previous operator, site handed over.
        assert_eq!(
            fix.store.agent(builder.id).unwrap().balance,
            Decimal::new(550, 0)
        );
        assert_eq!(
            fix.store.agent(operator.id).unwrap().balance,
            Decimal::new(60, 0)
        );
        assert_eq!(
            fix.store.location(fix.districts.chapel_site).unwrap().operator,
            Some(builder.id)
        );

        let kinds: Vec<StepKind> = fix
            .store
            .query_steps(&StepQuery::new())
            .iter()
            .map(|s| s.kind)
            .collect();
        assert!(kinds.iter().filter(|k| **k == StepKind::Transact).count() == 1);
    }
}
