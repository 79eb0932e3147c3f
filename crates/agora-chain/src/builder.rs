//! The chain builder: validated, timestamp-chained step construction.
//!
//! `build` is a pure read: it validates the request, resolves routes, and
//! returns the full ordered step list without touching the store.
//! [`submit_chain`] then persists the list atomically, so a chain either
//! exists in full or not at all.

use agora_store::RecordStore;
use agora_types::{
    ActionParams, ActionRequest, ActivityStep, BuildPayload, ChainId, DeliverPayload,
    FinalizePayload, LocationId, StepId, StepKind, StepPayload, StepStatus, TransactPayload,
    TravelPayload, PAYLOAD_VERSION,
};
use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::error::ChainError;
use crate::validation;

/// Fixed duration of a delivery handoff at the destination.
pub const DELIVER_DURATION_SECS: u64 = 600;

/// Fixed duration of a face-to-face transaction.
pub const TRANSACT_DURATION_SECS: u64 = 600;

/// Fixed duration of on-site construction work.
pub const BUILD_DURATION_SECS: u64 = 3600;

/// Fixed duration of the closing finalize step.
pub const FINALIZE_DURATION_SECS: u64 = 900;

/// Builds validated, timestamp-chained step lists for action requests.
///
/// Holds read-only borrows; persistence is the caller's move (see
/// [`submit_chain`]).
pub struct ChainBuilder<'a> {
    store: &'a dyn RecordStore,
    resolver: &'a dyn agora_world::RouteResolver,
}

/// Accumulates steps with continuous timestamps: each appended step starts
/// exactly where the previous one ended.
struct ChainAccumulator {
    chain_id: ChainId,
    agent: agora_types::AgentId,
    cursor: DateTime<Utc>,
    created_at: DateTime<Utc>,
    steps: Vec<ActivityStep>,
}

impl ChainAccumulator {
    fn new(agent: agora_types::AgentId, now: DateTime<Utc>) -> Self {
        Self {
            chain_id: ChainId::new(),
            agent,
            cursor: now,
            created_at: now,
            steps: Vec::new(),
        }
    }

    fn push(
        &mut self,
        kind: StepKind,
        duration_secs: u64,
        from: Option<LocationId>,
        to: Option<LocationId>,
        payload: StepPayload,
    ) -> Result<(), ChainError> {
        let starts_at = self.cursor;
        let offset = Duration::seconds(i64::try_from(duration_secs).unwrap_or(i64::MAX));
        let ends_at = starts_at
            .checked_add_signed(offset)
            .ok_or(ChainError::ScheduleOverflow)?;
        let seq = u32::try_from(self.steps.len()).unwrap_or(u32::MAX);
        self.steps.push(ActivityStep {
            id: StepId::new(),
            chain_id: self.chain_id,
            seq,
            kind,
            agent_id: self.agent,
            status: StepStatus::Pending,
            starts_at,
            ends_at,
            from_location: from,
            to_location: to,
            payload,
            failure_reason: None,
            created_at: self.created_at,
        });
        self.cursor = ends_at;
        Ok(())
    }
}

impl<'a> ChainBuilder<'a> {
    /// Create a builder over the given store and routing resolver.
    pub const fn new(
        store: &'a dyn RecordStore,
        resolver: &'a dyn agora_world::RouteResolver,
    ) -> Self {
        Self { store, resolver }
    }

    /// Validate the request and build its full ordered step list.
    ///
    /// Nothing is persisted; the returned list is what [`submit_chain`]
    /// writes atomically.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] on a failed precondition, a missing agent
    /// location, an unroutable leg, or a store failure. No partial output
    /// is produced.
    pub fn build(
        &self,
        request: &ActionRequest,
        now: DateTime<Utc>,
    ) -> Result<Vec<ActivityStep>, ChainError> {
        let agent = self.store.agent(request.agent_id)?;
        let origin = agent
            .location
            .ok_or(ChainError::InvalidAgentLocation(agent.id))?;

        let mut chain = ChainAccumulator::new(agent.id, now);

        match &request.params {
            ActionParams::Delivery { lot, destination } => {
                let record = validation::owned_lot(self.store, *lot, agent.id)?;
                self.store.location(*destination)?;
                self.travel_leg(&mut chain, origin, *destination, Some(*lot))?;
                chain.push(
                    StepKind::Deliver,
                    DELIVER_DURATION_SECS,
                    Some(*destination),
                    Some(*destination),
                    StepPayload::Deliver(DeliverPayload {
                        version: PAYLOAD_VERSION,
                        lot: *lot,
                        resource: record.kind,
                        quantity: record.quantity,
                    }),
                )?;
            }
            ActionParams::Trade {
                counterparty,
                lot,
                price,
            } => {
                validation::trade_preconditions(self.store, &agent, *counterparty, *lot, *price)?;
                let meeting_point = self
                    .store
                    .agent(*counterparty)?
                    .location
                    .ok_or(ChainError::InvalidAgentLocation(*counterparty))?;
                self.travel_leg(&mut chain, origin, meeting_point, *lot)?;
                chain.push(
                    StepKind::Transact,
                    TRANSACT_DURATION_SECS,
                    Some(meeting_point),
                    Some(meeting_point),
                    StepPayload::Transact(TransactPayload {
                        version: PAYLOAD_VERSION,
                        counterparty: *counterparty,
                        lot: *lot,
                        price: *price,
                    }),
                )?;
            }
            ActionParams::Construction {
                site,
                cost,
                handover_fee,
            } => {
                validation::construction_preconditions(self.store, &agent, *site, *cost)?;
                self.travel_leg(&mut chain, origin, *site, None)?;
                chain.push(
                    StepKind::Build,
                    BUILD_DURATION_SECS,
                    Some(*site),
                    Some(*site),
                    StepPayload::Build(BuildPayload {
                        version: PAYLOAD_VERSION,
                        site: *site,
                        cost: *cost,
                        handover_fee: *handover_fee,
                    }),
                )?;
            }
        }

        let closing_at = chain
            .steps
            .last()
            .and_then(|s| s.to_location)
            .or(Some(origin));
        chain.push(
            StepKind::Finalize,
            FINALIZE_DURATION_SECS,
            closing_at,
            closing_at,
            StepPayload::Finalize(FinalizePayload {
                version: PAYLOAD_VERSION,
                note: None,
            }),
        )?;

        info!(
            chain = %chain.chain_id,
            agent = %agent.id,
            kind = ?request.params.kind(),
            steps = chain.steps.len(),
            "Built activity chain"
        );
        Ok(chain.steps)
    }

    /// Append a travel step if the leg actually moves. A same-location leg
    /// produces no step.
    fn travel_leg(
        &self,
        chain: &mut ChainAccumulator,
        from: LocationId,
        to: LocationId,
        carried_lot: Option<agora_types::LotId>,
    ) -> Result<(), ChainError> {
        if from == to {
            return Ok(());
        }
        let route = self
            .resolver
            .resolve(from, to)
            .map_err(|source| ChainError::RouteNotFound { from, to, source })?;
        chain.push(
            StepKind::Travel,
            route.duration_secs,
            Some(from),
            Some(to),
            StepPayload::Travel(TravelPayload {
                version: PAYLOAD_VERSION,
                path: route.path,
                duration_secs: route.duration_secs,
                carried_lot,
            }),
        )
    }
}

/// Build a chain for the request and persist it atomically.
///
/// # Errors
///
/// Returns [`ChainError`] if construction fails (nothing persisted) or if
/// the atomic insert is rejected.
pub fn submit_chain<S: RecordStore>(
    store: &mut S,
    resolver: &dyn agora_world::RouteResolver,
    request: &ActionRequest,
    now: DateTime<Utc>,
) -> Result<Vec<ActivityStep>, ChainError> {
    let steps = ChainBuilder::new(&*store, resolver).build(request, now)?;
    store.insert_steps(&steps)?;
    Ok(steps)
}
