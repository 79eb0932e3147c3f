//! Kind-specific step handlers.
//!
//! Each handler performs the domain mutation for one step kind and returns
//! any follow-up steps it schedules. Handlers re-check their preconditions
//! at execution time; the world may have moved since the chain was built.

use agora_store::RecordStore;
use agora_types::{
    ActivityStep, AgentId, BuildPayload, Contract, ContractId, ContractKind, DeliverPayload,
    LotId, StepId, StepKind, StepPayload, StepStatus, TransactPayload, TravelPayload,
    PAYLOAD_VERSION,
};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::HandlerError;

/// Fixed duration of a handover-fee settlement appended after a build.
const HANDOVER_SECS: i64 = 600;

/// Steps a handler scheduled as a consequence of its own completion.
pub type FollowUps = Vec<ActivityStep>;

/// Move the agent (and any carried lot) to the travel destination.
pub fn travel(
    store: &mut dyn RecordStore,
    step: &ActivityStep,
    payload: &TravelPayload,
) -> Result<FollowUps, HandlerError> {
    let destination = step.to_location;

    // Resolve the carried lot before moving anyone; a failed ownership
    // check must leave the agent where it stands.
    let carried = match payload.carried_lot {
        Some(lot_id) => Some(held_lot(store, lot_id, step.agent_id)?),
        None => None,
    };

    let mut agent = store.agent(step.agent_id)?;
    agent.location = destination;
    store.update_agent(agent)?;

    if let (Some(mut lot), Some(to)) = (carried, destination) {
        lot.location = to;
        store.update_lot(lot)?;
    }

    debug!(agent = %step.agent_id, to = ?destination, "Travel complete");
    Ok(Vec::new())
}

/// Place the delivered lot at the destination. Ownership is untouched
/// here; campaign settlement decides who the goods ultimately belong to.
pub fn deliver(
    store: &mut dyn RecordStore,
    step: &ActivityStep,
    payload: &DeliverPayload,
) -> Result<FollowUps, HandlerError> {
    let mut lot = held_lot(store, payload.lot, step.agent_id)?;
    if let Some(to) = step.to_location {
        lot.location = to;
    }
    store.update_lot(lot)?;
    debug!(lot = %payload.lot, to = ?step.to_location, "Delivery complete");
    Ok(Vec::new())
}

/// Settle a transaction: either the agent sells a lot to the counterparty
/// (counterparty pays), or the agent makes a plain payment to the
/// counterparty. Writes a sale contract either way.
pub fn transact(
    store: &mut dyn RecordStore,
    step: &ActivityStep,
    payload: &TransactPayload,
) -> Result<FollowUps, HandlerError> {
    let (buyer_id, seller_id) = match payload.lot {
        Some(_) => (payload.counterparty, step.agent_id),
        None => (step.agent_id, payload.counterparty),
    };

    transfer_balance(store, buyer_id, seller_id, payload.price)?;

    if let Some(lot_id) = payload.lot {
        let mut lot = held_lot(store, lot_id, step.agent_id)?;
        lot.owner = payload.counterparty;
        if let Some(at) = step.to_location {
            lot.location = at;
        }
        store.update_lot(lot)?;
    }

    store.insert_contract(Contract {
        id: ContractId::new(),
        kind: ContractKind::Sale,
        buyer: buyer_id,
        seller: seller_id,
        amount: payload.price,
        step: step.id,
        created_at: step.ends_at,
    })?;

    debug!(buyer = %buyer_id, seller = %seller_id, price = %payload.price, "Transaction settled");
    Ok(Vec::new())
}

/// Pay for construction at the site and record the contract. The builder
/// becomes the site's operator. If a handover fee was agreed with the
/// previous operator, a settlement step is appended to the chain's tail.
pub fn build(
    store: &mut dyn RecordStore,
    step: &ActivityStep,
    payload: &BuildPayload,
) -> Result<FollowUps, HandlerError> {
    let mut agent = store.agent(step.agent_id)?;
    if agent.balance < payload.cost {
        return Err(HandlerError::InsufficientFunds {
            agent: agent.id,
            required: payload.cost,
            available: agent.balance,
        });
    }
    agent.balance = agent
        .balance
        .checked_sub(payload.cost)
        .ok_or(HandlerError::Overflow)?;
    store.update_agent(agent)?;

    let mut site = store.location(payload.site)?;
    let previous_operator = site.operator;
    site.operator = Some(step.agent_id);
    store.update_location(site)?;

    store.insert_contract(Contract {
        id: ContractId::new(),
        kind: ContractKind::Construction,
        buyer: step.agent_id,
        seller: previous_operator.unwrap_or(step.agent_id),
        amount: payload.cost,
        step: step.id,
        created_at: step.ends_at,
    })?;

    // Fee settlement only makes sense when someone is there to receive it.
    let follow_up = match (payload.handover_fee, previous_operator) {
        (Some(fee), Some(operator)) if fee > Decimal::ZERO => {
            Some(handover_step(store, step, operator, fee)?)
        }
        _ => None,
    };

    debug!(site = %payload.site, cost = %payload.cost, "Construction complete");
    Ok(follow_up.into_iter().collect())
}

/// Close out the chain. The step's completion is the whole effect.
pub fn finalize(step: &ActivityStep) -> FollowUps {
    debug!(chain = %step.chain_id, "Chain finalized");
    Vec::new()
}

/// Build the handover-fee settlement step, scheduled after the chain's
/// current last step so timestamp continuity holds.
fn handover_step(
    store: &dyn RecordStore,
    step: &ActivityStep,
    operator: AgentId,
    fee: Decimal,
) -> Result<ActivityStep, HandlerError> {
    let tail = store
        .chain_steps(step.chain_id)
        .last()
        .map_or((step.seq, step.ends_at), |last| (last.seq, last.ends_at));
    let starts_at = tail.1;
    let ends_at = starts_at
        .checked_add_signed(chrono::Duration::seconds(HANDOVER_SECS))
        .ok_or(HandlerError::Overflow)?;

    Ok(ActivityStep {
        id: StepId::new(),
        chain_id: step.chain_id,
        seq: tail.0.saturating_add(1),
        kind: StepKind::Transact,
        agent_id: step.agent_id,
        status: StepStatus::Pending,
        starts_at,
        ends_at,
        from_location: step.to_location,
        to_location: step.to_location,
        payload: StepPayload::Transact(TransactPayload {
            version: PAYLOAD_VERSION,
            counterparty: operator,
            lot: None,
            price: fee,
        }),
        failure_reason: None,
        created_at: step.ends_at,
    })
}

/// Fetch a lot and confirm the agent still holds it.
fn held_lot(
    store: &dyn RecordStore,
    lot: LotId,
    agent: AgentId,
) -> Result<agora_types::ResourceLot, HandlerError> {
    let record = store.lot(lot)?;
    if record.owner != agent {
        return Err(HandlerError::LotNotHeld { lot, agent });
    }
    Ok(record)
}

/// Move `amount` from `payer` to `payee`, failing if the payer cannot
/// cover it.
fn transfer_balance(
    store: &mut dyn RecordStore,
    payer: AgentId,
    payee: AgentId,
    amount: Decimal,
) -> Result<(), HandlerError> {
    let mut from = store.agent(payer)?;
    if from.balance < amount {
        return Err(HandlerError::InsufficientFunds {
            agent: payer,
            required: amount,
            available: from.balance,
        });
    }
    from.balance = from
        .balance
        .checked_sub(amount)
        .ok_or(HandlerError::Overflow)?;
    store.update_agent(from)?;

    let mut to = store.agent(payee)?;
    to.balance = to
        .balance
        .checked_add(amount)
        .ok_or(HandlerError::Overflow)?;
    store.update_agent(to)?;
    Ok(())
}
