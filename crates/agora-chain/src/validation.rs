//! Per-action precondition checks.
//!
//! Each check runs against read-only store state before any step is built.
//! A failed check aborts the whole request with a typed error, so callers
//! can distinguish "fix your parameters" from "the world says no".

use agora_store::RecordStore;
use agora_types::{Agent, AgentId, LotId, ResourceLot};
use rust_decimal::Decimal;

use crate::error::{ChainError, ValidationError};

/// Fetch a lot and confirm the agent owns it and it is non-empty.
pub(crate) fn owned_lot(
    store: &dyn RecordStore,
    lot: LotId,
    agent: AgentId,
) -> Result<ResourceLot, ChainError> {
    let record = store.lot(lot)?;
    if record.owner != agent {
        return Err(ValidationError::LotNotOwned { lot, agent }.into());
    }
    if record.quantity == 0 {
        return Err(ValidationError::EmptyLot { lot }.into());
    }
    Ok(record)
}

/// Confirm the agent can cover `required`.
pub(crate) fn sufficient_balance(
    agent: &Agent,
    required: Decimal,
) -> Result<(), ValidationError> {
    if agent.balance < required {
        return Err(ValidationError::InsufficientBalance {
            agent: agent.id,
            required,
            available: agent.balance,
        });
    }
    Ok(())
}

/// Validate a trade request: positive price, distinct parties, and the
/// paying party able to cover the price. When a lot changes hands the
/// counterparty pays; otherwise the requester is making a plain payment.
pub(crate) fn trade_preconditions(
    store: &dyn RecordStore,
    requester: &Agent,
    counterparty: AgentId,
    lot: Option<LotId>,
    price: Decimal,
) -> Result<(), ChainError> {
    if price <= Decimal::ZERO {
        return Err(ValidationError::NonPositivePrice { price }.into());
    }
    if counterparty == requester.id {
        return Err(ValidationError::SelfTrade { agent: requester.id }.into());
    }
    let other = store.agent(counterparty)?;
    match lot {
        Some(lot_id) => {
            owned_lot(store, lot_id, requester.id)?;
            sufficient_balance(&other, price)?;
        }
        None => sufficient_balance(requester, price)?,
    }
    Ok(())
}

/// Validate a construction request: the site exists, the cost is positive,
/// and the builder can pay it.
pub(crate) fn construction_preconditions(
    store: &dyn RecordStore,
    requester: &Agent,
    site: agora_types::LocationId,
    cost: Decimal,
) -> Result<(), ChainError> {
    if cost <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveCost { cost }.into());
    }
    store.location(site)?;
    sufficient_balance(requester, cost)?;
    Ok(())
}
