//! Dispatch error taxonomy.
//!
//! Handler errors and infrastructure errors recover differently: a
//! [`HandlerError`] marks the one step failed and the tick continues, a
//! [`DispatchError`] aborts the whole dispatch pass.

use agora_types::{AgentId, LotId};
use rust_decimal::Decimal;

/// A step handler could not perform its domain mutation. The step is
/// marked failed with this error as the reason; no retry.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The paying party cannot cover the amount at execution time.
    #[error("agent {agent} has {available} but owes {required}")]
    InsufficientFunds {
        /// The paying agent.
        agent: AgentId,
        /// The amount due.
        required: Decimal,
        /// The balance actually held.
        available: Decimal,
    },

    /// The lot named in the payload no longer belongs to the step's agent.
    #[error("lot {lot} is no longer held by agent {agent}")]
    LotNotHeld {
        /// The lot named in the payload.
        lot: LotId,
        /// The step's agent.
        agent: AgentId,
    },

    /// A balance or schedule computation left the representable range.
    #[error("arithmetic overflowed")]
    Overflow,

    /// A record the handler needed is missing or unwritable.
    #[error(transparent)]
    Store(#[from] agora_store::StoreError),
}

/// The dispatch pass itself failed. Distinct from a single step failing.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Only pending steps can be cancelled.
    #[error("step {step} is {status:?} and can no longer be cancelled")]
    NotCancellable {
        /// The step named in the cancellation.
        step: agora_types::StepId,
        /// Its current status.
        status: agora_types::StepStatus,
    },

    /// A store read or write outside any handler failed.
    #[error(transparent)]
    Store(#[from] agora_store::StoreError),
}
