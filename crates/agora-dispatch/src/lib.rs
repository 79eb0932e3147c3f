//! Step dispatcher for the Agora economy simulation.
//!
//! Once per tick, [`process_due_steps`] executes every pending step whose
//! start time has arrived, routing each one through the handler for its
//! kind. Handlers mutate domain state (locations, lot ownership, balances,
//! contracts); the dispatcher owns status transitions and per-chain
//! sequencing. A failed step is terminal; its successors fail their own
//! gate checks with the failed predecessor named.

pub mod dispatcher;
pub mod error;
pub mod handlers;

pub use dispatcher::{cancel_step, process_due_steps, DispatchSummary};
pub use error::{DispatchError, HandlerError};
