//! Chain builder for the Agora economy simulation.
//!
//! An action request (delivery, trade, construction) becomes an ordered
//! list of activity steps with continuous timestamps: travel legs first,
//! then the action itself, then a fixed fifteen-minute finalize step. The
//! whole list is validated and built in memory before anything is
//! persisted, so partial chains never exist in the store.

pub mod builder;
pub mod error;
mod validation;

pub use builder::{
    submit_chain, ChainBuilder, BUILD_DURATION_SECS, DELIVER_DURATION_SECS,
    FINALIZE_DURATION_SECS, TRANSACT_DURATION_SECS,
};
pub use error::{ChainError, ValidationError};
