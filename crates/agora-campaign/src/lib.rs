//! Campaign registry for the Agora economy simulation.
//!
//! A campaign (stratagem) is a long-lived collective goal: deliver up to
//! `max_total_amount` units of one resource to a target, with a pooled
//! reward escrowed from the organizer at creation. Three pieces live here:
//!
//! - [`create_campaign`] -- creation with synchronous, atomic escrow.
//! - [`scan_campaign`] -- the idempotent delta scanner that folds newly
//!   completed deliveries into the ledger each tick.
//! - [`lifecycle`] -- termination evaluation and settlement, including the
//!   organizer's escrow refund and explicit cancellation.

pub mod create;
pub mod error;
pub mod lifecycle;
pub mod scanner;

pub use create::{create_campaign, CampaignRequest};
pub use error::CampaignError;
pub use lifecycle::{cancel_campaign, evaluate, terminate};
pub use scanner::{scan_campaign, ScanOutcome, INITIAL_LOOKBACK_SECS, SCAN_OVERLAP_SECS};
