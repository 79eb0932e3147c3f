//! The periodic tick: dispatch due steps, then scan active campaigns.
//!
//! One tick is (1) a dispatch pass over all due steps, then (2) a delta
//! scan plus lifecycle evaluation for each active campaign, sequentially.
//! Campaigns never share a scan within a tick, so each campaign record has
//! exactly one writer per tick.
//!
//! Dry-run mode clones the in-memory store, runs the identical tick
//! against the copy, logs what would have happened, and discards it.

use agora_campaign::{scan_campaign, ScanOutcome};
use agora_dispatch::{process_due_steps, DispatchSummary};
use agora_store::{MemoryStore, RecordStore, StepQuery};
use agora_types::{ActivityStep, StepStatus, TerminationReason};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::DriverError;

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Step dispatch counts.
    pub dispatch: DispatchSummary,
    /// Campaigns scanned and still active.
    pub campaigns_continuing: u32,
    /// Campaigns that terminated this tick, with their reasons.
    pub campaigns_terminated: Vec<TerminationReason>,
    /// Campaigns moved to `errored` this tick.
    pub campaigns_errored: u32,
}

/// Run one full tick against the store.
///
/// # Errors
///
/// Returns [`DriverError`] if the dispatch pass or a campaign scan hits a
/// store failure. A campaign-level scan failure is absorbed into that
/// campaign's `errored` state and does not stop the tick.
pub fn run_tick(store: &mut MemoryStore, now: DateTime<Utc>) -> Result<TickReport, DriverError> {
    let dispatch = process_due_steps(store, now)?;

    let mut report = TickReport {
        dispatch,
        ..TickReport::default()
    };
    for campaign in store.active_campaigns() {
        match scan_campaign(store, campaign.id, now)? {
            ScanOutcome::Continuing => {
                report.campaigns_continuing = report.campaigns_continuing.saturating_add(1);
            }
            ScanOutcome::AlreadyTerminal => {}
            ScanOutcome::Terminated(reason) => report.campaigns_terminated.push(reason),
            ScanOutcome::Errored => {
                report.campaigns_errored = report.campaigns_errored.saturating_add(1);
            }
        }
    }

    info!(
        steps_completed = report.dispatch.completed,
        steps_failed = report.dispatch.failed,
        campaigns_continuing = report.campaigns_continuing,
        campaigns_terminated = report.campaigns_terminated.len(),
        campaigns_errored = report.campaigns_errored,
        "Tick complete"
    );
    Ok(report)
}

/// Run the tick against a throwaway copy of the store and discard every
/// mutation. The report shows what a real tick would have done.
///
/// # Errors
///
/// Returns [`DriverError`] under the same conditions as [`run_tick`].
pub fn run_tick_dry(store: &MemoryStore, now: DateTime<Utc>) -> Result<TickReport, DriverError> {
    let mut scratch = store.clone();
    let report = run_tick(&mut scratch, now)?;
    warn!(
        steps_completed = report.dispatch.completed,
        steps_failed = report.dispatch.failed,
        campaigns_terminated = report.campaigns_terminated.len(),
        "Dry run: mutations computed and discarded"
    );
    Ok(report)
}

/// All steps currently in a terminal status, for archival.
#[must_use]
pub fn terminal_steps(store: &MemoryStore) -> Vec<ActivityStep> {
    let mut steps = Vec::new();
    for status in [
        StepStatus::Completed,
        StepStatus::Failed,
        StepStatus::Cancelled,
    ] {
        steps.extend(store.query_steps(&StepQuery::new().with_status(status)));
    }
    steps
}
