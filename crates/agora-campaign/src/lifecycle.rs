//! Campaign lifecycle management: termination evaluation and settlement.
//!
//! All roads out of `active` run through [`terminate`], so unspent escrow
//! is refunded on every ordinary ending. The one exception is a scan
//! failure, which freezes the ledger for inspection instead of settling.

use agora_store::RecordStore;
use agora_types::{
    AgentId, Campaign, CampaignId, CampaignStatus, TerminationReason,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::CampaignError;

/// Decide whether a campaign should end now.
///
/// Reaching the target wins over expiry when both hold at once; the
/// campaign did what it set out to do.
#[must_use]
pub fn evaluate(campaign: &Campaign, now: DateTime<Utc>) -> Option<TerminationReason> {
    if campaign.remaining_capacity() == 0 {
        return Some(TerminationReason::TargetReached);
    }
    if now >= campaign.expires_at {
        return Some(TerminationReason::Expired);
    }
    None
}

/// Settle and close a campaign.
///
/// Unspent escrow goes back to the organizer, the status flips to its
/// terminal value, and the ledger stays as the final snapshot (so escrow
/// conservation still reads true afterwards). A scan failure skips the
/// refund and freezes everything for manual inspection. Terminating an
/// already-terminal campaign is a no-op.
///
/// # Errors
///
/// Returns [`CampaignError`] if the store rejects a read or write.
pub fn terminate<S: RecordStore>(
    store: &mut S,
    id: CampaignId,
    reason: TerminationReason,
) -> Result<(), CampaignError> {
    let mut campaign = store.campaign(id)?;
    if campaign.status.is_terminal() {
        debug!(campaign = %id, status = ?campaign.status, "Already terminal, skipping");
        return Ok(());
    }

    let refund = match reason {
        TerminationReason::ScanFailed => None,
        TerminationReason::TargetReached
        | TerminationReason::Expired
        | TerminationReason::Cancelled => Some(campaign.ledger.escrow_remaining),
    };

    if let Some(unspent) = refund {
        let mut organizer = store.agent(campaign.organizer)?;
        organizer.balance = organizer
            .balance
            .checked_add(unspent)
            .ok_or(CampaignError::Overflow)?;
        store.update_agent(organizer)?;
    }

    campaign.status = match reason {
        TerminationReason::TargetReached => CampaignStatus::Completed,
        TerminationReason::Expired | TerminationReason::Cancelled => CampaignStatus::Expired,
        TerminationReason::ScanFailed => CampaignStatus::Errored,
    };
    campaign.reason = Some(reason.to_string());
    store.update_campaign(campaign.clone())?;

    info!(
        campaign = %id,
        status = ?campaign.status,
        reason = %reason,
        refund = ?refund,
        collected = campaign.ledger.collected,
        "Campaign terminated"
    );
    Ok(())
}

/// Organizer-initiated cancellation, routed through [`terminate`] so the
/// escrow refund can never be skipped.
///
/// # Errors
///
/// Returns [`CampaignError::NotOrganizer`] for anyone but the organizer,
/// [`CampaignError::NotActive`] for a campaign already closed, or a store
/// error.
pub fn cancel_campaign<S: RecordStore>(
    store: &mut S,
    id: CampaignId,
    requester: AgentId,
) -> Result<(), CampaignError> {
    let campaign = store.campaign(id)?;
    if campaign.organizer != requester {
        return Err(CampaignError::NotOrganizer {
            campaign: id,
            agent: requester,
        });
    }
    if campaign.status.is_terminal() {
        return Err(CampaignError::NotActive {
            campaign: id,
            status: campaign.status,
        });
    }
    terminate(store, id, TerminationReason::Cancelled)
}
