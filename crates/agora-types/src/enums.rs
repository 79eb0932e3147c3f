//! Enumeration types shared across the Agora workspace.
//!
//! All enums are closed: dispatch on them happens through exhaustive
//! `match` expressions, so adding a variant is a compile-time event
//! everywhere it matters (no runtime string comparison).

use serde::{Deserialize, Serialize};

/// The kind of one activity step within a chain.
///
/// The dispatcher selects a handler by matching on this enum, so an
/// unknown kind cannot exist at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Move the agent (and any carried lot) along a resolved route.
    Travel,
    /// Drop a carried resource lot at the destination building.
    Deliver,
    /// Exchange a lot or a payment against a counterparty, producing a contract.
    Transact,
    /// Commit construction funds at a site, producing a construction contract.
    Build,
    /// Close out the chain with fixed-duration bookkeeping.
    Finalize,
}

/// Lifecycle status of an activity step.
///
/// Transitions: `Pending -> InProgress -> Completed | Failed`, and
/// `Pending -> Cancelled` before dispatch. Terminal steps are never
/// deleted; they remain as history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Created but not yet due or not yet dispatched.
    Pending,
    /// Dispatched and currently executing (held only within one tick).
    InProgress,
    /// Handler succeeded; `ends_at` is authoritative.
    Completed,
    /// Handler failed; `failure_reason` names the cause. No auto-retry.
    Failed,
    /// Externally cancelled before dispatch; skipped by the dispatcher.
    Cancelled,
}

impl StepStatus {
    /// Whether the status is terminal (no further transitions).
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether the step still has work ahead of it.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

/// The action kinds the Chain Builder knows how to expand into chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Carry a resource lot to a destination building.
    Delivery,
    /// Travel to a counterparty and exchange a lot against payment.
    Trade,
    /// Travel to a site and commit funds to a construction project.
    Construction,
}

/// The resource kinds circulating in the economy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Staple food grain.
    Grain,
    /// Construction timber.
    Timber,
    /// Quarried stone.
    Stone,
    /// Woven cloth.
    Cloth,
    /// Crafted tools.
    Tools,
}

/// Lifecycle status of a campaign (stratagem).
///
/// `Active` is entered at creation with escrow fully reserved. All other
/// states are terminal; a terminal campaign is never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    /// Accepting contributions; scanned every tick.
    Active,
    /// Target amount reached; escrow settled.
    Completed,
    /// Expiry passed before the target was reached; escrow settled.
    Expired,
    /// An unrecoverable scan failure occurred; the ledger is preserved
    /// as-is for manual inspection.
    Errored,
}

impl CampaignStatus {
    /// Whether the status is terminal (never re-entered by the scanner).
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Why a campaign left the `Active` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// `collected_amount` reached `max_total_amount`.
    TargetReached,
    /// The expiry timestamp passed.
    Expired,
    /// The organizer cancelled the campaign.
    Cancelled,
    /// Delta scanning hit an unrecoverable error.
    ScanFailed,
}

impl core::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            Self::TargetReached => "target reached",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled by organizer",
            Self::ScanFailed => "scan failed",
        };
        write!(f, "{text}")
    }
}

/// The category of a contract produced by a step handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    /// A lot changed owner against payment.
    Sale,
    /// Funds committed to a construction project at a site.
    Construction,
}
