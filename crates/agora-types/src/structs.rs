//! Core entity structs: agents, locations, routes, lots, contracts,
//! activity steps, and campaigns with their embedded ledger.
//!
//! These are data records. Behavior lives in the domain crates: the chain
//! builder constructs steps, the dispatcher mutates them, and the campaign
//! crate owns all ledger arithmetic.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{CampaignStatus, ContractKind, ResourceKind, StepKind, StepStatus};
use crate::ids::{
    AgentId, CampaignId, ChainId, ContractId, LocationId, LotId, RouteId, StepId,
};
use crate::payload::StepPayload;

// ---------------------------------------------------------------------------
// World entities
// ---------------------------------------------------------------------------

/// An autonomous citizen with a location and a money balance.
///
/// Mutated by step handlers and campaign settlement; never destroyed
/// during a simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique identifier.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Current money balance.
    pub balance: Decimal,
    /// Current location, if known. Chains cannot be built for an agent
    /// whose location is absent.
    pub location: Option<LocationId>,
}

/// A building or point in a district; immutable reference data used for
/// routing and proximity checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Unique identifier.
    pub id: LocationId,
    /// Display name.
    pub name: String,
    /// The agent operating this building, if any. Campaign deliveries to a
    /// building transfer ownership to its operator.
    pub operator: Option<AgentId>,
}

/// A directed edge in the district graph with a travel duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Unique identifier.
    pub id: RouteId,
    /// Origin location.
    pub from: LocationId,
    /// Destination location.
    pub to: LocationId,
    /// Travel duration in seconds.
    pub duration_secs: u64,
    /// Whether the route can be traversed in both directions.
    pub bidirectional: bool,
}

/// An owned stock of one resource kind, located somewhere in the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLot {
    /// Unique identifier.
    pub id: LotId,
    /// The resource kind.
    pub kind: ResourceKind,
    /// Number of units in the lot.
    pub quantity: u32,
    /// Current owner.
    pub owner: AgentId,
    /// Current physical location.
    pub location: LocationId,
}

/// A settled exchange between two agents, written by step handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    /// Unique identifier.
    pub id: ContractId,
    /// The category of exchange.
    pub kind: ContractKind,
    /// The paying party.
    pub buyer: AgentId,
    /// The receiving party.
    pub seller: AgentId,
    /// Amount paid.
    pub amount: Decimal,
    /// The step that produced this contract.
    pub step: StepId,
    /// When the contract was written.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Activity steps
// ---------------------------------------------------------------------------

/// One timed unit of work within an activity chain.
///
/// Within a chain, step `N`'s `starts_at` equals step `N-1`'s `ends_at`
/// (continuity), and at most one step per chain is non-terminal at a time.
/// Created by the chain builder; mutated only by the dispatcher; never
/// deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityStep {
    /// Unique identifier.
    pub id: StepId,
    /// The chain this step belongs to.
    pub chain_id: ChainId,
    /// Position within the chain. Disambiguates same-timestamp steps.
    pub seq: u32,
    /// The step kind; selects the dispatch handler.
    pub kind: StepKind,
    /// The agent performing the step.
    pub agent_id: AgentId,
    /// Lifecycle status.
    pub status: StepStatus,
    /// Scheduled start. The dispatcher picks the step up once this is due.
    pub starts_at: DateTime<Utc>,
    /// Scheduled end. Kept authoritative on completion for schedule
    /// determinism.
    pub ends_at: DateTime<Utc>,
    /// Source location, where the step involves movement or a pickup.
    pub from_location: Option<LocationId>,
    /// Destination location, where the step involves movement or a drop-off.
    pub to_location: Option<LocationId>,
    /// Kind-specific payload.
    pub payload: StepPayload,
    /// Why the step failed, when `status` is [`StepStatus::Failed`].
    pub failure_reason: Option<String>,
    /// When the step record was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Campaigns
// ---------------------------------------------------------------------------

/// What a campaign's qualifying deliveries must arrive at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", content = "id", rename_all = "snake_case")]
pub enum CampaignTarget {
    /// A single building; its operator is the beneficiary.
    Building(LocationId),
    /// Every building operated by this agent; the agent is the beneficiary.
    Operator(AgentId),
}

/// One participant's standing within a campaign ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantEntry {
    /// The contributing agent.
    pub agent: AgentId,
    /// Units contributed so far (post-clamp).
    pub contributed: u32,
    /// Total reward credited to the agent so far.
    pub reward_earned: Decimal,
}

/// The mutable bookkeeping structure embedded in a campaign.
///
/// Invariants, enforced by the campaign crate and checked in tests:
/// - `escrow_initial == escrow_remaining + sum(reward_earned)`
/// - `collected == sum(contributed)`
/// - `collected <= max_total_amount` of the owning campaign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignLedger {
    /// Units collected so far across all participants.
    pub collected: u32,
    /// Escrow reserved at creation.
    pub escrow_initial: Decimal,
    /// Escrow not yet paid out as rewards.
    pub escrow_remaining: Decimal,
    /// Per-agent contribution entries.
    pub participants: Vec<ParticipantEntry>,
    /// Steps already folded into this ledger. The idempotence guard:
    /// re-scanning a window never re-credits a processed step.
    pub processed_steps: BTreeSet<StepId>,
    /// Completion-time cursor of the last scan, if any scan has run.
    pub last_scanned_at: Option<DateTime<Utc>>,
}

impl CampaignLedger {
    /// A fresh ledger holding the given escrow.
    pub const fn new(escrow: Decimal) -> Self {
        Self {
            collected: 0,
            escrow_initial: escrow,
            escrow_remaining: escrow,
            participants: Vec::new(),
            processed_steps: BTreeSet::new(),
            last_scanned_at: None,
        }
    }

    /// Total rewards paid out so far.
    pub fn total_rewards_paid(&self) -> Decimal {
        self.participants
            .iter()
            .fold(Decimal::ZERO, |acc, p| acc.saturating_add(p.reward_earned))
    }

    /// Whether the escrow conservation invariant holds.
    pub fn is_conserved(&self) -> bool {
        self.escrow_initial == self.escrow_remaining.saturating_add(self.total_rewards_paid())
    }

    /// Sum of per-participant contributions. Equals `collected` for a
    /// well-formed ledger.
    pub fn contributed_total(&self) -> u64 {
        self.participants
            .iter()
            .fold(0u64, |acc, p| acc.saturating_add(u64::from(p.contributed)))
    }
}

/// A long-lived collective campaign (stratagem) with pooled rewards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    /// Unique identifier.
    pub id: CampaignId,
    /// The agent who created the campaign and funded the escrow.
    pub organizer: AgentId,
    /// The resource kind qualifying deliveries must carry.
    pub resource: ResourceKind,
    /// Where qualifying deliveries must arrive.
    pub target: CampaignTarget,
    /// Maximum total units the campaign will accept.
    pub max_total_amount: u32,
    /// Reward paid per accepted unit.
    pub reward_per_unit: Decimal,
    /// Lifecycle status.
    pub status: CampaignStatus,
    /// Free-text reason recorded when the campaign left `Active`.
    pub reason: Option<String>,
    /// When the campaign was created.
    pub created_at: DateTime<Utc>,
    /// When the campaign stops accepting contributions.
    pub expires_at: DateTime<Utc>,
    /// The embedded bookkeeping ledger.
    pub ledger: CampaignLedger,
}

impl Campaign {
    /// Units the campaign can still accept before hitting the cap.
    pub const fn remaining_capacity(&self) -> u32 {
        self.max_total_amount.saturating_sub(self.ledger.collected)
    }
}
