//! Campaign error taxonomy.

use agora_types::{AgentId, CampaignId, CampaignStatus};
use rust_decimal::Decimal;

/// A campaign operation failed.
#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    /// A campaign needs a positive target amount.
    #[error("campaign target amount must be positive")]
    ZeroTargetAmount,

    /// Reward per unit may be zero (no pooled reward) but never negative.
    #[error("reward per unit {0} is negative")]
    NegativeReward(Decimal),

    /// The organizer cannot cover the escrow reserved at creation.
    #[error("organizer {organizer} has {available} but escrow requires {required}")]
    InsufficientEscrow {
        /// The organizing agent.
        organizer: AgentId,
        /// Escrow the campaign parameters require.
        required: Decimal,
        /// The organizer's current balance.
        available: Decimal,
    },

    /// The operation requires an active campaign.
    #[error("campaign {campaign} is {status:?}, not active")]
    NotActive {
        /// The campaign.
        campaign: CampaignId,
        /// Its current status.
        status: CampaignStatus,
    },

    /// Only the organizer may cancel a campaign.
    #[error("agent {agent} is not the organizer of campaign {campaign}")]
    NotOrganizer {
        /// The campaign.
        campaign: CampaignId,
        /// The agent who asked.
        agent: AgentId,
    },

    /// Escrow or reward arithmetic left the representable range.
    #[error("escrow arithmetic overflowed")]
    Overflow,

    /// A record read or write failed.
    #[error(transparent)]
    Store(#[from] agora_store::StoreError),
}
